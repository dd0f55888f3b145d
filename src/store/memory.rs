use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::RwLock;

use super::GroupStore;
use crate::error::LedgerError;
use crate::schemas::{Expense, Group, GroupId};

/// Keeps every group in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    groups: RwLock<BTreeMap<GroupId, Group>>,
    last_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl GroupStore for MemoryStore {
    async fn next_group_id(&self) -> Result<GroupId, LedgerError> {
        Ok(self.last_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert_group(&self, group: &Group) -> Result<(), LedgerError> {
        self.groups.write().await.insert(group.id, group.clone());
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, LedgerError> {
        Ok(self.groups.read().await.values().cloned().collect())
    }

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>, LedgerError> {
        Ok(self.groups.read().await.get(&id).cloned())
    }

    async fn append_expense(
        &self,
        group_id: GroupId,
        expected_len: usize,
        expense: &Expense,
    ) -> Result<(), LedgerError> {
        let mut groups = self.groups.write().await;
        let group = groups
            .get_mut(&group_id)
            .ok_or(LedgerError::GroupNotFound(group_id))?;
        if group.expenses.len() != expected_len {
            return Err(LedgerError::Conflict(group_id));
        }
        group.expenses.push(expense.clone());
        Ok(())
    }

    async fn delete_group(&self, id: GroupId) -> Result<bool, LedgerError> {
        Ok(self.groups.write().await.remove(&id).is_some())
    }
}
