//! Where groups live between requests.

use crate::error::LedgerError;
use crate::schemas::{Expense, Group, GroupId};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// This trait abstracts over the storage backend.
///
/// A group is stored as a whole, with its users and expenses, so removing it
/// removes everything it owns.
pub trait GroupStore {
    /// Reserve a fresh, never used group id.
    async fn next_group_id(&self) -> Result<GroupId, LedgerError>;

    async fn insert_group(&self, group: &Group) -> Result<(), LedgerError>;

    /// All groups, sorted by id.
    async fn list_groups(&self) -> Result<Vec<Group>, LedgerError>;

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>, LedgerError>;

    /// Append an expense to the group.
    ///
    /// The append only happens if the group still holds exactly `expected_len`
    /// expenses, otherwise [`LedgerError::Conflict`] is returned. A missing group
    /// gives [`LedgerError::GroupNotFound`].
    async fn append_expense(
        &self,
        group_id: GroupId,
        expected_len: usize,
        expense: &Expense,
    ) -> Result<(), LedgerError>;

    /// Delete the group with its users and expenses. Returns `false` if there
    /// was no such group.
    async fn delete_group(&self, id: GroupId) -> Result<bool, LedgerError>;
}
