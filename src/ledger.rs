//! The ledger service: validates requests, serializes writes per group and
//! derives balances and settlements from stored expenses.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::balance::{compute_balance_from_group, compute_balances, Balances};
use crate::error::LedgerError;
use crate::money::Amount;
use crate::schemas::{Expense, Group, GroupId, Percentage, SplitPolicy, UserName};
use crate::settlement::{compute_settlements, Settlement};
use crate::split::{compute_shares, Shares};
use crate::store::GroupStore;

/// An expense as submitted, with users still referenced by name.
#[derive(Clone, Debug)]
pub struct NewExpense {
    pub description: String,
    pub amount: Amount,
    pub paid_by: UserName,
    pub split: NewSplit,
}

#[derive(Clone, Debug)]
pub enum NewSplit {
    Equal,
    Percentage(Vec<(UserName, Decimal)>),
}

/// A stored expense with its shares and the group it was added to.
pub struct AddedExpense {
    pub group: Group,
    pub expense: Expense,
    pub shares: Shares,
}

pub struct GroupReport {
    pub group: Group,
    pub balances: Balances,
    pub settlements: Vec<Settlement>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSummary {
    pub user: UserName,
    pub total_owed: Amount,
    pub total_owing: Amount,
    pub net_balance: Amount,
}

pub struct Ledger<S> {
    store: S,
    locks: Mutex<HashMap<GroupId, Arc<Mutex<()>>>>,
}

impl<S: GroupStore> Ledger<S> {
    pub fn new(store: S) -> Ledger<S> {
        Ledger {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a group with at least two distinct, non-blank member names.
    pub async fn create_group(
        &self,
        name: &str,
        user_names: &[String],
    ) -> Result<Group, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(reject(LedgerError::invalid_group("the group name is empty")));
        }

        let mut seen = HashSet::new();
        let mut users = Vec::with_capacity(user_names.len());
        for user in user_names {
            let user = user.trim();
            if user.is_empty() {
                return Err(reject(LedgerError::invalid_group("a user name is empty")));
            }
            if !seen.insert(user) {
                return Err(reject(LedgerError::invalid_group(format!(
                    "user `{user}` appears more than once"
                ))));
            }
            users.push(user.to_string());
        }
        if users.len() < 2 {
            return Err(reject(LedgerError::invalid_group(
                "a group needs at least two users",
            )));
        }

        let id = self.store.next_group_id().await?;
        let group = Group::new(id, name.to_string(), users, Utc::now());
        self.store.insert_group(&group).await?;
        info!(
            "Created group {} `{}` with {} users",
            group.id,
            group.name,
            group.users.len()
        );
        Ok(group)
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, LedgerError> {
        self.store.list_groups().await
    }

    pub async fn group(&self, id: GroupId) -> Result<Group, LedgerError> {
        self.store
            .find_group(id)
            .await?
            .ok_or(LedgerError::GroupNotFound(id))
    }

    /// Validate and append an expense. The group's lock is held from reading
    /// the current expenses until the append, so concurrent writers to the same
    /// group cannot lose each other's updates. Nothing is stored on failure.
    pub async fn add_expense(
        &self,
        group_id: GroupId,
        new: NewExpense,
    ) -> Result<AddedExpense, LedgerError> {
        let lock = self.group_lock(group_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.append_locked(group_id, new).await
        };
        if let Err(LedgerError::GroupNotFound(_)) = result {
            self.locks.lock().await.remove(&group_id);
        }
        result
    }

    /// Must be called with the group's lock held.
    async fn append_locked(
        &self,
        group_id: GroupId,
        new: NewExpense,
    ) -> Result<AddedExpense, LedgerError> {
        let mut group = self.group(group_id).await?;
        let expense = build_expense(&group, new).map_err(reject)?;
        let shares = compute_shares(&expense, &group.users).map_err(reject)?;
        // An expense that would push a balance out of range is refused here,
        // otherwise the group could no longer be reported on.
        compute_balances(&group.users, group.expenses.iter().chain([&expense])).map_err(reject)?;

        self.store
            .append_expense(group_id, group.expenses.len(), &expense)
            .await?;
        info!(
            "Added expense {} of {} to group {}",
            expense.id, expense.amount, group_id
        );
        group.expenses.push(expense.clone());
        Ok(AddedExpense {
            group,
            expense,
            shares,
        })
    }

    pub async fn group_report(&self, id: GroupId) -> Result<GroupReport, LedgerError> {
        let group = self.group(id).await?;
        let balances = compute_balance_from_group(&group)?;
        let settlements = compute_settlements(&balances);
        Ok(GroupReport {
            group,
            balances,
            settlements,
        })
    }

    /// Totals for a user across every group that has a member with this name.
    pub async fn user_summary(&self, name: &str) -> Result<UserSummary, LedgerError> {
        let mut found = false;
        let mut total_owed: Amount = 0;
        let mut total_owing: Amount = 0;

        for group in self.store.list_groups().await? {
            let Some(user) = group.user_by_name(name) else {
                continue;
            };
            found = true;
            let user_id = user.id;
            let balances = compute_balance_from_group(&group)?;
            let balance = balances
                .iter()
                .find(|(id, _)| *id == user_id)
                .map(|(_, b)| *b)
                .unwrap_or(0);
            if balance > 0 {
                total_owed = total_owed.checked_add(balance).ok_or_else(too_large)?;
            } else {
                total_owing = total_owing.checked_sub(balance).ok_or_else(too_large)?;
            }
        }

        if !found {
            return Err(LedgerError::UserNotFound(name.to_string()));
        }
        Ok(UserSummary {
            user: name.to_string(),
            total_owed,
            total_owing,
            net_balance: total_owed.checked_sub(total_owing).ok_or_else(too_large)?,
        })
    }

    pub async fn delete_group(&self, id: GroupId) -> Result<(), LedgerError> {
        let lock = self.group_lock(id).await;
        let deleted = {
            let _guard = lock.lock().await;
            self.store.delete_group(id).await?
        };
        self.locks.lock().await.remove(&id);

        if !deleted {
            return Err(LedgerError::GroupNotFound(id));
        }
        info!("Deleted group {}", id);
        Ok(())
    }

    async fn group_lock(&self, id: GroupId) -> Arc<Mutex<()>> {
        self.locks.lock().await.entry(id).or_default().clone()
    }
}

fn too_large() -> LedgerError {
    LedgerError::invalid_expense("the totals are too large")
}

fn reject(error: LedgerError) -> LedgerError {
    warn!("Rejected request: {}", error);
    error
}

/// Resolve user names against the group and give the expense its id.
fn build_expense(group: &Group, new: NewExpense) -> Result<Expense, LedgerError> {
    let description = new.description.trim();
    if description.is_empty() {
        return Err(LedgerError::invalid_expense("the description is empty"));
    }

    let paid_by = group
        .user_by_name(new.paid_by.trim())
        .ok_or_else(|| {
            LedgerError::invalid_expense(format!(
                "`{}` is not a member of group `{}`",
                new.paid_by, group.name
            ))
        })?
        .id;

    let split = match new.split {
        NewSplit::Equal => SplitPolicy::Equal,
        NewSplit::Percentage(percentages) => {
            let percentages = percentages
                .into_iter()
                .map(|(name, percent)| {
                    let user = group.user_by_name(name.trim()).ok_or_else(|| {
                        LedgerError::invalid_split(format!(
                            "`{}` is not a member of group `{}`",
                            name, group.name
                        ))
                    })?;
                    Ok(Percentage {
                        user_id: user.id,
                        percent,
                    })
                })
                .collect::<Result<Vec<_>, LedgerError>>()?;
            SplitPolicy::Percentage { percentages }
        }
    };

    Ok(Expense {
        id: group.next_expense_id(),
        description: description.to_string(),
        amount: new.amount,
        paid_by,
        split,
        created_at: Utc::now(),
    })
}
