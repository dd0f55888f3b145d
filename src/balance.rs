use std::collections::HashMap;

use crate::error::LedgerError;
use crate::money::Amount;
use crate::schemas::{Expense, Group, User, UserId};
use crate::split::compute_shares;

/// Net position of each member, in member order. Positive means the member
/// is owed money, negative means they owe it.
pub type Balances = Vec<(UserId, Amount)>;

pub fn compute_balance_from_group(group: &Group) -> Result<Balances, LedgerError> {
    compute_balances(&group.users, &group.expenses)
}

/// Fold expenses into per-member balances: the payer is credited with the whole
/// amount and every member, payer included, is debited with their share.
///
/// The result does not depend on the order of `expenses`, and always sums to
/// exactly zero since shares are exact. Fails with `InvalidExpense` when a
/// balance no longer fits in an [`Amount`].
pub fn compute_balances<'a>(
    members: &[User],
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> Result<Balances, LedgerError> {
    let mut balance: HashMap<UserId, Amount> = members.iter().map(|m| (m.id, 0)).collect();

    for expense in expenses {
        let shares = compute_shares(expense, members)?;
        let credit = balance
            .get_mut(&expense.paid_by)
            .expect("compute_shares checked the payer is a member");
        *credit = credit.checked_add(expense.amount).ok_or_else(too_large)?;
        for (user_id, share) in shares {
            let debit = balance
                .get_mut(&user_id)
                .expect("shares are only computed for members");
            *debit = debit.checked_sub(share).ok_or_else(too_large)?;
        }
    }

    let total: i128 = balance.values().map(|b| i128::from(*b)).sum();
    assert_eq!(total, 0, "balances do not add up to zero");

    Ok(members.iter().map(|m| (m.id, balance[&m.id])).collect())
}

fn too_large() -> LedgerError {
    LedgerError::invalid_expense("the balances are too large")
}
