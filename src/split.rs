//! Turn a single expense into the amount each member owes for it.
//!
//! Shares are never stored: they are derived again from the expense's split
//! policy every time balances are computed.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::money::{distribute_remainder, Amount, MAX_AMOUNT, PERCENT_DIGITS};
use crate::schemas::{Expense, Percentage, SplitPolicy, User, UserId};

/// Per-member owed amounts, sorted by ascending user id.
pub type Shares = Vec<(UserId, Amount)>;

/// Percentages may miss 100 by at most this much (0.01).
fn percent_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Add up split percentages and check they are within the tolerance of 100.
pub fn check_percent_total(
    percents: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, LedgerError> {
    let total = percents
        .into_iter()
        .try_fold(Decimal::ZERO, |total, percent| total.checked_add(percent))
        .ok_or_else(|| LedgerError::invalid_split("the percentages are too large"))?;
    if (total - Decimal::ONE_HUNDRED).abs() > percent_tolerance() {
        return Err(LedgerError::invalid_split(format!(
            "percentages add up to {total} instead of 100"
        )));
    }
    Ok(total)
}

/// Compute how much each member of the group owes for `expense`.
///
/// The returned shares always sum to the expense amount exactly: every share
/// is floored to the minor unit and the leftover units are moved one by one,
/// round-robin, over the members in ascending user id order.
pub fn compute_shares(expense: &Expense, members: &[User]) -> Result<Shares, LedgerError> {
    if members.is_empty() {
        return Err(LedgerError::invalid_group("the group has no members"));
    }
    if expense.amount <= 0 {
        return Err(LedgerError::invalid_expense("the amount must be positive"));
    }
    if expense.amount > MAX_AMOUNT {
        return Err(LedgerError::invalid_expense("the amount is too large"));
    }
    if !members.iter().any(|m| m.id == expense.paid_by) {
        return Err(LedgerError::invalid_expense(format!(
            "user {} paying the expense is not a member of the group",
            expense.paid_by
        )));
    }

    let mut ids: Vec<UserId> = members.iter().map(|m| m.id).collect();
    ids.sort_unstable();

    let shares = match &expense.split {
        SplitPolicy::Equal => equal_shares(expense.amount, &ids),
        SplitPolicy::Percentage { percentages } => {
            percentage_shares(expense.amount, &ids, percentages)?
        }
    };

    let total: Amount = shares.iter().map(|(_, share)| share).sum();
    assert_eq!(
        total, expense.amount,
        "shares of expense {} do not add up to its amount",
        expense.id
    );

    Ok(shares)
}

fn equal_shares(amount: Amount, ids: &[UserId]) -> Shares {
    let count = ids.len() as Amount;
    let quota = amount / count;
    let mut shares = vec![quota; ids.len()];
    distribute_remainder(shares.iter_mut().collect(), amount - quota * count);
    ids.iter().copied().zip(shares).collect()
}

fn percentage_shares(
    amount: Amount,
    ids: &[UserId],
    percentages: &[Percentage],
) -> Result<Shares, LedgerError> {
    let mut seen = HashSet::with_capacity(percentages.len());
    for p in percentages {
        if !ids.contains(&p.user_id) {
            return Err(LedgerError::invalid_split(format!(
                "user {} is not a member of the group",
                p.user_id
            )));
        }
        if !seen.insert(p.user_id) {
            return Err(LedgerError::invalid_split(format!(
                "user {} appears more than once",
                p.user_id
            )));
        }
        if p.percent.is_sign_negative() && !p.percent.is_zero() {
            return Err(LedgerError::invalid_split(format!(
                "user {} has a negative percentage",
                p.user_id
            )));
        }
    }

    check_percent_total(percentages.iter().map(|p| p.percent))?;

    // Scale every percentage to the same number of decimal digits so the
    // division below happens on integers and floors exactly.
    let scale = percentages
        .iter()
        .map(|p| p.percent.normalize().scale())
        .max()
        .unwrap_or(0);
    if scale > PERCENT_DIGITS {
        return Err(LedgerError::invalid_split(format!(
            "percentages have more than {PERCENT_DIGITS} decimal digits"
        )));
    }
    let scaled = |percent: Decimal| -> i128 {
        let mut percent = percent;
        percent.rescale(scale);
        percent.mantissa()
    };
    let hundred = scaled(Decimal::ONE_HUNDRED);

    let mut weights = Vec::with_capacity(ids.len());
    let mut shares = Vec::with_capacity(ids.len());
    for id in ids {
        let weight = percentages
            .iter()
            .find(|p| p.user_id == *id)
            .map(|p| scaled(p.percent))
            .unwrap_or(0);
        let share = i128::from(amount)
            .checked_mul(weight)
            .map(|v| v / hundred)
            .and_then(|v| Amount::try_from(v).ok())
            .ok_or_else(|| LedgerError::invalid_split("the percentages are too large"))?;
        weights.push(weight);
        shares.push(share);
    }

    // Positive when the percentages add up to less than 100 or after flooring,
    // negative when they add up to more.
    let leftover = amount - shares.iter().sum::<Amount>();
    distribute_remainder(
        shares
            .iter_mut()
            .zip(&weights)
            .filter(|(_, weight)| **weight > 0)
            .map(|(share, _)| share)
            .collect(),
        leftover,
    );

    Ok(ids.iter().copied().zip(shares).collect())
}
