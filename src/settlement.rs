use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::debug;

use crate::money::Amount;
use crate::schemas::UserId;

/// A suggested payment: `from` should give `amount` to `to`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub from: UserId,
    pub to: UserId,
    pub amount: Amount,
}

/// Outstanding magnitude of one party. Ordered so that the heap yields the
/// largest amount first and, among equal amounts, the lowest user id.
type Outstanding = (Amount, Reverse<UserId>);

/// Get a list of payments that bring every balance to zero.
///
/// The algorithm is greedy:
/// - split members into creditors (positive balance) and debtors (negative balance);
///   members already at zero are left out
/// - repeatedly match the largest creditor with the largest debtor, ties going to
///   the lower user id
/// - the debtor pays the smaller of the two magnitudes, which settles at least one
///   of them; whoever still has something outstanding goes back in the queue
///
/// Each step settles at least one party, so there are fewer payments than members
/// with a non-zero balance. This is not guaranteed to be the minimum number of
/// payments (finding that is NP-hard), but it is close in practice.
///
/// Balances must add up to zero.
pub fn compute_settlements(balances: &[(UserId, Amount)]) -> Vec<Settlement> {
    let mut creditors: BinaryHeap<Outstanding> = balances
        .iter()
        .filter(|(_, b)| *b > 0)
        .map(|&(id, b)| (b, Reverse(id)))
        .collect();
    let mut debtors: BinaryHeap<Outstanding> = balances
        .iter()
        .filter(|(_, b)| *b < 0)
        .map(|&(id, b)| (-b, Reverse(id)))
        .collect();

    let mut result = vec![];

    while let (Some((credit, Reverse(creditor))), Some((debt, Reverse(debtor)))) =
        (creditors.peek().copied(), debtors.peek().copied())
    {
        creditors.pop();
        debtors.pop();

        let amount = credit.min(debt);
        result.push(Settlement {
            from: debtor,
            to: creditor,
            amount,
        });

        if credit > amount {
            creditors.push((credit - amount, Reverse(creditor)));
        }
        if debt > amount {
            debtors.push((debt - amount, Reverse(debtor)));
        }
    }

    assert!(
        creditors.is_empty() && debtors.is_empty(),
        "balances do not add up to zero: creditors {:?}, debtors {:?}",
        creditors,
        debtors
    );
    debug!(
        "{} settlements for {} balances",
        result.len(),
        balances.len()
    );

    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    fn apply(balances: &[(UserId, Amount)], settlements: &[Settlement]) -> HashMap<UserId, Amount> {
        let mut result: HashMap<_, _> = balances.iter().copied().collect();
        for s in settlements {
            *result.get_mut(&s.from).expect("test") += s.amount;
            *result.get_mut(&s.to).expect("test") -= s.amount;
        }
        result
    }

    fn settle(from: UserId, to: UserId, amount: Amount) -> Settlement {
        Settlement { from, to, amount }
    }

    #[test]
    fn test_all_settled_up() {
        assert!(compute_settlements(&[]).is_empty());
        assert!(compute_settlements(&[(1, 0), (2, 0), (3, 0)]).is_empty());
    }

    #[test]
    fn test_one_creditor_one_debtor() {
        let settlements = compute_settlements(&[(1, -1250), (2, 1250)]);
        assert_eq!(settlements, vec![settle(1, 2, 1250)]);
    }

    #[test]
    fn test_largest_debtor_pays_first() {
        // a: -5, b: +40, c: -35
        let balances = [(1, -500), (2, 4000), (3, -3500)];
        let settlements = compute_settlements(&balances);
        assert_eq!(settlements, vec![settle(3, 2, 3500), settle(1, 2, 500)]);
    }

    #[test]
    fn test_ties_go_to_lower_id() {
        let balances = [(4, 100), (3, 100), (2, -100), (1, -100)];
        let settlements = compute_settlements(&balances);
        assert_eq!(settlements, vec![settle(1, 3, 100), settle(2, 4, 100)]);
    }

    #[test]
    fn test_several_creditors_and_debtors() {
        let balances = [(1, 1790), (2, 2200), (3, -3140), (4, -1300), (5, -550), (6, 1000)];
        let settlements = compute_settlements(&balances);
        assert_eq!(
            settlements,
            vec![
                settle(3, 2, 2200),
                settle(4, 1, 1300),
                settle(3, 6, 940),
                settle(5, 1, 490),
                settle(5, 6, 60),
            ]
        );
        assert!(apply(&balances, &settlements).values().all(|b| *b == 0));
    }

    #[test]
    #[should_panic(expected = "do not add up to zero")]
    fn test_unbalanced_input_panics() {
        compute_settlements(&[(1, 100), (2, -50)]);
    }

    fn arb_balances() -> impl Strategy<Value = Vec<(UserId, Amount)>> {
        prop::collection::vec(-1_000_000i64..1_000_000, 1..15).prop_map(|mut values| {
            let total: Amount = values.iter().sum();
            values.push(-total);
            (1..).zip(values).collect()
        })
    }

    proptest! {
        #[test]
        fn settlements_zero_every_balance(balances in arb_balances()) {
            let settlements = compute_settlements(&balances);
            prop_assert!(apply(&balances, &settlements).values().all(|b| *b == 0));
            prop_assert!(settlements.iter().all(|s| s.amount > 0 && s.from != s.to));

            let non_zero = balances.iter().filter(|(_, b)| *b != 0).count();
            prop_assert!(settlements.len() < non_zero.max(1));
        }
    }
}
