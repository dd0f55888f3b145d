//! JSON shapes exchanged with the front end. Money is a decimal number here
//! and integer minor units everywhere else.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::LedgerError;
use crate::ledger::{GroupReport, NewExpense, NewSplit, UserSummary};
use crate::money::{from_minor_units, round_percent, to_minor_units, Amount};
use crate::schemas::{Expense, ExpenseId, Group, GroupId, User, UserId};
use crate::split::{check_percent_total, Shares};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateGroupJson {
    pub name: String,
    pub users: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Percentage,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateExpenseJson {
    pub description: String,
    pub amount: Decimal,
    pub paid_by: String,
    pub split_type: SplitType,
    #[serde(default)]
    pub splits: Option<HashMap<String, Decimal>>,
}

impl TryFrom<CreateExpenseJson> for NewExpense {
    type Error = LedgerError;

    fn try_from(json: CreateExpenseJson) -> Result<Self, Self::Error> {
        let amount = to_minor_units(json.amount)
            .ok_or_else(|| LedgerError::invalid_expense("the amount is too large"))?;
        let split = match json.split_type {
            SplitType::Equal => NewSplit::Equal,
            SplitType::Percentage => {
                let splits = json.splits.filter(|s| !s.is_empty()).ok_or_else(|| {
                    LedgerError::invalid_split("percentage splits need a `splits` mapping")
                })?;
                // Percentages are stored with 4 digits, but the tolerance is
                // checked on the values as submitted.
                check_percent_total(splits.values().copied())?;
                let mut percentages: Vec<_> = splits
                    .into_iter()
                    .map(|(name, percent)| (name, round_percent(percent)))
                    .collect();
                percentages.sort();
                NewSplit::Percentage(percentages)
            }
        };
        Ok(NewExpense {
            description: json.description,
            amount,
            paid_by: json.paid_by,
            split,
        })
    }
}

/// Name to amount pairs, serialized as a JSON object that keeps member order.
#[derive(Clone, Debug, PartialEq)]
pub struct AmountMap(pub Vec<(String, Decimal)>);

impl Serialize for AmountMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, amount)| (name, amount)))
    }
}

impl AmountMap {
    fn from_amounts<'a>(
        group: &Group,
        amounts: impl IntoIterator<Item = &'a (UserId, Amount)>,
    ) -> AmountMap {
        AmountMap(
            amounts
                .into_iter()
                .map(|(id, amount)| (user_name(group, *id), from_minor_units(*amount)))
                .collect(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserJson {
    pub id: UserId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpenseJson {
    pub id: ExpenseId,
    pub description: String,
    pub amount: Decimal,
    pub paid_by: UserJson,
    pub split_type: SplitType,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreatedExpenseJson {
    #[serde(flatten)]
    pub expense: ExpenseJson,
    pub shares: AmountMap,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupJson {
    pub id: GroupId,
    pub name: String,
    pub users: Vec<UserJson>,
    pub expenses: Vec<ExpenseJson>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SettlementJson {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BalancesJson {
    pub group_name: String,
    pub balances: AmountMap,
    pub settlements: Vec<SettlementJson>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserBalancesJson {
    pub user: String,
    pub total_owed: Decimal,
    pub total_owing: Decimal,
    pub net_balance: Decimal,
}

fn user_name(group: &Group, id: UserId) -> String {
    group
        .user(id)
        .map(|u| u.name.clone())
        .unwrap_or_else(|| format!("user {id}"))
}

impl From<&User> for UserJson {
    fn from(user: &User) -> Self {
        UserJson {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

impl ExpenseJson {
    pub fn new(group: &Group, expense: &Expense) -> ExpenseJson {
        ExpenseJson {
            id: expense.id,
            description: expense.description.clone(),
            amount: from_minor_units(expense.amount),
            paid_by: UserJson {
                id: expense.paid_by,
                name: user_name(group, expense.paid_by),
            },
            split_type: if expense.split.is_equal() {
                SplitType::Equal
            } else {
                SplitType::Percentage
            },
            created_at: expense.created_at,
        }
    }
}

impl CreatedExpenseJson {
    pub fn new(group: &Group, expense: &Expense, shares: &Shares) -> CreatedExpenseJson {
        CreatedExpenseJson {
            expense: ExpenseJson::new(group, expense),
            shares: AmountMap::from_amounts(group, shares),
        }
    }
}

impl From<&Group> for GroupJson {
    fn from(group: &Group) -> Self {
        GroupJson {
            id: group.id,
            name: group.name.clone(),
            users: group.users.iter().map(UserJson::from).collect(),
            expenses: group
                .expenses
                .iter()
                .map(|e| ExpenseJson::new(group, e))
                .collect(),
            created_at: group.created_at,
        }
    }
}

impl From<&GroupReport> for BalancesJson {
    fn from(report: &GroupReport) -> Self {
        let group = &report.group;
        BalancesJson {
            group_name: group.name.clone(),
            balances: AmountMap::from_amounts(group, &report.balances),
            settlements: report
                .settlements
                .iter()
                .map(|s| SettlementJson {
                    from: user_name(group, s.from),
                    to: user_name(group, s.to),
                    amount: from_minor_units(s.amount),
                })
                .collect(),
        }
    }
}

impl From<&UserSummary> for UserBalancesJson {
    fn from(summary: &UserSummary) -> Self {
        UserBalancesJson {
            user: summary.user.clone(),
            total_owed: from_minor_units(summary.total_owed),
            total_owing: from_minor_units(summary.total_owing),
            net_balance: from_minor_units(summary.net_balance),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_equal_expense_ignores_splits() {
        let json: CreateExpenseJson = serde_json::from_value(json!({
            "description": "taxi",
            "amount": 12.345,
            "paid_by": "A",
            "split_type": "equal",
            "splits": {"A": 10}
        }))
        .expect("test");
        let expense = NewExpense::try_from(json).expect("test");
        assert_eq!(expense.amount, 1235);
        assert!(matches!(expense.split, NewSplit::Equal));
    }

    #[test]
    fn test_parse_percentage_expense() {
        let json: CreateExpenseJson = serde_json::from_value(json!({
            "description": "rent",
            "amount": 50,
            "paid_by": "B",
            "split_type": "percentage",
            "splits": {"C": 33.333333, "A": 66.666667}
        }))
        .expect("test");
        let expense = NewExpense::try_from(json).expect("test");
        assert_eq!(expense.amount, 5000);
        match expense.split {
            NewSplit::Percentage(values) => assert_eq!(
                values,
                vec![
                    ("A".to_string(), dec!(66.6667)),
                    ("C".to_string(), dec!(33.3333))
                ]
            ),
            NewSplit::Equal => panic!("expected a percentage split"),
        }
    }

    #[test]
    fn test_percentage_tolerance_uses_submitted_values() {
        let json: CreateExpenseJson = serde_json::from_value(json!({
            "description": "rent",
            "amount": 50,
            "paid_by": "A",
            "split_type": "percentage",
            "splits": {"A": 50, "B": 49.98995}
        }))
        .expect("test");
        assert!(matches!(
            NewExpense::try_from(json),
            Err(LedgerError::InvalidSplit(_))
        ));

        let json: CreateExpenseJson = serde_json::from_value(json!({
            "description": "rent",
            "amount": 50,
            "paid_by": "A",
            "split_type": "percentage",
            "splits": {"A": 50, "B": 49.99}
        }))
        .expect("test");
        assert!(NewExpense::try_from(json).is_ok());
    }

    #[test]
    fn test_percentage_expense_needs_splits() {
        let json: CreateExpenseJson = serde_json::from_value(json!({
            "description": "rent",
            "amount": 50,
            "paid_by": "B",
            "split_type": "percentage"
        }))
        .expect("test");
        assert!(matches!(
            NewExpense::try_from(json),
            Err(LedgerError::InvalidSplit(_))
        ));
    }

    #[test]
    fn test_unknown_split_type_is_rejected() {
        let result = serde_json::from_value::<CreateExpenseJson>(json!({
            "description": "rent",
            "amount": 50,
            "paid_by": "B",
            "split_type": "shares"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_amount_map_keeps_order_and_uses_numbers() {
        let map = AmountMap(vec![
            ("zed".to_string(), dec!(-0.05)),
            ("amy".to_string(), dec!(0.05)),
        ]);
        assert_eq!(
            serde_json::to_string(&map).expect("test"),
            r#"{"zed":-0.05,"amy":0.05}"#
        );
    }
}
