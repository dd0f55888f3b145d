use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Amount;

pub type GroupId = i64;
pub type UserId = i64;
pub type ExpenseId = i64;
pub type UserName = String;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: UserName,
}

/// A group owns its users and its expenses. Users keep their insertion order,
/// and their ids are their 1-based positions in that order.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub users: Vec<User>,
    pub expenses: Vec<Expense>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: Amount,
    pub paid_by: UserId,
    pub split: SplitPolicy,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SplitPolicy {
    Equal,
    Percentage { percentages: Vec<Percentage> },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Percentage {
    pub user_id: UserId,
    #[serde(with = "rust_decimal::serde::str")]
    pub percent: Decimal,
}

impl Group {
    pub fn new(id: GroupId, name: String, user_names: Vec<UserName>, created_at: DateTime<Utc>) -> Group {
        let users = user_names
            .into_iter()
            .zip(1..)
            .map(|(name, id)| User { id, name })
            .collect();
        Group {
            id,
            name,
            users,
            expenses: vec![],
            created_at,
        }
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| u.name == name)
    }

    pub fn next_expense_id(&self) -> ExpenseId {
        self.expenses.iter().map(|e| e.id).max().unwrap_or(0) + 1
    }
}

impl SplitPolicy {
    pub fn is_equal(&self) -> bool {
        matches!(self, SplitPolicy::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group_assigns_positional_ids() {
        let group = Group::new(
            7,
            "trip".to_string(),
            vec!["ann".to_string(), "bob".to_string(), "cid".to_string()],
            DateTime::<Utc>::MIN_UTC,
        );
        assert_eq!(group.users.len(), 3);
        assert_eq!(group.users[0], User { id: 1, name: "ann".to_string() });
        assert_eq!(group.users[2].id, 3);
        assert_eq!(group.user_by_name("bob").map(|u| u.id), Some(2));
        assert_eq!(group.user(3).map(|u| u.name.as_str()), Some("cid"));
        assert!(group.user(4).is_none());
        assert_eq!(group.next_expense_id(), 1);
    }

    #[test]
    fn test_group_bson_round_trip() {
        // BSON datetimes only keep milliseconds.
        let now: DateTime<Utc> = "2024-05-01T12:00:00.250Z".parse().expect("test");
        let mut group = Group::new(
            1,
            "home".to_string(),
            vec!["a".to_string(), "b".to_string()],
            now,
        );
        group.expenses.push(Expense {
            id: 1,
            description: "rent".to_string(),
            amount: 100_000,
            paid_by: 1,
            split: SplitPolicy::Percentage {
                percentages: vec![
                    Percentage { user_id: 1, percent: Decimal::new(605, 1) },
                    Percentage { user_id: 2, percent: Decimal::new(395, 1) },
                ],
            },
            created_at: now,
        });

        let document = bson::to_document(&group).expect("test");
        let decoded: Group = bson::from_document(document).expect("test");
        assert_eq!(decoded, group);
        assert_eq!(decoded.next_expense_id(), 2);
    }
}
