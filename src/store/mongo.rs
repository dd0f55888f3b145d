use anyhow::{anyhow, Context};
use futures::TryStreamExt;
use log::info;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Collection,
};

use super::GroupStore;
use crate::error::LedgerError;
use crate::schemas::{Expense, Group, GroupId};

/// One document per group in the `Groups` collection, with users and expenses
/// embedded. Group ids come from a sequence kept in `Counters`.
pub struct MongoStore {
    groups: Collection<Group>,
    counters: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> anyhow::Result<MongoStore> {
        let client = Client::with_uri_str(uri)
            .await
            .context("failed to parse the MongoDB URI")?;
        let database = client.database(database);
        database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .context("failed to connect to MongoDB")?;
        info!("Connected to database {}", database.name());

        Ok(MongoStore {
            groups: database.collection("Groups"),
            counters: database.collection("Counters"),
        })
    }
}

impl GroupStore for MongoStore {
    async fn next_group_id(&self) -> Result<GroupId, LedgerError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": "groups" },
                doc! { "$inc": { "seq": 1_i64 } },
                options,
            )
            .await
            .context("cannot increment the group counter")?
            .ok_or_else(|| anyhow!("the group counter was not created"))?;
        let id = counter
            .get_i64("seq")
            .context("the group counter is not an integer")?;
        Ok(id)
    }

    async fn insert_group(&self, group: &Group) -> Result<(), LedgerError> {
        self.groups
            .insert_one(group, None)
            .await
            .with_context(|| format!("cannot insert group {}", group.id))?;
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, LedgerError> {
        let options = FindOptions::builder().sort(doc! { "id": 1 }).build();
        let groups = self
            .groups
            .find(None, options)
            .await
            .context("cannot list groups")?
            .try_collect::<Vec<Group>>()
            .await
            .context("cannot read groups")?;
        Ok(groups)
    }

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>, LedgerError> {
        let group = self
            .groups
            .find_one(doc! { "id": id }, None)
            .await
            .with_context(|| format!("cannot read group {id}"))?;
        Ok(group)
    }

    async fn append_expense(
        &self,
        group_id: GroupId,
        expected_len: usize,
        expense: &Expense,
    ) -> Result<(), LedgerError> {
        let expense = bson::to_bson(expense).context("cannot encode the expense")?;
        let expected_len = i64::try_from(expected_len).context("too many expenses")?;
        let result = self
            .groups
            .update_one(
                doc! { "id": group_id, "expenses": { "$size": expected_len } },
                doc! { "$push": { "expenses": expense } },
                None,
            )
            .await
            .with_context(|| format!("cannot add an expense to group {group_id}"))?;

        if result.matched_count == 1 {
            return Ok(());
        }
        let exists = self
            .groups
            .count_documents(doc! { "id": group_id }, None)
            .await
            .with_context(|| format!("cannot read group {group_id}"))?
            > 0;
        if exists {
            Err(LedgerError::Conflict(group_id))
        } else {
            Err(LedgerError::GroupNotFound(group_id))
        }
    }

    async fn delete_group(&self, id: GroupId) -> Result<bool, LedgerError> {
        let result = self
            .groups
            .delete_one(doc! { "id": id }, None)
            .await
            .with_context(|| format!("cannot delete group {id}"))?;
        Ok(result.deleted_count > 0)
    }
}
