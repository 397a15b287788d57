//! Change history persistence.
//!
//! The entity accumulates before/after pairs in its modified-fields map;
//! this module is the consumer that turns one consumed map into a change
//! group with one item per field, written in a single transaction.
//! Callers reset the entity's map themselves after recording.

use crate::error::{DomainError, Result};
use crate::issue::IssueView;
use crate::issue::entity::Issue;
use crate::storage::sqlite::SqliteStore;
use chrono::{DateTime, Utc};
use rusqlite::params;

/// One recorded change set for an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeGroup {
    pub id: i64,
    pub issue_id: i64,
    pub author: Option<String>,
    pub created: DateTime<Utc>,
    pub items: Vec<ChangeItem>,
}

/// One field's before/after within a change group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeItem {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl SqliteStore {
    /// Persist an issue's accumulated modified fields as a change group.
    ///
    /// Returns the new group id, or `None` when there is nothing to
    /// record. The issue's map is left untouched; consuming callers
    /// reset it once they are done with the diff.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotPersisted`] for an unbound issue, or a
    /// database error if the write fails.
    pub fn record_change_history(
        &self,
        issue: &Issue,
        author: Option<&str>,
    ) -> Result<Option<i64>> {
        let Some(issue_id) = issue.id() else {
            return Err(DomainError::not_persisted("change_history"));
        };
        if issue.modified_fields().is_empty() {
            return Ok(None);
        }

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO change_group (issue_id, author, created) VALUES (?, ?, ?)",
            params![issue_id, author, Utc::now().to_rfc3339()],
        )?;
        let group_id = tx.last_insert_rowid();

        for (field, change) in issue.modified_fields() {
            tx.execute(
                "INSERT INTO change_item (group_id, field, old_value, new_value) VALUES (?, ?, ?, ?)",
                params![group_id, field, change.before, change.after],
            )?;
        }
        tx.commit()?;

        tracing::debug!(
            issue_id,
            group_id,
            fields = issue.modified_fields().len(),
            "recorded change history"
        );
        Ok(Some(group_id))
    }

    /// All change groups for an issue, oldest first, items included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn change_history(&self, issue_id: i64) -> Result<Vec<ChangeGroup>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, author, created FROM change_group WHERE issue_id = ? ORDER BY id",
        )?;
        let mut groups = stmt
            .query_map([issue_id], |row| {
                Ok(ChangeGroup {
                    id: row.get(0)?,
                    issue_id,
                    author: row.get(1)?,
                    created: parse_created(&row.get::<_, String>(2)?),
                    items: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut item_stmt = self.conn().prepare(
            "SELECT field, old_value, new_value FROM change_item WHERE group_id = ? ORDER BY id",
        )?;
        for group in &mut groups {
            group.items = item_stmt
                .query_map([group.id], |row| {
                    Ok(ChangeItem {
                        field: row.get(0)?,
                        old_value: row.get(1)?,
                        new_value: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
        }
        Ok(groups)
    }
}

fn parse_created(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
