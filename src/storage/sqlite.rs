//! `SQLite` storage backend.
//!
//! One store implements every collaborator trait, so a single handle can
//! be wired into [`IssueServices`] wholesale via [`SqliteStore::services`].

use crate::config::ApplicationProperties;
use crate::error::Result;
use crate::issue::fields::{FieldKind, FieldMap, FieldValue, IssueField, IssueRecord};
use crate::model::constants::{
    ConstantKind, ConstantRecord, IssueConstant, Translation, TranslationStore,
};
use crate::model::{Component, CustomField, Project, SecurityLevel, User, Version};
use crate::services::{
    AuthContext, ComponentCatalog, ConstantsCatalog, CustomFieldValues, EntityStore,
    IssueServices, LabelCatalog, ProjectDirectory, SecurityLevels, SubtaskLinks, UserDirectory,
    VersionCatalog,
};
use crate::storage::schema::apply_schema;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

struct StoreInner {
    conn: Connection,
    properties: Arc<ApplicationProperties>,
}

/// SQLite-backed domain store. Cloning shares the connection.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<StoreInner>,
}

/// Version relation discriminator in `issue_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionRelation {
    Affects,
    Fixes,
}

impl VersionRelation {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Affects => "affects",
            Self::Fixes => "fixes",
        }
    }
}

impl SqliteStore {
    /// Open a store at the given path, applying the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema
    /// application fails.
    pub fn open(path: &Path, properties: Arc<ApplicationProperties>) -> Result<Self> {
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self {
            inner: Arc::new(StoreInner { conn, properties }),
        })
    }

    /// Open an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory(properties: Arc<ApplicationProperties>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            inner: Arc::new(StoreInner { conn, properties }),
        })
    }

    pub(super) fn conn(&self) -> &Connection {
        &self.inner.conn
    }

    pub(crate) fn properties(&self) -> Arc<ApplicationProperties> {
        self.inner.properties.clone()
    }

    /// Build a full collaborator bundle backed by this store.
    #[must_use]
    pub fn services(&self, auth: Arc<dyn AuthContext>) -> IssueServices {
        IssueServices {
            store: Arc::new(self.clone()),
            projects: Arc::new(self.clone()),
            users: Arc::new(self.clone()),
            constants: Arc::new(self.clone()),
            versions: Arc::new(self.clone()),
            components: Arc::new(self.clone()),
            labels: Arc::new(self.clone()),
            security_levels: Arc::new(self.clone()),
            subtask_links: Arc::new(self.clone()),
            custom_fields: Arc::new(self.clone()),
            auth,
        }
    }

    // ------------------------------------------------------------------
    // Reference-data writes (projects, users, constants, relations)
    // ------------------------------------------------------------------

    /// Insert or replace a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_project(&self, project: &Project) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO project (id, key, name) VALUES (?, ?, ?)",
            params![project.id, project.key, project.name],
        )?;
        Ok(())
    }

    /// Insert or replace a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO app_user (user_key, username, display_name) VALUES (?, ?, ?)",
            params![user.key, user.username, user.display_name],
        )?;
        Ok(())
    }

    /// Insert or replace an issue constant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_constant(&self, record: &ConstantRecord) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO issue_constant (kind, id, name, description, icon_path, sequence)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                record.kind.as_str(),
                record.id,
                record.name,
                record.description,
                record.icon_path,
                record.sequence
            ],
        )?;
        Ok(())
    }

    /// Insert or replace a project version.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_version(&self, version: &Version) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO project_version (id, project_id, name, sequence, released, archived)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                version.id,
                version.project_id,
                version.name,
                version.sequence,
                i32::from(version.released),
                i32::from(version.archived)
            ],
        )?;
        Ok(())
    }

    /// Insert or replace a component.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_component(&self, component: &Component) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO component (id, project_id, name) VALUES (?, ?, ?)",
            params![component.id, component.project_id, component.name],
        )?;
        Ok(())
    }

    /// Insert or replace a security level.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_security_level(&self, level: &SecurityLevel) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO security_level (id, name, description) VALUES (?, ?, ?)",
            params![level.id, level.name, level.description],
        )?;
        Ok(())
    }

    /// Replace an issue's label set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_issue_labels(&self, issue_id: i64, labels: &BTreeSet<String>) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM issue_label WHERE issue_id = ?", [issue_id])?;
        for label in labels {
            tx.execute(
                "INSERT INTO issue_label (issue_id, label) VALUES (?, ?)",
                params![issue_id, label],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace an issue's component relation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_issue_components(&self, issue_id: i64, component_ids: &[i64]) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM issue_component WHERE issue_id = ?", [issue_id])?;
        for component_id in component_ids {
            tx.execute(
                "INSERT INTO issue_component (issue_id, component_id) VALUES (?, ?)",
                params![issue_id, component_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace one side of an issue's version relation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_issue_versions(
        &self,
        issue_id: i64,
        relation: VersionRelation,
        version_ids: &[i64],
    ) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM issue_version WHERE issue_id = ? AND relation = ?",
            params![issue_id, relation.as_str()],
        )?;
        for version_id in version_ids {
            tx.execute(
                "INSERT INTO issue_version (issue_id, version_id, relation) VALUES (?, ?, ?)",
                params![issue_id, version_id, relation.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Link a subtask to its parent (replacing any previous parent).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn link_subtask(&self, parent_id: i64, child_id: i64) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO subtask_link (child_id, parent_id) VALUES (?, ?)",
            params![child_id, parent_id],
        )?;
        Ok(())
    }

    /// Insert or replace a custom field descriptor with its default.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_custom_field(
        &self,
        field: &CustomField,
        default_value: Option<&str>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO custom_field (id, name, default_value) VALUES (?, ?, ?)",
            params![field.id, field.name, default_value],
        )?;
        Ok(())
    }

    /// Store a custom field value for an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_custom_field_value(
        &self,
        field_id: i64,
        issue_id: i64,
        value: &str,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO custom_field_value (field_id, issue_id, value) VALUES (?, ?, ?)",
            params![field_id, issue_id, value],
        )?;
        Ok(())
    }
}

fn issue_columns() -> String {
    IssueField::persisted()
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn sql_value(value: Option<&FieldValue>) -> rusqlite::types::Value {
    match value {
        None => rusqlite::types::Value::Null,
        Some(FieldValue::Text(s)) => rusqlite::types::Value::Text(s.clone()),
        Some(FieldValue::Int(n)) => rusqlite::types::Value::Integer(*n),
        Some(FieldValue::Timestamp(ts)) => rusqlite::types::Value::Text(ts.to_rfc3339()),
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    Utc::now()
}

impl EntityStore for SqliteStore {
    fn create_issue(&self, fields: &FieldMap) -> Result<IssueRecord> {
        let placeholders = vec!["?"; IssueField::persisted().len()].join(", ");
        let sql = format!(
            "INSERT INTO issue ({}) VALUES ({placeholders})",
            issue_columns()
        );
        let values = IssueField::persisted()
            .iter()
            .map(|field| sql_value(fields.get(*field)));
        self.conn().execute(&sql, params_from_iter(values))?;

        let id = self.conn().last_insert_rowid();
        tracing::debug!(issue_id = id, "inserted issue row");
        Ok(IssueRecord::new(id, fields.clone()))
    }

    fn update_issue(&self, record: &IssueRecord) -> Result<()> {
        let assignments = IssueField::persisted()
            .iter()
            .map(|f| format!("{} = ?", f.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE issue SET {assignments} WHERE id = ?");
        let values = IssueField::persisted()
            .iter()
            .map(|field| sql_value(record.get(*field)))
            .chain(std::iter::once(rusqlite::types::Value::Integer(
                record.id(),
            )));
        let changed = self.conn().execute(&sql, params_from_iter(values))?;
        tracing::debug!(issue_id = record.id(), rows = changed, "updated issue row");
        Ok(())
    }

    fn issue_record(&self, id: i64) -> Result<Option<IssueRecord>> {
        let sql = format!("SELECT {} FROM issue WHERE id = ?", issue_columns());
        let record = self
            .conn()
            .prepare(&sql)?
            .query_row([id], |row| {
                let mut fields = FieldMap::new();
                for (i, field) in IssueField::persisted().iter().enumerate() {
                    match field.kind() {
                        FieldKind::Text => fields
                            .set_text(*field, row.get::<_, Option<String>>(i)?.as_deref()),
                        FieldKind::Int => {
                            fields.set_int(*field, row.get::<_, Option<i64>>(i)?);
                        }
                        FieldKind::Timestamp => fields.set_timestamp(
                            *field,
                            row.get::<_, Option<String>>(i)?
                                .as_deref()
                                .map(parse_datetime),
                        ),
                    }
                }
                Ok(IssueRecord::new(id, fields))
            })
            .optional()?;
        Ok(record)
    }
}

impl ProjectDirectory for SqliteStore {
    fn project_by_id(&self, id: i64) -> Result<Option<Project>> {
        let project = self
            .conn()
            .query_row(
                "SELECT id, key, name FROM project WHERE id = ?",
                [id],
                |row| {
                    Ok(Project {
                        id: row.get(0)?,
                        key: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(project)
    }

    fn project_by_key(&self, key: &str) -> Result<Option<Project>> {
        let project = self
            .conn()
            .query_row(
                "SELECT id, key, name FROM project WHERE key = ?",
                [key],
                |row| {
                    Ok(Project {
                        id: row.get(0)?,
                        key: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(project)
    }
}

impl UserDirectory for SqliteStore {
    fn user_by_key(&self, key: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT user_key, username, display_name FROM app_user WHERE user_key = ?",
                [key],
                |row| {
                    Ok(User {
                        key: row.get(0)?,
                        username: row.get(1)?,
                        display_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

impl ConstantsCatalog for SqliteStore {
    fn constant(&self, kind: ConstantKind, id: &str) -> Result<Option<IssueConstant>> {
        let record = self
            .conn()
            .query_row(
                "SELECT id, name, description, icon_path, sequence
                 FROM issue_constant WHERE kind = ? AND id = ?",
                params![kind.as_str(), id],
                |row| {
                    Ok(ConstantRecord {
                        id: row.get(0)?,
                        kind,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        icon_path: row.get(3)?,
                        sequence: row.get(4)?,
                    })
                },
            )
            .optional()?;

        Ok(record.map(|r| {
            IssueConstant::new(r, self.properties(), Arc::new(self.clone()))
        }))
    }
}

impl TranslationStore for SqliteStore {
    fn translation(
        &self,
        kind: ConstantKind,
        id: &str,
        locale: &str,
    ) -> Result<Option<Translation>> {
        let translation = self
            .conn()
            .query_row(
                "SELECT name, description FROM constant_translation
                 WHERE kind = ? AND constant_id = ? AND locale = ?",
                params![kind.as_str(), id, locale],
                |row| {
                    Ok(Translation {
                        name: row.get(0)?,
                        description: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(translation)
    }

    fn set_translation(
        &self,
        kind: ConstantKind,
        id: &str,
        locale: &str,
        translation: &Translation,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO constant_translation (kind, constant_id, locale, name, description)
             VALUES (?, ?, ?, ?, ?)",
            params![
                kind.as_str(),
                id,
                locale,
                translation.name,
                translation.description
            ],
        )?;
        Ok(())
    }

    fn delete_translation(&self, kind: ConstantKind, id: &str, locale: &str) -> Result<()> {
        self.conn().execute(
            "DELETE FROM constant_translation WHERE kind = ? AND constant_id = ? AND locale = ?",
            params![kind.as_str(), id, locale],
        )?;
        Ok(())
    }
}

fn version_from_row(row: &rusqlite::Row) -> rusqlite::Result<Version> {
    Ok(Version {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        sequence: row.get(3)?,
        released: row.get::<_, i32>(4)? != 0,
        archived: row.get::<_, i32>(5)? != 0,
    })
}

impl SqliteStore {
    fn versions_for(&self, issue_id: i64, relation: VersionRelation) -> Result<Vec<Version>> {
        let mut stmt = self.conn().prepare(
            "SELECT v.id, v.project_id, v.name, v.sequence, v.released, v.archived
             FROM project_version v
             JOIN issue_version iv ON iv.version_id = v.id
             WHERE iv.issue_id = ? AND iv.relation = ?
             ORDER BY v.sequence",
        )?;
        let versions = stmt
            .query_map(params![issue_id, relation.as_str()], version_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(versions)
    }
}

impl VersionCatalog for SqliteStore {
    fn affected_versions(&self, issue_id: i64) -> Result<Vec<Version>> {
        self.versions_for(issue_id, VersionRelation::Affects)
    }

    fn fix_versions(&self, issue_id: i64) -> Result<Vec<Version>> {
        self.versions_for(issue_id, VersionRelation::Fixes)
    }
}

impl ComponentCatalog for SqliteStore {
    fn components_for_issue(&self, issue_id: i64) -> Result<Vec<Component>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.id, c.project_id, c.name
             FROM component c
             JOIN issue_component ic ON ic.component_id = c.id
             WHERE ic.issue_id = ?
             ORDER BY c.name",
        )?;
        let components = stmt
            .query_map([issue_id], |row| {
                Ok(Component {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(components)
    }
}

impl LabelCatalog for SqliteStore {
    fn labels_for_issue(&self, issue_id: i64) -> Result<BTreeSet<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT label FROM issue_label WHERE issue_id = ?")?;
        let labels = stmt
            .query_map([issue_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(labels)
    }
}

impl SecurityLevels for SqliteStore {
    fn level(&self, id: i64) -> Result<Option<SecurityLevel>> {
        let level = self
            .conn()
            .query_row(
                "SELECT id, name, description FROM security_level WHERE id = ?",
                [id],
                |row| {
                    Ok(SecurityLevel {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(level)
    }
}

impl SubtaskLinks for SqliteStore {
    fn parent_issue_id(&self, issue_id: i64) -> Result<Option<i64>> {
        let parent = self
            .conn()
            .query_row(
                "SELECT parent_id FROM subtask_link WHERE child_id = ?",
                [issue_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(parent)
    }

    fn subtask_ids(&self, issue_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT child_id FROM subtask_link WHERE parent_id = ? ORDER BY child_id")?;
        let ids = stmt
            .query_map([issue_id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

impl CustomFieldValues for SqliteStore {
    fn value(&self, field: &CustomField, issue_id: i64) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM custom_field_value WHERE field_id = ? AND issue_id = ?",
                params![field.id, issue_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn default_value(&self, field: &CustomField) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT default_value FROM custom_field WHERE id = ?",
                [field.id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(value.flatten())
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}
