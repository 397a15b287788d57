//! Collaborator seams consumed by the issue entities.
//!
//! Everything an issue resolves lazily comes through one of these traits,
//! injected at construction via [`IssueServices`]. There is no ambient
//! registry: a caller that wants different lookup behavior (tests, import
//! pipelines) swaps the trait object and nothing else changes.

use crate::error::Result;
use crate::issue::fields::{FieldMap, IssueRecord};
use crate::model::constants::{ConstantKind, IssueConstant};
use crate::model::{Component, CustomField, Project, SecurityLevel, User, Version};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Record lookup/create/update against the relational store.
pub trait EntityStore {
    /// Insert a new issue row from a field map, returning the stored record.
    fn create_issue(&self, fields: &FieldMap) -> Result<IssueRecord>;

    /// Re-persist an existing record in place.
    fn update_issue(&self, record: &IssueRecord) -> Result<()>;

    /// Fetch a record by id.
    fn issue_record(&self, id: i64) -> Result<Option<IssueRecord>>;
}

/// Project lookup by id or key.
pub trait ProjectDirectory {
    fn project_by_id(&self, id: i64) -> Result<Option<Project>>;
    fn project_by_key(&self, key: &str) -> Result<Option<Project>>;
}

/// User lookup by opaque key.
pub trait UserDirectory {
    fn user_by_key(&self, key: &str) -> Result<Option<User>>;
}

/// Constant lookup; implementations wire translations and properties into
/// the returned constant.
pub trait ConstantsCatalog {
    fn constant(&self, kind: ConstantKind, id: &str) -> Result<Option<IssueConstant>>;
}

/// Version relations of an issue.
pub trait VersionCatalog {
    fn affected_versions(&self, issue_id: i64) -> Result<Vec<Version>>;
    fn fix_versions(&self, issue_id: i64) -> Result<Vec<Version>>;
}

/// Component relations of an issue.
pub trait ComponentCatalog {
    fn components_for_issue(&self, issue_id: i64) -> Result<Vec<Component>>;
}

/// Label relations of an issue.
pub trait LabelCatalog {
    fn labels_for_issue(&self, issue_id: i64) -> Result<BTreeSet<String>>;
}

/// Security level lookup.
pub trait SecurityLevels {
    fn level(&self, id: i64) -> Result<Option<SecurityLevel>>;
}

/// Subtask parent/child links. Parent linkage is not stored on the issue
/// row; it is a link relation discovered through here.
pub trait SubtaskLinks {
    fn parent_issue_id(&self, issue_id: i64) -> Result<Option<i64>>;
    fn subtask_ids(&self, issue_id: i64) -> Result<Vec<i64>>;
}

/// Custom field value resolution. Persisted issues read stored values;
/// unpersisted issues fall back to the field's default.
pub trait CustomFieldValues {
    fn value(&self, field: &CustomField, issue_id: i64) -> Result<Option<String>>;
    fn default_value(&self, field: &CustomField) -> Result<Option<String>>;
}

/// Request-scoped authentication context.
pub trait AuthContext {
    /// Key of the currently authenticated user, if any.
    fn current_user_key(&self) -> Option<String>;
}

/// An [`AuthContext`] with nobody signed in, for services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuth;

impl AuthContext for AnonymousAuth {
    fn current_user_key(&self) -> Option<String> {
        None
    }
}

/// The full collaborator bundle handed to issue construction.
#[derive(Clone)]
pub struct IssueServices {
    pub store: Arc<dyn EntityStore>,
    pub projects: Arc<dyn ProjectDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub constants: Arc<dyn ConstantsCatalog>,
    pub versions: Arc<dyn VersionCatalog>,
    pub components: Arc<dyn ComponentCatalog>,
    pub labels: Arc<dyn LabelCatalog>,
    pub security_levels: Arc<dyn SecurityLevels>,
    pub subtask_links: Arc<dyn SubtaskLinks>,
    pub custom_fields: Arc<dyn CustomFieldValues>,
    pub auth: Arc<dyn AuthContext>,
}

impl std::fmt::Debug for IssueServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueServices").finish_non_exhaustive()
    }
}
