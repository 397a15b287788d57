//! The read-only, search-index-backed issue view.
//!
//! An [`IndexDocument`] is the flattened, denormalized form of an issue
//! kept in the search index: every field is one or more strings, with
//! related entities embedded as JSON payloads. [`IndexedIssue`] exposes
//! the shared [`IssueView`] contract over such a document, re-parsing on
//! every call; there is no mutation and no `store()` — the type simply
//! does not have them.

use crate::error::{DomainError, Result};
use crate::issue::IssueView;
use crate::model::constants::{ConstantKind, IssueConstant};
use crate::model::{Component, CustomField, Project, SecurityLevel, User, Version};
use crate::services::IssueServices;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Index field names.
pub mod index_fields {
    pub const ISSUE_ID: &str = "issue_id";
    pub const KEY: &str = "key";
    pub const PROJECT: &str = "project";
    pub const NUMBER: &str = "number";
    pub const ISSUE_TYPE: &str = "issue_type";
    pub const SUMMARY: &str = "summary";
    pub const DESCRIPTION: &str = "description";
    pub const ENVIRONMENT: &str = "environment";
    pub const ASSIGNEE: &str = "assignee";
    pub const REPORTER: &str = "reporter";
    pub const CREATOR: &str = "creator";
    pub const PRIORITY: &str = "priority";
    pub const STATUS: &str = "status";
    pub const RESOLUTION: &str = "resolution";
    pub const SECURITY_LEVEL: &str = "security_level";
    pub const DUE_DATE: &str = "due_date";
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
    pub const RESOLUTION_DATE: &str = "resolution_date";
    pub const ORIGINAL_ESTIMATE: &str = "time_original_estimate";
    pub const REMAINING_ESTIMATE: &str = "time_estimate";
    pub const TIME_SPENT: &str = "time_spent";
    pub const VOTES: &str = "votes";
    pub const WATCHES: &str = "watches";
    pub const WORKFLOW_ID: &str = "workflow_id";
    pub const LABELS: &str = "labels";
    pub const COMPONENTS: &str = "components";
    pub const AFFECTED_VERSIONS: &str = "affected_versions";
    pub const FIX_VERSIONS: &str = "fix_versions";
    pub const PARENT_ID: &str = "parent_id";

    /// Sentinel stored when an issue has no assignee. Distinct from the
    /// field being absent, which older index generations produce.
    pub const NO_ASSIGNEE: &str = "unassigned";
    /// Sentinel stored when an issue has no reporter.
    pub const NO_REPORTER: &str = "issue_no_reporter";
    /// Sentinel stored when an issue has no creator.
    pub const NO_CREATOR: &str = "issue_no_creator";
}

/// A flattened index record: field name to one or more string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDocument {
    fields: BTreeMap<String, Vec<String>>,
}

impl IndexDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from its JSON form: an object whose values are
    /// strings or arrays of strings.
    ///
    /// # Errors
    ///
    /// Returns an error for non-object JSON or non-string field values.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let object = json.as_object().ok_or_else(|| DomainError::IndexDecode {
            field: "<document>".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        let mut fields = BTreeMap::new();
        for (name, value) in object {
            let values = match value {
                serde_json::Value::String(s) => vec![s.clone()],
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            DomainError::IndexDecode {
                                field: name.clone(),
                                reason: "expected string array elements".to_string(),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
                other => {
                    return Err(DomainError::IndexDecode {
                        field: name.clone(),
                        reason: format!("unsupported value type: {other}"),
                    });
                }
            };
            fields.insert(name.clone(), values);
        }
        Ok(Self { fields })
    }

    /// Add a field value (multi-valued fields call this repeatedly).
    pub fn add(&mut self, field: &str, value: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(value.into());
    }

    /// Builder-style [`Self::add`].
    #[must_use]
    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.add(field, value);
        self
    }

    /// First value of a field, if present.
    #[must_use]
    pub fn first_value(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a field; empty when absent.
    #[must_use]
    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }
}

/// A read-only issue reconstructed from an [`IndexDocument`].
pub struct IndexedIssue {
    document: IndexDocument,
    services: IssueServices,
    // per-instance custom field memo; everything else re-parses per call
    custom_field_values: RefCell<HashMap<i64, Option<String>>>,
}

impl IndexedIssue {
    pub(crate) fn new(document: IndexDocument, services: IssueServices) -> Self {
        Self {
            document,
            services,
            custom_field_values: RefCell::new(HashMap::new()),
        }
    }

    /// The underlying index document.
    #[must_use]
    pub const fn document(&self) -> &IndexDocument {
        &self.document
    }

    fn int_field(&self, field: &str) -> Option<i64> {
        self.document.first_value(field)?.parse().ok()
    }

    fn timestamp_field(&self, field: &str) -> Option<DateTime<Utc>> {
        let raw = self.document.first_value(field)?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn text_field(&self, field: &str) -> Option<String> {
        self.document.first_value(field).map(str::to_string)
    }

    // User identity fields store a sentinel for "nobody"; both the
    // sentinel and an absent field read as no user.
    fn user_field(&self, field: &str, sentinel: &str) -> Option<String> {
        let raw = self.document.first_value(field)?;
        (raw != sentinel).then(|| raw.to_string())
    }

    // Multi-valued entity fields embed one JSON payload per value and
    // sort with the target type's own ordering.
    fn entity_values<T>(&self, field: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Ord,
    {
        let mut decoded = self
            .document
            .values(field)
            .iter()
            .map(|raw| {
                serde_json::from_str::<T>(raw).map_err(|err| DomainError::IndexDecode {
                    field: field.to_string(),
                    reason: err.to_string(),
                })
            })
            .collect::<Result<Vec<T>>>()?;
        decoded.sort();
        Ok(decoded)
    }

    /// The project, resolved from the indexed id.
    ///
    /// # Errors
    ///
    /// Returns an error if the project lookup fails.
    pub fn project(&self) -> Result<Option<Project>> {
        match self.int_field(index_fields::PROJECT) {
            Some(id) => self.services.projects.project_by_id(id),
            None => Ok(None),
        }
    }

    /// The issue type constant, resolved from the indexed id.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn issue_type(&self) -> Result<Option<IssueConstant>> {
        self.constant(ConstantKind::IssueType, index_fields::ISSUE_TYPE)
    }

    /// The priority constant, resolved from the indexed id.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn priority(&self) -> Result<Option<IssueConstant>> {
        self.constant(ConstantKind::Priority, index_fields::PRIORITY)
    }

    /// The resolution constant, resolved from the indexed id.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn resolution(&self) -> Result<Option<IssueConstant>> {
        self.constant(ConstantKind::Resolution, index_fields::RESOLUTION)
    }

    /// The status constant, resolved from the indexed id.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn status(&self) -> Result<Option<IssueConstant>> {
        self.constant(ConstantKind::Status, index_fields::STATUS)
    }

    fn constant(&self, kind: ConstantKind, field: &str) -> Result<Option<IssueConstant>> {
        match self.document.first_value(field) {
            Some(id) => self.services.constants.constant(kind, id),
            None => Ok(None),
        }
    }

    /// The assigned user, resolved from the indexed key.
    ///
    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    pub fn assignee(&self) -> Result<Option<User>> {
        self.user(self.assignee_id())
    }

    /// The reporting user, resolved from the indexed key.
    ///
    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    pub fn reporter(&self) -> Result<Option<User>> {
        self.user(self.reporter_id())
    }

    /// The creating user, resolved from the indexed key.
    ///
    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    pub fn creator(&self) -> Result<Option<User>> {
        self.user(self.creator_id())
    }

    fn user(&self, key: Option<String>) -> Result<Option<User>> {
        match key {
            Some(key) => self.services.users.user_by_key(&key),
            None => Ok(None),
        }
    }

    /// The security level, resolved from the indexed id.
    ///
    /// # Errors
    ///
    /// Returns an error if the level lookup fails.
    pub fn security_level(&self) -> Result<Option<SecurityLevel>> {
        match self.int_field(index_fields::SECURITY_LEVEL) {
            Some(id) => self.services.security_levels.level(id),
            None => Ok(None),
        }
    }

    /// Resolve a custom field value, memoized per field per instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the value provider fails.
    pub fn custom_field_value(&self, field: &CustomField) -> Result<Option<String>> {
        if let Some(cached) = self.custom_field_values.borrow().get(&field.id) {
            return Ok(cached.clone());
        }
        let value = match self.int_field(index_fields::ISSUE_ID) {
            Some(issue_id) => self.services.custom_fields.value(field, issue_id)?,
            None => None,
        };
        self.custom_field_values
            .borrow_mut()
            .insert(field.id, value.clone());
        Ok(value)
    }
}

impl IssueView for IndexedIssue {
    fn id(&self) -> Option<i64> {
        self.int_field(index_fields::ISSUE_ID)
    }

    fn key(&self) -> Option<String> {
        self.text_field(index_fields::KEY)
    }

    fn project_id(&self) -> Option<i64> {
        self.int_field(index_fields::PROJECT)
    }

    fn number(&self) -> Option<i64> {
        self.int_field(index_fields::NUMBER)
    }

    fn issue_type_id(&self) -> Option<String> {
        self.text_field(index_fields::ISSUE_TYPE)
    }

    fn summary(&self) -> Option<String> {
        self.text_field(index_fields::SUMMARY)
    }

    fn description(&self) -> Option<String> {
        self.text_field(index_fields::DESCRIPTION)
    }

    fn environment(&self) -> Option<String> {
        self.text_field(index_fields::ENVIRONMENT)
    }

    fn assignee_id(&self) -> Option<String> {
        self.user_field(index_fields::ASSIGNEE, index_fields::NO_ASSIGNEE)
    }

    fn reporter_id(&self) -> Option<String> {
        self.user_field(index_fields::REPORTER, index_fields::NO_REPORTER)
    }

    fn creator_id(&self) -> Option<String> {
        self.user_field(index_fields::CREATOR, index_fields::NO_CREATOR)
    }

    fn priority_id(&self) -> Option<String> {
        self.text_field(index_fields::PRIORITY)
    }

    fn status_id(&self) -> Option<String> {
        self.text_field(index_fields::STATUS)
    }

    fn resolution_id(&self) -> Option<String> {
        self.text_field(index_fields::RESOLUTION)
    }

    fn security_level_id(&self) -> Option<i64> {
        self.int_field(index_fields::SECURITY_LEVEL)
    }

    fn due_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field(index_fields::DUE_DATE)
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field(index_fields::CREATED)
    }

    fn updated(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field(index_fields::UPDATED)
    }

    fn resolution_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field(index_fields::RESOLUTION_DATE)
    }

    fn votes(&self) -> Option<i64> {
        // Indexed issues are always persisted, so the zero default for
        // legacy vote-less records applies here too.
        Some(self.int_field(index_fields::VOTES).unwrap_or(0))
    }

    fn watches(&self) -> Option<i64> {
        self.int_field(index_fields::WATCHES)
    }

    fn original_estimate(&self) -> Option<i64> {
        self.int_field(index_fields::ORIGINAL_ESTIMATE)
    }

    fn remaining_estimate(&self) -> Option<i64> {
        self.int_field(index_fields::REMAINING_ESTIMATE)
    }

    fn time_spent(&self) -> Option<i64> {
        self.int_field(index_fields::TIME_SPENT)
    }

    fn workflow_id(&self) -> Option<i64> {
        self.int_field(index_fields::WORKFLOW_ID)
    }

    fn labels(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .document
            .values(index_fields::LABELS)
            .iter()
            .cloned()
            .collect())
    }

    fn affected_versions(&self) -> Result<Vec<Version>> {
        self.entity_values(index_fields::AFFECTED_VERSIONS)
    }

    fn fix_versions(&self) -> Result<Vec<Version>> {
        self.entity_values(index_fields::FIX_VERSIONS)
    }

    fn components(&self) -> Result<Vec<Component>> {
        self.entity_values(index_fields::COMPONENTS)
    }

    fn parent_issue_id(&self) -> Result<Option<i64>> {
        Ok(self.int_field(index_fields::PARENT_ID))
    }
}

impl std::fmt::Debug for IndexedIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedIssue")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}
