//! Issue field identifiers and typed field values.
//!
//! The backing record is a closed set of known fields, each holding a
//! text, integer, or timestamp value. Access goes through [`IssueField`]
//! and [`FieldValue`] instead of stringly-typed name lookups; an untyped
//! escape hatch would hide typos until runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of a built-in issue field.
///
/// Collection fields (labels, components, versions) appear in change maps
/// and input parameters but are not part of the scalar backing record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IssueField {
    Project,
    IssueType,
    Summary,
    Description,
    Environment,
    Assignee,
    Reporter,
    Creator,
    DueDate,
    SecurityLevel,
    Priority,
    Status,
    Resolution,
    Created,
    Updated,
    ResolutionDate,
    OriginalEstimate,
    RemainingEstimate,
    TimeSpent,
    Votes,
    Watches,
    Number,
    WorkflowId,
    Labels,
    Components,
    AffectedVersions,
    FixVersions,
    TimeTracking,
}

impl IssueField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::IssueType => "issue_type",
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Environment => "environment",
            Self::Assignee => "assignee",
            Self::Reporter => "reporter",
            Self::Creator => "creator",
            Self::DueDate => "due_date",
            Self::SecurityLevel => "security_level",
            Self::Priority => "priority",
            Self::Status => "status",
            Self::Resolution => "resolution",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::ResolutionDate => "resolution_date",
            Self::OriginalEstimate => "time_original_estimate",
            Self::RemainingEstimate => "time_estimate",
            Self::TimeSpent => "time_spent",
            Self::Votes => "votes",
            Self::Watches => "watches",
            Self::Number => "number",
            Self::WorkflowId => "workflow_id",
            Self::Labels => "labels",
            Self::Components => "components",
            Self::AffectedVersions => "affected_versions",
            Self::FixVersions => "fix_versions",
            Self::TimeTracking => "timetracking",
        }
    }

    /// Scalar fields persisted on the issue row, in column order.
    #[must_use]
    pub const fn persisted() -> &'static [Self] {
        &[
            Self::Project,
            Self::IssueType,
            Self::Summary,
            Self::Description,
            Self::Environment,
            Self::Assignee,
            Self::Reporter,
            Self::Creator,
            Self::DueDate,
            Self::SecurityLevel,
            Self::Priority,
            Self::Status,
            Self::Resolution,
            Self::Created,
            Self::Updated,
            Self::ResolutionDate,
            Self::OriginalEstimate,
            Self::RemainingEstimate,
            Self::TimeSpent,
            Self::Votes,
            Self::Watches,
            Self::Number,
            Self::WorkflowId,
        ]
    }
}

/// The value shape a field holds in the backing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Timestamp,
}

impl IssueField {
    /// The value shape this field holds.
    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            Self::IssueType
            | Self::Summary
            | Self::Description
            | Self::Environment
            | Self::Assignee
            | Self::Reporter
            | Self::Creator
            | Self::Priority
            | Self::Status
            | Self::Resolution
            | Self::Labels
            | Self::Components
            | Self::AffectedVersions
            | Self::FixVersions
            | Self::TimeTracking => FieldKind::Text,
            Self::Project
            | Self::SecurityLevel
            | Self::OriginalEstimate
            | Self::RemainingEstimate
            | Self::TimeSpent
            | Self::Votes
            | Self::Watches
            | Self::Number
            | Self::WorkflowId => FieldKind::Int,
            Self::DueDate | Self::Created | Self::Updated | Self::ResolutionDate => {
                FieldKind::Timestamp
            }
        }
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueField {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "project" => Self::Project,
            "issue_type" => Self::IssueType,
            "summary" => Self::Summary,
            "description" => Self::Description,
            "environment" => Self::Environment,
            "assignee" => Self::Assignee,
            "reporter" => Self::Reporter,
            "creator" => Self::Creator,
            "due_date" => Self::DueDate,
            "security_level" => Self::SecurityLevel,
            "priority" => Self::Priority,
            "status" => Self::Status,
            "resolution" => Self::Resolution,
            "created" => Self::Created,
            "updated" => Self::Updated,
            "resolution_date" => Self::ResolutionDate,
            "time_original_estimate" => Self::OriginalEstimate,
            "time_estimate" => Self::RemainingEstimate,
            "time_spent" => Self::TimeSpent,
            "votes" => Self::Votes,
            "watches" => Self::Watches,
            "number" => Self::Number,
            "workflow_id" => Self::WorkflowId,
            "labels" => Self::Labels,
            "components" => Self::Components,
            "affected_versions" => Self::AffectedVersions,
            "fix_versions" => Self::FixVersions,
            "timetracking" => Self::TimeTracking,
            other => {
                return Err(crate::error::DomainError::FieldNotApplicable {
                    field: other.to_string(),
                    expected: "issue field",
                });
            }
        };
        Ok(field)
    }
}

/// A value held by one field of the backing record.
///
/// Untagged serde: integers first, then timestamps (RFC 3339 strings),
/// then arbitrary text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

/// Field-id keyed value map; absent keys read as null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    fields: BTreeMap<IssueField, FieldValue>,
}

impl FieldMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field; `None` clears it.
    pub fn set(&mut self, field: IssueField, value: Option<FieldValue>) {
        match value {
            Some(v) => {
                self.fields.insert(field, v);
            }
            None => {
                self.fields.remove(&field);
            }
        }
    }

    pub fn set_text(&mut self, field: IssueField, value: Option<&str>) {
        self.set(field, value.map(|s| FieldValue::Text(s.to_string())));
    }

    pub fn set_int(&mut self, field: IssueField, value: Option<i64>) {
        self.set(field, value.map(FieldValue::Int));
    }

    pub fn set_timestamp(&mut self, field: IssueField, value: Option<DateTime<Utc>>) {
        self.set(field, value.map(FieldValue::Timestamp));
    }

    #[must_use]
    pub fn get(&self, field: IssueField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    #[must_use]
    pub fn text(&self, field: IssueField) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    #[must_use]
    pub fn int(&self, field: IssueField) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_int)
    }

    #[must_use]
    pub fn timestamp(&self, field: IssueField) -> Option<DateTime<Utc>> {
        self.get(field).and_then(FieldValue::as_timestamp)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IssueField, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The relational row underlying a persisted issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    id: i64,
    fields: FieldMap,
}

impl IssueRecord {
    #[must_use]
    pub const fn new(id: i64, fields: FieldMap) -> Self {
        Self { id, fields }
    }

    /// Opaque store identifier of this row.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, field: IssueField) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn text(&self, field: IssueField) -> Option<&str> {
        self.fields.text(field)
    }

    #[must_use]
    pub fn int(&self, field: IssueField) -> Option<i64> {
        self.fields.int(field)
    }

    #[must_use]
    pub fn timestamp(&self, field: IssueField) -> Option<DateTime<Utc>> {
        self.fields.timestamp(field)
    }

    /// Write-through from an entity setter; `None` clears the field.
    pub fn set(&mut self, field: IssueField, value: Option<FieldValue>) {
        self.fields.set(field, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn field_str_roundtrip() {
        for field in IssueField::persisted() {
            let parsed: IssueField = field.as_str().parse().unwrap();
            assert_eq!(parsed, *field);
        }
    }

    #[test]
    fn unknown_field_rejected() {
        assert!("nonsense".parse::<IssueField>().is_err());
    }

    #[test]
    fn field_map_set_and_clear() {
        let mut map = FieldMap::new();
        map.set_text(IssueField::Summary, Some("A summary"));
        assert_eq!(map.text(IssueField::Summary), Some("A summary"));

        map.set_text(IssueField::Summary, None);
        assert!(map.get(IssueField::Summary).is_none());
    }

    #[test]
    fn typed_accessors_reject_wrong_shape() {
        let mut map = FieldMap::new();
        map.set_int(IssueField::Votes, Some(3));
        assert_eq!(map.int(IssueField::Votes), Some(3));
        assert_eq!(map.text(IssueField::Votes), None);
        assert_eq!(map.timestamp(IssueField::Votes), None);
    }

    #[test]
    fn record_reads_through_field_map() {
        let created = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut fields = FieldMap::new();
        fields.set_int(IssueField::Project, Some(10000));
        fields.set_timestamp(IssueField::Created, Some(created));

        let record = IssueRecord::new(42, fields);
        assert_eq!(record.id(), 42);
        assert_eq!(record.int(IssueField::Project), Some(10000));
        assert_eq!(record.timestamp(IssueField::Created), Some(created));
        assert_eq!(record.text(IssueField::Summary), None);
    }

    #[test]
    fn field_value_display() {
        assert_eq!(FieldValue::Text("abc".to_string()).to_string(), "abc");
        assert_eq!(FieldValue::Int(7).to_string(), "7");
    }
}
