//! The issue entity and its variants.
//!
//! Two concrete representations share one read contract ([`IssueView`]):
//! [`entity::Issue`], the mutable store-backed entity, and
//! [`indexed::IndexedIssue`], the read-only view reconstructed from a
//! search-index document. Mutation and persistence live only on the
//! entity, so the indexed variant never carries stubbed-out setters.

pub mod entity;
pub mod factory;
pub mod fields;
pub mod indexed;
pub mod params;

#[cfg(test)]
pub(crate) mod testkit;

use crate::error::Result;
use crate::model::{Component, Version};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Read-only accessor contract shared by every issue representation.
///
/// Scalar getters return owned values: the indexed variant decodes on
/// every call and has nothing to borrow from.
pub trait IssueView {
    /// Store identifier; `None` until persisted.
    fn id(&self) -> Option<i64>;

    /// Display key, defined only when project and number are both known.
    fn key(&self) -> Option<String>;

    fn project_id(&self) -> Option<i64>;
    fn number(&self) -> Option<i64>;
    fn issue_type_id(&self) -> Option<String>;
    fn summary(&self) -> Option<String>;
    fn description(&self) -> Option<String>;
    fn environment(&self) -> Option<String>;
    fn assignee_id(&self) -> Option<String>;
    fn reporter_id(&self) -> Option<String>;
    fn creator_id(&self) -> Option<String>;
    fn priority_id(&self) -> Option<String>;
    fn status_id(&self) -> Option<String>;
    fn resolution_id(&self) -> Option<String>;
    fn security_level_id(&self) -> Option<i64>;
    fn due_date(&self) -> Option<DateTime<Utc>>;
    fn created(&self) -> Option<DateTime<Utc>>;
    fn updated(&self) -> Option<DateTime<Utc>>;
    fn resolution_date(&self) -> Option<DateTime<Utc>>;
    fn votes(&self) -> Option<i64>;
    fn watches(&self) -> Option<i64>;
    fn original_estimate(&self) -> Option<i64>;
    fn remaining_estimate(&self) -> Option<i64>;
    fn time_spent(&self) -> Option<i64>;
    fn workflow_id(&self) -> Option<i64>;

    /// Label set; a fresh copy on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing lookup fails.
    fn labels(&self) -> Result<BTreeSet<String>>;

    /// Affected versions in version order; a fresh copy on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing lookup fails.
    fn affected_versions(&self) -> Result<Vec<Version>>;

    /// Fix versions in version order; a fresh copy on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing lookup fails.
    fn fix_versions(&self) -> Result<Vec<Version>>;

    /// Components in name order; a fresh copy on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing lookup fails.
    fn components(&self) -> Result<Vec<Component>>;

    /// Parent issue id; `None` for top-level issues.
    ///
    /// # Errors
    ///
    /// Returns an error if link discovery fails.
    fn parent_issue_id(&self) -> Result<Option<i64>>;

    /// An issue is a subtask iff it has a parent.
    ///
    /// # Errors
    ///
    /// Returns an error if link discovery fails.
    fn is_subtask(&self) -> Result<bool> {
        Ok(self.parent_issue_id()?.is_some())
    }
}
