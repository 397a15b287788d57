//! Core data types for `quarry`.
//!
//! This module defines the related entities an issue resolves lazily:
//! - `Project` - the container an issue belongs to
//! - `Version` - affected/fix version of a project
//! - `Component` - project component
//! - `SecurityLevel` - visibility restriction level
//! - `User` - a user referenced by opaque key
//! - `CustomField` - a caller-defined field descriptor
//!
//! Issue keys live in [`key`], issue constants (status, priority,
//! resolution, type) in [`constants`].

pub mod constants;
pub mod key;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A project: the namespace issues are numbered within.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    /// Short uppercase code, e.g. "ABC".
    pub key: String,
    pub name: String,
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// A project version, orderable by its scheduling sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Version {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    /// Position within the project's version order.
    pub sequence: i64,
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub archived: bool,
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A project component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Component {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An issue security level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityLevel {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A user, addressed everywhere by an opaque stable key.
///
/// The key survives renames; `username` and `display_name` are what the
/// directory currently knows about the account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub key: String,
    pub username: String,
    pub display_name: String,
}

/// Descriptor for a caller-defined custom field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CustomField {
    pub id: i64,
    pub name: String,
}

impl CustomField {
    /// The field identifier used in change maps and input parameters.
    #[must_use]
    pub fn field_id(&self) -> String {
        format!("customfield_{}", self.id)
    }
}
