//! Issue key encoding: `"<PROJECTKEY>-<NUMBER>"`.
//!
//! The project key may itself contain hyphens, so parsing splits at the
//! last hyphen before the trailing digit run.

use crate::error::{DomainError, Result};
use crate::model::Project;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)-(\d+)$").expect("issue key pattern"));

/// The human-readable pairing of a project key and a per-project number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct IssueKey {
    project_key: String,
    number: i64,
}

impl IssueKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(project_key: impl Into<String>, number: i64) -> Self {
        Self {
            project_key: project_key.into(),
            number,
        }
    }

    /// Format the display key for an issue of `project` with `number`.
    #[must_use]
    pub fn format(project: &Project, number: i64) -> String {
        format!("{}-{}", project.key, number)
    }

    /// Parse a display key back into its parts.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidKey`] when the string does not match
    /// `PROJECT-NUMBER` or the number does not fit in an `i64`.
    pub fn parse(key: &str) -> Result<Self> {
        let captures = KEY_PATTERN
            .captures(key)
            .ok_or_else(|| DomainError::InvalidKey {
                key: key.to_string(),
            })?;

        let number: i64 =
            captures[2]
                .parse()
                .map_err(|_| DomainError::InvalidKey {
                    key: key.to_string(),
                })?;

        Ok(Self {
            project_key: captures[1].to_string(),
            number,
        })
    }

    #[must_use]
    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    #[must_use]
    pub const fn number(&self) -> i64 {
        self.number
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.project_key, self.number)
    }
}

impl FromStr for IssueKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
