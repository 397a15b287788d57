//! Issue-tracking domain core.
//!
//! `quarry` is the entity layer of an issue tracker: the mutable,
//! store-backed [`Issue`] with per-field change tracking, its read-only
//! search-index twin [`IndexedIssue`], the constants and key value types
//! around them, and a SQLite store behind explicit service traits.
//!
//! # Layout
//!
//! - [`model`] - related-entity value types, issue keys, issue constants
//! - [`issue`] - the entity, its indexed variant, factory, field ids,
//!   and form-shaped input parameters
//! - [`services`] - collaborator traits wired into entities at
//!   construction
//! - [`storage`] - the SQLite implementation of those traits
//! - [`config`] - application properties the domain layer reads
//! - [`error`] - error types
//!
//! # Example
//!
//! ```no_run
//! use quarry::storage::SqliteStore;
//! use quarry::services::AnonymousAuth;
//! use quarry::{ApplicationProperties, IssueFactory};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> quarry::Result<()> {
//! let properties = Arc::new(ApplicationProperties::default());
//! let store = SqliteStore::open(Path::new("tracker.db"), properties)?;
//! let factory = IssueFactory::new(store.services(Arc::new(AnonymousAuth)));
//!
//! let mut issue = factory.new_issue();
//! issue.set_project_id(Some(10000))?;
//! issue.set_number(Some(1))?;
//! issue.set_summary(Some("First issue"));
//! issue.store()?;
//! assert!(issue.is_persisted());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod issue;
pub mod model;
pub mod services;
pub mod storage;

pub use config::ApplicationProperties;
pub use error::{DomainError, ErrorClass, Result};
pub use issue::IssueView;
pub use issue::entity::{Issue, ModifiedValue};
pub use issue::factory::IssueFactory;
pub use issue::fields::{FieldMap, FieldValue, IssueField, IssueRecord};
pub use issue::indexed::{IndexDocument, IndexedIssue};
pub use issue::params::IssueInputParameters;
pub use model::key::IssueKey;
