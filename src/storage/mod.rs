//! SQLite-backed persistence for the domain layer.

pub mod history;
pub mod schema;
mod sqlite;

pub use history::{ChangeGroup, ChangeItem};
pub use sqlite::{SqliteStore, VersionRelation};
