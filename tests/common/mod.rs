//! Shared fixtures for integration tests: a real in-memory SQLite store
//! seeded with a project, users, constants, and a security level.
#![allow(dead_code)]

use quarry::model::constants::{ConstantKind, ConstantRecord};
use quarry::model::{Component, Project, SecurityLevel, User, Version};
use quarry::services::{AuthContext, IssueServices};
use quarry::storage::SqliteStore;
use quarry::{ApplicationProperties, IssueFactory};
use std::sync::Arc;

/// Auth context with a fixed signed-in user.
pub struct SignedIn(pub &'static str);

impl AuthContext for SignedIn {
    fn current_user_key(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

/// In-memory store seeded with the standard fixtures.
pub fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_memory(Arc::new(ApplicationProperties::default()))
        .expect("open in-memory store");

    store
        .insert_project(&Project {
            id: 10000,
            key: "ABC".to_string(),
            name: "Alphabet".to_string(),
        })
        .unwrap();

    for (key, username, display_name) in [
        ("bob-key", "bob", "Bob Builder"),
        ("admin-key", "admin", "Administrator"),
    ] {
        store
            .insert_user(&User {
                key: key.to_string(),
                username: username.to_string(),
                display_name: display_name.to_string(),
            })
            .unwrap();
    }

    for (kind, id, name, sequence) in [
        (ConstantKind::IssueType, "bug", "Bug", 1),
        (ConstantKind::IssueType, "task", "Task", 2),
        (ConstantKind::Priority, "blocker", "Blocker", 1),
        (ConstantKind::Priority, "major", "Major", 3),
        (ConstantKind::Status, "open", "Open", 1),
        (ConstantKind::Status, "resolved", "Resolved", 5),
        (ConstantKind::Resolution, "fixed", "Fixed", 1),
        (ConstantKind::Resolution, "wont_fix", "Won't Fix", 2),
    ] {
        store
            .insert_constant(&ConstantRecord {
                id: id.to_string(),
                kind,
                name: name.to_string(),
                description: None,
                icon_path: None,
                sequence,
            })
            .unwrap();
    }

    store
        .insert_security_level(&SecurityLevel {
            id: 10100,
            name: "Internal".to_string(),
            description: Some("Staff only".to_string()),
        })
        .unwrap();

    for (id, name, sequence) in [(1, "1.0", 10), (2, "2.0", 20)] {
        store
            .insert_version(&Version {
                id,
                project_id: 10000,
                name: name.to_string(),
                sequence,
                released: false,
                archived: false,
            })
            .unwrap();
    }

    for (id, name) in [(1, "api"), (2, "web")] {
        store
            .insert_component(&Component {
                id,
                project_id: 10000,
                name: name.to_string(),
            })
            .unwrap();
    }

    store
}

/// Anonymous services over a seeded store.
pub fn anonymous_services(store: &SqliteStore) -> IssueServices {
    store.services(Arc::new(quarry::services::AnonymousAuth))
}

/// Factory over a seeded store with a signed-in user.
pub fn signed_in_factory(store: &SqliteStore, user_key: &'static str) -> IssueFactory {
    IssueFactory::new(store.services(Arc::new(SignedIn(user_key))))
}
