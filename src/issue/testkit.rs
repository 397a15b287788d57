//! In-memory collaborator fixtures for unit tests.
//!
//! One `TestWorld` backs every service trait with hash maps, plus call
//! counters where memoization behavior is under test. Integration tests
//! use the real SQLite store instead.

use crate::config::ApplicationProperties;
use crate::error::Result;
use crate::issue::fields::{FieldMap, IssueRecord};
use crate::model::constants::{
    ConstantKind, ConstantRecord, IssueConstant, Translation, TranslationStore,
};
use crate::model::{Component, CustomField, Project, SecurityLevel, User, Version};
use crate::services::{
    AuthContext, ComponentCatalog, ConstantsCatalog, CustomFieldValues, EntityStore,
    IssueServices, LabelCatalog, ProjectDirectory, SecurityLevels, SubtaskLinks, UserDirectory,
    VersionCatalog,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Translation store with nothing in it.
struct NoTranslations;

impl TranslationStore for NoTranslations {
    fn translation(
        &self,
        _kind: ConstantKind,
        _id: &str,
        _locale: &str,
    ) -> Result<Option<Translation>> {
        Ok(None)
    }

    fn set_translation(
        &self,
        _kind: ConstantKind,
        _id: &str,
        _locale: &str,
        _translation: &Translation,
    ) -> Result<()> {
        Ok(())
    }

    fn delete_translation(&self, _kind: ConstantKind, _id: &str, _locale: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct WorldState {
    projects: RefCell<HashMap<i64, Project>>,
    users: RefCell<HashMap<String, User>>,
    constants: RefCell<HashMap<(ConstantKind, String), ConstantRecord>>,
    security_levels: RefCell<HashMap<i64, SecurityLevel>>,
    records: RefCell<HashMap<i64, IssueRecord>>,
    next_record_id: Cell<i64>,
    parent_links: RefCell<HashMap<i64, i64>>,
    parent_lookups: Cell<usize>,
    issue_labels: RefCell<HashMap<i64, BTreeSet<String>>>,
    issue_components: RefCell<HashMap<i64, Vec<Component>>>,
    issue_affected_versions: RefCell<HashMap<i64, Vec<Version>>>,
    issue_fix_versions: RefCell<HashMap<i64, Vec<Version>>>,
    custom_defaults: RefCell<HashMap<i64, String>>,
    custom_values: RefCell<HashMap<(i64, i64), String>>,
    custom_lookups: Cell<usize>,
    current_user: RefCell<Option<String>>,
}

impl EntityStore for WorldState {
    fn create_issue(&self, fields: &FieldMap) -> Result<IssueRecord> {
        let id = self.next_record_id.get();
        self.next_record_id.set(id + 1);
        let record = IssueRecord::new(id, fields.clone());
        self.records.borrow_mut().insert(id, record.clone());
        Ok(record)
    }

    fn update_issue(&self, record: &IssueRecord) -> Result<()> {
        self.records.borrow_mut().insert(record.id(), record.clone());
        Ok(())
    }

    fn issue_record(&self, id: i64) -> Result<Option<IssueRecord>> {
        Ok(self.records.borrow().get(&id).cloned())
    }
}

impl ProjectDirectory for WorldState {
    fn project_by_id(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.projects.borrow().get(&id).cloned())
    }

    fn project_by_key(&self, key: &str) -> Result<Option<Project>> {
        Ok(self
            .projects
            .borrow()
            .values()
            .find(|p| p.key == key)
            .cloned())
    }
}

impl UserDirectory for WorldState {
    fn user_by_key(&self, key: &str) -> Result<Option<User>> {
        Ok(self.users.borrow().get(key).cloned())
    }
}

impl ConstantsCatalog for WorldState {
    fn constant(&self, kind: ConstantKind, id: &str) -> Result<Option<IssueConstant>> {
        Ok(self
            .constants
            .borrow()
            .get(&(kind, id.to_string()))
            .cloned()
            .map(|record| {
                IssueConstant::new(
                    record,
                    Arc::new(ApplicationProperties::default()),
                    Arc::new(NoTranslations),
                )
            }))
    }
}

impl VersionCatalog for WorldState {
    fn affected_versions(&self, issue_id: i64) -> Result<Vec<Version>> {
        Ok(self
            .issue_affected_versions
            .borrow()
            .get(&issue_id)
            .cloned()
            .unwrap_or_default())
    }

    fn fix_versions(&self, issue_id: i64) -> Result<Vec<Version>> {
        Ok(self
            .issue_fix_versions
            .borrow()
            .get(&issue_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl ComponentCatalog for WorldState {
    fn components_for_issue(&self, issue_id: i64) -> Result<Vec<Component>> {
        Ok(self
            .issue_components
            .borrow()
            .get(&issue_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl LabelCatalog for WorldState {
    fn labels_for_issue(&self, issue_id: i64) -> Result<BTreeSet<String>> {
        Ok(self
            .issue_labels
            .borrow()
            .get(&issue_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl SecurityLevels for WorldState {
    fn level(&self, id: i64) -> Result<Option<SecurityLevel>> {
        Ok(self.security_levels.borrow().get(&id).cloned())
    }
}

impl SubtaskLinks for WorldState {
    fn parent_issue_id(&self, issue_id: i64) -> Result<Option<i64>> {
        self.parent_lookups.set(self.parent_lookups.get() + 1);
        Ok(self.parent_links.borrow().get(&issue_id).copied())
    }

    fn subtask_ids(&self, issue_id: i64) -> Result<Vec<i64>> {
        let mut ids: Vec<i64> = self
            .parent_links
            .borrow()
            .iter()
            .filter(|(_, parent)| **parent == issue_id)
            .map(|(child, _)| *child)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

impl CustomFieldValues for WorldState {
    fn value(&self, field: &CustomField, issue_id: i64) -> Result<Option<String>> {
        self.custom_lookups.set(self.custom_lookups.get() + 1);
        Ok(self
            .custom_values
            .borrow()
            .get(&(field.id, issue_id))
            .cloned())
    }

    fn default_value(&self, field: &CustomField) -> Result<Option<String>> {
        self.custom_lookups.set(self.custom_lookups.get() + 1);
        Ok(self.custom_defaults.borrow().get(&field.id).cloned())
    }
}

impl AuthContext for WorldState {
    fn current_user_key(&self) -> Option<String> {
        self.current_user.borrow().clone()
    }
}

/// The fixture handle shared by unit tests.
pub(crate) struct TestWorld {
    state: Arc<WorldState>,
}

impl TestWorld {
    /// A world with the standard fixtures: project ABC (10000), users
    /// bob-key/admin-key, the usual constants, security level 10100.
    pub(crate) fn with_fixtures() -> Self {
        let state = WorldState {
            next_record_id: Cell::new(1),
            ..Default::default()
        };
        let world = Self {
            state: Arc::new(state),
        };

        world.add_project(10000, "ABC", "Alphabet");
        world.add_user("bob-key", "bob", "Bob Builder");
        world.add_user("admin-key", "admin", "Administrator");
        world.add_constant(ConstantKind::Resolution, "fixed", "Fixed", 1);
        world.add_constant(ConstantKind::Resolution, "wont_fix", "Won't Fix", 2);
        world.add_constant(ConstantKind::Priority, "major", "Major", 3);
        world.add_constant(ConstantKind::IssueType, "bug", "Bug", 1);
        world.add_constant(ConstantKind::IssueType, "subtask", "Sub-task", 7);
        world.add_constant(ConstantKind::Status, "open", "Open", 1);
        world.state.security_levels.borrow_mut().insert(
            10100,
            SecurityLevel {
                id: 10100,
                name: "Internal".to_string(),
                description: None,
            },
        );
        world
    }

    pub(crate) fn signed_in_as(self, user_key: &str) -> Self {
        *self.state.current_user.borrow_mut() = Some(user_key.to_string());
        self
    }

    pub(crate) fn services(&self) -> IssueServices {
        IssueServices {
            store: self.state.clone(),
            projects: self.state.clone(),
            users: self.state.clone(),
            constants: self.state.clone(),
            versions: self.state.clone(),
            components: self.state.clone(),
            labels: self.state.clone(),
            security_levels: self.state.clone(),
            subtask_links: self.state.clone(),
            custom_fields: self.state.clone(),
            auth: self.state.clone(),
        }
    }

    pub(crate) fn add_project(&self, id: i64, key: &str, name: &str) {
        self.state.projects.borrow_mut().insert(
            id,
            Project {
                id,
                key: key.to_string(),
                name: name.to_string(),
            },
        );
    }

    pub(crate) fn add_user(&self, key: &str, username: &str, display_name: &str) {
        self.state.users.borrow_mut().insert(
            key.to_string(),
            User {
                key: key.to_string(),
                username: username.to_string(),
                display_name: display_name.to_string(),
            },
        );
    }

    pub(crate) fn add_constant(&self, kind: ConstantKind, id: &str, name: &str, sequence: i64) {
        self.state.constants.borrow_mut().insert(
            (kind, id.to_string()),
            ConstantRecord {
                id: id.to_string(),
                kind,
                name: name.to_string(),
                description: None,
                icon_path: None,
                sequence,
            },
        );
    }

    /// Insert a record directly into the fake store.
    pub(crate) fn insert_record(&self, build: impl FnOnce(&mut FieldMap)) -> IssueRecord {
        let mut fields = FieldMap::new();
        build(&mut fields);
        self.state
            .create_issue(&fields)
            .expect("fake store insert")
    }

    pub(crate) fn stored_record(&self, id: i64) -> Option<IssueRecord> {
        self.state.records.borrow().get(&id).cloned()
    }

    pub(crate) fn link_parent(&self, child_id: i64, parent_id: i64) {
        self.state
            .parent_links
            .borrow_mut()
            .insert(child_id, parent_id);
    }

    pub(crate) fn parent_lookups(&self) -> usize {
        self.state.parent_lookups.get()
    }

    pub(crate) fn set_custom_field_default(&self, field_id: i64, value: &str) {
        self.state
            .custom_defaults
            .borrow_mut()
            .insert(field_id, value.to_string());
    }

    pub(crate) fn set_custom_field_value(&self, field_id: i64, issue_id: i64, value: &str) {
        self.state
            .custom_values
            .borrow_mut()
            .insert((field_id, issue_id), value.to_string());
    }

    pub(crate) fn custom_field_lookups(&self) -> usize {
        self.state.custom_lookups.get()
    }
}
