//! End-to-end entity lifecycle against a real `SQLite` store (no mocks).
//!
//! Covers the unbound-to-bound transition, creator assignment, lazy
//! relation loading, key derivation, cloning, and subtask discovery.

mod common;

use common::{anonymous_services, seeded_store, signed_in_factory};
use quarry::{DomainError, IssueFactory, IssueField, IssueView};

// ============================================================================
// CREATE / STORE
// ============================================================================

#[test]
fn store_inserts_then_updates() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));

    let mut issue = factory.new_issue();
    issue.set_project_id(Some(10000)).unwrap();
    issue.set_number(Some(1)).unwrap();
    issue.set_issue_type_id(Some("bug")).unwrap();
    issue.set_summary(Some("Login broken"));
    issue.set_reporter_id(Some("bob-key")).unwrap();
    assert!(!issue.is_persisted());

    issue.store().unwrap();
    assert!(issue.is_persisted());
    let id = issue.id().expect("id after store");

    issue.set_summary(Some("Login broken on Safari"));
    issue.store().unwrap();

    let reloaded = factory.load(id).unwrap().expect("issue reloads");
    assert_eq!(reloaded.summary(), Some("Login broken on Safari".to_string()));
    assert_eq!(reloaded.key(), Some("ABC-1".to_string()));
    assert_eq!(reloaded.issue_type_id(), Some("bug".to_string()));
}

#[test]
fn creator_prefers_authenticated_user() {
    let store = seeded_store();
    let factory = signed_in_factory(&store, "admin-key");

    let mut issue = factory.new_issue();
    issue.set_project_id(Some(10000)).unwrap();
    issue.set_number(Some(2)).unwrap();
    issue.set_reporter_id(Some("bob-key")).unwrap();
    issue.store().unwrap();

    assert_eq!(issue.creator_id(), Some("admin-key".to_string()));
    let creator = issue.creator().unwrap().expect("creator resolves");
    assert_eq!(creator.username, "admin");
}

#[test]
fn creator_falls_back_to_reporter_when_anonymous() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));

    let mut issue = factory.new_issue();
    issue.set_project_id(Some(10000)).unwrap();
    issue.set_number(Some(3)).unwrap();
    issue.set_reporter_id(Some("bob-key")).unwrap();
    issue.store().unwrap();

    assert_eq!(issue.creator_id(), Some("bob-key".to_string()));
}

#[test]
fn votes_default_to_zero_for_legacy_rows() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));

    // a row written without any vote count, as old data has
    let mut legacy = factory.new_issue();
    legacy.set_project_id(Some(10000)).unwrap();
    legacy.set_number(Some(4)).unwrap();
    legacy.set_summary(Some("legacy"));
    legacy.store().unwrap();

    let reloaded = factory.load(legacy.id().unwrap()).unwrap().unwrap();
    assert_eq!(reloaded.votes(), Some(0));
    assert_eq!(reloaded.watches(), None);
}

// ============================================================================
// RESOLUTION DATE COUPLING
// ============================================================================

#[test]
fn resolution_changes_drive_resolution_date() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));
    let mut issue = factory.new_issue();

    issue.set_resolution_id(Some("fixed")).unwrap();
    let stamped = issue.resolution_date().expect("stamped on resolve");

    issue.set_resolution_id(Some("fixed")).unwrap();
    assert_eq!(issue.resolution_date(), Some(stamped));

    issue.set_resolution_id(Some("wont_fix")).unwrap();
    assert!(issue.resolution_date().unwrap() >= stamped);

    issue.set_resolution_id(None).unwrap();
    assert_eq!(issue.resolution_id(), None);
    assert_eq!(issue.resolution_date(), None);
}

// ============================================================================
// RELATIONS
// ============================================================================

#[test]
fn relations_load_lazily_and_copy_defensively() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));

    let mut issue = factory.new_issue();
    issue.set_project_id(Some(10000)).unwrap();
    issue.set_number(Some(5)).unwrap();
    issue.store().unwrap();
    let id = issue.id().unwrap();

    store
        .set_issue_labels(id, &["beta".to_string(), "alpha".to_string()].into())
        .unwrap();
    store
        .set_issue_versions(id, quarry::storage::VersionRelation::Fixes, &[2, 1])
        .unwrap();
    store.set_issue_components(id, &[2, 1]).unwrap();

    let issue = factory.load(id).unwrap().unwrap();

    let labels = issue.labels().unwrap();
    assert_eq!(
        labels.iter().map(String::as_str).collect::<Vec<_>>(),
        ["alpha", "beta"]
    );

    let versions = issue.fix_versions().unwrap();
    assert_eq!(
        versions.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["1.0", "2.0"]
    );

    let components = issue.components().unwrap();
    assert_eq!(
        components.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        ["api", "web"]
    );

    // mutating one copy never affects the next read
    let mut copy = issue.fix_versions().unwrap();
    copy.clear();
    assert_eq!(issue.fix_versions().unwrap().len(), 2);
}

#[test]
fn collection_setter_diffs_use_previous_value() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));

    let mut issue = factory.new_issue();
    issue.set_project_id(Some(10000)).unwrap();
    issue.set_number(Some(6)).unwrap();
    issue.store().unwrap();
    store
        .set_issue_labels(issue.id().unwrap(), &["old".to_string()].into())
        .unwrap();
    let mut issue = factory.load(issue.id().unwrap()).unwrap().unwrap();

    issue
        .set_labels(["new-a".to_string(), "new-b".to_string()].into())
        .unwrap();

    let change = &issue.modified_fields()["labels"];
    assert_eq!(change.before.as_deref(), Some("old"));
    assert_eq!(change.after.as_deref(), Some("new-a new-b"));
}

// ============================================================================
// KEYS AND EQUALITY
// ============================================================================

#[test]
fn key_derives_from_project_and_number() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));

    let mut issue = factory.new_issue();
    issue.set_project_id(Some(10000)).unwrap();
    assert_eq!(issue.key(), None);

    issue.set_number(Some(7)).unwrap();
    assert_eq!(issue.key(), Some("ABC-7".to_string()));

    issue.set_key(None).unwrap();
    assert_eq!(issue.key(), None);
    assert_eq!(issue.project_id(), None);

    issue.set_key(Some("ABC-8")).unwrap();
    assert_eq!(issue.number(), Some(8));
}

#[test]
fn generic_field_access_requires_persistence() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));

    let unbound = factory.new_issue();
    assert!(matches!(
        unbound.field_value(IssueField::Summary),
        Err(DomainError::NotPersisted { .. })
    ));

    let mut issue = factory.new_issue();
    issue.set_project_id(Some(10000)).unwrap();
    issue.set_number(Some(9)).unwrap();
    issue.set_summary(Some("raw access"));
    issue.store().unwrap();

    let value = issue.field_value(IssueField::Summary).unwrap();
    assert_eq!(
        value.and_then(|v| v.as_text().map(str::to_string)),
        Some("raw access".to_string())
    );
}

// ============================================================================
// CLONING AND SUBTASKS
// ============================================================================

#[test]
fn clone_copies_state_but_not_binding() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));

    let mut source = factory.new_issue();
    source.set_project_id(Some(10000)).unwrap();
    source.set_number(Some(10)).unwrap();
    source.set_summary(Some("cloneable"));
    source.set_priority_id(Some("major")).unwrap();
    source.store().unwrap();
    let source = factory.load(source.id().unwrap()).unwrap().unwrap();

    let clone = factory.clone_issue(&source).unwrap();
    assert!(!clone.is_persisted());
    assert_eq!(clone.summary(), Some("cloneable".to_string()));
    assert_eq!(clone.priority_id(), Some("major".to_string()));
    assert_eq!(clone, source);
}

#[test]
fn subtask_discovery_and_clone_without_parent() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));

    let mut parent = factory.new_issue();
    parent.set_project_id(Some(10000)).unwrap();
    parent.set_number(Some(11)).unwrap();
    parent.store().unwrap();

    let mut child = factory.new_issue();
    child.set_project_id(Some(10000)).unwrap();
    child.set_number(Some(12)).unwrap();
    child.store().unwrap();

    store
        .link_subtask(parent.id().unwrap(), child.id().unwrap())
        .unwrap();

    let child = factory.load(child.id().unwrap()).unwrap().unwrap();
    assert!(child.is_subtask().unwrap());
    assert_eq!(child.parent_issue_id().unwrap(), parent.id());
    let loaded_parent = child.parent().unwrap().expect("parent loads");
    assert_eq!(loaded_parent.id(), parent.id());

    let parent = factory.load(parent.id().unwrap()).unwrap().unwrap();
    assert_eq!(parent.subtask_ids().unwrap(), vec![child.id().unwrap()]);

    let detached = factory.clone_issue_without_parent(&child).unwrap();
    assert!(!detached.is_subtask().unwrap());
}

// ============================================================================
// CUSTOM FIELDS
// ============================================================================

#[test]
fn custom_fields_resolve_stored_or_default() {
    let store = seeded_store();
    let factory = IssueFactory::new(anonymous_services(&store));
    let field = quarry::model::CustomField {
        id: 10001,
        name: "Story Points".to_string(),
    };
    store.insert_custom_field(&field, Some("3")).unwrap();

    // unbound: default value
    let unbound = factory.new_issue();
    assert_eq!(unbound.custom_field_value(&field).unwrap(), Some("3".to_string()));

    // bound with a stored value
    let mut issue = factory.new_issue();
    issue.set_project_id(Some(10000)).unwrap();
    issue.set_number(Some(13)).unwrap();
    issue.store().unwrap();
    store
        .set_custom_field_value(field.id, issue.id().unwrap(), "8")
        .unwrap();
    let issue = factory.load(issue.id().unwrap()).unwrap().unwrap();
    assert_eq!(issue.custom_field_value(&field).unwrap(), Some("8".to_string()));

    // tracked mutation
    let mut issue = issue;
    issue
        .set_custom_field_value(&field, Some("13".to_string()))
        .unwrap();
    let change = &issue.modified_fields()["customfield_10001"];
    assert_eq!(change.before.as_deref(), Some("8"));
    assert_eq!(change.after.as_deref(), Some("13"));
}
