//! The mutable, store-backed issue entity.
//!
//! An issue is either *unbound* (no backing record; `store()` inserts) or
//! *bound* (hydrated from a record; `store()` updates). The transition
//! happens exactly once, inside [`Issue::store`]. Related entities resolve
//! lazily through the injected services and are memoized per instance;
//! every mutator records a before/after pair in the modified-fields map
//! for change-history generation.
//!
//! Instances are not `Sync`: all memoization is instance-local and
//! unsynchronized, matching the one-request-one-thread execution model.

use crate::error::{DomainError, Result};
use crate::issue::IssueView;
use crate::issue::fields::{FieldMap, FieldValue, IssueField, IssueRecord};
use crate::model::constants::{ConstantKind, IssueConstant};
use crate::model::key::IssueKey;
use crate::model::{Component, CustomField, Project, SecurityLevel, User, Version};
use crate::services::IssueServices;
use chrono::{DateTime, Utc};
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// A before/after pair recorded by a field mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedValue {
    pub before: Option<String>,
    pub after: Option<String>,
}

/// Parent linkage memo. Link discovery runs at most once per instance;
/// the negative outcome is remembered too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParentMemo {
    Unresolved,
    NoParent,
    Known(i64),
}

/// The read/write issue entity.
pub struct Issue {
    services: IssueServices,
    record: Option<IssueRecord>,

    // Scalar state
    project_id: Option<i64>,
    number: Option<i64>,
    key: Option<String>,
    issue_type_id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    environment: Option<String>,
    assignee_id: Option<String>,
    reporter_id: Option<String>,
    creator_id: Option<String>,
    due_date: Option<DateTime<Utc>>,
    security_level_id: Option<i64>,
    priority_id: Option<String>,
    status_id: Option<String>,
    resolution_id: Option<String>,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    resolution_date: Option<DateTime<Utc>>,
    original_estimate: Option<i64>,
    remaining_estimate: Option<i64>,
    time_spent: Option<i64>,
    votes: Option<i64>,
    watches: Option<i64>,
    workflow_id: Option<i64>,

    // Lazily resolved related entities, one lookup per instance
    project: OnceCell<Option<Project>>,
    issue_type: OnceCell<Option<IssueConstant>>,
    priority: OnceCell<Option<IssueConstant>>,
    resolution: OnceCell<Option<IssueConstant>>,
    status: OnceCell<Option<IssueConstant>>,
    assignee: OnceCell<Option<User>>,
    reporter: OnceCell<Option<User>>,
    creator: OnceCell<Option<User>>,
    security_level: OnceCell<Option<SecurityLevel>>,
    components: OnceCell<Vec<Component>>,
    affected_versions: OnceCell<Vec<Version>>,
    fix_versions: OnceCell<Vec<Version>>,
    labels: OnceCell<BTreeSet<String>>,
    parent_memo: RefCell<ParentMemo>,
    parent_issue: OnceCell<Option<Box<Issue>>>,
    custom_field_values: RefCell<HashMap<i64, Option<String>>>,

    // Change tracking
    modified_fields: BTreeMap<String, ModifiedValue>,
    external_fields: BTreeMap<String, Option<String>>,
}

impl Issue {
    /// A blank, unbound issue to be filled by setters and stored later.
    pub(crate) fn unbound(services: IssueServices) -> Self {
        Self {
            services,
            record: None,
            project_id: None,
            number: None,
            key: None,
            issue_type_id: None,
            summary: None,
            description: None,
            environment: None,
            assignee_id: None,
            reporter_id: None,
            creator_id: None,
            due_date: None,
            security_level_id: None,
            priority_id: None,
            status_id: None,
            resolution_id: None,
            created: None,
            updated: None,
            resolution_date: None,
            original_estimate: None,
            remaining_estimate: None,
            time_spent: None,
            votes: None,
            watches: None,
            workflow_id: None,
            project: OnceCell::new(),
            issue_type: OnceCell::new(),
            priority: OnceCell::new(),
            resolution: OnceCell::new(),
            status: OnceCell::new(),
            assignee: OnceCell::new(),
            reporter: OnceCell::new(),
            creator: OnceCell::new(),
            security_level: OnceCell::new(),
            components: OnceCell::new(),
            affected_versions: OnceCell::new(),
            fix_versions: OnceCell::new(),
            labels: OnceCell::new(),
            parent_memo: RefCell::new(ParentMemo::Unresolved),
            parent_issue: OnceCell::new(),
            custom_field_values: RefCell::new(HashMap::new()),
            modified_fields: BTreeMap::new(),
            external_fields: BTreeMap::new(),
        }
    }

    /// An issue bound to an existing record, hydrated at construction.
    ///
    /// # Errors
    ///
    /// Returns an error if the project lookup for key derivation fails.
    pub(crate) fn bound(services: IssueServices, record: IssueRecord) -> Result<Self> {
        let mut issue = Self::unbound(services);
        issue.hydrate(&record);
        issue.record = Some(record);
        issue.refresh_key()?;
        Ok(issue)
    }

    /// Clone another issue's in-memory state into a new unbound issue.
    ///
    /// A bound source re-hydrates from its backing record; an unbound
    /// source is copied field by field. The clone itself is always
    /// unbound — it does not exist in the store until stored.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the source's relations fails.
    pub(crate) fn cloned_from(
        services: IssueServices,
        source: &Self,
        retain_parent: bool,
    ) -> Result<Self> {
        let mut issue = Self::unbound(services);

        // Relations first, through the setters, so the clone's change map
        // reflects them the same way a caller-populated issue would.
        issue.set_affected_versions(source.affected_versions()?)?;
        issue.set_fix_versions(source.fix_versions()?)?;
        issue.set_components(source.components()?)?;
        issue.set_labels(source.labels()?)?;

        if let Some(record) = &source.record {
            issue.hydrate(record);
        } else {
            issue.copy_fields_from(source);
        }

        if retain_parent {
            issue.set_parent_issue_id(source.parent_issue_id()?);
        } else {
            issue.set_parent_issue_id(None);
        }
        issue.refresh_key()?;
        Ok(issue)
    }

    fn hydrate(&mut self, record: &IssueRecord) {
        self.project_id = record.int(IssueField::Project);
        self.number = record.int(IssueField::Number);
        self.issue_type_id = record.text(IssueField::IssueType).map(str::to_string);
        self.summary = record.text(IssueField::Summary).map(str::to_string);
        self.description = record.text(IssueField::Description).map(str::to_string);
        self.environment = record.text(IssueField::Environment).map(str::to_string);
        self.assignee_id = record.text(IssueField::Assignee).map(str::to_string);
        self.reporter_id = record.text(IssueField::Reporter).map(str::to_string);
        self.creator_id = record.text(IssueField::Creator).map(str::to_string);
        self.due_date = record.timestamp(IssueField::DueDate);
        self.security_level_id = record.int(IssueField::SecurityLevel);
        self.priority_id = record.text(IssueField::Priority).map(str::to_string);
        self.status_id = record.text(IssueField::Status).map(str::to_string);
        self.resolution_id = record.text(IssueField::Resolution).map(str::to_string);
        self.created = record.timestamp(IssueField::Created);
        self.updated = record.timestamp(IssueField::Updated);
        self.resolution_date = record.timestamp(IssueField::ResolutionDate);
        self.original_estimate = record.int(IssueField::OriginalEstimate);
        self.remaining_estimate = record.int(IssueField::RemainingEstimate);
        self.time_spent = record.int(IssueField::TimeSpent);
        // Legacy rows predate vote counting; absent reads as zero.
        self.votes = Some(record.int(IssueField::Votes).unwrap_or(0));
        self.watches = record.int(IssueField::Watches);
        self.workflow_id = record.int(IssueField::WorkflowId);
    }

    fn copy_fields_from(&mut self, source: &Self) {
        self.project_id = source.project_id;
        self.number = source.number;
        self.issue_type_id = source.issue_type_id.clone();
        self.summary = source.summary.clone();
        self.description = source.description.clone();
        self.environment = source.environment.clone();
        self.assignee_id = source.assignee_id.clone();
        self.reporter_id = source.reporter_id.clone();
        self.creator_id = source.creator_id.clone();
        self.due_date = source.due_date;
        self.security_level_id = source.security_level_id;
        self.priority_id = source.priority_id.clone();
        self.status_id = source.status_id.clone();
        self.resolution_id = source.resolution_id.clone();
        self.created = source.created;
        self.updated = source.updated;
        self.resolution_date = source.resolution_date;
        self.original_estimate = source.original_estimate;
        self.remaining_estimate = source.remaining_estimate;
        self.time_spent = source.time_spent;
        self.votes = Some(source.votes.unwrap_or(0));
        self.watches = source.watches;
        self.workflow_id = source.workflow_id;
    }

    /// Whether this issue has a backing record.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.record.is_some()
    }

    // ========================================================================
    // Lazily resolved related entities
    // ========================================================================

    /// The issue's project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project lookup fails.
    pub fn project(&self) -> Result<Option<&Project>> {
        let value = self.project.get_or_try_init(|| match self.project_id {
            Some(id) => self.services.projects.project_by_id(id),
            None => Ok(None),
        })?;
        Ok(value.as_ref())
    }

    /// The issue type constant.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn issue_type(&self) -> Result<Option<&IssueConstant>> {
        Self::constant_in(
            &self.issue_type,
            self.issue_type_id.as_deref(),
            ConstantKind::IssueType,
            &self.services,
        )
    }

    /// The priority constant.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn priority(&self) -> Result<Option<&IssueConstant>> {
        Self::constant_in(
            &self.priority,
            self.priority_id.as_deref(),
            ConstantKind::Priority,
            &self.services,
        )
    }

    /// The resolution constant; `None` while unresolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn resolution(&self) -> Result<Option<&IssueConstant>> {
        Self::constant_in(
            &self.resolution,
            self.resolution_id.as_deref(),
            ConstantKind::Resolution,
            &self.services,
        )
    }

    /// The workflow status constant.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn status(&self) -> Result<Option<&IssueConstant>> {
        Self::constant_in(
            &self.status,
            self.status_id.as_deref(),
            ConstantKind::Status,
            &self.services,
        )
    }

    fn constant_in<'a>(
        cell: &'a OnceCell<Option<IssueConstant>>,
        id: Option<&str>,
        kind: ConstantKind,
        services: &IssueServices,
    ) -> Result<Option<&'a IssueConstant>> {
        let value = cell.get_or_try_init(|| match id {
            Some(id) => services.constants.constant(kind, id),
            None => Ok(None),
        })?;
        Ok(value.as_ref())
    }

    /// The assigned user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    pub fn assignee(&self) -> Result<Option<&User>> {
        Self::user_in(&self.assignee, self.assignee_id.as_deref(), &self.services)
    }

    /// The reporting user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    pub fn reporter(&self) -> Result<Option<&User>> {
        Self::user_in(&self.reporter, self.reporter_id.as_deref(), &self.services)
    }

    /// The creating user, assigned on first store.
    ///
    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    pub fn creator(&self) -> Result<Option<&User>> {
        Self::user_in(&self.creator, self.creator_id.as_deref(), &self.services)
    }

    fn user_in<'a>(
        cell: &'a OnceCell<Option<User>>,
        key: Option<&str>,
        services: &IssueServices,
    ) -> Result<Option<&'a User>> {
        let value = cell.get_or_try_init(|| match key {
            Some(key) => services.users.user_by_key(key),
            None => Ok(None),
        })?;
        Ok(value.as_ref())
    }

    /// The security level restricting visibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the level lookup fails.
    pub fn security_level(&self) -> Result<Option<&SecurityLevel>> {
        let value = self
            .security_level
            .get_or_try_init(|| match self.security_level_id {
                Some(id) => self.services.security_levels.level(id),
                None => Ok(None),
            })?;
        Ok(value.as_ref())
    }

    // Collection loaders. Unbound issues default to empty; bound issues
    // load once and every getter call hands out an independent copy.

    fn load_components(&self) -> Result<Vec<Component>> {
        let cached = self
            .components
            .get_or_try_init(|| -> Result<Vec<Component>> {
                match &self.record {
                    Some(record) => {
                        let mut list =
                            self.services.components.components_for_issue(record.id())?;
                        list.sort();
                        Ok(list)
                    }
                    None => Ok(Vec::new()),
                }
            })?;
        Ok(cached.clone())
    }

    fn load_affected_versions(&self) -> Result<Vec<Version>> {
        let cached = self
            .affected_versions
            .get_or_try_init(|| -> Result<Vec<Version>> {
                match &self.record {
                    Some(record) => {
                        let mut list = self.services.versions.affected_versions(record.id())?;
                        list.sort();
                        Ok(list)
                    }
                    None => Ok(Vec::new()),
                }
            })?;
        Ok(cached.clone())
    }

    fn load_fix_versions(&self) -> Result<Vec<Version>> {
        let cached = self
            .fix_versions
            .get_or_try_init(|| -> Result<Vec<Version>> {
                match &self.record {
                    Some(record) => {
                        let mut list = self.services.versions.fix_versions(record.id())?;
                        list.sort();
                        Ok(list)
                    }
                    None => Ok(Vec::new()),
                }
            })?;
        Ok(cached.clone())
    }

    fn load_labels(&self) -> Result<BTreeSet<String>> {
        let cached = self.labels.get_or_try_init(|| match &self.record {
            Some(record) => self.services.labels.labels_for_issue(record.id()),
            None => Ok(BTreeSet::new()),
        })?;
        Ok(cached.clone())
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    pub fn set_summary(&mut self, summary: Option<&str>) {
        let before = self.summary.clone();
        self.summary = summary.map(str::to_string);
        self.write_through(IssueField::Summary, text_value(summary));
        self.track_field(IssueField::Summary, before, self.summary.clone());
    }

    pub fn set_description(&mut self, description: Option<&str>) {
        let before = self.description.clone();
        self.description = description.map(str::to_string);
        self.write_through(IssueField::Description, text_value(description));
        self.track_field(IssueField::Description, before, self.description.clone());
    }

    pub fn set_environment(&mut self, environment: Option<&str>) {
        let before = self.environment.clone();
        self.environment = environment.map(str::to_string);
        self.write_through(IssueField::Environment, text_value(environment));
        self.track_field(IssueField::Environment, before, self.environment.clone());
    }

    /// Set the project, updating the derived key.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the previous project fails.
    pub fn set_project(&mut self, project: Option<Project>) -> Result<()> {
        let before = self.project()?.map(|p| p.key.clone());
        let after = project.as_ref().map(|p| p.key.clone());
        self.track_field(IssueField::Project, before, after);

        self.project_id = project.as_ref().map(|p| p.id);
        self.project = OnceCell::with_value(project);
        self.write_through(IssueField::Project, self.project_id.map(FieldValue::Int));
        self.refresh_key()
    }

    /// Set the project by id.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownProject`] when the id does not
    /// resolve to a known project.
    pub fn set_project_id(&mut self, project_id: Option<i64>) -> Result<()> {
        match project_id {
            None => self.set_project(None),
            Some(id) => {
                let project = self
                    .services
                    .projects
                    .project_by_id(id)?
                    .ok_or(DomainError::UnknownProject { id })?;
                self.set_project(Some(project))
            }
        }
    }

    /// Set the issue type constant.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the previous constant fails.
    pub fn set_issue_type(&mut self, issue_type: Option<IssueConstant>) -> Result<()> {
        let before = self.issue_type()?.map(|c| c.name().to_string());
        let after = issue_type.as_ref().map(|c| c.name().to_string());
        self.track_field(IssueField::IssueType, before, after);

        self.issue_type_id = issue_type.as_ref().map(|c| c.id().to_string());
        self.issue_type = OnceCell::with_value(issue_type);
        self.write_through(
            IssueField::IssueType,
            self.issue_type_id.clone().map(FieldValue::Text),
        );
        Ok(())
    }

    /// Set the issue type by constant id. An id the catalog does not know
    /// clears the field.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn set_issue_type_id(&mut self, issue_type_id: Option<&str>) -> Result<()> {
        let constant = match issue_type_id {
            Some(id) => self.services.constants.constant(ConstantKind::IssueType, id)?,
            None => None,
        };
        self.set_issue_type(constant)
    }

    /// Set the priority constant.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the previous constant fails.
    pub fn set_priority(&mut self, priority: Option<IssueConstant>) -> Result<()> {
        let before = self.priority()?.map(|c| c.name().to_string());
        let after = priority.as_ref().map(|c| c.name().to_string());
        self.track_field(IssueField::Priority, before, after);

        self.priority_id = priority.as_ref().map(|c| c.id().to_string());
        self.priority = OnceCell::with_value(priority);
        self.write_through(
            IssueField::Priority,
            self.priority_id.clone().map(FieldValue::Text),
        );
        Ok(())
    }

    /// Set the priority by constant id.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn set_priority_id(&mut self, priority_id: Option<&str>) -> Result<()> {
        let constant = match priority_id {
            Some(id) => self.services.constants.constant(ConstantKind::Priority, id)?,
            None => None,
        };
        self.set_priority(constant)
    }

    /// Set the resolution constant.
    ///
    /// Moving to a different resolution (or resolving for the first time)
    /// stamps the resolution date; clearing the resolution clears it.
    /// Re-setting the same resolution leaves an existing date untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the previous constant fails.
    pub fn set_resolution(&mut self, resolution: Option<IssueConstant>) -> Result<()> {
        let before = self.resolution()?.map(|c| c.name().to_string());
        let after = resolution.as_ref().map(|c| c.name().to_string());
        self.track_field(IssueField::Resolution, before, after);

        match resolution {
            Some(constant) => {
                let old_id = self.resolution_id.take();
                let new_id = constant.id().to_string();
                let id_changed = old_id.as_deref() != Some(new_id.as_str());
                self.resolution_id = Some(new_id);
                self.resolution = OnceCell::with_value(Some(constant));
                if id_changed || self.resolution_date.is_none() {
                    self.set_resolution_date(Some(Utc::now()));
                }
            }
            None => {
                self.resolution_id = None;
                self.resolution = OnceCell::with_value(None);
                self.set_resolution_date(None);
            }
        }

        self.write_through(
            IssueField::Resolution,
            self.resolution_id.clone().map(FieldValue::Text),
        );
        Ok(())
    }

    /// Set the resolution by constant id. An id the catalog does not know
    /// clears the field (and the resolution date with it).
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn set_resolution_id(&mut self, resolution_id: Option<&str>) -> Result<()> {
        let constant = match resolution_id {
            Some(id) => self
                .services
                .constants
                .constant(ConstantKind::Resolution, id)?,
            None => None,
        };
        self.set_resolution(constant)
    }

    /// Set the workflow status. Status moves are owned by workflow
    /// transitions, so this does not enter the modified-fields map.
    pub fn set_status(&mut self, status: Option<IssueConstant>) {
        self.status_id = status.as_ref().map(|c| c.id().to_string());
        self.status = OnceCell::with_value(status);
        self.write_through(
            IssueField::Status,
            self.status_id.clone().map(FieldValue::Text),
        );
    }

    /// Set the workflow status by constant id.
    ///
    /// # Errors
    ///
    /// Returns an error if the constant lookup fails.
    pub fn set_status_id(&mut self, status_id: Option<&str>) -> Result<()> {
        let constant = match status_id {
            Some(id) => self.services.constants.constant(ConstantKind::Status, id)?,
            None => None,
        };
        self.set_status(constant);
        Ok(())
    }

    /// Set the assignee.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the previous assignee fails.
    pub fn set_assignee(&mut self, assignee: Option<User>) -> Result<()> {
        let before = self.assignee()?.map(|u| u.key.clone());
        let after = assignee.as_ref().map(|u| u.key.clone());
        self.track_field(IssueField::Assignee, before, after);

        self.assignee_id = assignee.as_ref().map(|u| u.key.clone());
        self.assignee = OnceCell::with_value(assignee);
        self.write_through(
            IssueField::Assignee,
            self.assignee_id.clone().map(FieldValue::Text),
        );
        Ok(())
    }

    /// Set the assignee by user key. An unknown key clears the field.
    ///
    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    pub fn set_assignee_id(&mut self, assignee_key: Option<&str>) -> Result<()> {
        let user = match assignee_key {
            Some(key) => self.services.users.user_by_key(key)?,
            None => None,
        };
        self.set_assignee(user)
    }

    /// Set the reporter.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the previous reporter fails.
    pub fn set_reporter(&mut self, reporter: Option<User>) -> Result<()> {
        let before = self.reporter()?.map(|u| u.key.clone());
        let after = reporter.as_ref().map(|u| u.key.clone());
        self.track_field(IssueField::Reporter, before, after);

        self.reporter_id = reporter.as_ref().map(|u| u.key.clone());
        self.reporter = OnceCell::with_value(reporter);
        self.write_through(
            IssueField::Reporter,
            self.reporter_id.clone().map(FieldValue::Text),
        );
        Ok(())
    }

    /// Set the reporter by user key. An unknown key clears the field.
    ///
    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    pub fn set_reporter_id(&mut self, reporter_key: Option<&str>) -> Result<()> {
        let user = match reporter_key {
            Some(key) => self.services.users.user_by_key(key)?,
            None => None,
        };
        self.set_reporter(user)
    }

    /// Set the security level.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the previous level fails.
    pub fn set_security_level(&mut self, level: Option<SecurityLevel>) -> Result<()> {
        let before = self.security_level()?.map(|l| l.name.clone());
        let after = level.as_ref().map(|l| l.name.clone());
        self.track_field(IssueField::SecurityLevel, before, after);

        self.security_level_id = level.as_ref().map(|l| l.id);
        self.security_level = OnceCell::with_value(level);
        self.write_through(
            IssueField::SecurityLevel,
            self.security_level_id.map(FieldValue::Int),
        );
        Ok(())
    }

    /// Set the security level by id.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownSecurityLevel`] when the id does not
    /// resolve to a known level.
    pub fn set_security_level_id(&mut self, level_id: Option<i64>) -> Result<()> {
        match level_id {
            None => self.set_security_level(None),
            Some(id) => {
                let level = self
                    .services
                    .security_levels
                    .level(id)?
                    .ok_or(DomainError::UnknownSecurityLevel { id })?;
                self.set_security_level(Some(level))
            }
        }
    }

    pub fn set_due_date(&mut self, due_date: Option<DateTime<Utc>>) {
        let before = self.due_date.map(|d| d.to_rfc3339());
        self.due_date = due_date;
        self.write_through(IssueField::DueDate, due_date.map(FieldValue::Timestamp));
        self.track_field(IssueField::DueDate, before, due_date.map(|d| d.to_rfc3339()));
    }

    pub fn set_created(&mut self, created: Option<DateTime<Utc>>) {
        self.created = created;
        self.write_through(IssueField::Created, created.map(FieldValue::Timestamp));
    }

    pub fn set_updated(&mut self, updated: Option<DateTime<Utc>>) {
        self.updated = updated;
        self.write_through(IssueField::Updated, updated.map(FieldValue::Timestamp));
    }

    pub fn set_resolution_date(&mut self, resolution_date: Option<DateTime<Utc>>) {
        self.resolution_date = resolution_date;
        self.write_through(
            IssueField::ResolutionDate,
            resolution_date.map(FieldValue::Timestamp),
        );
    }

    pub fn set_original_estimate(&mut self, original_estimate: Option<i64>) {
        let before = self.original_estimate.map(|v| v.to_string());
        self.original_estimate = original_estimate;
        self.write_through(
            IssueField::OriginalEstimate,
            original_estimate.map(FieldValue::Int),
        );
        self.track_field(
            IssueField::TimeTracking,
            before,
            original_estimate.map(|v| v.to_string()),
        );
    }

    pub fn set_remaining_estimate(&mut self, remaining_estimate: Option<i64>) {
        let before = self.remaining_estimate.map(|v| v.to_string());
        self.remaining_estimate = remaining_estimate;
        self.write_through(
            IssueField::RemainingEstimate,
            remaining_estimate.map(FieldValue::Int),
        );
        self.track_field(
            IssueField::TimeTracking,
            before,
            remaining_estimate.map(|v| v.to_string()),
        );
    }

    pub fn set_time_spent(&mut self, time_spent: Option<i64>) {
        self.time_spent = time_spent;
        self.write_through(IssueField::TimeSpent, time_spent.map(FieldValue::Int));
    }

    pub fn set_votes(&mut self, votes: Option<i64>) {
        self.votes = votes;
        self.write_through(IssueField::Votes, votes.map(FieldValue::Int));
    }

    pub fn set_watches(&mut self, watches: Option<i64>) {
        self.watches = watches;
        self.write_through(IssueField::Watches, watches.map(FieldValue::Int));
    }

    pub fn set_workflow_id(&mut self, workflow_id: Option<i64>) {
        self.workflow_id = workflow_id;
        self.write_through(IssueField::WorkflowId, workflow_id.map(FieldValue::Int));
    }

    /// Set the per-project sequence number, updating the derived key.
    ///
    /// # Errors
    ///
    /// Returns an error if the project lookup for key derivation fails.
    pub fn set_number(&mut self, number: Option<i64>) -> Result<()> {
        self.number = number;
        self.write_through(IssueField::Number, number.map(FieldValue::Int));
        self.refresh_key()
    }

    /// Set project and number from a display key.
    ///
    /// Clears both first; a `None` key leaves them cleared.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidKey`] for a malformed key and
    /// [`DomainError::UnknownProjectKey`] when no project matches.
    pub fn set_key(&mut self, key: Option<&str>) -> Result<()> {
        self.set_project(None)?;
        self.set_number(None)?;

        if let Some(raw) = key {
            let parsed = IssueKey::parse(raw)?;
            let project = self
                .services
                .projects
                .project_by_key(parsed.project_key())?
                .ok_or_else(|| DomainError::UnknownProjectKey {
                    key: parsed.project_key().to_string(),
                })?;
            self.set_project(Some(project))?;
            self.set_number(Some(parsed.number()))?;
        }
        Ok(())
    }

    /// Replace the component set.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the previous set for the diff fails.
    pub fn set_components(&mut self, components: Vec<Component>) -> Result<()> {
        let before = self.load_components()?;
        self.track_field(
            IssueField::Components,
            join_names(before.iter().map(|c| c.name.as_str())),
            join_names(components.iter().map(|c| c.name.as_str())),
        );
        self.components = OnceCell::with_value(components);
        Ok(())
    }

    /// Replace the affected-version set.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the previous set for the diff fails.
    pub fn set_affected_versions(&mut self, versions: Vec<Version>) -> Result<()> {
        let before = self.load_affected_versions()?;
        self.track_field(
            IssueField::AffectedVersions,
            join_names(before.iter().map(|v| v.name.as_str())),
            join_names(versions.iter().map(|v| v.name.as_str())),
        );
        self.affected_versions = OnceCell::with_value(versions);
        Ok(())
    }

    /// Replace the fix-version set.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the previous set for the diff fails.
    pub fn set_fix_versions(&mut self, versions: Vec<Version>) -> Result<()> {
        let before = self.load_fix_versions()?;
        self.track_field(
            IssueField::FixVersions,
            join_names(before.iter().map(|v| v.name.as_str())),
            join_names(versions.iter().map(|v| v.name.as_str())),
        );
        self.fix_versions = OnceCell::with_value(versions);
        Ok(())
    }

    /// Replace the label set. The diff renders both sides space-joined.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the previous set for the diff fails.
    pub fn set_labels(&mut self, labels: BTreeSet<String>) -> Result<()> {
        let before = self.load_labels()?;
        self.track_field(
            IssueField::Labels,
            join_labels(&before),
            join_labels(&labels),
        );
        self.labels = OnceCell::with_value(labels);
        Ok(())
    }

    // ========================================================================
    // Custom and external fields
    // ========================================================================

    /// Resolve a custom field value, memoized per field per instance.
    /// Unpersisted issues resolve the field's default instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the value provider fails.
    pub fn custom_field_value(&self, field: &CustomField) -> Result<Option<String>> {
        if let Some(cached) = self.custom_field_values.borrow().get(&field.id) {
            return Ok(cached.clone());
        }
        let value = match &self.record {
            Some(record) => self.services.custom_fields.value(field, record.id())?,
            None => self.services.custom_fields.default_value(field)?,
        };
        self.custom_field_values
            .borrow_mut()
            .insert(field.id, value.clone());
        Ok(value)
    }

    /// Set a custom field value, tracked like any built-in field.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the previous value fails.
    pub fn set_custom_field_value(
        &mut self,
        field: &CustomField,
        value: Option<String>,
    ) -> Result<()> {
        let before = self.custom_field_value(field)?;
        self.custom_field_values
            .borrow_mut()
            .insert(field.id, value.clone());
        self.track(field.field_id(), before, value);
        Ok(())
    }

    /// Value of an externally tracked field (e.g. attachments in flight).
    #[must_use]
    pub fn external_field_value(&self, field_id: &str) -> Option<&str> {
        self.external_fields
            .get(field_id)
            .and_then(|v| v.as_deref())
    }

    /// Record an external field value with no known previous value.
    pub fn set_external_field_value(&mut self, field_id: &str, value: Option<String>) {
        self.set_external_field_change(field_id, None, value);
    }

    /// Record an external field value with an explicit previous value.
    pub fn set_external_field_change(
        &mut self,
        field_id: &str,
        before: Option<String>,
        value: Option<String>,
    ) {
        self.external_fields
            .insert(field_id.to_string(), value.clone());
        self.track(field_id.to_string(), before, value);
    }

    // ========================================================================
    // Parent / subtask linkage
    // ========================================================================

    /// Set the parent issue id directly. `None` marks the issue as
    /// top-level and suppresses any later link discovery.
    pub fn set_parent_issue_id(&mut self, parent_id: Option<i64>) {
        *self.parent_memo.get_mut() = match parent_id {
            Some(id) => ParentMemo::Known(id),
            None => ParentMemo::NoParent,
        };
        self.parent_issue = OnceCell::new();
    }

    /// Attach an in-memory parent issue, so that subtask fields can read
    /// from a parent that changed in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnpersistedParent`] when the parent has no
    /// store id yet.
    pub fn attach_parent(&mut self, parent: Self) -> Result<()> {
        let Some(id) = parent.record.as_ref().map(IssueRecord::id) else {
            return Err(DomainError::UnpersistedParent);
        };
        *self.parent_memo.get_mut() = ParentMemo::Known(id);
        self.parent_issue = OnceCell::with_value(Some(Box::new(parent)));
        Ok(())
    }

    /// The parent issue, loaded once per instance (an attached in-memory
    /// parent takes precedence over a store load).
    ///
    /// # Errors
    ///
    /// Returns an error if link discovery or the record load fails.
    pub fn parent(&self) -> Result<Option<&Self>> {
        let parent_id = self.parent_issue_id()?;
        let cached = self
            .parent_issue
            .get_or_try_init(|| -> Result<Option<Box<Self>>> {
                let Some(id) = parent_id else {
                    return Ok(None);
                };
                let Some(record) = self.services.store.issue_record(id)? else {
                    return Ok(None);
                };
                Ok(Some(Box::new(Self::bound(self.services.clone(), record)?)))
            })?;
        Ok(cached.as_deref())
    }

    /// Ids of this issue's subtasks; empty until persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the link lookup fails.
    pub fn subtask_ids(&self) -> Result<Vec<i64>> {
        match &self.record {
            Some(record) => self.services.subtask_links.subtask_ids(record.id()),
            None => Ok(Vec::new()),
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Persist this issue.
    ///
    /// An unbound issue is inserted — acquiring a creator (authenticated
    /// user, else reporter, else none) — and re-hydrated from the created
    /// record; a bound issue is updated in place. The modified-fields map
    /// is left for the caller to consume and reset.
    ///
    /// # Errors
    ///
    /// Returns a data-access error when the underlying store fails.
    pub fn store(&mut self) -> Result<()> {
        if let Some(record) = &self.record {
            self.services.store.update_issue(record)?;
            tracing::debug!(issue_id = record.id(), "updated issue record");
            return Ok(());
        }

        self.creator_id = self.services.auth.current_user_key();
        if self.creator_id.is_none() && self.reporter_id.is_some() {
            // Anonymous contexts fall back to the reporter as creator.
            self.creator_id = self.reporter_id.clone();
        }
        self.creator = OnceCell::new();

        let fields = self.persisted_fields();
        let record = self.services.store.create_issue(&fields)?;
        tracing::debug!(issue_id = record.id(), key = self.key.as_deref(), "created issue record");
        self.hydrate(&record);
        self.record = Some(record);
        self.refresh_key()
    }

    fn persisted_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.set_int(IssueField::Project, self.project_id);
        fields.set_text(IssueField::IssueType, self.issue_type_id.as_deref());
        fields.set_text(IssueField::Summary, self.summary.as_deref());
        fields.set_text(IssueField::Description, self.description.as_deref());
        fields.set_text(IssueField::Environment, self.environment.as_deref());
        fields.set_text(IssueField::Assignee, self.assignee_id.as_deref());
        fields.set_text(IssueField::Reporter, self.reporter_id.as_deref());
        fields.set_text(IssueField::Creator, self.creator_id.as_deref());
        fields.set_timestamp(IssueField::DueDate, self.due_date);
        fields.set_int(IssueField::SecurityLevel, self.security_level_id);
        fields.set_text(IssueField::Priority, self.priority_id.as_deref());
        fields.set_text(IssueField::Status, self.status_id.as_deref());
        fields.set_text(IssueField::Resolution, self.resolution_id.as_deref());
        fields.set_timestamp(IssueField::Created, self.created);
        fields.set_timestamp(IssueField::Updated, self.updated);
        fields.set_timestamp(IssueField::ResolutionDate, self.resolution_date);
        fields.set_int(IssueField::OriginalEstimate, self.original_estimate);
        fields.set_int(IssueField::RemainingEstimate, self.remaining_estimate);
        fields.set_int(IssueField::TimeSpent, self.time_spent);
        fields.set_int(IssueField::Votes, self.votes);
        fields.set_int(IssueField::Watches, self.watches);
        fields.set_int(IssueField::Number, self.number);
        fields.set_int(IssueField::WorkflowId, self.workflow_id);
        fields
    }

    /// Raw typed access to a backing-record field.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotPersisted`] on an unbound issue.
    pub fn field_value(&self, field: IssueField) -> Result<Option<FieldValue>> {
        self.record.as_ref().map_or_else(
            || Err(DomainError::not_persisted(field.as_str())),
            |record| Ok(record.get(field).cloned()),
        )
    }

    // ========================================================================
    // Change tracking
    // ========================================================================

    /// The accumulated before/after map, keyed by field identifier.
    #[must_use]
    pub const fn modified_fields(&self) -> &BTreeMap<String, ModifiedValue> {
        &self.modified_fields
    }

    /// Clear the change map and the externally tracked values with it.
    pub fn reset_modified_fields(&mut self) {
        self.modified_fields.clear();
        self.external_fields.clear();
    }

    fn track_field(&mut self, field: IssueField, before: Option<String>, after: Option<String>) {
        self.track(field.as_str().to_string(), before, after);
    }

    fn track(&mut self, field_id: String, before: Option<String>, after: Option<String>) {
        self.modified_fields
            .insert(field_id, ModifiedValue { before, after });
    }

    fn write_through(&mut self, field: IssueField, value: Option<FieldValue>) {
        if let Some(record) = &mut self.record {
            record.set(field, value);
        }
    }

    // The key is never stored on its own; it is recomputed whenever
    // project or number may have changed.
    fn refresh_key(&mut self) -> Result<()> {
        let key = match (self.project()?, self.number) {
            (Some(project), Some(number)) => Some(IssueKey::format(project, number)),
            _ => None,
        };
        self.key = key;
        Ok(())
    }
}

fn text_value(value: Option<&str>) -> Option<FieldValue> {
    value.map(|s| FieldValue::Text(s.to_string()))
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = names.collect::<Vec<_>>().join(", ");
    (!joined.is_empty()).then_some(joined)
}

fn join_labels(labels: &BTreeSet<String>) -> Option<String> {
    let joined = labels.iter().cloned().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

impl IssueView for Issue {
    fn id(&self) -> Option<i64> {
        self.record.as_ref().map(IssueRecord::id)
    }

    fn key(&self) -> Option<String> {
        self.key.clone()
    }

    fn project_id(&self) -> Option<i64> {
        self.project_id
    }

    fn number(&self) -> Option<i64> {
        self.number
    }

    fn issue_type_id(&self) -> Option<String> {
        self.issue_type_id.clone()
    }

    fn summary(&self) -> Option<String> {
        self.summary.clone()
    }

    fn description(&self) -> Option<String> {
        self.description.clone()
    }

    fn environment(&self) -> Option<String> {
        self.environment.clone()
    }

    fn assignee_id(&self) -> Option<String> {
        self.assignee_id.clone()
    }

    fn reporter_id(&self) -> Option<String> {
        self.reporter_id.clone()
    }

    fn creator_id(&self) -> Option<String> {
        self.creator_id.clone()
    }

    fn priority_id(&self) -> Option<String> {
        self.priority_id.clone()
    }

    fn status_id(&self) -> Option<String> {
        self.status_id.clone()
    }

    fn resolution_id(&self) -> Option<String> {
        self.resolution_id.clone()
    }

    fn security_level_id(&self) -> Option<i64> {
        self.security_level_id
    }

    fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    fn resolution_date(&self) -> Option<DateTime<Utc>> {
        self.resolution_date
    }

    fn votes(&self) -> Option<i64> {
        self.votes
    }

    fn watches(&self) -> Option<i64> {
        self.watches
    }

    fn original_estimate(&self) -> Option<i64> {
        self.original_estimate
    }

    fn remaining_estimate(&self) -> Option<i64> {
        self.remaining_estimate
    }

    fn time_spent(&self) -> Option<i64> {
        self.time_spent
    }

    fn workflow_id(&self) -> Option<i64> {
        self.workflow_id
    }

    fn labels(&self) -> Result<BTreeSet<String>> {
        self.load_labels()
    }

    fn affected_versions(&self) -> Result<Vec<Version>> {
        self.load_affected_versions()
    }

    fn fix_versions(&self) -> Result<Vec<Version>> {
        self.load_fix_versions()
    }

    fn components(&self) -> Result<Vec<Component>> {
        self.load_components()
    }

    fn parent_issue_id(&self) -> Result<Option<i64>> {
        {
            let memo = self.parent_memo.borrow();
            match *memo {
                ParentMemo::Known(id) => return Ok(Some(id)),
                ParentMemo::NoParent => return Ok(None),
                ParentMemo::Unresolved => {}
            }
        }

        let discovered = match &self.record {
            Some(record) => self.services.subtask_links.parent_issue_id(record.id())?,
            None => None,
        };
        *self.parent_memo.borrow_mut() = match discovered {
            Some(id) => ParentMemo::Known(id),
            None => ParentMemo::NoParent,
        };
        Ok(discovered)
    }
}

/// Two issues are the same issue iff both have keys and the keys match.
/// A key-less issue equals only itself.
impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match (&self.key, &other.key) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Issue {}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.key, &self.summary) {
            (Some(key), _) => write!(f, "{key}"),
            (None, Some(summary)) => write!(f, "{summary}"),
            (None, None) => Ok(()),
        }
    }
}

impl fmt::Debug for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Issue")
            .field("id", &self.record.as_ref().map(IssueRecord::id))
            .field("key", &self.key)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::testkit::TestWorld;

    #[test]
    fn key_undefined_until_project_and_number() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());

        issue.set_project_id(Some(10000)).unwrap();
        assert_eq!(issue.key(), None);

        issue.set_number(Some(7)).unwrap();
        assert_eq!(issue.key(), Some("ABC-7".to_string()));
    }

    #[test]
    fn set_key_resolves_project_and_number() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());

        issue.set_key(Some("ABC-42")).unwrap();
        assert_eq!(issue.project_id(), Some(10000));
        assert_eq!(issue.number(), Some(42));
        assert_eq!(issue.key(), Some("ABC-42".to_string()));

        let err = issue.set_key(Some("NOPE-1")).unwrap_err();
        assert!(matches!(err, DomainError::UnknownProjectKey { .. }));
    }

    #[test]
    fn unknown_project_id_rejected() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());
        let err = issue.set_project_id(Some(99999)).unwrap_err();
        assert!(matches!(err, DomainError::UnknownProject { id: 99999 }));
    }

    #[test]
    fn unknown_security_level_rejected() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());
        let err = issue.set_security_level_id(Some(404)).unwrap_err();
        assert!(matches!(err, DomainError::UnknownSecurityLevel { id: 404 }));
    }

    #[test]
    fn equality_requires_matching_keys() {
        let world = TestWorld::with_fixtures();
        let mut a = Issue::unbound(world.services());
        a.set_key(Some("ABC-1")).unwrap();
        let mut b = Issue::unbound(world.services());
        b.set_key(Some("ABC-1")).unwrap();
        let mut c = Issue::unbound(world.services());
        c.set_key(Some("ABC-2")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);

        // key-less issues equal only themselves
        let blank_x = Issue::unbound(world.services());
        let blank_y = Issue::unbound(world.services());
        assert_ne!(blank_x, blank_y);
        assert_eq!(blank_x, blank_x);
        assert_ne!(blank_x, a);
    }

    #[test]
    fn resolution_date_coupling() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());

        assert_eq!(issue.resolution_date(), None);

        issue.set_resolution_id(Some("fixed")).unwrap();
        let stamped = issue.resolution_date().expect("date stamped");

        // same resolution again: date untouched
        issue.set_resolution_id(Some("fixed")).unwrap();
        assert_eq!(issue.resolution_date(), Some(stamped));

        // different resolution: date re-stamped
        issue.set_resolution_id(Some("wont_fix")).unwrap();
        let restamped = issue.resolution_date().expect("date re-stamped");
        assert!(restamped >= stamped);

        // clearing the resolution clears the date
        issue.set_resolution(None).unwrap();
        assert_eq!(issue.resolution_id(), None);
        assert_eq!(issue.resolution_date(), None);
    }

    #[test]
    fn resolution_same_id_stamps_when_date_unset() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());

        issue.set_resolution_id(Some("fixed")).unwrap();
        issue.set_resolution_date(None);

        issue.set_resolution_id(Some("fixed")).unwrap();
        assert!(issue.resolution_date().is_some());
    }

    #[test]
    fn collection_getters_hand_out_independent_copies() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());
        issue
            .set_labels(["alpha".to_string(), "beta".to_string()].into())
            .unwrap();

        let mut first = issue.labels().unwrap();
        first.insert("mutated".to_string());
        let second = issue.labels().unwrap();

        assert_eq!(second.len(), 2);
        assert!(!second.contains("mutated"));
    }

    #[test]
    fn modified_fields_capture_before_and_after() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());

        issue.set_summary(Some("first"));
        issue.set_summary(Some("second"));

        let modified = issue.modified_fields();
        let entry = &modified["summary"];
        assert_eq!(entry.before.as_deref(), Some("first"));
        assert_eq!(entry.after.as_deref(), Some("second"));
    }

    #[test]
    fn reset_clears_modified_and_external_fields() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());

        issue.set_summary(Some("tracked"));
        issue.set_external_field_value("attachment", Some("screenshot.png".to_string()));
        assert_eq!(issue.modified_fields().len(), 2);
        assert_eq!(issue.external_field_value("attachment"), Some("screenshot.png"));

        issue.reset_modified_fields();
        assert!(issue.modified_fields().is_empty());
        assert_eq!(issue.external_field_value("attachment"), None);
    }

    #[test]
    fn store_transitions_unbound_to_bound() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());
        issue.set_project_id(Some(10000)).unwrap();
        issue.set_number(Some(1)).unwrap();
        issue.set_summary(Some("first store"));

        assert_eq!(issue.id(), None);
        issue.store().unwrap();
        let id = issue.id().expect("bound after store");

        // second store updates in place
        issue.set_summary(Some("edited"));
        issue.store().unwrap();
        assert_eq!(issue.id(), Some(id));

        let stored = world.stored_record(id).expect("record persisted");
        assert_eq!(stored.text(IssueField::Summary), Some("edited"));
    }

    #[test]
    fn store_assigns_creator_from_auth_context() {
        let world = TestWorld::with_fixtures().signed_in_as("admin-key");
        let mut issue = Issue::unbound(world.services());
        issue.set_reporter_id(Some("bob-key")).unwrap();
        issue.store().unwrap();
        assert_eq!(issue.creator_id(), Some("admin-key".to_string()));
    }

    #[test]
    fn store_creator_falls_back_to_reporter() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());
        issue.set_reporter_id(Some("bob-key")).unwrap();
        issue.store().unwrap();
        assert_eq!(issue.creator_id(), Some("bob-key".to_string()));

        let mut anonymous = Issue::unbound(world.services());
        anonymous.store().unwrap();
        assert_eq!(anonymous.creator_id(), None);
    }

    #[test]
    fn votes_default_to_zero_on_hydration() {
        let world = TestWorld::with_fixtures();
        // A record with no stored vote count, as legacy rows have.
        let record = world.insert_record(|fields| {
            fields.set_text(IssueField::Summary, Some("legacy row"));
        });

        let issue = Issue::bound(world.services(), record).unwrap();
        assert_eq!(issue.votes(), Some(0));
        // a blank unbound issue has no vote count at all
        let blank = Issue::unbound(world.services());
        assert_eq!(blank.votes(), None);
    }

    #[test]
    fn field_value_requires_persistence() {
        let world = TestWorld::with_fixtures();
        let issue = Issue::unbound(world.services());
        let err = issue.field_value(IssueField::Summary).unwrap_err();
        assert!(matches!(err, DomainError::NotPersisted { .. }));
    }

    #[test]
    fn parent_discovery_memoizes_negative_result() {
        let world = TestWorld::with_fixtures();
        let record = world.insert_record(|fields| {
            fields.set_text(IssueField::Summary, Some("top level"));
        });
        let issue = Issue::bound(world.services(), record).unwrap();

        assert_eq!(issue.parent_issue_id().unwrap(), None);
        assert_eq!(issue.parent_issue_id().unwrap(), None);
        assert_eq!(world.parent_lookups(), 1);
        assert!(!issue.is_subtask().unwrap());
    }

    #[test]
    fn parent_discovered_through_link_lookup() {
        let world = TestWorld::with_fixtures();
        let parent = world.insert_record(|fields| {
            fields.set_text(IssueField::Summary, Some("parent"));
        });
        let child = world.insert_record(|fields| {
            fields.set_text(IssueField::Summary, Some("child"));
        });
        world.link_parent(child.id(), parent.id());

        let issue = Issue::bound(world.services(), child).unwrap();
        assert_eq!(issue.parent_issue_id().unwrap(), Some(parent.id()));
        assert!(issue.is_subtask().unwrap());
        let loaded = issue.parent().unwrap().expect("parent loads");
        assert_eq!(loaded.summary(), Some("parent".to_string()));
    }

    #[test]
    fn attach_parent_requires_persisted_parent() {
        let world = TestWorld::with_fixtures();
        let mut child = Issue::unbound(world.services());
        let unpersisted = Issue::unbound(world.services());

        let err = child.attach_parent(unpersisted).unwrap_err();
        assert!(matches!(err, DomainError::UnpersistedParent));
    }

    #[test]
    fn clone_without_parent_suppresses_link_lookup() {
        let world = TestWorld::with_fixtures();
        let parent = world.insert_record(|fields| {
            fields.set_text(IssueField::Summary, Some("parent"));
        });
        let child = world.insert_record(|fields| {
            fields.set_text(IssueField::Summary, Some("child"));
        });
        world.link_parent(child.id(), parent.id());
        let source = Issue::bound(world.services(), child).unwrap();

        let detached = Issue::cloned_from(world.services(), &source, false).unwrap();
        assert!(!detached.is_persisted());
        assert_eq!(detached.parent_issue_id().unwrap(), None);

        let retained = Issue::cloned_from(world.services(), &source, true).unwrap();
        assert_eq!(retained.parent_issue_id().unwrap(), Some(parent.id()));
    }

    #[test]
    fn custom_field_values_memoize_and_default() {
        let world = TestWorld::with_fixtures();
        let field = CustomField {
            id: 10001,
            name: "Story Points".to_string(),
        };
        world.set_custom_field_default(10001, "3");

        let issue = Issue::unbound(world.services());
        assert_eq!(issue.custom_field_value(&field).unwrap(), Some("3".to_string()));
        assert_eq!(issue.custom_field_value(&field).unwrap(), Some("3".to_string()));
        assert_eq!(world.custom_field_lookups(), 1);
    }

    #[test]
    fn display_prefers_key_over_summary() {
        let world = TestWorld::with_fixtures();
        let mut issue = Issue::unbound(world.services());
        issue.set_summary(Some("a summary"));
        assert_eq!(issue.to_string(), "a summary");

        issue.set_key(Some("ABC-9")).unwrap();
        assert_eq!(issue.to_string(), "ABC-9");
    }
}
