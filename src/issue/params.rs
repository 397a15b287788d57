//! Form-shaped issue input: field identifier to string values.
//!
//! Create/edit validation consumes this transport structure instead of
//! the entity itself. Values arrive as they would from a form submit;
//! typed setters exist for the common fields. Time-tracking input
//! depends on the application's legacy flag: legacy mode keeps one
//! combined estimate field, modern mode keeps original and remaining
//! estimates as separate sub-fields plus a marker naming the targeted
//! sub-field.

use crate::config::ApplicationProperties;
use crate::issue::fields::IssueField;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Sub-field holding the original estimate in modern time tracking.
pub const TIMETRACKING_ORIGINAL_ESTIMATE: &str = "timetracking_originalestimate";
/// Sub-field holding the remaining estimate in modern time tracking.
pub const TIMETRACKING_REMAINING_ESTIMATE: &str = "timetracking_remainingestimate";
/// Marker naming which time-tracking sub-field a submit targeted.
pub const TIMETRACKING_TARGET_SUB_FIELD: &str = "timetracking_targetsubfield";
/// Field id carrying the comment body.
pub const COMMENT: &str = "comment";

/// A bag of named string-array parameters driving create/edit validation.
#[derive(Debug, Clone)]
pub struct IssueInputParameters {
    properties: Arc<ApplicationProperties>,
    parameters: BTreeMap<String, Vec<String>>,
    provided_fields: Option<BTreeSet<String>>,
    retain_existing_values_when_parameter_not_provided: bool,
    apply_default_values_when_parameter_not_provided: bool,
    skip_screen_check: bool,
}

impl IssueInputParameters {
    #[must_use]
    pub fn new(properties: Arc<ApplicationProperties>) -> Self {
        Self {
            properties,
            parameters: BTreeMap::new(),
            provided_fields: None,
            retain_existing_values_when_parameter_not_provided: true,
            apply_default_values_when_parameter_not_provided: false,
            skip_screen_check: false,
        }
    }

    /// Seed from raw web-style parameters (a form submit).
    #[must_use]
    pub fn from_parameters(
        properties: Arc<ApplicationProperties>,
        parameters: BTreeMap<String, Vec<String>>,
    ) -> Self {
        let mut input = Self::new(properties);
        input.parameters = parameters;
        input
    }

    // ------------------------------------------------------------------
    // Raw access
    // ------------------------------------------------------------------

    /// Set a raw parameter; `None` records an explicit empty value.
    pub fn set_parameter(&mut self, field_id: &str, values: Option<Vec<String>>) {
        self.parameters
            .insert(field_id.to_string(), values.unwrap_or_default());
    }

    /// All values of a parameter, `None` when never set.
    #[must_use]
    pub fn values(&self, field_id: &str) -> Option<&[String]> {
        self.parameters.get(field_id).map(Vec::as_slice)
    }

    /// First value of a parameter, skipping empty markers.
    #[must_use]
    pub fn first_value(&self, field_id: &str) -> Option<&str> {
        self.parameters
            .get(field_id)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// First value parsed as an id.
    #[must_use]
    pub fn first_id(&self, field_id: &str) -> Option<i64> {
        self.first_value(field_id)?.parse().ok()
    }

    /// A parameter is empty when it was never set, holds no values, or
    /// holds a single empty-string element (a cleared form input).
    #[must_use]
    pub fn is_empty_value(&self, field_id: &str) -> bool {
        match self.parameters.get(field_id) {
            None => true,
            Some(values) => {
                values.is_empty() || (values.len() == 1 && values[0].is_empty())
            }
        }
    }

    /// Whether a field appears in this input at all.
    #[must_use]
    pub fn is_field_present(&self, field_id: &str) -> bool {
        self.parameters.contains_key(field_id)
    }

    // ------------------------------------------------------------------
    // Typed setters for the common fields
    // ------------------------------------------------------------------

    pub fn set_project_id(&mut self, project_id: i64) -> &mut Self {
        self.put_single(IssueField::Project.as_str(), &project_id.to_string())
    }

    #[must_use]
    pub fn project_id(&self) -> Option<i64> {
        self.first_id(IssueField::Project.as_str())
    }

    pub fn set_issue_type_id(&mut self, issue_type_id: &str) -> &mut Self {
        self.put_single(IssueField::IssueType.as_str(), issue_type_id)
    }

    #[must_use]
    pub fn issue_type_id(&self) -> Option<&str> {
        self.first_value(IssueField::IssueType.as_str())
    }

    pub fn set_summary(&mut self, summary: &str) -> &mut Self {
        self.put_single(IssueField::Summary.as_str(), summary)
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.first_value(IssueField::Summary.as_str())
    }

    pub fn set_description(&mut self, description: &str) -> &mut Self {
        self.put_single(IssueField::Description.as_str(), description)
    }

    pub fn set_environment(&mut self, environment: &str) -> &mut Self {
        self.put_single(IssueField::Environment.as_str(), environment)
    }

    pub fn set_assignee_id(&mut self, assignee_key: &str) -> &mut Self {
        self.put_single(IssueField::Assignee.as_str(), assignee_key)
    }

    #[must_use]
    pub fn assignee_id(&self) -> Option<&str> {
        self.first_value(IssueField::Assignee.as_str())
    }

    pub fn set_reporter_id(&mut self, reporter_key: &str) -> &mut Self {
        self.put_single(IssueField::Reporter.as_str(), reporter_key)
    }

    pub fn set_priority_id(&mut self, priority_id: &str) -> &mut Self {
        self.put_single(IssueField::Priority.as_str(), priority_id)
    }

    pub fn set_resolution_id(&mut self, resolution_id: &str) -> &mut Self {
        self.put_single(IssueField::Resolution.as_str(), resolution_id)
    }

    pub fn set_status_id(&mut self, status_id: &str) -> &mut Self {
        self.put_single(IssueField::Status.as_str(), status_id)
    }

    pub fn set_security_level_id(&mut self, level_id: i64) -> &mut Self {
        self.put_single(IssueField::SecurityLevel.as_str(), &level_id.to_string())
    }

    pub fn set_due_date(&mut self, due_date: &str) -> &mut Self {
        self.put_single(IssueField::DueDate.as_str(), due_date)
    }

    pub fn set_fix_version_ids(&mut self, ids: &[i64]) -> &mut Self {
        self.put_ids(IssueField::FixVersions.as_str(), ids)
    }

    pub fn set_affected_version_ids(&mut self, ids: &[i64]) -> &mut Self {
        self.put_ids(IssueField::AffectedVersions.as_str(), ids)
    }

    pub fn set_component_ids(&mut self, ids: &[i64]) -> &mut Self {
        self.put_ids(IssueField::Components.as_str(), ids)
    }

    pub fn set_comment(&mut self, comment: &str) -> &mut Self {
        self.put_single(COMMENT, comment)
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.first_value(COMMENT)
    }

    /// Values submitted for a custom field, by its numeric id.
    #[must_use]
    pub fn custom_field_value(&self, custom_field_id: i64) -> Option<&[String]> {
        self.values(&format!("customfield_{custom_field_id}"))
    }

    pub fn set_custom_field_value(&mut self, custom_field_id: i64, values: Vec<String>) -> &mut Self {
        self.parameters
            .insert(format!("customfield_{custom_field_id}"), values);
        self
    }

    // ------------------------------------------------------------------
    // Time tracking
    // ------------------------------------------------------------------

    /// Record the original estimate. Legacy mode has a single combined
    /// estimate field; modern mode targets the original-estimate
    /// sub-field and clears the other.
    pub fn set_original_estimate(&mut self, estimate: &str) -> &mut Self {
        if self.properties.legacy_time_tracking {
            self.put_single(IssueField::TimeTracking.as_str(), estimate);
        } else {
            self.put_single(TIMETRACKING_TARGET_SUB_FIELD, TIMETRACKING_ORIGINAL_ESTIMATE);
            self.put_single(TIMETRACKING_ORIGINAL_ESTIMATE, estimate);
            self.parameters
                .remove(TIMETRACKING_REMAINING_ESTIMATE);
            // Placeholder so the system field registers as present.
            self.parameters
                .insert(IssueField::TimeTracking.as_str().to_string(), Vec::new());
        }
        self
    }

    /// Record the remaining estimate; the legacy/modern split mirrors
    /// [`Self::set_original_estimate`].
    pub fn set_remaining_estimate(&mut self, estimate: &str) -> &mut Self {
        if self.properties.legacy_time_tracking {
            self.put_single(IssueField::TimeTracking.as_str(), estimate);
        } else {
            self.put_single(TIMETRACKING_TARGET_SUB_FIELD, TIMETRACKING_REMAINING_ESTIMATE);
            self.put_single(TIMETRACKING_REMAINING_ESTIMATE, estimate);
            self.parameters.remove(TIMETRACKING_ORIGINAL_ESTIMATE);
            self.parameters
                .insert(IssueField::TimeTracking.as_str().to_string(), Vec::new());
        }
        self
    }

    /// Record both estimates at once. The combined legacy field cannot
    /// hold two values, so this is a no-op in legacy mode.
    pub fn set_original_and_remaining_estimate(
        &mut self,
        original: &str,
        remaining: &str,
    ) -> &mut Self {
        if self.properties.legacy_time_tracking {
            return self;
        }
        self.put_single(TIMETRACKING_ORIGINAL_ESTIMATE, original);
        self.put_single(TIMETRACKING_REMAINING_ESTIMATE, remaining);
        self.parameters
            .insert(IssueField::TimeTracking.as_str().to_string(), Vec::new());
        self
    }

    #[must_use]
    pub fn original_estimate(&self) -> Option<&str> {
        if self.properties.legacy_time_tracking {
            self.first_value(IssueField::TimeTracking.as_str())
        } else {
            self.first_value(TIMETRACKING_ORIGINAL_ESTIMATE)
        }
    }

    #[must_use]
    pub fn remaining_estimate(&self) -> Option<&str> {
        if self.properties.legacy_time_tracking {
            self.first_value(IssueField::TimeTracking.as_str())
        } else {
            self.first_value(TIMETRACKING_REMAINING_ESTIMATE)
        }
    }

    // ------------------------------------------------------------------
    // Validation scoping
    // ------------------------------------------------------------------

    /// Fields the caller declares as provided, overriding detection from
    /// the parameter map; `None` means "derive from the map".
    #[must_use]
    pub const fn provided_fields(&self) -> Option<&BTreeSet<String>> {
        self.provided_fields.as_ref()
    }

    pub fn set_provided_fields(&mut self, fields: BTreeSet<String>) {
        self.provided_fields = Some(fields);
    }

    #[must_use]
    pub const fn retain_existing_values_when_parameter_not_provided(&self) -> bool {
        self.retain_existing_values_when_parameter_not_provided
    }

    pub fn set_retain_existing_values_when_parameter_not_provided(&mut self, retain: bool) {
        self.retain_existing_values_when_parameter_not_provided = retain;
    }

    #[must_use]
    pub const fn apply_default_values_when_parameter_not_provided(&self) -> bool {
        self.apply_default_values_when_parameter_not_provided
    }

    pub fn set_apply_default_values_when_parameter_not_provided(&mut self, apply: bool) {
        self.apply_default_values_when_parameter_not_provided = apply;
    }

    #[must_use]
    pub const fn skip_screen_check(&self) -> bool {
        self.skip_screen_check
    }

    pub fn set_skip_screen_check(&mut self, skip: bool) {
        self.skip_screen_check = skip;
    }

    fn put_single(&mut self, field_id: &str, value: &str) -> &mut Self {
        self.parameters
            .insert(field_id.to_string(), vec![value.to_string()]);
        self
    }

    fn put_ids(&mut self, field_id: &str, ids: &[i64]) -> &mut Self {
        self.parameters.insert(
            field_id.to_string(),
            ids.iter().map(ToString::to_string).collect(),
        );
        self
    }
}
