//! Issue constants: status, priority, resolution, issue type.
//!
//! A constant is a named, ordered, icon-bearing classification value with
//! locale-translated display text. Translations are cached per locale and
//! invalidated one locale at a time when a translation is set or deleted.

use crate::config::ApplicationProperties;
use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The four constant families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantKind {
    Status,
    Priority,
    Resolution,
    IssueType,
}

impl ConstantKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Priority => "priority",
            Self::Resolution => "resolution",
            Self::IssueType => "issue_type",
        }
    }
}

impl fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConstantKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "status" => Ok(Self::Status),
            "priority" => Ok(Self::Priority),
            "resolution" => Ok(Self::Resolution),
            "issue_type" => Ok(Self::IssueType),
            other => Err(DomainError::FieldNotApplicable {
                field: other.to_string(),
                expected: "constant kind",
            }),
        }
    }
}

/// A locale-specific name/description pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Translation {
    pub name: String,
    pub description: Option<String>,
}

/// Persistence seam for constant translations.
pub trait TranslationStore {
    /// Stored translation for a constant in a locale, if any.
    fn translation(&self, kind: ConstantKind, id: &str, locale: &str)
    -> Result<Option<Translation>>;

    /// Store a translation for a constant in a locale.
    fn set_translation(
        &self,
        kind: ConstantKind,
        id: &str,
        locale: &str,
        translation: &Translation,
    ) -> Result<()>;

    /// Remove a translation for a constant in a locale.
    fn delete_translation(&self, kind: ConstantKind, id: &str, locale: &str) -> Result<()>;
}

/// Localized-string seam used by synthetic text constants.
pub trait Localizer {
    /// Resolve a message key in a locale, `None` when the bundle lacks it.
    fn text(&self, message_key: &str, locale: &str) -> Option<String>;
}

/// The persisted fields of a constant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstantRecord {
    pub id: String,
    pub kind: ConstantKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Icon path, server-relative or absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    /// Position among siblings of the same kind; drives ordering.
    pub sequence: i64,
}

/// A status/priority/resolution/type value with translated display text.
///
/// Not `Sync`: the translation cache is instance-local and unsynchronized.
/// Correct concurrent behavior relies on instances being dropped and
/// rebuilt when constants change elsewhere in the system.
pub struct IssueConstant {
    record: ConstantRecord,
    properties: Arc<ApplicationProperties>,
    translations: Arc<dyn TranslationStore>,
    // locale -> cached translation; one entry invalidated per mutation
    cache: RefCell<HashMap<String, Option<Translation>>>,
}

impl IssueConstant {
    #[must_use]
    pub fn new(
        record: ConstantRecord,
        properties: Arc<ApplicationProperties>,
        translations: Arc<dyn TranslationStore>,
    ) -> Self {
        Self {
            record,
            properties,
            translations,
            cache: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    #[must_use]
    pub const fn kind(&self) -> ConstantKind {
        self.record.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.record.name = name.into();
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.record.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.record.description = description;
    }

    /// Icon URL, absolutized against the configured base URL.
    #[must_use]
    pub fn icon_url(&self) -> Option<String> {
        self.record
            .icon_path
            .as_deref()
            .map(|path| self.properties.absolute_icon_url(path))
    }

    pub fn set_icon_path(&mut self, icon_path: Option<String>) {
        self.record.icon_path = icon_path;
    }

    #[must_use]
    pub const fn sequence(&self) -> i64 {
        self.record.sequence
    }

    pub fn set_sequence(&mut self, sequence: i64) {
        self.record.sequence = sequence;
    }

    /// Name translated for `locale`, falling back to the base name.
    ///
    /// # Errors
    ///
    /// Returns an error if the translation store fails.
    pub fn translated_name(&self, locale: &str) -> Result<String> {
        Ok(self
            .cached_translation(locale)?
            .map_or_else(|| self.record.name.clone(), |t| t.name))
    }

    /// Description translated for `locale`, falling back to the base text.
    ///
    /// # Errors
    ///
    /// Returns an error if the translation store fails.
    pub fn translated_description(&self, locale: &str) -> Result<Option<String>> {
        Ok(self
            .cached_translation(locale)?
            .map_or_else(|| self.record.description.clone(), |t| t.description))
    }

    /// Store a translation and invalidate that locale's cached entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the translation store fails.
    pub fn set_translation(&self, locale: &str, translation: &Translation) -> Result<()> {
        self.translations
            .set_translation(self.record.kind, &self.record.id, locale, translation)?;
        self.cache.borrow_mut().remove(locale);
        Ok(())
    }

    /// Delete a translation and invalidate that locale's cached entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the translation store fails.
    pub fn delete_translation(&self, locale: &str) -> Result<()> {
        self.translations
            .delete_translation(self.record.kind, &self.record.id, locale)?;
        self.cache.borrow_mut().remove(locale);
        Ok(())
    }

    // Compute-on-miss lookup; the negative result is cached too.
    fn cached_translation(&self, locale: &str) -> Result<Option<Translation>> {
        if let Some(cached) = self.cache.borrow().get(locale) {
            return Ok(cached.clone());
        }
        let fetched =
            self.translations
                .translation(self.record.kind, &self.record.id, locale)?;
        self.cache
            .borrow_mut()
            .insert(locale.to_string(), fetched.clone());
        Ok(fetched)
    }
}

impl fmt::Debug for IssueConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueConstant")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl PartialEq for IssueConstant {
    fn eq(&self, other: &Self) -> bool {
        self.record.kind == other.record.kind && self.record.id == other.record.id
    }
}

impl Eq for IssueConstant {}

impl Ord for IssueConstant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.record
            .sequence
            .cmp(&other.record.sequence)
            .then_with(|| self.record.id.cmp(&other.record.id))
    }
}

impl PartialOrd for IssueConstant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A synthetic, non-persisted constant resolving text via a [`Localizer`].
///
/// Used for placeholder values such as "no priority set". Accessors work;
/// every mutator fails with [`DomainError::ReadOnlyConstant`].
pub struct TextConstant {
    id: String,
    kind: ConstantKind,
    name_key: String,
    description_key: Option<String>,
    localizer: Arc<dyn Localizer>,
}

impl TextConstant {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: ConstantKind,
        name_key: impl Into<String>,
        description_key: Option<String>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name_key: name_key.into(),
            description_key,
            localizer,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn kind(&self) -> ConstantKind {
        self.kind
    }

    /// Resolve the display name for a locale; the message key itself is
    /// the last-resort fallback.
    #[must_use]
    pub fn name(&self, locale: &str) -> String {
        self.localizer
            .text(&self.name_key, locale)
            .unwrap_or_else(|| self.name_key.clone())
    }

    #[must_use]
    pub fn description(&self, locale: &str) -> Option<String> {
        self.description_key
            .as_deref()
            .and_then(|k| self.localizer.text(k, locale))
    }

    /// Always fails: text constants carry no persisted name.
    ///
    /// # Errors
    ///
    /// Always returns [`DomainError::ReadOnlyConstant`].
    pub fn set_name(&mut self, _name: &str) -> Result<()> {
        Err(DomainError::ReadOnlyConstant { field: "name" })
    }

    /// Always fails: text constants carry no persisted description.
    ///
    /// # Errors
    ///
    /// Always returns [`DomainError::ReadOnlyConstant`].
    pub fn set_description(&mut self, _description: Option<&str>) -> Result<()> {
        Err(DomainError::ReadOnlyConstant {
            field: "description",
        })
    }

    /// Always fails: text constants carry no icon.
    ///
    /// # Errors
    ///
    /// Always returns [`DomainError::ReadOnlyConstant`].
    pub fn set_icon_path(&mut self, _icon_path: Option<&str>) -> Result<()> {
        Err(DomainError::ReadOnlyConstant { field: "icon_path" })
    }

    /// Always fails: text constants are not ordered.
    ///
    /// # Errors
    ///
    /// Always returns [`DomainError::ReadOnlyConstant`].
    pub fn set_sequence(&mut self, _sequence: i64) -> Result<()> {
        Err(DomainError::ReadOnlyConstant { field: "sequence" })
    }
}
