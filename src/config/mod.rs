//! Application-level properties consumed by the domain layer.
//!
//! The surrounding application owns richer configuration; this module
//! carries only what the domain entities themselves read: the base URL
//! used to absolutize constant icon paths, the legacy time-tracking
//! toggle, and the default display locale.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_LOCALE: &str = "en_US";

/// Properties that change entity behavior at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationProperties {
    /// Base URL prepended to relative icon paths.
    pub base_url: String,

    /// Legacy mode records time tracking as one combined estimate field;
    /// modern mode keeps original and remaining estimates separate.
    #[serde(default)]
    pub legacy_time_tracking: bool,

    /// Locale used when a caller does not supply one.
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

impl Default for ApplicationProperties {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            legacy_time_tracking: false,
            default_locale: default_locale(),
        }
    }
}

impl ApplicationProperties {
    /// Load properties from a YAML file, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let mut props: Self = serde_yaml::from_str(&contents)?;

        if props.base_url.trim().is_empty() {
            props.base_url = DEFAULT_BASE_URL.to_string();
        }

        Ok(props)
    }

    /// Absolutize an icon path against the configured base URL.
    ///
    /// Absolute URLs pass through untouched; anything else is treated as a
    /// server-relative path.
    #[must_use]
    pub fn absolute_icon_url(&self, icon_path: &str) -> String {
        if icon_path.starts_with("http://") || icon_path.starts_with("https://") {
            return icon_path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if icon_path.starts_with('/') {
            format!("{base}{icon_path}")
        } else {
            format!("{base}/{icon_path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let props = ApplicationProperties::load(Path::new("/nonexistent/props.yaml")).unwrap();
        assert_eq!(props.base_url, DEFAULT_BASE_URL);
        assert!(!props.legacy_time_tracking);
        assert_eq!(props.default_locale, "en_US");
    }

    #[test]
    fn test_load_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("props.yaml");
        fs::write(
            &path,
            "base_url: https://tracker.example.com\nlegacy_time_tracking: true\n",
        )
        .unwrap();

        let props = ApplicationProperties::load(&path).unwrap();
        assert_eq!(props.base_url, "https://tracker.example.com");
        assert!(props.legacy_time_tracking);
        assert_eq!(props.default_locale, "en_US");
    }

    #[test]
    fn test_absolute_icon_url() {
        let props = ApplicationProperties {
            base_url: "https://tracker.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            props.absolute_icon_url("/images/icons/bug.gif"),
            "https://tracker.example.com/images/icons/bug.gif"
        );
        assert_eq!(
            props.absolute_icon_url("https://cdn.example.com/bug.gif"),
            "https://cdn.example.com/bug.gif"
        );
        assert_eq!(
            props.absolute_icon_url("icons/task.gif"),
            "https://tracker.example.com/icons/task.gif"
        );
    }
}
