#![forbid(unsafe_code)]

//! File-backed configuration for the navigation tree.
//!
//! [`NavConfig`] groups the runtime and coordinator knobs so a host can
//! keep them in a TOML or JSON file. Every section is optional; missing
//! fields take their defaults.
//!
//! ```toml
//! [program]
//! task_mode = "inline"
//! poll_timeout_ms = 25
//!
//! [nav]
//! seed_root_expanded = false
//! ```
//!
//! ```rust,ignore
//! let config = NavConfig::load("rulenav.toml")?;
//! let program = Program::new(nav.with_options(config.nav_options()), config.program_config());
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::nav::NavOptions;
use crate::program::{ProgramConfig, TaskMode};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct NavConfig {
    /// Runtime settings.
    pub program: ProgramSettings,
    /// Coordinator settings.
    pub nav: NavOptions,
}

/// Serializable view of [`ProgramConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ProgramSettings {
    pub task_mode: TaskMode,
    pub poll_timeout_ms: u64,
}

impl Default for ProgramSettings {
    fn default() -> Self {
        Self::from(&ProgramConfig::default())
    }
}

impl From<&ProgramConfig> for ProgramSettings {
    /// Timeouts beyond `u64::MAX` milliseconds saturate.
    fn from(config: &ProgramConfig) -> Self {
        Self {
            task_mode: config.task_mode,
            poll_timeout_ms: u64::try_from(config.poll_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl NavConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.checked()
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.checked()
    }

    /// Load from a file, choosing JSON for a `.json` extension and TOML
    /// otherwise.
    #[cfg(feature = "config")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Validation problems; empty when the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.program.poll_timeout_ms == 0 {
            errors.push("program.poll_timeout_ms must be > 0".to_owned());
        }
        errors
    }

    /// Runtime configuration.
    #[must_use]
    pub fn program_config(&self) -> ProgramConfig {
        ProgramConfig {
            task_mode: self.program.task_mode,
            poll_timeout: Duration::from_millis(self.program.poll_timeout_ms),
        }
    }

    /// Coordinator options.
    #[must_use]
    pub fn nav_options(&self) -> NavOptions {
        self.nav.clone()
    }

    #[cfg(feature = "config")]
    fn checked(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_runtime_defaults() {
        let config = NavConfig::default();
        assert!(config.validate().is_empty());
        let program = config.program_config();
        assert_eq!(program.task_mode, TaskMode::Background);
        assert_eq!(program.poll_timeout, Duration::from_millis(50));
        assert_eq!(config.nav_options(), NavOptions::default());
    }

    #[test]
    fn oversized_poll_timeout_saturates() {
        let config = ProgramConfig {
            task_mode: TaskMode::Inline,
            poll_timeout: Duration::MAX,
        };
        let settings = ProgramSettings::from(&config);
        assert_eq!(settings.poll_timeout_ms, u64::MAX);
        assert_eq!(settings.task_mode, TaskMode::Inline);
    }

    #[test]
    fn zero_poll_timeout_is_rejected() {
        let mut config = NavConfig::default();
        config.program.poll_timeout_ms = 0;
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn validation_error_lists_problems() {
        let err = ConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation errors: a; b");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[cfg(feature = "config")]
    #[test]
    fn partial_toml_keeps_defaults() {
        let config = NavConfig::from_toml_str(
            r#"
            [program]
            task_mode = "inline"
            "#,
        )
        .unwrap();
        assert_eq!(config.program.task_mode, TaskMode::Inline);
        assert_eq!(config.program.poll_timeout_ms, 50);
        assert!(config.nav.seed_root_expanded);
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_sections_override() {
        let config = NavConfig::from_json_str(
            r#"{"nav": {"seed_root_expanded": false}, "program": {"poll_timeout_ms": 10}}"#,
        )
        .unwrap();
        assert!(!config.nav.seed_root_expanded);
        assert!(config.nav.ignore_after_teardown);
        assert_eq!(
            config.program_config().poll_timeout,
            Duration::from_millis(10)
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn invalid_file_contents_fail_validation() {
        let err = NavConfig::from_toml_str("[program]\npoll_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[cfg(feature = "config")]
    #[test]
    fn bad_toml_reports_parse_error() {
        let err = NavConfig::from_toml_str("[program\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[cfg(feature = "config")]
    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("nav.json");
        std::fs::write(&json, r#"{"program": {"task_mode": "inline"}}"#).unwrap();
        let toml_path = dir.path().join("nav.toml");
        std::fs::write(&toml_path, "[nav]\nignore_after_teardown = false\n").unwrap();

        assert_eq!(
            NavConfig::load(&json).unwrap().program.task_mode,
            TaskMode::Inline
        );
        assert!(!NavConfig::load(&toml_path).unwrap().nav.ignore_after_teardown);
        assert!(matches!(
            NavConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
