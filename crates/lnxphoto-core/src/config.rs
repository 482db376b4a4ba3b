//! Configuration module for LNXPhoto.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, saving, validation, defaults, and a builder pattern for
//! programmatic use. The file doubles as the completion record: the sync engine
//! reads the `sync_engine` section on its first run, and a daemon restart
//! resumes a finished flow from the `onboarding` section.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SyncConfig;

// ---------------------------------------------------------------------------
// T060: Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for LNXPhoto.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub onboarding: OnboardingConfig,
    pub sync_engine: SyncEngineConfig,
    pub logging: LoggingConfig,
}

/// Onboarding completion record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnboardingConfig {
    /// Whether the first-launch flow has finished on this machine.
    pub completed: bool,
    /// When the flow finished. Present exactly while `completed` is true.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Settings handed to the sync engine for its first run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEngineConfig {
    /// Exclude assets captured before this instant (absent = sync everything).
    pub start_date: Option<DateTime<Utc>>,
    /// Perform analysis and logging only, no uploads.
    pub dry_run: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit structured JSON instead of human-readable lines.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// T061: Config::load() / Config::save()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration to a YAML file at `path`, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create configuration directory")?;
        }
        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        std::fs::write(path, &yaml).context("Failed to write configuration file")?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/lnxphoto/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("lnxphoto")
            .join("config.yaml")
    }

    /// Record a finished flow: the handed-off sync settings plus the
    /// completion mark, stamped with the current time.
    pub fn record_completion(&mut self, handoff: SyncConfig) {
        self.sync_engine.start_date = handoff.start_date;
        self.sync_engine.dry_run = handoff.dry_run;
        self.onboarding.completed = true;
        self.onboarding.completed_at = Some(Utc::now());
    }

    /// Returns the frozen sync settings and completion time of a finished
    /// flow, or `None` while onboarding is still pending.
    pub fn resume_state(&self) -> Option<(SyncConfig, DateTime<Utc>)> {
        if !self.onboarding.completed {
            return None;
        }
        let completed_at = self.onboarding.completed_at?;
        let config = SyncConfig {
            start_date: self.sync_engine.start_date,
            dry_run: self.sync_engine.dry_run,
        };
        Some((config, completed_at))
    }
}

// ---------------------------------------------------------------------------
// T062: Config::default()
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.
// (clippy::derivable_impls)

// OnboardingConfig derives Default (flow starts incomplete, no timestamp).
// (clippy::derivable_impls)

impl Default for SyncEngineConfig {
    fn default() -> Self {
        let defaults = SyncConfig::default();
        Self {
            start_date: defaults.start_date,
            dry_run: defaults.dry_run,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// T063: Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"logging.level"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- onboarding ---
        // The completion flag and timestamp travel together; a file where
        // they disagree was edited by hand or written by a buggy client.
        if self.onboarding.completed && self.onboarding.completed_at.is_none() {
            errors.push(ValidationError {
                field: "onboarding.completed".into(),
                message: "is true but completed_at is missing".into(),
            });
        }
        if !self.onboarding.completed && self.onboarding.completed_at.is_some() {
            errors.push(ValidationError {
                field: "onboarding.completed_at".into(),
                message: "is set but completed is false".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// T064: ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use lnxphoto_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .sync_engine_dry_run(false)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- onboarding ---

    pub fn onboarding_completed(mut self, completed: bool) -> Self {
        self.config.onboarding.completed = completed;
        self
    }

    pub fn onboarding_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.config.onboarding.completed_at = Some(completed_at);
        self
    }

    // --- sync_engine ---

    pub fn sync_engine_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.config.sync_engine.start_date = Some(start_date);
        self
    }

    pub fn sync_engine_dry_run(mut self, dry_run: bool) -> Self {
        self.config.sync_engine.dry_run = dry_run;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// T065: Unit tests
// ---------------------------------------------------------------------------
