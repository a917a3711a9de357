//! TOML-based configuration for tmdl-migrate.
//!
//! Supports a config file (tmdl-migrate.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [paths]
//! input = "${EXPORT_ROOT}/workspace"
//! output = "PBIP"
//! template = "src/Default.Report"
//!
//! [migration]
//! target_level = 1605
//! default_database = "Warehouse"
//! legacy_partition_name = "quoted"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Input, output and template roots.
    pub paths: PathSettings,

    /// Compatibility-level migration options.
    pub migration: MigrationSettings,
}

/// Filesystem roots.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathSettings {
    /// Root searched recursively for model directories.
    pub input: String,

    /// Working tree the models are copied into and mutated.
    pub output: String,

    /// Template report tree cloned once per model.
    pub template: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            input: "workspace".to_string(),
            output: "PBIP".to_string(),
            template: "src/Default.Report".to_string(),
        }
    }
}

/// Migration options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Compatibility level written into every database declaration.
    pub target_level: u32,

    /// Database used by the 1600 binding when the data source cannot be resolved.
    pub default_database: Option<String>,

    /// Partition identifier quoting for the 1500 binding: "quoted" or "bare".
    pub legacy_partition_name: String,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            target_level: 1605,
            default_database: None,
            legacy_partition_name: "quoted".to_string(),
        }
    }
}

impl MigrationSettings {
    /// The configured partition identifier style for the 1500 binding.
    pub fn partition_name_style(&self) -> Result<PartitionNameStyle, SettingsError> {
        PartitionNameStyle::from_str(&self.legacy_partition_name)
    }
}

/// How a partition identifier is written in the regenerated block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionNameStyle {
    /// `partition 'Orders' = m`
    #[default]
    Quoted,
    /// `partition Orders = m`
    Bare,
}

impl PartitionNameStyle {
    /// Parse a style from its config spelling.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, SettingsError> {
        match s.to_lowercase().as_str() {
            "quoted" => Ok(PartitionNameStyle::Quoted),
            "bare" => Ok(PartitionNameStyle::Bare),
            other => Err(SettingsError::InvalidConfig(format!(
                "unknown legacy_partition_name '{}', expected 'quoted' or 'bare'",
                other
            ))),
        }
    }
}

/// Fully resolved, immutable configuration handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub template_report: PathBuf,
    pub target_level: u32,
    pub default_database: Option<String>,
    pub legacy_partition_name: PartitionNameStyle,
}

impl MigrateConfig {
    /// Build a config with default migration options for the given roots.
    pub fn new(
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        template_report: impl Into<PathBuf>,
    ) -> Self {
        let migration = MigrationSettings::default();
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            template_report: template_report.into(),
            target_level: migration.target_level,
            default_database: migration.default_database,
            legacy_partition_name: PartitionNameStyle::default(),
        }
    }
}

/// Command-line values that replace resolved settings.
///
/// Paths are taken literally: `$` in a path given on the command line is not
/// treated as an environment variable reference.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub target_level: Option<u32>,
    pub default_database: Option<String>,
    pub legacy_partition_name: Option<PartitionNameStyle>,
}

impl MigrateConfig {
    /// Apply command-line overrides on top of a resolved configuration.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, SettingsError> {
        if overrides.target_level == Some(0) {
            return Err(SettingsError::InvalidConfig(
                "target_level must be a positive compatibility level".to_string(),
            ));
        }

        if let Some(input) = overrides.input {
            self.input_root = input;
        }
        if let Some(output) = overrides.output {
            self.output_root = output;
        }
        if let Some(template) = overrides.template {
            self.template_report = template;
        }
        if let Some(level) = overrides.target_level {
            self.target_level = level;
        }
        if let Some(db) = overrides.default_database {
            self.default_database = Some(db).filter(|db| !db.trim().is_empty());
        }
        if let Some(style) = overrides.legacy_partition_name {
            self.legacy_partition_name = style;
        }
        Ok(self)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `TMDL_MIGRATE_CONFIG`
    /// 2. `./tmdl-migrate.toml`
    /// 3. `~/.config/tmdl-migrate/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("TMDL_MIGRATE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("tmdl-migrate.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tmdl-migrate").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Expand environment variables and validate, producing the run configuration.
    pub fn resolve(&self) -> Result<MigrateConfig, SettingsError> {
        if self.migration.target_level == 0 {
            return Err(SettingsError::InvalidConfig(
                "target_level must be a positive compatibility level".to_string(),
            ));
        }

        let default_database = match &self.migration.default_database {
            Some(db) if !db.trim().is_empty() => Some(expand_env_vars(db)?),
            _ => None,
        };

        Ok(MigrateConfig {
            input_root: PathBuf::from(expand_env_vars(&self.paths.input)?),
            output_root: PathBuf::from(expand_env_vars(&self.paths.output)?),
            template_report: PathBuf::from(expand_env_vars(&self.paths.template)?),
            target_level: self.migration.target_level,
            default_database,
            legacy_partition_name: self.migration.partition_name_style()?,
        })
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    var_name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
