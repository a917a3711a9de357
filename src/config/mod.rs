//! Configuration module for tmdl-migrate.
//!
//! Handles the TOML settings file, environment variables, and connection strings.

mod connection;
mod settings;

pub use connection::ConnectionDescriptor;
pub use settings::{
    expand_env_vars, ConfigOverrides, MigrateConfig, MigrationSettings, PartitionNameStyle, PathSettings, Settings,
    SettingsError,
};
