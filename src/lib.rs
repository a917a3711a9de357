//! # tmdl-migrate
//!
//! Batch migrator for Power BI semantic models exported as TMDL.
//!
//! ## Architecture
//!
//! Every run works on a disposable copy of the input tree:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Input root (*.SemanticModel)                │
//! │                      read only                           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [materialize]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Output root: model copies + cloned report shells    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [report]
//! ┌─────────────────────────────────────────────────────────┐
//! │       definition.pbir / .platform bound to the model     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [migrate, per model]
//! ┌─────────────────────────────────────────────────────────┐
//! │  compatibilityLevel ─▶ strategy ─▶ [rewrite] tables      │
//! │  database.tmdl bumped, model.tmdl filtered,              │
//! │  dataSources.tmdl removed                                │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod materialize;
pub mod migrate;
pub mod report;
pub mod rewrite;
pub mod tmdl;

pub use error::{MigrateError, Result};
pub use migrate::{run, MigrationSummary, ModelOutcome};
pub use rewrite::{rewrite_table, rewrite_table_file, RewriteError, RewriteOptions, RewriteOutcome};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::{ConnectionDescriptor, MigrateConfig, PartitionNameStyle, Settings};
    pub use crate::error::{MigrateError, Result};
    pub use crate::layout::ModelDir;
    pub use crate::migrate::{run, MigrationSummary, ModelOutcome};
    pub use crate::rewrite::{rewrite_table, RewriteOptions, RewriteOutcome};
    pub use crate::tmdl::{Binding, BindingStrategy, DataSourceCatalog, Fallback};
}
