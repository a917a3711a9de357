//! End-to-end migration of a model export.
//!
//! ```text
//! input root ──copy──▶ output root ──clone template──▶ <base>.Report
//!                          │                                │
//!                          ▼                                ▼
//!            per model: detect level                 bind report JSON
//!                       rewrite tables (strategy)
//!                       bump compatibilityLevel
//!                       filter model.tmdl
//!                       delete dataSources.tmdl
//! ```
//!
//! Model directories are processed one at a time. Each model, report and
//! table file is its own unit of work: failures are logged, recorded in the
//! [`MigrationSummary`], and never stop sibling units.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::MigrateConfig;
use crate::error::{MigrateError, Result};
use crate::layout::{model_dirs, ModelDir};
use crate::materialize::{clone_reports, copy_model_dirs, discover_model_dirs};
use crate::report::{patch_reports, ReportPatch};
use crate::rewrite::{rewrite_table_file, RewriteOptions};
use crate::tmdl::binding::Fallback;
use crate::tmdl::compat::{patch_level, read_level, BindingStrategy};
use crate::tmdl::datasources::DataSourceCatalog;
use crate::tmdl::model_filter::filter_model;

// ============================================================================
// Summary Types
// ============================================================================

/// A table file that could not be rewritten.
#[derive(Debug)]
pub struct TableFailure {
    pub path: PathBuf,
    pub error: MigrateError,
}

/// A fallback taken while rewriting a table file.
#[derive(Debug, Clone)]
pub struct TableFallback {
    pub path: PathBuf,
    pub fallback: Fallback,
}

/// What happened to one model directory.
#[derive(Debug)]
pub struct ModelOutcome {
    /// Base name of the model directory.
    pub name: String,
    /// Declared compatibility level before migration.
    pub level: Option<u32>,
    /// Strategy used for table rewriting, if the level was recognised.
    pub strategy: Option<BindingStrategy>,
    pub tables_rewritten: usize,
    pub table_failures: Vec<TableFailure>,
    pub fallbacks: Vec<TableFallback>,
    /// Failures of the model-level steps (level, database, model, data sources).
    pub step_errors: Vec<String>,
}

impl ModelOutcome {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            level: None,
            strategy: None,
            tables_rewritten: 0,
            table_failures: Vec::new(),
            fallbacks: Vec::new(),
            step_errors: Vec::new(),
        }
    }

    /// True when every step and table succeeded.
    pub fn is_clean(&self) -> bool {
        self.strategy.is_some() && self.table_failures.is_empty() && self.step_errors.is_empty()
    }

    fn record_step(&mut self, step: &str, result: Result<()>) {
        if let Err(e) = result {
            error!("{}: {} failed: {}", self.name, step, e);
            self.step_errors.push(format!("{}: {}", step, e));
        }
    }
}

/// Result of a full run.
#[derive(Debug, Default)]
pub struct MigrationSummary {
    /// Model directories copied from the input root.
    pub copied: Vec<PathBuf>,
    /// Base names of the reports cloned from the template.
    pub reports_created: Vec<String>,
    /// Report binding results.
    pub reports: Vec<ReportPatch>,
    /// Per-model results.
    pub models: Vec<ModelOutcome>,
}

impl MigrationSummary {
    pub fn tables_rewritten(&self) -> usize {
        self.models.iter().map(|m| m.tables_rewritten).sum()
    }

    pub fn tables_failed(&self) -> usize {
        self.models.iter().map(|m| m.table_failures.len()).sum()
    }

    pub fn fallbacks_used(&self) -> usize {
        self.models.iter().map(|m| m.fallbacks.len()).sum()
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Models copied:   {}", self.copied.len())?;
        writeln!(f, "Reports created: {}", self.reports_created.len())?;
        writeln!(f, "Tables rewritten: {}", self.tables_rewritten())?;
        writeln!(f, "Tables failed:    {}", self.tables_failed())?;
        writeln!(f, "Fallbacks used:   {}", self.fallbacks_used())?;

        for model in &self.models {
            writeln!(f)?;
            let level = model
                .level
                .map_or_else(|| "unknown".to_string(), |l| l.to_string());
            match model.strategy {
                Some(strategy) => writeln!(f, "{} (level {}, {})", model.name, level, strategy)?,
                None => writeln!(f, "{} (level {}, tables skipped)", model.name, level)?,
            }
            writeln!(f, "  tables rewritten: {}", model.tables_rewritten)?;
            for failure in &model.table_failures {
                writeln!(f, "  FAILED {}: {}", failure.path.display(), failure.error)?;
            }
            for fb in &model.fallbacks {
                writeln!(f, "  fallback {}: {}", fb.path.display(), fb.fallback)?;
            }
            for step in &model.step_errors {
                writeln!(f, "  error {}", step)?;
            }
        }

        for report in &self.reports {
            if !(report.definition.is_patched() && report.platform.is_patched()) {
                writeln!(
                    f,
                    "report {}: definition.pbir {}, .platform {}",
                    report.name, report.definition, report.platform
                )?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Model-Level Steps
// ============================================================================

/// Read the declared compatibility level of a model.
pub fn detect_level(model: &ModelDir) -> Result<Option<u32>> {
    let path = model.database_file();
    if !path.is_file() {
        return Err(MigrateError::FileNotFound(path));
    }
    let content = fs::read_to_string(&path).map_err(MigrateError::io(&path))?;
    let level = read_level(&content);
    if level.is_none() {
        warn!("compatibilityLevel not found in {}", path.display());
    }
    Ok(level)
}

/// Rewrite a legacy compatibility level in `database.tmdl` to `target`.
///
/// The file is written back even when nothing matched. Returns whether the
/// content changed.
pub fn patch_database(model: &ModelDir, target: u32) -> Result<bool> {
    let path = model.database_file();
    if !path.is_file() {
        return Err(MigrateError::FileNotFound(path));
    }
    let content = fs::read_to_string(&path).map_err(MigrateError::io(&path))?;
    let patched = patch_level(&content, target);
    let changed = patched != content;

    fs::write(&path, patched.as_bytes()).map_err(MigrateError::io(&path))?;
    info!("Updated {} (compatibilityLevel changed: {})", path.display(), changed);
    Ok(changed)
}

/// Filter `model.tmdl` down to its allowed declarations.
pub fn filter_model_file(model: &ModelDir) -> Result<()> {
    let path = model.model_file();
    if !path.is_file() {
        return Err(MigrateError::FileNotFound(path));
    }
    let content = fs::read_to_string(&path).map_err(MigrateError::io(&path))?;
    fs::write(&path, filter_model(&content)).map_err(MigrateError::io(&path))?;
    info!("File '{}' successfully updated with filtered content", path.display());
    Ok(())
}

/// Load the model's data-source declarations, if a data-sources file exists.
pub fn load_catalog(model: &ModelDir) -> Result<Option<DataSourceCatalog>> {
    for path in model.datasources_files() {
        if path.is_file() {
            let content = fs::read_to_string(&path).map_err(MigrateError::io(&path))?;
            return Ok(Some(DataSourceCatalog::parse(&content)));
        }
    }
    Ok(None)
}

/// Delete the model's data-sources file(s). Returns the deleted paths.
pub fn delete_datasources(model: &ModelDir) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    for path in model.datasources_files() {
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("File '{}' successfully deleted", path.display());
                deleted.push(path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(MigrateError::Io { path, source: e }),
        }
    }
    if deleted.is_empty() {
        info!("No data-sources file in {}", model.definition_dir().display());
    }
    Ok(deleted)
}

/// Rewrite every table file of `model` with `strategy`.
fn rewrite_tables(
    model: &ModelDir,
    strategy: BindingStrategy,
    config: &MigrateConfig,
    outcome: &mut ModelOutcome,
) {
    let catalog = match strategy {
        BindingStrategy::LegacyV1 => None,
        BindingStrategy::LegacyV2 => match load_catalog(model) {
            Ok(Some(catalog)) => {
                if catalog.is_empty() {
                    warn!(
                        "Data-sources file in {} declares no data sources",
                        model.definition_dir().display()
                    );
                }
                Some(catalog)
            }
            Ok(None) => {
                warn!(
                    "No data-sources file in {}; server and database cannot be resolved",
                    model.definition_dir().display()
                );
                None
            }
            Err(e) => {
                error!("{}", e);
                outcome.step_errors.push(format!("data sources: {}", e));
                None
            }
        },
    };

    let options = RewriteOptions::new(strategy)
        .with_catalog(catalog.as_ref())
        .with_default_database(config.default_database.as_deref())
        .with_legacy_partition_name(config.legacy_partition_name);

    let files = match model.table_files() {
        Ok(files) => files,
        Err(e) => {
            let e = MigrateError::Io {
                path: model.tables_dir(),
                source: e,
            };
            outcome.record_step("tables", Err(e));
            return;
        }
    };

    for path in files {
        info!("Processing file: {}", path.display());
        match rewrite_table_file(&path, &options) {
            Ok(result) => {
                outcome.tables_rewritten += 1;
                outcome
                    .fallbacks
                    .extend(result.fallbacks.into_iter().map(|fallback| TableFallback {
                        path: path.clone(),
                        fallback,
                    }));
            }
            Err(e) => {
                error!("Error: {}: {}", path.display(), e);
                outcome.table_failures.push(TableFailure {
                    path,
                    error: e.into(),
                });
            }
        }
    }
}

/// Migrate one model directory in the output tree.
///
/// Data sources are resolved before the data-sources file is deleted.
pub fn process_model(model: &ModelDir, config: &MigrateConfig) -> ModelOutcome {
    info!("Processing semantic model: {}", model.root().display());
    let mut outcome = ModelOutcome::new(model.base_name());

    match detect_level(model) {
        Ok(level) => outcome.level = level,
        Err(e) => outcome.record_step("compatibility level", Err(e)),
    }

    outcome.strategy = outcome.level.and_then(BindingStrategy::for_level);
    match outcome.strategy {
        Some(strategy) => {
            info!("{}: using {}", model.base_name(), strategy);
            rewrite_tables(model, strategy, config, &mut outcome);
        }
        None => warn!(
            "Unknown compatibility level for {}. Skipping table processing.",
            model.root().display()
        ),
    }

    let database = patch_database(model, config.target_level).map(|_| ());
    outcome.record_step("database", database);
    outcome.record_step("model", filter_model_file(model));
    let datasources = delete_datasources(model).map(|_| ());
    outcome.record_step("data sources", datasources);

    outcome
}

/// Migrate every model directory directly under `output_root`.
pub fn process_all_models(output_root: &Path, config: &MigrateConfig) -> Result<Vec<ModelOutcome>> {
    let models = model_dirs(output_root).map_err(MigrateError::io(output_root))?;
    Ok(models
        .iter()
        .map(|model| process_model(model, config))
        .collect())
}

// ============================================================================
// Run
// ============================================================================

/// Resolve `path` to an absolute, symlink-free form even if it does not exist yet.
fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        match current.canonicalize() {
            Ok(existing) => {
                return Ok(missing
                    .iter()
                    .rev()
                    .fold(existing, |acc: PathBuf, part| acc.join(part)));
            }
            Err(_) => match (current.parent(), current.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    current = if parent.as_os_str().is_empty() {
                        Path::new(".")
                    } else {
                        parent
                    };
                }
                _ => return std::env::current_dir().map(|cwd| cwd.join(path)),
            },
        }
    }
}

/// Refuse configurations in which the output tree would overwrite sources.
pub fn check_roots(config: &MigrateConfig) -> Result<()> {
    if !config.input_root.is_dir() {
        return Err(MigrateError::InputNotFound(config.input_root.clone()));
    }
    let input = config
        .input_root
        .canonicalize()
        .map_err(MigrateError::io(&config.input_root))?;
    let output = resolve_path(&config.output_root).map_err(MigrateError::io(&config.output_root))?;

    if output == input {
        return Err(MigrateError::OverlappingRoots {
            output,
            model: input,
        });
    }
    for model in discover_model_dirs(&input, None) {
        if output.starts_with(&model) {
            return Err(MigrateError::OverlappingRoots { output, model });
        }
    }
    Ok(())
}

/// Run the full pipeline.
///
/// Only root-level problems (missing input, overlapping roots, unreadable
/// output root) are returned as errors.
pub fn run(config: &MigrateConfig) -> Result<MigrationSummary> {
    check_roots(config)?;

    let copied = copy_model_dirs(&config.input_root, &config.output_root)?;
    info!("Copied {} semantic model directories", copied.len());

    let reports_created = clone_reports(&config.output_root, &config.template_report)?;
    let reports = patch_reports(&config.output_root)?;
    let models = process_all_models(&config.output_root, config)?;

    Ok(MigrationSummary {
        copied,
        reports_created,
        reports,
        models,
    })
}
