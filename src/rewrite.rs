//! Table definition rewriter.
//!
//! Replaces the trailing partition block of a table file with an import-mode
//! `Sql.Database` partition carrying an explicit column projection:
//!
//! ```text
//! table file → header scan → binding extraction → partition emission → table file
//!                              (inline | referenced)
//! ```
//!
//! The header scan is shared; the two binding strategies only differ in how
//! they read the partition block and in how strictly `sourceColumn:` lines
//! are matched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::PartitionNameStyle;
use crate::tmdl::binding::{Binding, BindingField, Fallback, InlineBinding, ReferencedBinding};
use crate::tmdl::compat::BindingStrategy;
use crate::tmdl::datasources::DataSourceCatalog;
use crate::tmdl::emitter::{assemble, emit_partition, line_ending};
use crate::tmdl::header::{scan_header, split_lines, ColumnMapping};

/// Errors that can occur while rewriting a table file.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to extract all required metadata from partition block (missing {})", join_fields(.missing))]
    IncompleteBinding { missing: Vec<BindingField> },
}

fn join_fields(fields: &[BindingField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inputs shared by every table of one model directory.
#[derive(Debug, Clone, Copy)]
pub struct RewriteOptions<'a> {
    pub strategy: BindingStrategy,
    /// Declared data sources, consulted by the referenced strategy only.
    pub catalog: Option<&'a DataSourceCatalog>,
    /// Database used when a referenced data source gives none.
    pub default_database: Option<&'a str>,
    /// Partition identifier quoting for the inline strategy.
    pub legacy_partition_name: PartitionNameStyle,
}

impl<'a> RewriteOptions<'a> {
    pub fn new(strategy: BindingStrategy) -> Self {
        Self {
            strategy,
            catalog: None,
            default_database: None,
            legacy_partition_name: PartitionNameStyle::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: Option<&'a DataSourceCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_default_database(mut self, database: Option<&'a str>) -> Self {
        self.default_database = database;
        self
    }

    pub fn with_legacy_partition_name(mut self, style: PartitionNameStyle) -> Self {
        self.legacy_partition_name = style;
        self
    }
}

/// Result of rewriting one table definition.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    /// Binding used for the new partition; `None` when the file had no partition.
    pub binding: Option<Binding>,
    /// Column mappings in declaration order.
    pub mappings: Vec<ColumnMapping>,
    /// Substitutions made by the referenced strategy.
    pub fallbacks: Vec<Fallback>,
    /// Rewritten document.
    pub content: String,
}

/// Rewrite a table definition held in memory.
pub fn rewrite_table(
    content: &str,
    options: &RewriteOptions<'_>,
) -> Result<RewriteOutcome, RewriteError> {
    let newline = line_ending(content);
    let lines = split_lines(content);
    let header = scan_header(&lines, options.strategy.source_column_rule());

    let Some(start) = header.partition_start else {
        debug!("No partition block found; header kept without a partition");
        return Ok(RewriteOutcome {
            binding: None,
            content: assemble(&header.text(), None, newline),
            mappings: header.mappings,
            fallbacks: Vec::new(),
        });
    };
    let partition = &lines[start..];

    let (binding, fallbacks, style) = match options.strategy {
        BindingStrategy::LegacyV1 => {
            let binding = InlineBinding::scan(partition)
                .complete()
                .map_err(|missing| RewriteError::IncompleteBinding { missing })?;
            (binding, Vec::new(), options.legacy_partition_name)
        }
        BindingStrategy::LegacyV2 => {
            let referenced = ReferencedBinding::scan(partition);
            let resolved = referenced
                .data_source
                .as_deref()
                .zip(options.catalog)
                .and_then(|(id, catalog)| catalog.lookup(id));
            if let Some(conn) = resolved.filter(|conn| !conn.is_complete()) {
                warn!(
                    "Connection string for data source '{}' lacks {}",
                    referenced.data_source.as_deref().unwrap_or_default(),
                    if conn.server.is_none() { "a server" } else { "a database" }
                );
            }
            let (binding, fallbacks) = referenced.complete(
                header.table_name.as_deref(),
                resolved,
                options.default_database,
            );
            (binding, fallbacks, PartitionNameStyle::Quoted)
        }
    };

    let block = emit_partition(&binding, &header.mappings, style, newline);
    Ok(RewriteOutcome {
        content: assemble(&header.text(), Some(&block), newline),
        binding: Some(binding),
        mappings: header.mappings,
        fallbacks,
    })
}

/// Rewrite a table file in place.
///
/// Nothing is written when the binding cannot be completed.
pub fn rewrite_table_file(
    path: &Path,
    options: &RewriteOptions<'_>,
) -> Result<RewriteOutcome, RewriteError> {
    let content = fs::read_to_string(path).map_err(|source| RewriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let outcome = rewrite_table(&content, options)?;
    for fallback in &outcome.fallbacks {
        warn!("{}: {}", path.display(), fallback);
    }

    fs::write(path, &outcome.content).map_err(|source| RewriteError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Transformed table file {}", path.display());
    Ok(outcome)
}
