//! Report shell binding.
//!
//! A cloned report is bound to its model through two JSON documents:
//!
//! - `definition.pbir`: `datasetReference.byPath.path` → `../<base>.SemanticModel`
//! - `.platform`: `metadata.displayName` → `<base>`
//!
//! Documents are fully deserialized and re-serialized, so unknown keys survive
//! (in their original order) while whitespace is normalized.

use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{MigrateError, Result};
use crate::layout::{
    base_name, child_dirs_with_suffix, MODEL_SUFFIX, REPORT_DEFINITION_FILE, REPORT_PLATFORM_FILE,
    REPORT_SUFFIX,
};

/// Key path of the model reference in `definition.pbir`.
pub const DATASET_PATH: [&str; 3] = ["datasetReference", "byPath", "path"];

/// Key path of the display name in `.platform`.
pub const DISPLAY_NAME: [&str; 2] = ["metadata", "displayName"];

/// Outcome of patching one JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Value replaced and document written.
    Patched,
    /// Key path absent; document re-written without the change.
    KeyPathMissing,
    /// Document not found.
    Missing,
    /// Document could not be read, parsed or written.
    Failed(String),
}

impl DocumentStatus {
    pub fn is_patched(&self) -> bool {
        matches!(self, DocumentStatus::Patched)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentStatus::Patched => write!(f, "patched"),
            DocumentStatus::KeyPathMissing => write!(f, "expected keys not found"),
            DocumentStatus::Missing => write!(f, "not found"),
            DocumentStatus::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Result of binding one report directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPatch {
    /// Model base name the report was bound to.
    pub name: String,
    pub definition: DocumentStatus,
    pub platform: DocumentStatus,
}

/// Replace the value at `path` if every key along it exists.
///
/// Returns `false` and leaves `value` untouched otherwise.
pub fn set_json_path(value: &mut Value, path: &[&str], new_value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let mut current = value;
    for key in parents {
        match current.get_mut(*key) {
            Some(next) => current = next,
            None => return false,
        }
    }

    match current.as_object_mut().and_then(|obj| obj.get_mut(*last)) {
        Some(slot) => {
            *slot = new_value;
            true
        }
        None => false,
    }
}

/// Load a JSON document, set `key_path`, and write it back pretty-printed.
pub fn patch_json_file(path: &Path, key_path: &[&str], new_value: Value) -> Result<bool> {
    let content = fs::read_to_string(path).map_err(MigrateError::io(path))?;
    let mut document: Value = serde_json::from_str(&content).map_err(MigrateError::json(path))?;

    let found = set_json_path(&mut document, key_path, new_value);
    if !found {
        warn!("Expected keys {} not found in {}", key_path.join("."), path.display());
    }

    let serialized = serde_json::to_string_pretty(&document).map_err(MigrateError::json(path))?;
    fs::write(path, serialized).map_err(MigrateError::io(path))?;
    Ok(found)
}

fn patch_document(path: &Path, key_path: &[&str], new_value: Value) -> DocumentStatus {
    if !path.is_file() {
        warn!("'{}' not found", path.display());
        return DocumentStatus::Missing;
    }

    match patch_json_file(path, key_path, new_value) {
        Ok(true) => DocumentStatus::Patched,
        Ok(false) => DocumentStatus::KeyPathMissing,
        Err(e) => {
            error!("Error updating {}: {}", path.display(), e);
            DocumentStatus::Failed(e.to_string())
        }
    }
}

/// Bind the report at `report_dir` to the model named `base`.
pub fn patch_report(report_dir: &Path, base: &str) -> ReportPatch {
    let model_ref = format!("../{}{}", base, MODEL_SUFFIX);

    let definition = patch_document(
        &report_dir.join(REPORT_DEFINITION_FILE),
        &DATASET_PATH,
        Value::String(model_ref),
    );
    let platform = patch_document(
        &report_dir.join(REPORT_PLATFORM_FILE),
        &DISPLAY_NAME,
        Value::String(base.to_string()),
    );

    if definition.is_patched() && platform.is_patched() {
        info!("Bound report {} to semantic model '{}'", report_dir.display(), base);
    }

    ReportPatch {
        name: base.to_string(),
        definition,
        platform,
    }
}

/// Bind every report directory directly under `output_root`.
pub fn patch_reports(output_root: &Path) -> Result<Vec<ReportPatch>> {
    let reports =
        child_dirs_with_suffix(output_root, REPORT_SUFFIX).map_err(MigrateError::io(output_root))?;

    Ok(reports
        .iter()
        .filter_map(|dir| {
            let name = dir.file_name()?.to_str()?;
            let base = base_name(name, REPORT_SUFFIX)?;
            Some(patch_report(dir, base))
        })
        .collect())
}
