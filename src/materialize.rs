//! Working-tree materialization.
//!
//! Model directories are copied out of the input root before anything is
//! mutated, and a template report is cloned beside each copy. The input root
//! is only ever read; every later step works on the output tree, which can be
//! deleted and rebuilt at any time.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::error::{MigrateError, Result};
use crate::layout::{base_name, model_dirs, MODEL_SUFFIX, REPORT_SUFFIX};

/// Find model directories anywhere under `input_root`.
///
/// Matched directories are not descended into, and `skip` (typically the
/// output root when it lives inside the input root) is never entered.
pub fn discover_model_dirs(input_root: &Path, skip: Option<&Path>) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(input_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", input_root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if skip.is_some_and(|skip| entry.path() == skip) {
            walker.skip_current_dir();
            continue;
        }

        let is_model = entry
            .file_name()
            .to_str()
            .and_then(|name| base_name(name, MODEL_SUFFIX))
            .is_some();
        if is_model {
            found.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }

    found
}

/// Recursively copy `src` into `dest`, merging with existing content.
///
/// Existing files at the destination are overwritten.
pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|source| MigrateError::Walk {
            root: src.to_path_buf(),
            source,
        })?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(MigrateError::io(&target))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(MigrateError::io(parent))?;
            }
            fs::copy(entry.path(), &target).map_err(MigrateError::io(entry.path()))?;
        }
    }
    Ok(())
}

/// Copy every model directory under `input_root` to the same relative path
/// under `output_root`.
///
/// Returns the destination directories. A model that fails to copy is logged
/// and skipped.
pub fn copy_model_dirs(input_root: &Path, output_root: &Path) -> Result<Vec<PathBuf>> {
    if !input_root.is_dir() {
        return Err(MigrateError::InputNotFound(input_root.to_path_buf()));
    }
    fs::create_dir_all(output_root).map_err(MigrateError::io(output_root))?;

    let input = input_root
        .canonicalize()
        .map_err(MigrateError::io(input_root))?;
    let skip = output_root.canonicalize().ok();
    let mut copied = Vec::new();

    for source in discover_model_dirs(&input, skip.as_deref()) {
        let relative = source.strip_prefix(&input).unwrap_or(&source);
        let dest = output_root.join(relative);

        match copy_dir_recursive(&source, &dest) {
            Ok(()) => {
                info!("Copied directory: {} to {}", source.display(), dest.display());
                copied.push(dest);
            }
            Err(e) => error!("Failed to copy {}: {}", source.display(), e),
        }
    }

    Ok(copied)
}

/// Clone `template` as `<base>.Report` beside every model directory directly
/// under `output_root`.
///
/// An existing report directory is deleted and replaced, never merged. A
/// missing template skips the whole step and returns no names.
pub fn clone_reports(output_root: &Path, template: &Path) -> Result<Vec<String>> {
    if !template.is_dir() {
        warn!("Default report folder not found at: {}", template.display());
        return Ok(Vec::new());
    }

    let models = model_dirs(output_root).map_err(MigrateError::io(output_root))?;
    let mut names = Vec::new();

    for model in models {
        let base = model.base_name();
        let dest = output_root.join(format!("{}{}", base, REPORT_SUFFIX));

        match replace_with_copy(template, &dest) {
            Ok(()) => {
                info!(
                    "Copied report folder from '{}' to '{}'",
                    template.display(),
                    dest.display()
                );
                names.push(base.to_string());
            }
            Err(e) => error!("Failed to create report for {}: {}", base, e),
        }
    }

    Ok(names)
}

fn replace_with_copy(template: &Path, dest: &Path) -> Result<()> {
    if dest.is_dir() {
        fs::remove_dir_all(dest).map_err(MigrateError::io(dest))?;
    } else if dest.exists() {
        fs::remove_file(dest).map_err(MigrateError::io(dest))?;
    }
    copy_dir_recursive(template, dest)
}
