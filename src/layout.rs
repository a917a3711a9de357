//! On-disk layout of a Power BI project export.
//!
//! ```text
//! PBIP/
//! ├── Sales.SemanticModel/
//! │   └── definition/
//! │       ├── database.tmdl
//! │       ├── model.tmdl
//! │       ├── dataSources.tmdl      (optional)
//! │       └── tables/*.tmdl
//! └── Sales.Report/
//!     ├── definition.pbir
//!     └── .platform
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory-name suffix marking a model directory.
pub const MODEL_SUFFIX: &str = ".SemanticModel";

/// Directory-name suffix marking a report directory.
pub const REPORT_SUFFIX: &str = ".Report";

pub const DEFINITION_DIR: &str = "definition";
pub const TABLES_DIR: &str = "tables";
pub const TMDL_EXTENSION: &str = "tmdl";

pub const DATABASE_FILE: &str = "database.tmdl";
pub const MODEL_FILE: &str = "model.tmdl";

/// Data-sources file names, modern spelling first.
pub const DATASOURCES_FILES: [&str; 2] = ["dataSources.tmdl", "datasources.tmdl"];

pub const REPORT_DEFINITION_FILE: &str = "definition.pbir";
pub const REPORT_PLATFORM_FILE: &str = ".platform";

/// Strip `suffix` from a directory name, returning the base name.
///
/// Returns `None` when the name does not carry the suffix or nothing precedes it.
pub fn base_name<'a>(dir_name: &'a str, suffix: &str) -> Option<&'a str> {
    dir_name
        .strip_suffix(suffix)
        .filter(|base| !base.is_empty())
}

/// A model directory inside the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDir {
    root: PathBuf,
    base: String,
}

impl ModelDir {
    /// Wrap `root` if its final segment carries the model suffix.
    pub fn from_path(root: &Path) -> Option<Self> {
        let name = root.file_name()?.to_str()?;
        let base = base_name(name, MODEL_SUFFIX)?;
        Some(Self {
            root: root.to_path_buf(),
            base: base.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name with the model suffix stripped (`Sales` for `Sales.SemanticModel`).
    pub fn base_name(&self) -> &str {
        &self.base
    }

    pub fn definition_dir(&self) -> PathBuf {
        self.root.join(DEFINITION_DIR)
    }

    pub fn database_file(&self) -> PathBuf {
        self.definition_dir().join(DATABASE_FILE)
    }

    pub fn model_file(&self) -> PathBuf {
        self.definition_dir().join(MODEL_FILE)
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.definition_dir().join(TABLES_DIR)
    }

    /// Candidate data-sources files in lookup order.
    pub fn datasources_files(&self) -> Vec<PathBuf> {
        let definition = self.definition_dir();
        DATASOURCES_FILES
            .iter()
            .map(|name| definition.join(name))
            .collect()
    }

    /// All `*.tmdl` files directly under `definition/tables`, sorted by path.
    pub fn table_files(&self) -> io::Result<Vec<PathBuf>> {
        let tables = self.tables_dir();
        if !tables.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&tables)? {
            let path = entry?.path();
            let is_tmdl = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == TMDL_EXTENSION);
            if is_tmdl && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// List immediate child directories of `root` whose name carries `suffix`.
///
/// Results are sorted by name.
pub fn child_dirs_with_suffix(root: &Path, suffix: &str) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        let matches = entry
            .file_name()
            .to_str()
            .and_then(|name| base_name(name, suffix))
            .is_some();
        if matches && path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// List model directories directly under `root`.
pub fn model_dirs(root: &Path) -> io::Result<Vec<ModelDir>> {
    Ok(child_dirs_with_suffix(root, MODEL_SUFFIX)?
        .iter()
        .filter_map(|path| ModelDir::from_path(path))
        .collect())
}
