//! `dataSources.tmdl` parsing.
//!
//! ```text
//! dataSource 'SQL Warehouse' = provider
//!     connectionString: Data Source=DW01;Initial Catalog=Warehouse;Integrated Security=SSPI
//!     impersonationMode: impersonateServiceAccount
//! ```

use super::lexer::{starts_with_keyword, unquote};
use crate::config::ConnectionDescriptor;

const DATA_SOURCE_DECL: &str = "dataSource";
const CONNECTION_STRING: &str = "connectionString:";

/// One declared data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceEntry {
    pub name: String,
    pub connection: Option<ConnectionDescriptor>,
}

/// All data sources declared in a data-sources document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceCatalog {
    entries: Vec<DataSourceEntry>,
}

impl DataSourceCatalog {
    /// Parse a data-sources document.
    ///
    /// A declaration runs until the next `dataSource` line. Only its first
    /// `connectionString:` property is read.
    pub fn parse(content: &str) -> Self {
        let mut entries: Vec<DataSourceEntry> = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if starts_with_keyword(trimmed, DATA_SOURCE_DECL) {
                let decl = trimmed[DATA_SOURCE_DECL.len()..].trim_start();
                let name = decl.split_once('=').map_or(decl, |(name, _)| name).trim();
                entries.push(DataSourceEntry {
                    name: unquote(name).to_string(),
                    connection: None,
                });
                continue;
            }

            if let Some(value) = trimmed.strip_prefix(CONNECTION_STRING) {
                if let Some(entry) = entries.last_mut() {
                    entry
                        .connection
                        .get_or_insert_with(|| ConnectionDescriptor::parse(value));
                }
            }
        }

        Self { entries }
    }

    /// Find a data source by identifier (case-insensitive).
    pub fn lookup(&self, id: &str) -> Option<&ConnectionDescriptor> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(id))
            .and_then(|entry| entry.connection.as_ref())
    }

    pub fn entries(&self) -> &[DataSourceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
