//! Data-source binding extraction from a table's partition block.
//!
//! Two partition dialects exist in compatibility levels below the target:
//!
//! - **1500 (inline)**: the partition names its server directly in a quoted
//!   `dataSource:` value, and a Tabular Editor annotation carries the table,
//!   schema and database as JSON.
//! - **1600 (referenced)**: the partition names a data source declared in
//!   `dataSources.tmdl`, and the physical table only appears in the embedded
//!   native query's `FROM` clause.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

use super::lexer::{unquote, DATA_SOURCE};
use crate::config::ConnectionDescriptor;

/// Annotation carrying the physical table for inline bindings.
pub const TABLE_SCHEMA_ANNOTATION: &str = "annotation TabularEditor_TableSchema";

pub const DEFAULT_SCHEMA: &str = "dbo";
pub const UNKNOWN_TABLE: &str = "UnknownTable";

static INLINE_DATA_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dataSource:\s*'([^']+)'").unwrap());

static TABLE_SCHEMA_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"annotation TabularEditor_TableSchema\s*=\s*(\{.*\})").unwrap()
});

static REFERENCED_DATA_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dataSource:\s*(?:'([^']+)'|([^'\s]+))").unwrap());

static FROM_SCHEMA_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)FROM\s+\[([^\]]+)\]\.\[([^\]]+)\]").unwrap());

/// Physical location of a table's rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub server: String,
    pub database: String,
    pub schema: String,
    pub table: String,
}

/// A binding field that could not be recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingField {
    Server,
    Database,
    Schema,
    Table,
}

impl fmt::Display for BindingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindingField::Server => "server",
            BindingField::Database => "database",
            BindingField::Schema => "schema",
            BindingField::Table => "table",
        };
        f.write_str(name)
    }
}

/// A substitution made while completing a referenced binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// The data source could not be resolved; server is emitted empty.
    ServerUnresolved { data_source: Option<String> },
    /// Database taken from the configured default.
    DatabaseFromDefault,
    /// Database taken from the server name.
    DatabaseFromServer,
    /// Table name taken from the query's FROM clause.
    TableFromQuery,
    /// No table name anywhere; placeholder used.
    TableUnknown,
    /// No schema in the query; default schema used.
    SchemaDefault,
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::ServerUnresolved {
                data_source: Some(id),
            } => write!(f, "data source '{}' not resolved, server left empty", id),
            Fallback::ServerUnresolved { data_source: None } => {
                write!(f, "no dataSource in partition, server left empty")
            }
            Fallback::DatabaseFromDefault => write!(f, "database taken from configured default"),
            Fallback::DatabaseFromServer => write!(f, "database taken from server name"),
            Fallback::TableFromQuery => write!(f, "table name taken from query FROM clause"),
            Fallback::TableUnknown => write!(f, "table name unknown, using '{}'", UNKNOWN_TABLE),
            Fallback::SchemaDefault => write!(f, "schema unknown, using '{}'", DEFAULT_SCHEMA),
        }
    }
}

// ============================================================================
// Inline (1500) bindings
// ============================================================================

/// Fields recovered from an inline partition block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineBinding {
    pub server: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
}

impl InlineBinding {
    /// Scan partition lines for the quoted data source and schema annotation.
    pub fn scan(partition: &[&str]) -> Self {
        let mut binding = Self::default();

        for line in partition {
            if line.contains(DATA_SOURCE) {
                if let Some(value) = INLINE_DATA_SOURCE.captures(line).and_then(|c| c.get(1)) {
                    binding.server = value.as_str().split_whitespace().next().map(str::to_string);
                }
            }

            if line.contains(TABLE_SCHEMA_ANNOTATION) {
                if let Some(json) = TABLE_SCHEMA_JSON.captures(line).and_then(|c| c.get(1)) {
                    binding.apply_table_schema(json.as_str());
                }
            }
        }

        binding
    }

    fn apply_table_schema(&mut self, json: &str) {
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(value) => {
                let field = |key: &str| {
                    value
                        .get(key)
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                };
                self.table = field("Name");
                self.schema = field("Schema");
                self.database = field("Database");
            }
            Err(e) => warn!("Error parsing JSON in TableSchema annotation: {}", e),
        }
    }

    /// Fields still unset, in server/table/schema/database order.
    pub fn missing(&self) -> Vec<BindingField> {
        let mut missing = Vec::new();
        if self.server.is_none() {
            missing.push(BindingField::Server);
        }
        if self.table.is_none() {
            missing.push(BindingField::Table);
        }
        if self.schema.is_none() {
            missing.push(BindingField::Schema);
        }
        if self.database.is_none() {
            missing.push(BindingField::Database);
        }
        missing
    }

    /// Complete binding, or the list of fields that are missing.
    pub fn complete(self) -> Result<Binding, Vec<BindingField>> {
        match self {
            InlineBinding {
                server: Some(server),
                database: Some(database),
                schema: Some(schema),
                table: Some(table),
            } => Ok(Binding {
                server,
                database,
                schema,
                table,
            }),
            partial => Err(partial.missing()),
        }
    }
}

// ============================================================================
// Referenced (1600) bindings
// ============================================================================

/// Fields recovered from a referenced partition block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencedBinding {
    /// Data-source identifier to resolve against `dataSources.tmdl`.
    pub data_source: Option<String>,
    /// Schema from the query's `FROM [schema].[table]`.
    pub query_schema: Option<String>,
    /// Table from the query's `FROM [schema].[table]`.
    pub query_table: Option<String>,
}

impl ReferencedBinding {
    /// Scan the partition text for the data-source reference and FROM clause.
    pub fn scan(partition: &[&str]) -> Self {
        let text = partition.concat();
        let mut binding = Self::default();

        if let Some(caps) = REFERENCED_DATA_SOURCE.captures(&text) {
            binding.data_source = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| unquote(m.as_str().trim()).to_string());
        }

        if let Some(caps) = FROM_SCHEMA_TABLE.captures(&text) {
            binding.query_schema = Some(caps[1].trim().to_string());
            binding.query_table = Some(caps[2].trim().to_string());
        }

        binding
    }

    /// Complete the binding, substituting placeholders where data is missing.
    ///
    /// Table preference: header declaration, then FROM clause, then
    /// `UnknownTable`. Schema: FROM clause, then `dbo`. Database: resolved,
    /// then `default_database`, then the server name.
    pub fn complete(
        self,
        header_table: Option<&str>,
        resolved: Option<&ConnectionDescriptor>,
        default_database: Option<&str>,
    ) -> (Binding, Vec<Fallback>) {
        let mut fallbacks = Vec::new();

        let server = resolved.and_then(|c| c.server.clone());
        if server.is_none() {
            fallbacks.push(Fallback::ServerUnresolved {
                data_source: self.data_source.clone(),
            });
        }

        let database = match resolved.and_then(|c| c.database.clone()) {
            Some(db) => Some(db),
            None => match default_database {
                Some(db) => {
                    fallbacks.push(Fallback::DatabaseFromDefault);
                    Some(db.to_string())
                }
                None => {
                    fallbacks.push(Fallback::DatabaseFromServer);
                    server.clone()
                }
            },
        };

        let table = match (header_table, self.query_table) {
            (Some(name), _) => name.to_string(),
            (None, Some(name)) => {
                fallbacks.push(Fallback::TableFromQuery);
                name
            }
            (None, None) => {
                fallbacks.push(Fallback::TableUnknown);
                UNKNOWN_TABLE.to_string()
            }
        };

        let schema = self.query_schema.unwrap_or_else(|| {
            fallbacks.push(Fallback::SchemaDefault);
            DEFAULT_SCHEMA.to_string()
        });

        let binding = Binding {
            server: server.unwrap_or_default(),
            database: database.unwrap_or_default(),
            schema,
            table,
        };
        (binding, fallbacks)
    }
}
