//! Connection descriptor parsing.
//!
//! Data sources in a model export carry ADO-style connection strings:
//! `Data Source=SQLHOST;Initial Catalog=SalesDB;Integrated Security=SSPI`.
//! Only the server and database are needed to rebuild a partition binding.

/// Server and database recovered from a connection string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Server hostname (`Data Source` / `Server`).
    pub server: Option<String>,
    /// Database name (`Initial Catalog` / `Database`).
    pub database: Option<String>,
}

impl ConnectionDescriptor {
    /// Parse a `Key=Value;Key=Value` connection string.
    ///
    /// Keys are matched case-insensitively. Surrounding quotes are stripped
    /// from the whole string and from each value. Unknown keys are skipped.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        let unquoted = strip_quotes(trimmed);

        let mut descriptor = Self::default();
        for part in unquoted.split(';') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = strip_quotes(value.trim());
            if value.is_empty() {
                continue;
            }

            match key.trim().to_lowercase().as_str() {
                "data source" | "server" | "address" => {
                    descriptor.server.get_or_insert_with(|| value.to_string());
                }
                "initial catalog" | "database" => {
                    descriptor.database.get_or_insert_with(|| value.to_string());
                }
                _ => {}
            }
        }
        descriptor
    }

    /// True when both server and database were found.
    pub fn is_complete(&self) -> bool {
        self.server.is_some() && self.database.is_some()
    }
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}
