//! Line classifier for TMDL documents.
//!
//! TMDL is indentation-structured with one declaration per line. Every line the
//! migrator cares about is identified by its leading keyword once leading
//! whitespace is removed, so classification never needs more than one line of
//! context.

/// Keyword opening the trailing partition block.
pub const PARTITION: &str = "partition";
/// Legacy provider marker dropped from table headers.
pub const SOURCE_PROVIDER_TYPE: &str = "sourceProviderType";
pub const TABLE: &str = "table";
pub const COLUMN: &str = "column";
/// Column property naming the physical source column.
pub const SOURCE_COLUMN: &str = "sourceColumn:";
/// Partition property naming the data source.
pub const DATA_SOURCE: &str = "dataSource:";
pub const DOC_COMMENT: &str = "///";

/// Classification of a single TMDL line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'src> {
    /// `partition <name> = ...`
    Partition,
    /// `sourceProviderType: ...`
    SourceProviderType,
    /// `table <name>`; the name has surrounding quotes removed.
    Table { name: Option<&'src str> },
    /// `column <name>`; `None` for a declaration with no name token.
    Column { name: Option<&'src str> },
    /// Line that starts with `sourceColumn:`.
    SourceColumn,
    /// `/// ...`
    DocComment,
    Blank,
    Other,
}

/// Classify a raw line (leading whitespace and line terminator allowed).
pub fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with(DOC_COMMENT) {
        return LineKind::DocComment;
    }
    if starts_with_keyword(trimmed, PARTITION) {
        return LineKind::Partition;
    }
    if trimmed.starts_with(SOURCE_PROVIDER_TYPE) {
        return LineKind::SourceProviderType;
    }
    if starts_with_keyword(trimmed, TABLE) {
        return LineKind::Table {
            name: table_name(trimmed),
        };
    }
    if starts_with_keyword(trimmed, COLUMN) {
        return LineKind::Column {
            name: trimmed.split_whitespace().nth(1),
        };
    }
    if trimmed.starts_with(SOURCE_COLUMN) {
        return LineKind::SourceColumn;
    }
    LineKind::Other
}

/// True when `trimmed` is `keyword` alone or `keyword` followed by whitespace.
pub fn starts_with_keyword(trimmed: &str, keyword: &str) -> bool {
    match trimmed.strip_prefix(keyword) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// Extract the table name from `table Orders`, `table 'Order Lines'` or `table "X"`.
fn table_name(trimmed: &str) -> Option<&str> {
    let rest = trimmed[TABLE.len()..].trim_start();
    let rest = rest.trim_start_matches(['\'', '"']);
    let end = rest.find(['\'', '"']).unwrap_or(rest.len());
    let name = rest[..end].trim();
    (!name.is_empty()).then_some(name)
}

/// Strip one pair of matching single or double quotes.
pub fn unquote(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}
