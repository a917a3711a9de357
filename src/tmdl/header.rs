//! Forward scan of a table definition up to its partition block.
//!
//! The header is everything before the first `partition` line. The scan keeps
//! it verbatim except for `sourceProviderType` lines, and records which
//! physical column feeds each declared column so the partition query can be
//! rebuilt as an explicit projection.

use regex::Regex;
use std::sync::LazyLock;

use super::lexer::{classify, LineKind, SOURCE_COLUMN};

static STRICT_SOURCE_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sourceColumn:\s*(\S+)").unwrap());

static LENIENT_SOURCE_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sourceColumn:\s*([\w\[\]]+)").unwrap());

/// How `sourceColumn:` properties are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceColumnRule {
    /// Line must start with `sourceColumn:`; value is the next non-space run.
    Strict,
    /// Property may appear anywhere; value is a word, optionally bracketed.
    Lenient,
}

impl SourceColumnRule {
    fn extract<'a>(self, line: &'a str, kind: LineKind<'_>) -> Option<&'a str> {
        let pattern = match self {
            SourceColumnRule::Strict if kind == LineKind::SourceColumn => &*STRICT_SOURCE_COLUMN,
            SourceColumnRule::Lenient if line.contains(SOURCE_COLUMN) => &*LENIENT_SOURCE_COLUMN,
            _ => return None,
        };
        pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    }
}

/// A declared column and the physical column it is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Value of `sourceColumn:`.
    pub source: String,
    /// Name from the `column` declaration.
    pub column: String,
}

impl ColumnMapping {
    pub fn new(source: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            column: column.into(),
        }
    }
}

/// Result of the header scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableHeader {
    /// Retained header lines, including their line terminators.
    pub lines: Vec<String>,
    /// Column mappings in declaration order.
    pub mappings: Vec<ColumnMapping>,
    /// Name from the `table` declaration, if one was seen.
    pub table_name: Option<String>,
    /// Line index of the first `partition` line.
    pub partition_start: Option<usize>,
}

impl TableHeader {
    /// Header text with trailing whitespace removed.
    pub fn text(&self) -> String {
        self.lines.concat().trim_end().to_string()
    }
}

/// Split a document into lines, keeping line terminators.
pub fn split_lines(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

/// Scan `lines` up to the first partition declaration.
pub fn scan_header(lines: &[&str], rule: SourceColumnRule) -> TableHeader {
    let mut header = TableHeader::default();
    let mut current_column: Option<&str> = None;

    for (index, line) in lines.iter().enumerate() {
        let kind = classify(line);
        match kind {
            LineKind::Partition => {
                header.partition_start = Some(index);
                break;
            }
            LineKind::SourceProviderType => continue,
            LineKind::Table { name: Some(name) } if header.table_name.is_none() => {
                header.table_name = Some(name.to_string());
            }
            LineKind::Column { name } => current_column = name,
            _ => {}
        }

        if let Some(column) = current_column {
            if let Some(source) = rule.extract(line, kind) {
                header.mappings.push(ColumnMapping::new(source, column));
            }
        }

        header.lines.push((*line).to_string());
    }

    header
}
