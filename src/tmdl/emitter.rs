//! Partition block emission.
//!
//! Regenerated partitions are import-mode M expressions that call
//! `Sql.Database` with an explicit native query:
//!
//! ```text
//! partition 'Orders' = m
//!     mode: import
//!     source =
//!         let
//!             Source = Sql.Database("SQLHOST", "SalesDB", [Query = "SELECT ...", CreateNavigationProperties=false])
//!         in
//!             Source
//! ```

use super::binding::Binding;
use super::header::ColumnMapping;
use crate::config::PartitionNameStyle;

/// Indentation unit for emitted blocks.
const INDENT: &str = "    ";

pub const LF: &str = "\n";
pub const CRLF: &str = "\r\n";

/// Line terminator of a document, taken from its first line.
#[must_use]
pub fn line_ending(content: &str) -> &'static str {
    match content.find('\n') {
        Some(end) if content[..end].ends_with('\r') => CRLF,
        _ => LF,
    }
}

/// A writer that manages indentation for TMDL output.
pub struct IndentWriter {
    buffer: String,
    current_indent: usize,
    newline: &'static str,
}

impl IndentWriter {
    /// Create a writer starting at the given indentation level.
    #[must_use]
    pub fn new(base_indent: usize) -> Self {
        Self {
            buffer: String::new(),
            current_indent: base_indent,
            newline: LF,
        }
    }

    /// Terminate lines with `newline` instead of `\n`.
    #[must_use]
    pub fn with_line_ending(mut self, newline: &'static str) -> Self {
        self.newline = newline;
        self
    }

    pub fn indent(&mut self) {
        self.current_indent += 1;
    }

    pub fn dedent(&mut self) {
        self.current_indent = self.current_indent.saturating_sub(1);
    }

    /// Write a complete line at the current indentation.
    pub fn write_line(&mut self, s: &str) {
        for _ in 0..self.current_indent {
            self.buffer.push_str(INDENT);
        }
        self.buffer.push_str(s);
        self.buffer.push_str(self.newline);
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }
}

/// Escape a value for use inside an M string literal.
#[must_use]
pub fn escape_m_string(s: &str) -> String {
    s.replace('"', "\"\"")
}

/// Render a partition identifier in the requested style.
#[must_use]
pub fn partition_name(table: &str, style: PartitionNameStyle) -> String {
    match style {
        PartitionNameStyle::Quoted => format!("'{}'", table.replace('\'', "''")),
        PartitionNameStyle::Bare => table.to_string(),
    }
}

/// Build the projection list: `[src] AS [col], ...` in mapping order.
#[must_use]
pub fn projection(mappings: &[ColumnMapping]) -> String {
    mappings
        .iter()
        .map(|m| format!("[{}] AS [{}]", m.source, m.column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the native query for a binding.
#[must_use]
pub fn native_query(binding: &Binding, mappings: &[ColumnMapping]) -> String {
    format!(
        "SELECT {} FROM [{}].[{}]",
        projection(mappings),
        binding.schema,
        binding.table
    )
}

/// Emit the partition block, indented one level under its table.
#[must_use]
pub fn emit_partition(
    binding: &Binding,
    mappings: &[ColumnMapping],
    style: PartitionNameStyle,
    newline: &'static str,
) -> String {
    let mut w = IndentWriter::new(1).with_line_ending(newline);

    w.write_line(&format!("partition {} = m", partition_name(&binding.table, style)));
    w.indent();
    w.write_line("mode: import");
    w.write_line("source =");
    w.indent();
    w.write_line("let");
    w.indent();
    w.write_line(&format!(
        "Source = Sql.Database(\"{}\", \"{}\", [Query = \"{}\", CreateNavigationProperties=false])",
        escape_m_string(&binding.server),
        escape_m_string(&binding.database),
        escape_m_string(&native_query(binding, mappings)),
    ));
    w.dedent();
    w.write_line("in");
    w.indent();
    w.write_line("Source");

    w.into_string()
}

/// Join the retained header and the regenerated partition with one blank line.
///
/// An empty header with no partition yields an empty document.
#[must_use]
pub fn assemble(header: &str, partition: Option<&str>, newline: &str) -> String {
    let header = header.trim_end();
    match partition {
        Some(block) if header.is_empty() => block.to_string(),
        Some(block) => format!("{header}{newline}{newline}{block}"),
        None if header.is_empty() => String::new(),
        None => format!("{header}{newline}"),
    }
}
