//! TMDL text handling.
//!
//! Only the slice of the TMDL grammar the migrator touches is modelled: lines
//! are classified by their leading keyword ([`lexer`]), table headers are
//! scanned forward up to the partition block ([`header`]), and the partition
//! block is interpreted by one of two binding dialects ([`binding`]) before a
//! replacement is emitted ([`emitter`]). Everything here is pure text in, text
//! out; file handling lives in [`crate::rewrite`] and [`crate::migrate`].

pub mod binding;
pub mod compat;
pub mod datasources;
pub mod emitter;
pub mod header;
pub mod lexer;
pub mod model_filter;

pub use binding::{Binding, BindingField, Fallback, InlineBinding, ReferencedBinding};
pub use compat::{patch_level, read_level, BindingStrategy};
pub use datasources::DataSourceCatalog;
pub use header::{scan_header, split_lines, ColumnMapping, SourceColumnRule, TableHeader};
pub use model_filter::filter_model;
