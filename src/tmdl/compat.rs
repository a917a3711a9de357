//! Compatibility levels and the database declaration patch.

use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use super::header::SourceColumnRule;

pub const LEGACY_V1_LEVEL: u32 = 1500;
pub const LEGACY_V2_LEVEL: u32 = 1600;

static LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"compatibilityLevel:\s*(\d+)").unwrap());

static LEGACY_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(compatibilityLevel:\s*)(?:1500|1600)\b").unwrap());

/// Binding dialect selected by a model's compatibility level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStrategy {
    /// Level 1500: server and table inlined in each partition.
    LegacyV1,
    /// Level 1600: partitions reference a shared data source.
    LegacyV2,
}

impl BindingStrategy {
    /// Strategy for a declared level, `None` when the level is not a known legacy one.
    pub fn for_level(level: u32) -> Option<Self> {
        match level {
            LEGACY_V1_LEVEL => Some(BindingStrategy::LegacyV1),
            LEGACY_V2_LEVEL => Some(BindingStrategy::LegacyV2),
            _ => None,
        }
    }

    /// How `sourceColumn:` is recognised in this dialect's table headers.
    pub fn source_column_rule(self) -> SourceColumnRule {
        match self {
            BindingStrategy::LegacyV1 => SourceColumnRule::Strict,
            BindingStrategy::LegacyV2 => SourceColumnRule::Lenient,
        }
    }
}

impl fmt::Display for BindingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingStrategy::LegacyV1 => write!(f, "inline binding ({})", LEGACY_V1_LEVEL),
            BindingStrategy::LegacyV2 => write!(f, "data-source binding ({})", LEGACY_V2_LEVEL),
        }
    }
}

/// Read the first `compatibilityLevel:` value from a database declaration.
pub fn read_level(content: &str) -> Option<u32> {
    LEVEL
        .captures(content)
        .and_then(|caps| caps[1].parse().ok())
}

/// Rewrite a legacy `compatibilityLevel:` value to `target`.
///
/// Content without a legacy declaration is returned unchanged.
pub fn patch_level(content: &str, target: u32) -> Cow<'_, str> {
    LEGACY_LEVEL.replace_all(content, |caps: &regex::Captures<'_>| {
        format!("{}{}", &caps[1], target)
    })
}
