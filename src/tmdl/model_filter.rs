//! Reduction of `model.tmdl` to the declarations the target level accepts.

/// Declarations kept by [`filter_model`].
pub const ALLOWED_KEYWORDS: [&str; 5] = [
    "model",
    "culture",
    "defaultPowerBIDataSourceVersion",
    "discourageImplicitMeasures",
    "ref",
];

/// Keep only lines whose left-trimmed text starts with an allowed keyword.
///
/// Retained lines are copied byte for byte, terminators included.
pub fn filter_model(content: &str) -> String {
    content
        .split_inclusive('\n')
        .filter(|line| {
            let stripped = line.trim_start();
            ALLOWED_KEYWORDS.iter().any(|kw| stripped.starts_with(kw))
        })
        .collect()
}
