//! Tag extraction from analysis metadata

use serde_json::Value;
use std::collections::HashMap;

/// Normalize a raw tag
///
/// Trims and lowercases, then keeps at most the first two hyphen-separated
/// parts: `"Local-Events-2024"` becomes `"local-events"`. Returns `None` when
/// nothing is left.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let parts: Vec<&str> = lowered
        .split('-')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(2)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("-"))
    }
}

/// Read `tags` out of an analysis response's metadata
///
/// Accepts an array of strings or a single comma-separated string. Output is
/// normalized and deduplicated, first occurrence wins.
pub fn tags_from_metadata(metadata: &HashMap<String, Value>) -> Vec<String> {
    let raw: Vec<String> = match metadata.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(joined)) => joined.split(',').map(str::to_string).collect(),
        _ => return Vec::new(),
    };

    let mut tags = Vec::new();
    for tag in raw.iter().filter_map(|t| normalize_tag(t)) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
