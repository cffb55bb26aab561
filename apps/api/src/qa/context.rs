//! Context builder: renders the current record snapshot into the text block
//! handed to the model alongside the question.
//!
//! Pure function of its input — no caching here. The context is rebuilt on
//! every question because records may have changed since the last one.

use std::collections::BTreeMap;

use crate::models::record::RecordRow;

/// Friendly section labels for the known categories. Anything else renders
/// as the uppercased category string.
const SECTION_LABELS: &[(&str, &str)] = &[
    ("education", "EDUCATION"),
    ("experience", "PROFESSIONAL EXPERIENCE"),
    ("skills", "SKILLS"),
    ("projects", "PROJECTS"),
];

fn section_label(category: &str) -> String {
    SECTION_LABELS
        .iter()
        .find(|(key, _)| *key == category)
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| category.to_uppercase())
}

/// Renders records grouped into labeled category sections.
///
/// Categories render in sorted order (BTreeMap). The spec for the cache key
/// only needs SOME deterministic order: the fingerprint hashes the rendered
/// string, so an order that varied between identical calls would defeat the
/// cache. Within a category, input order is preserved.
///
/// A period line renders only when both dates are present; partial ranges
/// are dropped silently. Empty input yields an empty string.
pub fn build_context(records: &[RecordRow]) -> String {
    let mut by_category: BTreeMap<&str, Vec<&RecordRow>> = BTreeMap::new();
    for record in records {
        by_category
            .entry(record.category.as_str())
            .or_default()
            .push(record);
    }

    let mut lines: Vec<String> = Vec::new();
    for (category, entries) in by_category {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("{}:", section_label(category)));

        for entry in entries {
            lines.push(format!("- {}", entry.title));
            if !entry.description.is_empty() {
                lines.push(format!("  {}", entry.description));
            }
            if let (Some(start), Some(end)) = (entry.start_date, entry.end_date) {
                lines.push(format!(
                    "  Period: {} until {}",
                    start.format("%Y-%m"),
                    end.format("%Y-%m")
                ));
            }
        }
    }

    lines.join("\n")
}
