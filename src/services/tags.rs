// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Description tag extraction.
//!
//! Pure function mapping a free-text description plus a rule set to derived
//! column values. No I/O and deterministic, so re-enrichment is idempotent.

use std::collections::BTreeMap;

use crate::config::TagRule;

/// Extract tag values from an activity description.
///
/// For each rule applicable to `sport_type`, the first literal occurrence of
/// the marker wins; the value is the text run to the next line break with
/// leading whitespace trimmed. A rule whose marker is absent, or whose value
/// is empty, contributes no entry — the column stays unset, never empty.
pub fn extract_tags(
    description: Option<&str>,
    sport_type: &str,
    rules: &[TagRule],
) -> BTreeMap<String, String> {
    let mut extracted = BTreeMap::new();
    let Some(description) = description else {
        return extracted;
    };

    for rule in rules {
        if !rule.activity_types.iter().any(|t| t == sport_type) {
            continue;
        }
        if let Some(value) = extract_value(description, &rule.tag_name) {
            extracted.insert(rule.column_name.clone(), value);
        }
    }
    extracted
}

fn extract_value(description: &str, tag_name: &str) -> Option<String> {
    let index = description.find(tag_name)?;
    let rest = &description[index + tag_name.len()..];
    let line = rest.lines().next().unwrap_or("");
    let value = line.trim_start().trim_end_matches('\r');
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
