//! Drops risks whose citations cannot be resolved against the corpus.

use rustc_hash::FxHashSet;
use serde_json::Value;

use super::RISKS_FIELD;
use crate::types::ReferencePassage;

/// Retains only risks whose every citation names a `source_id` present in
/// `passages`; risks with no citations at all are dropped too.
///
/// Cited ids get the cleanup the original sources tend to need: surrounding
/// quotes, a `[…]` wrapper, and a `file://` prefix are stripped before the
/// exact match. The report is modified in place; a report without a risks
/// array is left untouched.
pub fn retain_verifiable_risks(report: &mut Value, passages: &[ReferencePassage]) {
    let known: FxHashSet<&str> = passages
        .iter()
        .map(|passage| passage.source_id.as_str())
        .collect();
    let Some(risks) = report.get_mut(RISKS_FIELD).and_then(Value::as_array_mut) else {
        return;
    };

    risks.retain(|risk| {
        let Some(citations) = risk.get("citations").and_then(Value::as_array) else {
            return false;
        };
        !citations.is_empty()
            && citations.iter().all(|citation| {
                citation
                    .get("source_id")
                    .and_then(Value::as_str)
                    .map(clean_source_id)
                    .is_some_and(|source| known.contains(source.as_str()))
            })
    });
}

/// Strips the wrapping models tend to add around source ids.
fn clean_source_id(raw: &str) -> String {
    let mut cleaned = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if cleaned.len() > 2 && cleaned.starts_with('[') && cleaned.ends_with(']') {
        cleaned = cleaned[1..cleaned.len() - 1].trim();
    }
    let cleaned = cleaned
        .strip_prefix("file://")
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(cleaned);
    cleaned.to_string()
}
