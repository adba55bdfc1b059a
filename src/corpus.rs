//! Parses reference documents into retrievable passages.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ReferencePassage;

/// Section label assigned when a document has no recognizable markers.
pub const FULL_DOCUMENT_LABEL: &str = "全文";

/// Statute-style section markers: `第一条`, `第十三条`, `第5条`, …
static SECTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第[一二三四五六七八九十百千0-9]+条").expect("valid section pattern"));

/// Splits one reference document into passages, one per section marker.
///
/// Each passage runs from its marker to the next marker (or to the end of the
/// document); whitespace-only segments are dropped. A document without any
/// marker falls back to a single passage covering the whole trimmed text,
/// labeled [`FULL_DOCUMENT_LABEL`]. Empty text yields no passages.
pub fn parse_reference_passages(text: &str, source_id: &str) -> Vec<ReferencePassage> {
    let markers: Vec<(usize, &str)> = SECTION_MARKER
        .find_iter(text)
        .map(|found| (found.start(), found.as_str()))
        .collect();
    if markers.is_empty() {
        return fallback_full_document(text, source_id);
    }

    let mut passages = Vec::with_capacity(markers.len());
    for (position, (start, label)) in markers.iter().enumerate() {
        let end = markers
            .get(position + 1)
            .map_or(text.len(), |(next_start, _)| *next_start);
        let content = text[*start..end].trim();
        if content.is_empty() {
            continue;
        }
        passages.push(ReferencePassage::new(source_id, *label, content));
    }

    if passages.is_empty() {
        return fallback_full_document(text, source_id);
    }
    passages
}

fn fallback_full_document(text: &str, source_id: &str) -> Vec<ReferencePassage> {
    let content = text.trim();
    if content.is_empty() {
        return Vec::new();
    }
    vec![ReferencePassage::new(
        source_id,
        FULL_DOCUMENT_LABEL,
        content,
    )]
}
