//! Prompt construction for the chunked review pipeline.

use serde_json::Value;

use crate::types::{Chunk, ReferencePassage};

/// JSON skeleton the generation collaborator is asked to fill in.
const REPORT_SCHEMA: &str = r#"{
  "overall_risk_score": 0,
  "summary": "one-sentence overview",
  "risks": [
    {
      "clause_excerpt": "verbatim excerpt from the document",
      "risk_level": "high/medium/low",
      "risk_reason": "why this is a risk",
      "citations": [
        {
          "source_id": "reference source",
          "section_label": "section marker",
          "quote": "verbatim reference text"
        }
      ],
      "suggestion": "proposed revision"
    }
  ]
}
"#;

/// Shared instruction prompt, built once per run.
pub fn build_system_prompt() -> String {
    "You are a compliance review assistant. You assess document text against \
     the supplied reference passages, score risks, and propose revisions. \
     Every finding must cite the reference passage it relies on, with a \
     traceable source id and section label. \
     Respond with JSON only, no surrounding prose."
        .to_string()
}

/// Request for one chunk: memory, prior partial findings, the chunk itself,
/// and the selected reference passages, in that order.
pub fn build_chunk_prompt(
    memory: &str,
    prior_findings: &str,
    chunk: &Chunk,
    passages: &[ReferencePassage],
) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Task: review the document part below against the reference passages \
         and output a review report as JSON.\n\
         Requirements:\n\
         1) Output fields must match the JSON structure exactly\n\
         2) Every risk must cite a reference passage (source_id + section_label + quote)\n\
         3) Risk scores range 0-100; higher means more risk\n\
         4) Suggestions must be directly usable as replacement wording\n\
         JSON structure:\n",
    );
    prompt.push_str(REPORT_SCHEMA);

    if !memory.trim().is_empty() {
        prompt.push_str("Reviewer memory:\n");
        prompt.push_str(memory.trim());
        prompt.push('\n');
    }
    if !prior_findings.trim().is_empty() {
        prompt.push_str("Findings from earlier parts:\n");
        prompt.push_str(prior_findings.trim());
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Document part {} of {}:\n{}\n",
        chunk.index, chunk.total, chunk.text
    ));
    prompt.push_str("Reference passages:\n");
    prompt.push_str(&format_reference_context(passages));
    prompt
}

/// Merge request across the full ordered list of partial reports.
pub fn build_merge_prompt(memory: &str, partials: &[Value]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Task: merge the partial review reports below into one final report \
         with the same JSON structure. Deduplicate overlapping risks, keep \
         every citation, and write a summary covering the whole document.\n",
    );
    if !memory.trim().is_empty() {
        prompt.push_str("Reviewer memory:\n");
        prompt.push_str(memory.trim());
        prompt.push('\n');
    }
    prompt.push_str("Partial reports in document order:\n");
    prompt.push_str(&render_partial_findings(partials));
    prompt.push('\n');
    prompt
}

/// Flat-text rendering of the partial reports carried between chunk requests.
pub fn render_partial_findings(partials: &[Value]) -> String {
    partials
        .iter()
        .map(|partial| serde_json::to_string(partial).unwrap_or_default())
        .collect::<Vec<String>>()
        .join("\n\n")
}

/// Formats the selected passages as `[source_id] section_label` blocks.
pub fn format_reference_context(passages: &[ReferencePassage]) -> String {
    let blocks: Vec<String> = passages
        .iter()
        .map(|passage| {
            format!(
                "[{}] {}\n{}\n",
                passage.source_id,
                passage.section_label,
                passage.text.trim()
            )
        })
        .collect();
    blocks.join("\n")
}
