//! Distills reviewer feedback into the bounded cross-run memory blob.
//!
//! The memory blob is an explicit in/out string: callers read it before a run,
//! pass it here together with feedback on the produced report, and persist
//! whatever comes back. Nothing in this module touches storage.

use serde_json::Value;

use crate::providers::ChatProvider;
use crate::types::AuditError;

/// Ceiling on one distilled addition.
const ADDITION_CAP: usize = 200;
/// Floor applied once the memory budget is already exhausted.
const ADDITION_FLOOR: usize = 50;

/// Folds `feedback` about `report` into `memory`, keeping the blob near
/// `max_len` characters.
///
/// Runs one distillation call and appends the result to the blob separated
/// by a blank line. Only when the prior blob has already reached `max_len`
/// does a compression call follow, its output hard-truncated to `max_len`.
///
/// # Errors
///
/// Generation failures propagate unchanged.
pub async fn refine_memory(
    chat: &dyn ChatProvider,
    memory: &str,
    feedback: &str,
    report: &Value,
    max_len: usize,
) -> Result<String, AuditError> {
    let addition_cap = addition_budget(memory, max_len);
    let addition = distill_feedback(chat, memory, feedback, report, addition_cap).await?;
    let appended = append_memory(memory, &addition);

    if memory.chars().count() < max_len {
        Ok(appended.trim().to_string())
    } else {
        let compressed = compress_memory(chat, &appended, max_len).await?;
        Ok(compressed.trim().to_string())
    }
}

/// Character budget for the next addition: `min(200, remaining)` while the
/// blob has room, 50 once it does not, 0 when there is no budget at all.
fn addition_budget(memory: &str, max_len: usize) -> usize {
    if max_len == 0 {
        return 0;
    }
    if memory.is_empty() {
        return ADDITION_CAP.min(max_len);
    }
    let used = memory.trim().chars().count() + 2;
    match max_len.checked_sub(used) {
        Some(remaining) if remaining > 0 => ADDITION_CAP.min(remaining),
        _ => ADDITION_FLOOR,
    }
}

fn append_memory(memory: &str, addition: &str) -> String {
    let base = memory.trim();
    let addition = addition.trim();
    if base.is_empty() {
        return addition.to_string();
    }
    if addition.is_empty() {
        return base.to_string();
    }
    format!("{base}\n\n{addition}")
}

async fn distill_feedback(
    chat: &dyn ChatProvider,
    memory: &str,
    feedback: &str,
    report: &Value,
    max_len: usize,
) -> Result<String, AuditError> {
    let system_prompt = format!(
        "You distill reviewer feedback into durable review memory. \
         Produce one new memory entry from the review report and the feedback. \
         Output a short Markdown fragment only; no report ids, no full quotes. \
         Keep it actionable and avoid repeating existing memory. \
         Stay within {max_len} characters."
    );
    let user_prompt = format!(
        "Existing memory:\n{memory}\n\nReview report:\n{report}\n\n\
         Reviewer feedback:\n{feedback}\n\nNew memory entry:",
        report = serde_json::to_string_pretty(report).unwrap_or_default(),
    );
    let reply = chat.complete(&system_prompt, &user_prompt).await?;
    Ok(reply.text.trim().to_string())
}

async fn compress_memory(
    chat: &dyn ChatProvider,
    memory: &str,
    max_len: usize,
) -> Result<String, AuditError> {
    let system_prompt = format!(
        "You compress review memory. Remove duplicated entries while keeping \
         every constraint and improvement note, as concise Markdown. \
         Stay within {max_len} characters."
    );
    let user_prompt = format!("Current memory:\n{memory}\n\nCompressed memory:");
    let reply = chat.complete(&system_prompt, &user_prompt).await?;
    Ok(truncate_chars(reply.text.trim(), max_len).trim_end().to_string())
}

fn truncate_chars(text: &str, max_len: usize) -> &str {
    match text.char_indices().nth(max_len) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
