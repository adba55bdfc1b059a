//! Extracts a well-formed report object from loosely formatted model replies.
//!
//! Generation backends routinely wrap their JSON in prose, typographic
//! quotes, trailing commas, or stray control characters. This layer turns any
//! such reply into an object with the two required fields present, degrading
//! content rather than failing: the only hard error is a reply with no
//! enclosing braces at all.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::types::AuditError;

static QUOTED_SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""summary"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid summary pattern")
});
static LOOSE_SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*"?summary"?\s*[:：]\s*(.+)$"#).expect("valid loose summary pattern")
});
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid trailing-comma pattern"));

/// Returns the JSON-object candidate inside `reply`.
///
/// A reply that is braced end to end is taken whole; otherwise the substring
/// from the first `{` to the last `}` is the candidate.
///
/// # Errors
///
/// [`AuditError::MissingJsonObject`] when no enclosing braces exist; that is
/// the one structurally unrecoverable reply shape.
pub fn extract_object_text(reply: &str) -> Result<&str, AuditError> {
    let trimmed = reply.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Ok(trimmed);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&trimmed[start..=end]),
        _ => Err(AuditError::MissingJsonObject),
    }
}

/// Coerces a raw generation reply into a report object guaranteed to carry a
/// string `summary` and an array `list_field`.
///
/// The candidate object text is parsed strictly; on failure the repair
/// transforms run once, in order (leading BOM, typographic quotes, trailing
/// commas, non-whitespace control characters), and the parse is retried. If
/// the reply still does not parse to an object, a fallback object is
/// synthesized by pattern-scraping a summary; when even that fails the raw
/// reply is preserved under `raw_text` so nothing is silently dropped.
/// Fields beyond the two required ones pass through untouched.
pub fn coerce_report(reply: &str, list_field: &str) -> Result<Value, AuditError> {
    let candidate = extract_object_text(reply)?;

    let parsed = serde_json::from_str::<Value>(candidate)
        .ok()
        .or_else(|| serde_json::from_str::<Value>(&repair_candidate(candidate)).ok());

    let mut object = match parsed {
        Some(Value::Object(map)) => map,
        _ => {
            warn!("model reply did not parse as a JSON object; scraping fallback fields");
            fallback_object(reply)
        }
    };

    if !object.get("summary").is_some_and(Value::is_string) {
        object.insert("summary".to_string(), Value::String(String::new()));
    }
    if !object.get(list_field).is_some_and(Value::is_array) {
        object.insert(list_field.to_string(), Value::Array(Vec::new()));
    }
    Ok(Value::Object(object))
}

/// Repair transforms applied between the strict parse and its single retry.
fn repair_candidate(candidate: &str) -> String {
    let without_bom = candidate.strip_prefix('\u{feff}').unwrap_or(candidate);
    let requoted: String = without_bom
        .chars()
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' | '\u{201e}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    let decommaed = TRAILING_COMMA.replace_all(&requoted, "$1");
    decommaed
        .chars()
        .filter(|c| !c.is_ascii_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Last-resort object built by scraping the reply text directly.
fn fallback_object(reply: &str) -> Map<String, Value> {
    let mut object = Map::new();
    let summary = QUOTED_SUMMARY
        .captures(reply)
        .and_then(|captures| captures.get(1))
        .map(|capture| capture.as_str().to_string())
        .or_else(|| {
            LOOSE_SUMMARY
                .captures(reply)
                .and_then(|captures| captures.get(1))
                .map(|capture| strip_wrapping_quotes(capture.as_str().trim()).to_string())
        })
        .filter(|summary| !summary.is_empty());

    match summary {
        Some(summary) => {
            object.insert("summary".to_string(), Value::String(summary));
        }
        None => {
            object.insert("raw_text".to_string(), Value::String(reply.to_string()));
        }
    }
    object
}

fn strip_wrapping_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_formed_reply_passes_through() {
        let report = coerce_report(r#"{"summary": "ok", "risks": [1]}"#, "risks").unwrap();
        assert_eq!(report, json!({"summary": "ok", "risks": [1]}));
    }

    #[test]
    fn extra_fields_are_preserved() {
        let report =
            coerce_report(r#"{"summary": "s", "risks": [], "overall_risk_score": 40}"#, "risks")
                .unwrap();
        assert_eq!(report["overall_risk_score"], json!(40));
    }

    #[test]
    fn surrounding_noise_is_stripped() {
        let report = coerce_report(r#"noise {"summary":"x"} noise"#, "risks").unwrap();
        assert_eq!(report, json!({"summary": "x", "risks": []}));
    }

    #[test]
    fn trailing_comma_is_repaired() {
        let report = coerce_report(r#"{"summary":"ok","risks":[],}"#, "risks").unwrap();
        assert_eq!(report["summary"], json!("ok"));
        assert_eq!(report["risks"], json!([]));
    }

    #[test]
    fn bom_and_typographic_quotes_are_repaired() {
        let reply = "\u{feff}{\u{201c}summary\u{201d}: \u{201c}quoted\u{201d}, \"risks\": []}";
        let report = coerce_report(reply, "risks").unwrap();
        assert_eq!(report["summary"], json!("quoted"));
    }

    #[test]
    fn control_characters_are_stripped() {
        let reply = "{\"summary\": \"a\u{0008}b\", \"risks\": []}";
        let report = coerce_report(reply, "risks").unwrap();
        assert_eq!(report["summary"], json!("ab"));
    }

    #[test]
    fn braceless_reply_is_fatal() {
        let err = coerce_report("no structure here", "risks").unwrap_err();
        assert!(matches!(err, AuditError::MissingJsonObject));
    }

    #[test]
    fn unparseable_object_falls_back_to_quoted_summary() {
        let reply = r#"{"summary": "recovered", "risks": [unquoted}"#;
        let report = coerce_report(reply, "risks").unwrap();
        assert_eq!(report["summary"], json!("recovered"));
        assert_eq!(report["risks"], json!([]));
        assert!(report.get("raw_text").is_none());
    }

    #[test]
    fn loose_summary_line_is_scraped() {
        let reply = "{broken\nsummary: \"from a loose line\"\nrest}";
        let report = coerce_report(reply, "risks").unwrap();
        assert_eq!(report["summary"], json!("from a loose line"));
    }

    #[test]
    fn fullwidth_colon_summary_is_scraped() {
        let reply = "{broken\nsummary： 支付条款存在风险\n}";
        let report = coerce_report(reply, "risks").unwrap();
        assert_eq!(report["summary"], json!("支付条款存在风险"));
    }

    #[test]
    fn hopeless_reply_keeps_raw_text() {
        let reply = "{completely : unusable : gibberish}";
        let report = coerce_report(reply, "risks").unwrap();
        assert_eq!(report["summary"], json!(""));
        assert_eq!(report["risks"], json!([]));
        assert_eq!(report["raw_text"], json!(reply));
    }

    #[test]
    fn wrong_typed_required_fields_are_defaulted() {
        let report = coerce_report(r#"{"summary": 7, "risks": "nope"}"#, "risks").unwrap();
        assert_eq!(report["summary"], json!(""));
        assert_eq!(report["risks"], json!([]));
    }

    #[test]
    fn trailing_noise_after_object_is_ignored() {
        let report = coerce_report(r#"{"summary": "x"} [1,2,3]"#, "risks").unwrap();
        assert_eq!(report["summary"], json!("x"));
    }
}
