//! Lexical tokenization for statistical scoring.

use once_cell::sync::Lazy;
use regex::Regex;

/// A token is a maximal run of ASCII word characters, or a run of at least
/// two CJK ideographs. Single ideographs are not emitted.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_]+|[\u{4e00}-\u{9fff}]{2,}").expect("valid token pattern"));

/// Lowercases `text` and returns its lexical tokens in order.
///
/// Pure and deterministic; no stemming, no stop-word removal.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|token| token.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_words_lowercased() {
        assert_eq!(
            tokenize("Payment is due in 30 days_net"),
            vec!["payment", "is", "due", "in", "30", "days_net"]
        );
    }

    #[test]
    fn cjk_runs_of_two_or_more() {
        assert_eq!(tokenize("支付服务费"), vec!["支付服务费"]);
        assert_eq!(tokenize("甲方 and 乙方"), vec!["甲方", "and", "乙方"]);
    }

    #[test]
    fn single_ideographs_are_dropped() {
        assert!(tokenize("条").is_empty());
        assert_eq!(tokenize("第1条"), vec!["1"]);
    }

    #[test]
    fn punctuation_is_not_a_token() {
        assert!(tokenize("!!! ··· ---").is_empty());
    }
}
