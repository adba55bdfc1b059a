//! Token-usage accounting across the sequential generation calls of one run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Monotonically non-decreasing usage totals for one run.
///
/// Deltas arrive as loose maps straight from the backend; absent or
/// non-numeric fields count as zero. The uncached share is recomputed per
/// delta as `max(prompt_total - prompt_cached, 0)` rather than trusted from
/// the map, so the invariant holds for every merged delta.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTotal {
    pub prompt_total: u64,
    pub prompt_cached: u64,
    pub prompt_uncached: u64,
    pub completion: u64,
}

impl UsageTotal {
    /// Folds one usage delta into the running totals.
    pub fn merge(&mut self, delta: &Value) {
        let prompt_total = int_field(delta, "prompt_total");
        let prompt_cached = int_field(delta, "prompt_cached");
        self.prompt_total += prompt_total;
        self.prompt_cached += prompt_cached;
        self.prompt_uncached += prompt_total.saturating_sub(prompt_cached);
        self.completion += int_field(delta, "completion");
    }
}

fn int_field(delta: &Value, key: &str) -> u64 {
    delta.get(key).and_then(Value::as_u64).unwrap_or(0)
}
