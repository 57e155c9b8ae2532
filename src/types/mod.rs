//! Usage accounting types.

use serde::{Deserialize, Serialize};

/// A single metered API call, as reported by the caller.
///
/// Ephemeral: events are folded into a [`UsageLedger`](crate::ledger::UsageLedger)
/// and never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageEvent {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    /// Number of API calls this event represents (almost always 1).
    #[serde(default = "default_call_count")]
    pub call_count: u64,
}

fn default_call_count() -> u64 {
    1
}

impl Default for UsageEvent {
    fn default() -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            call_count: 1,
        }
    }
}

impl UsageEvent {
    /// Event for a single call with the given token counts and cost.
    pub fn new(input_tokens: u64, output_tokens: u64, cost_usd: f64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cost_usd,
            call_count: 1,
        }
    }

    /// Total tokens (input + output) in this event.
    pub fn tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Immutable point-in-time copy of accumulated usage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct UsageSnapshot {
    pub tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub calls: u64,
}

/// Signed difference between two snapshots.
///
/// Fields are signed so that a ledger reset occurring mid-scope surfaces as a
/// negative delta instead of being silently clamped to zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct UsageDelta {
    pub tokens: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub calls: i64,
}

impl UsageSnapshot {
    /// Per-field difference `self - baseline`.
    pub fn delta_since(&self, baseline: &UsageSnapshot) -> UsageDelta {
        UsageDelta {
            tokens: self.tokens as i64 - baseline.tokens as i64,
            input_tokens: self.input_tokens as i64 - baseline.input_tokens as i64,
            output_tokens: self.output_tokens as i64 - baseline.output_tokens as i64,
            cost_usd: self.cost_usd - baseline.cost_usd,
            calls: self.calls as i64 - baseline.calls as i64,
        }
    }
}

/// Counters for cache effectiveness.
///
/// Hits and misses never touch usage totals: a cache hit is never billed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheSavings {
    pub hit_count: u64,
    pub miss_count: u64,
    pub tokens_saved: u64,
    pub usd_saved: f64,
}
