//! Usage ledger: mutable accounting shared across a meter.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::budget;
use crate::error::Result;
use crate::types::{CacheSavings, UsageEvent, UsageSnapshot};

/// Accumulates usage globally and per provider, plus cache savings.
///
/// Cheaply cloneable; clones share the same counters. Concurrent `record`
/// calls serialize on an internal lock, so no increment is ever lost.
#[derive(Clone, Default)]
pub struct UsageLedger {
    inner: Arc<RwLock<LedgerInner>>,
}

#[derive(Default)]
struct LedgerInner {
    totals: Totals,
    providers: HashMap<String, Totals>,
    savings: CacheSavings,
}

#[derive(Default, Clone, Copy)]
struct Totals {
    input_tokens: u64,
    output_tokens: u64,
    cost_usd: f64,
    calls: u64,
}

impl Totals {
    fn add(&mut self, event: &UsageEvent) {
        self.input_tokens += event.input_tokens;
        self.output_tokens += event.output_tokens;
        self.cost_usd += event.cost_usd;
        self.calls += event.call_count;
    }

    fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            tokens: self.input_tokens + self.output_tokens,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cost_usd: self.cost_usd,
            calls: self.calls,
        }
    }
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a usage event into the global totals and the named provider's
    /// totals. Both update under one lock, so the invariant that global
    /// totals equal the sum of provider totals can never be observed broken.
    ///
    /// After recording, the budget scope currently active for this logical
    /// execution (if it watches this ledger) gets a limit check; a breach
    /// surfaces here, as soon as the event that caused it lands.
    pub fn record(&self, event: &UsageEvent, provider: &str) -> Result<()> {
        {
            let mut inner = self.inner.write().unwrap();
            inner.totals.add(event);
            inner
                .providers
                .entry(provider.to_string())
                .or_default()
                .add(event);
        }
        budget::check_active_scope(self)
    }

    /// Count a cache hit and the usage it avoided. Never touches usage
    /// totals: a hit is not billed.
    pub fn note_cache_hit(&self, tokens_saved: u64, usd_saved: f64) {
        let mut inner = self.inner.write().unwrap();
        inner.savings.hit_count += 1;
        inner.savings.tokens_saved += tokens_saved;
        inner.savings.usd_saved += usd_saved;
    }

    /// Count a cache miss.
    pub fn note_cache_miss(&self) {
        self.inner.write().unwrap().savings.miss_count += 1;
    }

    /// Immutable copy of the global totals.
    pub fn summary(&self) -> UsageSnapshot {
        self.inner.read().unwrap().totals.snapshot()
    }

    /// Immutable per-provider copies.
    pub fn breakdown(&self) -> HashMap<String, UsageSnapshot> {
        self.inner
            .read()
            .unwrap()
            .providers
            .iter()
            .map(|(name, totals)| (name.clone(), totals.snapshot()))
            .collect()
    }

    /// Immutable copy of the cache-savings counters.
    pub fn savings(&self) -> CacheSavings {
        self.inner.read().unwrap().savings
    }

    /// Reset usage totals, the provider map, and savings counters together,
    /// under one lock. A partial reset is never observable.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        *inner = LedgerInner::default();
        tracing::debug!("usage ledger cleared");
    }

    /// Whether two handles share the same underlying counters.
    pub(crate) fn same_ledger(&self, other: &UsageLedger) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
