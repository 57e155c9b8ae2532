//! Meter facade: one ledger plus an optional deduplication cache.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

use crate::budget::BudgetScope;
use crate::cache::{CacheConfig, RequestCache};
use crate::error::Result;
use crate::ledger::UsageLedger;
use crate::types::UsageEvent;

/// Owns the usage ledger and the configured cache backend.
///
/// Clones share both, so a meter can be handed to every instrumented client
/// in a process.
#[derive(Clone, Default)]
pub struct Meter {
    ledger: UsageLedger,
    cache: Option<Arc<dyn RequestCache>>,
}

impl Meter {
    /// Meter with no cache configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a built-in cache backend.
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config.build());
        self
    }

    /// Plug in a custom cache backend.
    pub fn with_cache(mut self, cache: Arc<dyn RequestCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn cache(&self) -> Option<&Arc<dyn RequestCache>> {
        self.cache.as_ref()
    }

    /// Record a usage event against a provider. See [`UsageLedger::record`].
    pub fn record(&self, event: &UsageEvent, provider: &str) -> Result<()> {
        self.ledger.record(event, provider)
    }

    /// New unconstrained budget scope over this meter's ledger.
    pub fn budget(&self) -> BudgetScope {
        BudgetScope::new(&self.ledger)
    }

    /// Deduplicate a call by its request shape.
    ///
    /// On a hit the stored value is returned without running `f`, and
    /// `saved_on_hit` (the usage one execution of `f` would have recorded)
    /// feeds the savings counters. On a miss `f` runs and its value is
    /// stored. With no cache configured `f` just runs — indistinguishable
    /// from a miss except that no savings counters move. A hit never touches
    /// usage totals.
    pub async fn memoized<R, T, F, Fut>(
        &self,
        request: &R,
        saved_on_hit: &UsageEvent,
        f: F,
    ) -> Result<T>
    where
        R: Serialize,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(cache) = &self.cache else {
            return f().await;
        };

        // A request with no canonical form is uncacheable; run it directly.
        let Ok(request_value) = serde_json::to_value(request) else {
            return f().await;
        };
        let key = cache.derive_key(&request_value);

        if let Some(stored) = cache.get(&key).await {
            // A stored value that no longer deserializes is a miss.
            if let Ok(value) = serde_json::from_value::<T>(stored) {
                self.ledger
                    .note_cache_hit(saved_on_hit.tokens(), saved_on_hit.cost_usd);
                return Ok(value);
            }
        }

        self.ledger.note_cache_miss();
        let value = f().await?;
        if let Ok(stored) = serde_json::to_value(&value) {
            cache.set(&key, stored).await;
        }
        Ok(value)
    }
}
