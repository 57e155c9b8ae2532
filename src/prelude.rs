//! Convenience re-exports for common use.

pub use crate::budget::BudgetScope;
pub use crate::cache::{
    BoundedMemoryCache, CacheConfig, DiskCache, MemoryCache, RequestCache,
};
pub use crate::error::{MeterError, Result};
pub use crate::ledger::UsageLedger;
pub use crate::meter::Meter;
pub use crate::pricing::{ModelPricing, PricingTable};
pub use crate::types::{CacheSavings, UsageDelta, UsageEvent, UsageSnapshot};
