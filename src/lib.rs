//! tokenmeter — usage metering and spend caps for generative-AI APIs.
//!
//! Tracks token/cost usage across providers, deduplicates identical requests
//! through a content-addressed cache, and enforces budget ceilings over
//! arbitrarily nested async call graphs.
//!
//! # Quick Start
//!
//! ```no_run
//! use tokenmeter::prelude::*;
//!
//! # async fn example() -> tokenmeter::error::Result<()> {
//! let meter = Meter::new();
//!
//! meter
//!     .budget()
//!     .with_max_cost_usd(5.0)
//!     .run(|| async {
//!         meter.record(&UsageEvent::new(1200, 340, 0.018), "openai")?;
//!         Ok(())
//!     })
//!     .await?;
//!
//! println!("spent ${:.4}", meter.ledger().summary().cost_usd);
//! # Ok(())
//! # }
//! ```

pub mod budget;
pub mod cache;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod meter;
pub mod prelude;
pub mod pricing;
pub mod types;
