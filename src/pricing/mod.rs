//! Caller-populated pricing rates.

use std::collections::HashMap;

use crate::error::{MeterError, Result};

/// Per-model USD rates per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

/// Lookup table from model key to rates.
///
/// tokenmeter curates no rates of its own; callers load whatever table they
/// trust. An unknown model surfaces as [`MeterError::UnknownPricingKey`]
/// unless [`allow_unknown`](Self::allow_unknown) opted into treating unknown
/// models as free.
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
    unknown_is_free: bool,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rates for a model.
    pub fn insert(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.models.insert(model.into(), pricing);
    }

    /// Treat models without an entry as costing nothing instead of failing.
    pub fn allow_unknown(mut self) -> Self {
        self.unknown_is_free = true;
        self
    }

    /// Rates for a model, if present.
    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(model)
    }

    /// Compute the USD cost of a call against this table.
    pub fn cost_for(&self, model: &str, input_tokens: u64, output_tokens: u64) -> Result<f64> {
        match self.models.get(model) {
            Some(pricing) => Ok(
                (input_tokens as f64 / 1_000_000.0) * pricing.input_per_mtok
                    + (output_tokens as f64 / 1_000_000.0) * pricing.output_per_mtok,
            ),
            None if self.unknown_is_free => Ok(0.0),
            None => Err(MeterError::UnknownPricingKey(model.to_string())),
        }
    }
}
