//! Scope-propagated budget accounting.
//!
//! A [`BudgetScope`] measures the usage delta since its creation and enforces
//! optional spend/token ceilings. While its [`run`](BudgetScope::run) future
//! executes, the scope is the task-local "current scope" for everything
//! logically descended from that future: any [`UsageLedger`] record made
//! there triggers an immediate limit check, and `run` performs one final
//! check when its body completes. The binding is a `tokio::task_local!`
//! slot, not a global, so concurrent sibling chains each see their own scope
//! (or none), and uninstall is structural — it happens on every exit path,
//! panics included.

use std::future::Future;
use std::sync::Arc;

use crate::error::{MeterError, Result};
use crate::ledger::UsageLedger;
use crate::types::{UsageDelta, UsageSnapshot};

tokio::task_local! {
    static CURRENT_SCOPE: Arc<BudgetScope>;
}

/// An accounting boundary with optional cost/token ceilings.
///
/// Construction captures a baseline snapshot of the ledger; everything the
/// scope reports is a delta against that baseline, so nested scopes track
/// independent windows of the same ledger.
#[derive(Clone)]
pub struct BudgetScope {
    max_cost_usd: Option<f64>,
    max_tokens: Option<u64>,
    ledger: UsageLedger,
    baseline: UsageSnapshot,
}

impl BudgetScope {
    /// Create an unconstrained scope over `ledger`, with the baseline taken
    /// now.
    pub fn new(ledger: &UsageLedger) -> Self {
        Self {
            max_cost_usd: None,
            max_tokens: None,
            ledger: ledger.clone(),
            baseline: ledger.summary(),
        }
    }

    /// Cap total spend (USD) recorded within this scope.
    pub fn with_max_cost_usd(mut self, max: f64) -> Self {
        self.max_cost_usd = Some(max);
        self
    }

    /// Cap total tokens recorded within this scope.
    pub fn with_max_tokens(mut self, max: u64) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Usage recorded since this scope's baseline.
    ///
    /// Signed: a ledger reset mid-scope shows up as a negative delta rather
    /// than being clamped away.
    pub fn current_usage(&self) -> UsageDelta {
        self.ledger.summary().delta_since(&self.baseline)
    }

    /// Dollars left before the cost ceiling, or `None` when unconstrained.
    pub fn remaining_budget(&self) -> Option<f64> {
        self.max_cost_usd
            .map(|max| (max - self.current_usage().cost_usd).max(0.0))
    }

    /// Tokens left before the token ceiling, or `None` when unconstrained.
    pub fn remaining_tokens(&self) -> Option<u64> {
        self.max_tokens.map(|max| {
            let used = self.current_usage().tokens;
            if used >= max as i64 {
                0
            } else {
                max - used.max(0) as u64
            }
        })
    }

    /// Fail if either ceiling has been crossed. The cost check runs first, so
    /// a simultaneous double breach reports the cost limit.
    pub fn check_limits(&self) -> Result<()> {
        let usage = self.current_usage();
        if let Some(max) = self.max_cost_usd {
            if usage.cost_usd > max {
                return Err(MeterError::CostLimitExceeded {
                    current: usage.cost_usd,
                    max,
                });
            }
        }
        if let Some(max) = self.max_tokens {
            if usage.tokens > max as i64 {
                return Err(MeterError::TokenLimitExceeded {
                    current: usage.tokens,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Execute `f` with this scope installed as the current scope, then check
    /// limits one final time.
    ///
    /// The scope stays current across every suspension of `f`'s future. If
    /// `f` fails, its error propagates as-is and no final check runs; the
    /// binding is released on all exit paths either way. Inner `run` calls
    /// shadow this scope for their own extent, and detached tasks spawned
    /// from `f` do not inherit it.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let value = CURRENT_SCOPE
            .scope(Arc::new(self.clone()), f())
            .await?;
        self.check_limits()?;
        Ok(value)
    }
}

/// Run the current scope's limit check, if one is active for `ledger`.
///
/// Called by [`UsageLedger::record`]; enforcement does not depend on the
/// recording code knowing it is inside a `run`.
pub(crate) fn check_active_scope(ledger: &UsageLedger) -> Result<()> {
    let scope = CURRENT_SCOPE.try_with(Arc::clone).ok();
    match scope {
        Some(scope) if scope.ledger.same_ledger(ledger) => scope.check_limits(),
        _ => Ok(()),
    }
}
