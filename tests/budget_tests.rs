//! Tests for budget scopes.

use pretty_assertions::assert_eq;
use tokenmeter::budget::BudgetScope;
use tokenmeter::error::MeterError;
use tokenmeter::ledger::UsageLedger;
use tokenmeter::types::UsageEvent;

#[tokio::test]
async fn record_inside_run_fails_as_soon_as_token_cap_is_crossed() {
    let ledger = UsageLedger::new();
    let scope = BudgetScope::new(&ledger).with_max_tokens(100);

    let result = scope
        .run(|| async {
            // This single event blows the cap, so record itself fails.
            ledger.record(&UsageEvent::new(100, 50, 0.0), "openai")?;
            Ok("unreachable")
        })
        .await;

    match result {
        Err(MeterError::TokenLimitExceeded { current, max }) => {
            assert_eq!(current, 150);
            assert_eq!(max, 100);
        }
        other => panic!("expected token limit error, got {other:?}"),
    }
}

#[tokio::test]
async fn breach_is_still_caught_at_run_boundary_when_record_error_is_ignored() {
    let ledger = UsageLedger::new();
    let scope = BudgetScope::new(&ledger).with_max_cost_usd(0.05);

    let result = scope
        .run(|| async {
            // Caller drops the advisory error; the boundary check must not.
            let _ = ledger.record(&UsageEvent::new(10, 10, 0.10), "openai");
            Ok("finished")
        })
        .await;

    match result {
        Err(MeterError::CostLimitExceeded { current, max }) => {
            assert!((current - 0.10).abs() < 1e-12);
            assert!((max - 0.05).abs() < 1e-12);
        }
        other => panic!("expected cost limit error, got {other:?}"),
    }
}

#[tokio::test]
async fn cost_breach_takes_priority_over_token_breach() {
    let ledger = UsageLedger::new();
    let scope = BudgetScope::new(&ledger)
        .with_max_cost_usd(0.01)
        .with_max_tokens(10);

    let result = scope
        .run(|| async {
            let _ = ledger.record(&UsageEvent::new(100, 100, 1.0), "openai");
            Ok(())
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.is_limit_breach());
    assert!(matches!(err, MeterError::CostLimitExceeded { .. }));
}

#[tokio::test]
async fn usage_below_limits_passes_through() {
    let ledger = UsageLedger::new();
    let scope = BudgetScope::new(&ledger)
        .with_max_cost_usd(1.0)
        .with_max_tokens(1000);

    let value = scope
        .run(|| async {
            ledger.record(&UsageEvent::new(100, 100, 0.01), "openai")?;
            Ok(42)
        })
        .await
        .unwrap();

    assert_eq!(value, 42);
}

#[tokio::test]
async fn baseline_excludes_usage_recorded_before_scope_creation() {
    let ledger = UsageLedger::new();
    ledger
        .record(&UsageEvent::new(5000, 5000, 9.0), "openai")
        .unwrap();

    let scope = BudgetScope::new(&ledger).with_max_tokens(100);
    assert_eq!(scope.current_usage().tokens, 0);

    scope
        .run(|| async {
            ledger.record(&UsageEvent::new(10, 10, 0.0), "openai")?;
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn remaining_budget_and_tokens_report_headroom_or_unconstrained() {
    let ledger = UsageLedger::new();
    let unconstrained = BudgetScope::new(&ledger);
    assert_eq!(unconstrained.remaining_budget(), None);
    assert_eq!(unconstrained.remaining_tokens(), None);

    let scope = BudgetScope::new(&ledger)
        .with_max_cost_usd(1.0)
        .with_max_tokens(100);
    ledger
        .record(&UsageEvent::new(30, 30, 0.25), "openai")
        .unwrap();

    assert_eq!(scope.remaining_tokens(), Some(40));
    assert!((scope.remaining_budget().unwrap() - 0.75).abs() < 1e-12);

    ledger
        .record(&UsageEvent::new(500, 500, 5.0), "openai")
        .unwrap();
    assert_eq!(scope.remaining_tokens(), Some(0));
    assert_eq!(scope.remaining_budget(), Some(0.0));
}

#[tokio::test]
async fn inner_scope_breach_does_not_fail_outer_scope() {
    let ledger = UsageLedger::new();
    let outer = BudgetScope::new(&ledger).with_max_tokens(10_000);

    let outcome = outer
        .run(|| async {
            let inner = BudgetScope::new(&ledger).with_max_tokens(50);
            let inner_result = inner
                .run(|| async {
                    let _ = ledger.record(&UsageEvent::new(40, 20, 0.0), "openai");
                    Ok(())
                })
                .await;
            assert!(matches!(
                inner_result,
                Err(MeterError::TokenLimitExceeded { current: 60, max: 50 })
            ));

            // The outer scope keeps running with plenty of headroom.
            ledger.record(&UsageEvent::new(100, 100, 0.0), "openai")?;
            Ok("outer survived")
        })
        .await;

    assert_eq!(outcome.unwrap(), "outer survived");
}

#[tokio::test]
async fn scopes_track_independent_deltas_from_independent_baselines() {
    let ledger = UsageLedger::new();
    let outer = BudgetScope::new(&ledger);
    ledger
        .record(&UsageEvent::new(100, 0, 0.0), "openai")
        .unwrap();
    let inner = BudgetScope::new(&ledger);
    ledger
        .record(&UsageEvent::new(50, 0, 0.0), "openai")
        .unwrap();

    assert_eq!(outer.current_usage().tokens, 150);
    assert_eq!(inner.current_usage().tokens, 50);
}

#[tokio::test]
async fn scope_is_uninstalled_after_run_completes() {
    let ledger = UsageLedger::new();
    let scope = BudgetScope::new(&ledger).with_max_tokens(10);
    scope.run(|| async { Ok(()) }).await.unwrap();

    // No scope is current any more: an enormous record succeeds.
    ledger
        .record(&UsageEvent::new(1_000_000, 0, 0.0), "openai")
        .unwrap();
}

#[tokio::test]
async fn failing_body_propagates_without_a_post_failure_limit_check() {
    let ledger = UsageLedger::new();
    let scope = BudgetScope::new(&ledger).with_max_tokens(10);

    let result: Result<(), _> = scope
        .run(|| async {
            let _ = ledger.record(&UsageEvent::new(500, 0, 0.0), "openai");
            Err(MeterError::UnknownPricingKey("mystery-model".to_string()))
        })
        .await;

    // The body's own error wins; the breach is not re-reported on top of it.
    match result {
        Err(MeterError::UnknownPricingKey(model)) => assert_eq!(model, "mystery-model"),
        other => panic!("expected the body's error, got {other:?}"),
    }

    // And the scope was released despite the failure.
    ledger
        .record(&UsageEvent::new(1_000_000, 0, 0.0), "openai")
        .unwrap();
}

#[tokio::test]
async fn detached_tasks_do_not_inherit_the_scope() {
    let ledger = UsageLedger::new();
    let scope = BudgetScope::new(&ledger).with_max_tokens(100);

    let result = scope
        .run(|| {
            let ledger = ledger.clone();
            async move {
                // A spawned sibling sees no current scope, so its record is
                // not rejected mid-flight...
                let handle = tokio::spawn(async move {
                    ledger.record(&UsageEvent::new(200, 0, 0.0), "openai")
                });
                handle.await.unwrap()?;
                Ok(())
            }
        })
        .await;

    // ...but the usage still lands on the ledger, so the run-boundary check
    // catches the breach.
    assert!(matches!(
        result,
        Err(MeterError::TokenLimitExceeded { current: 200, max: 100 })
    ));
}

#[tokio::test]
async fn concurrent_sibling_scopes_enforce_their_own_limits() {
    let ledger_a = UsageLedger::new();
    let ledger_b = UsageLedger::new();
    let scope_a = BudgetScope::new(&ledger_a).with_max_tokens(50);
    let scope_b = BudgetScope::new(&ledger_b).with_max_tokens(10_000);

    let (result_a, result_b) = tokio::join!(
        scope_a.run(|| async {
            tokio::task::yield_now().await;
            ledger_a.record(&UsageEvent::new(60, 0, 0.0), "openai")?;
            Ok(())
        }),
        scope_b.run(|| async {
            tokio::task::yield_now().await;
            ledger_b.record(&UsageEvent::new(60, 0, 0.0), "openai")?;
            Ok(())
        }),
    );

    assert!(matches!(
        result_a,
        Err(MeterError::TokenLimitExceeded { .. })
    ));
    assert!(result_b.is_ok());
}

#[tokio::test]
async fn scope_stays_current_across_suspension_points() {
    let ledger = UsageLedger::new();
    let scope = BudgetScope::new(&ledger).with_max_tokens(100);

    let result = scope
        .run(|| async {
            ledger.record(&UsageEvent::new(30, 0, 0.0), "openai")?;
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            ledger.record(&UsageEvent::new(30, 0, 0.0), "openai")?;
            tokio::task::yield_now().await;
            // Third record crosses the cap; the scope must still be current.
            ledger.record(&UsageEvent::new(50, 0, 0.0), "openai")
        })
        .await;

    assert!(matches!(
        result,
        Err(MeterError::TokenLimitExceeded { current: 110, max: 100 })
    ));
}

#[tokio::test]
async fn ledger_reset_mid_scope_surfaces_as_negative_delta() {
    let ledger = UsageLedger::new();
    ledger
        .record(&UsageEvent::new(100, 100, 1.0), "openai")
        .unwrap();
    let scope = BudgetScope::new(&ledger);

    ledger.clear();

    let delta = scope.current_usage();
    assert_eq!(delta.tokens, -200);
    assert_eq!(delta.calls, -1);
    assert!(delta.cost_usd < 0.0);
}

#[tokio::test]
async fn records_against_other_ledgers_ignore_the_current_scope() {
    let metered = UsageLedger::new();
    let unrelated = UsageLedger::new();
    let scope = BudgetScope::new(&metered).with_max_tokens(10);

    scope
        .run(|| async {
            // Over the scope's cap, but on a ledger it does not watch.
            unrelated.record(&UsageEvent::new(500, 0, 0.0), "openai")?;
            Ok(())
        })
        .await
        .unwrap();
}
