//! Retry behaviour under scripted rejections.
//!
//! Tests run with paused time, so backoff waits complete instantly while
//! `tokio::time::Instant` still observes them.

use std::sync::Arc;
use std::time::Duration;

use near_sender::*;
use tokio::time::{Instant, sleep};

use crate::common::{Reply, ScriptedNode, alice_credentials, alice_with_cached_nonce, bob, init_tracing};

fn transfer() -> Vec<Action> {
    vec![Action::transfer(NearToken::near(1))]
}

// =============================================================================
// Nonce conflicts
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_nonce_conflicts_then_accept() {
    init_tracing();
    let node = Arc::new(ScriptedNode::new(0).script([Reply::StaleNonce, Reply::StaleNonce]));
    let account = alice_with_cached_nonce(node.clone(), 41, RetryConfig::default()).await;

    let outcome = account.sign_and_send(&bob(), transfer()).await.unwrap();

    assert_eq!(node.submitted_nonces(), vec![42, 43, 44]);
    assert_eq!(outcome.nonce(), Some(44));
    assert_eq!(
        outcome.transaction_hash(),
        Some(&node.submitted()[2].get_hash())
    );
    assert_eq!(
        account
            .cache()
            .cached_nonce(account.account_id(), account.public_key())
            .await,
        Some(44)
    );
}

#[tokio::test(start_paused = true)]
async fn test_each_attempt_gets_fresh_block_hash() {
    let node = Arc::new(ScriptedNode::new(0).script([Reply::StaleNonce]));
    let account = Account::new(alice_credentials(), node.clone());

    account.sign_and_send(&bob(), transfer()).await.unwrap();

    let submitted = node.submitted();
    assert_eq!(submitted.len(), 2);
    assert_ne!(
        submitted[0].transaction.block_hash,
        submitted[1].transaction.block_hash
    );
    assert!(submitted[1].transaction.nonce > submitted[0].transaction.nonce);
}

// =============================================================================
// Exhaustion and timing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_always_failing_node_exhausts_attempts() {
    init_tracing();
    let node = Arc::new(ScriptedNode::new(0).otherwise(Reply::Internal));
    let account = Account::new(alice_credentials(), node.clone());
    let config = RetryConfig::default();

    let start = Instant::now();
    let err = account.sign_and_send(&bob(), transfer()).await.unwrap_err();
    let elapsed = start.elapsed();

    match &err {
        Error::ExhaustedRetries { attempts, last } => {
            assert_eq!(*attempts, 12);
            assert!(matches!(
                **last,
                Error::Submission(RpcError::InternalError(_))
            ));
        }
        other => panic!("expected ExhaustedRetries, got {other:?}"),
    }
    assert_eq!(err.failure_class(), FailureClass::Transient);
    assert_eq!(node.submitted_nonces(), (1..=12).collect::<Vec<_>>());

    // Sleeps are rounded up to whole milliseconds by the timer.
    let expected = config.total_delay();
    assert!(elapsed >= expected, "{elapsed:?} < {expected:?}");
    assert!(
        elapsed <= expected + Duration::from_millis(12),
        "{elapsed:?} > {expected:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_attempt_ceiling() {
    let node = Arc::new(ScriptedNode::new(0).otherwise(Reply::Internal));
    let config = RetryConfig {
        max_attempts: 3,
        initial_delay_ms: 100,
        backoff_factor: 2.0,
        ..Default::default()
    };
    let account = Account::builder(alice_credentials(), node.clone())
        .retry_config(config)
        .build()
        .unwrap();

    let start = Instant::now();
    let err = account.sign_and_send(&bob(), transfer()).await.unwrap_err();

    assert!(matches!(err, Error::ExhaustedRetries { attempts: 3, .. }));
    assert_eq!(node.submitted().len(), 3);
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_block_fetch_failures_are_retried_without_burning_nonces() {
    let node = Arc::new(ScriptedNode::new(0).failing_blocks(2));
    let account = Account::new(alice_credentials(), node.clone());

    account.sign_and_send(&bob(), transfer()).await.unwrap();

    assert_eq!(node.submitted_nonces(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_key_fetch_timeout_is_retried() {
    let node = Arc::new(ScriptedNode::new(5).failing_key_queries(1));
    let account = Account::new(alice_credentials(), node.clone());

    let outcome = account.send_money(&bob(), NearToken::near(1)).await.unwrap();

    assert_eq!(outcome.nonce(), Some(6));
    assert_eq!(node.key_queries(), 2);
    assert_eq!(node.submitted_nonces(), vec![6]);
}

// =============================================================================
// Classification
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_permanent_rejection_retried_by_default() {
    let node = Arc::new(ScriptedNode::new(0).script([Reply::InsufficientBalance]));
    let account = Account::new(alice_credentials(), node.clone());

    account.sign_and_send(&bob(), transfer()).await.unwrap();

    assert_eq!(node.submitted().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_on_permanent() {
    let node = Arc::new(ScriptedNode::new(0).otherwise(Reply::InsufficientBalance));
    let account = Account::builder(alice_credentials(), node.clone())
        .retry_config(RetryConfig {
            stop_on_permanent: true,
            ..Default::default()
        })
        .build()
        .unwrap();

    let err = account.sign_and_send(&bob(), transfer()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Submission(RpcError::InsufficientBalance { .. })
    ));
    assert!(err.is_permanent());
    assert_eq!(node.submitted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_key_fails_immediately() {
    let node = Arc::new(ScriptedNode::without_key());
    let account = Account::new(alice_credentials(), node.clone());

    let err = account.sign_and_send(&bob(), transfer()).await.unwrap_err();

    match err {
        Error::KeyLookup {
            account_id, source, ..
        } => {
            assert_eq!(account_id.as_str(), "alice.test");
            assert!(source.is_not_found());
        }
        other => panic!("expected KeyLookup, got {other:?}"),
    }
    assert_eq!(node.key_queries(), 1);
    assert!(node.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_key_lookup_retry_is_opt_in() {
    let node = Arc::new(ScriptedNode::without_key());
    let account = Account::builder(alice_credentials(), node.clone())
        .retry_config(RetryConfig {
            max_attempts: 3,
            retry_key_lookup: true,
            ..Default::default()
        })
        .build()
        .unwrap();

    let err = account.sign_and_send(&bob(), transfer()).await.unwrap_err();

    assert!(matches!(err, Error::ExhaustedRetries { attempts: 3, .. }));
    assert!(matches!(err.rpc_error(), Some(RpcError::AccessKeyNotFound { .. })));
    assert_eq!(node.key_queries(), 3);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff() {
    let node = Arc::new(ScriptedNode::new(0).otherwise(Reply::Internal));
    let account = Account::new(alice_credentials(), node.clone());
    let cancel = CancelToken::new();

    let bob = bob();

    let start = Instant::now();
    let (result, ()) = tokio::join!(
        account.sign_and_send_with_cancel(&bob, transfer(), &cancel),
        async {
            // Attempts run at 0 ms and 500 ms; the next wait ends at 1250 ms.
            sleep(Duration::from_millis(600)).await;
            cancel.cancel();
        }
    );

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(node.submitted().len(), 2);
    assert!(start.elapsed() < Duration::from_millis(1250));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let node = Arc::new(ScriptedNode::new(0));
    let account = Account::new(alice_credentials(), node.clone());
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = account
        .sign_and_send_with_cancel(&bob(), transfer(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(node.submitted().is_empty());
}

// =============================================================================
// Controller without the façade
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_controller_over_borrowed_parts() {
    let node = ScriptedNode::new(9).script([Reply::StaleNonce]);
    let credentials = alice_credentials();
    let cache = AccessKeyCache::new();
    let config = RetryConfig::default();

    let controller = RetryController::new(&credentials, &node, &cache, &config);
    let outcome = controller.submit(&bob(), transfer()).await.unwrap();

    assert_eq!(outcome.nonce(), Some(11));
    assert_eq!(node.submitted_nonces(), vec![10, 11]);
}
