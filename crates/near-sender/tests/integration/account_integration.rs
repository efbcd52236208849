//! Account operations end to end: nonce allocation, action shape, outcomes.

use std::sync::Arc;

use near_sender::*;

use crate::common::{Reply, ScriptedNode, alice_credentials, alice_with_cached_nonce, bob, init_tracing};

#[tokio::test]
async fn test_send_money_uses_next_cached_nonce() {
    init_tracing();
    let node = Arc::new(ScriptedNode::new(0));
    let account = alice_with_cached_nonce(node.clone(), 41, RetryConfig::default()).await;

    let amount = NearToken::yocto(10u128.pow(24));
    let outcome = account.send_money(&bob(), amount).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.nonce(), Some(42));
    assert_eq!(node.key_queries(), 0);

    let submitted = node.submitted();
    assert_eq!(submitted.len(), 1);
    let tx = &submitted[0].transaction;
    assert_eq!(tx.nonce, 42);
    assert_eq!(tx.signer_id.as_str(), "alice.test");
    assert_eq!(tx.receiver_id, bob());
    assert_eq!(tx.public_key, *account.public_key());
    assert_eq!(tx.actions, vec![Action::transfer(NearToken::near(1))]);
    assert_eq!(outcome.transaction_hash(), Some(&submitted[0].get_hash()));
}

#[tokio::test]
async fn test_first_send_fetches_access_key() {
    let node = Arc::new(ScriptedNode::new(7));
    let account = Account::new(alice_credentials(), node.clone());

    account.send_money(&bob(), NearToken::near(1)).await.unwrap();
    account.send_money(&bob(), NearToken::near(1)).await.unwrap();

    assert_eq!(node.key_queries(), 1);
    assert_eq!(node.submitted_nonces(), vec![8, 9]);
}

#[tokio::test]
async fn test_sequential_sends_increase_nonce_by_one() {
    let node = Arc::new(ScriptedNode::new(100));
    let account = Account::new(alice_credentials(), node.clone());

    for _ in 0..5 {
        account.send_money(&bob(), NearToken::millinear(5)).await.unwrap();
    }

    assert_eq!(node.submitted_nonces(), vec![101, 102, 103, 104, 105]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_never_share_a_nonce() {
    let node = Arc::new(ScriptedNode::new(0));
    let account = Account::new(alice_credentials(), node.clone());

    let mut handles = Vec::new();
    for _ in 0..20 {
        let account = account.clone();
        handles.push(tokio::spawn(async move {
            account.send_money(&bob(), NearToken::yocto(1)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut nonces = node.submitted_nonces();
    nonces.sort_unstable();
    assert_eq!(nonces, (1..=20).collect::<Vec<_>>());
    assert_eq!(node.key_queries(), 1);
}

#[tokio::test]
async fn test_delete_account_targets_own_account() {
    let node = Arc::new(ScriptedNode::new(3));
    let account = Account::new(alice_credentials(), node.clone());

    account.delete_account(&bob()).await.unwrap();

    let submitted = node.submitted();
    let tx = &submitted[0].transaction;
    assert_eq!(&tx.receiver_id, account.account_id());
    assert_eq!(tx.actions, vec![Action::delete_account(bob())]);
}

#[tokio::test]
async fn test_function_call_action() {
    let node = Arc::new(ScriptedNode::new(0));
    let account = Account::new(alice_credentials(), node.clone());
    let contract: AccountId = "counter.test".parse().unwrap();

    account
        .function_call(
            &contract,
            "increment",
            br#"{"by":2}"#.to_vec(),
            Gas::tgas(50),
            NearToken::yocto(1),
        )
        .await
        .unwrap();
    account
        .function_call_json(
            &contract,
            "increment",
            &serde_json::json!({ "by": 2 }),
            Gas::tgas(50),
            NearToken::yocto(1),
        )
        .await
        .unwrap();

    let submitted = node.submitted();
    assert_eq!(submitted.len(), 2);
    for signed in &submitted {
        let tx = &signed.transaction;
        assert_eq!(tx.receiver_id, contract);
        match &tx.actions[..] {
            [Action::FunctionCall(call)] => {
                assert_eq!(call.method_name, "increment");
                assert_eq!(call.args, br#"{"by":2}"#.to_vec());
                assert_eq!(call.gas, Gas::tgas(50));
                assert_eq!(call.deposit, NearToken::yocto(1));
            }
            other => panic!("unexpected actions: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_multi_action_transaction() {
    let node = Arc::new(ScriptedNode::new(0));
    let account = Account::new(alice_credentials(), node.clone());
    let new_key = SecretKey::ed25519_from_bytes([5u8; 32]).public_key();
    let sub: AccountId = "sub.alice.test".parse().unwrap();

    let actions = vec![
        Action::create_account(),
        Action::transfer(NearToken::near(2)),
        Action::add_full_access_key(new_key),
    ];
    account.sign_and_send(&sub, actions.clone()).await.unwrap();

    let submitted = node.submitted();
    assert_eq!(submitted[0].transaction.actions, actions);
    let kinds: Vec<u8> = actions.iter().map(Action::discriminant).collect();
    assert_eq!(kinds, vec![0, 3, 5]);
}

#[tokio::test]
async fn test_execution_failure_is_returned_not_retried() {
    let node = Arc::new(ScriptedNode::new(0).script([Reply::ExecutionFailure]));
    let account = Account::new(alice_credentials(), node.clone());

    let outcome = account.send_money(&bob(), NearToken::near(1)).await.unwrap();

    assert!(outcome.is_failure());
    assert!(outcome.failure_message().is_some());
    assert_eq!(node.submitted().len(), 1);
}

#[tokio::test]
async fn test_empty_action_list_rejected() {
    let node = Arc::new(ScriptedNode::new(0));
    let account = Account::new(alice_credentials(), node.clone());

    let err = account.sign_and_send(&bob(), vec![]).await.unwrap_err();

    assert!(matches!(err, Error::InvalidTransaction(_)));
    assert!(node.submitted().is_empty());
}
