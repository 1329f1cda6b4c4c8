// ABOUTME: Integration tests for the one-time token lifecycle and expiry sweep
// ABOUTME: Exercises issue, consume-once, wall-clock expiry, and background sweep interleaving
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use forgeguard::security::token_store::{TokenRejection, TokenStore};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn consume_is_terminal() {
    let store = TokenStore::new(3600);
    store.issue("tok").await;

    assert_eq!(store.validate_and_consume("tok").await, Ok(()));
    assert_eq!(
        store.validate_and_consume("tok").await,
        Err(TokenRejection::AlreadyUsed)
    );
    // still terminal after a sweep
    store.sweep().await;
    assert_eq!(
        store.validate_and_consume("tok").await,
        Err(TokenRejection::AlreadyUsed)
    );
}

#[tokio::test]
async fn wall_clock_expiry_is_observed() {
    // zero-second lifetime: any elapsed time past issuance expires the token
    let store = TokenStore::new(0);
    store.issue("tok").await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(
        store.validate_and_consume("tok").await,
        Err(TokenRejection::Expired)
    );
}

#[tokio::test]
async fn sweep_runs_concurrently_with_issuance() {
    let store = Arc::new(TokenStore::new(3600));

    let issuer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..200 {
                store.issue(&format!("tok-{i}")).await;
            }
        })
    };
    let sweeper = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..50 {
                store.sweep().await;
                tokio::task::yield_now().await;
            }
        })
    };

    issuer.await.unwrap();
    sweeper.await.unwrap();

    // nothing was expired, so every issued token survived the sweeps
    assert_eq!(store.len().await, 200);
    assert_eq!(store.validate_and_consume("tok-0").await, Ok(()));
}
