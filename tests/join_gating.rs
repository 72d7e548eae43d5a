// tests/join_gating.rs
//!
//! Join-time gating: bans, passwords, and capacity are all enforced before a
//! session is ever added to the match's player list.

mod common;

use aetherlink::core::match_engine::warp::WarpMode;
use aetherlink::core::registry::bans::BanRecord;
use common::Harness;

#[tokio::test]
async fn banned_user_cannot_join() {
    let harness = Harness::spawn(8, 60, WarpMode::Subspace, None).await;
    harness
        .bans
        .ban(BanRecord {
            user_id: "griefer".to_string(),
            reason: "ramming other vessels".to_string(),
            banned_by: "admin".to_string(),
            banned_at_unix_ms: 0,
        })
        .await
        .expect("ban recorded");

    let result = harness.join(1, "griefer", "Griefer", None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn wrong_password_is_rejected_correct_password_admitted() {
    let harness = Harness::spawn(8, 60, WarpMode::Subspace, Some("hunter2")).await;

    let wrong = harness.join(1, "alice", "Alice", Some("nope")).await;
    assert!(wrong.is_err());

    let missing = harness.join(1, "alice", "Alice", None).await;
    assert!(missing.is_err());

    let right = harness.join(1, "alice", "Alice", Some("hunter2")).await;
    assert!(right.is_ok());
}

#[tokio::test]
async fn server_full_rejects_further_joins() {
    let harness = Harness::spawn(1, 60, WarpMode::Subspace, None).await;
    let _first = harness.join(1, "alice", "Alice", None).await.expect("first join admitted");

    let second = harness.join(2, "bob", "Bob", None).await;
    assert!(second.is_err());
}
