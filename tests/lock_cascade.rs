// tests/lock_cascade.rs
//!
//! S1: acquiring Control over a vessel another session holds Update on does
//! NOT auto-transfer Update; a later explicit Update request from the
//! Control holder force-recaptures it from whoever holds it live.

mod common;

use aetherlink::core::match_engine::warp::WarpMode;
use aetherlink::core::opcode::{codes, LockAction, LockKind, LockPayload};
use common::{drain, Harness};
use uuid::Uuid;

fn acquire(lock_type: LockKind, vessel_id: Uuid) -> LockPayload {
    LockPayload {
        action: LockAction::Acquire,
        lock_type,
        vessel_id: Some(vessel_id),
        kerbal_name: None,
        owner: None,
        reason: None,
    }
}

#[tokio::test]
async fn control_acquire_does_not_auto_grant_update() {
    let harness = Harness::spawn(8, 60, WarpMode::Subspace, None).await;
    let mut alice_rx = harness.join(1, "alice", "Alice", None).await.expect("alice joins");
    let mut bob_rx = harness.join(2, "bob", "Bob", None).await.expect("bob joins");
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    let vessel_id = Uuid::new_v4();
    harness.send(1, "alice", codes::LOCK, &acquire(LockKind::Update, vessel_id)).await;
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    harness.send(2, "bob", codes::LOCK, &acquire(LockKind::Control, vessel_id)).await;

    let bob_events = drain(&mut bob_rx).await;
    assert!(bob_events.iter().any(|m| m.opcode == codes::LOCK && m.json["action"] == "granted" && m.json["lock_type"] == "Control"));
    assert!(!bob_events.iter().any(|m| m.opcode == codes::LOCK && m.json["lock_type"] == "Update"));

    // Alice's Update lock is untouched — no release event reaches her.
    let alice_events = drain(&mut alice_rx).await;
    assert!(!alice_events.iter().any(|m| m.opcode == codes::LOCK && m.json["lock_type"] == "Update"));
}

#[tokio::test]
async fn control_holder_force_recaptures_a_live_update_lock() {
    let harness = Harness::spawn(8, 60, WarpMode::Subspace, None).await;
    let mut alice_rx = harness.join(1, "alice", "Alice", None).await.expect("alice joins");
    let mut bob_rx = harness.join(2, "bob", "Bob", None).await.expect("bob joins");
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    let vessel_id = Uuid::new_v4();
    harness.send(1, "alice", codes::LOCK, &acquire(LockKind::Update, vessel_id)).await;
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    harness.send(2, "bob", codes::LOCK, &acquire(LockKind::Control, vessel_id)).await;
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    harness.send(2, "bob", codes::LOCK, &acquire(LockKind::Update, vessel_id)).await;

    let bob_events = drain(&mut bob_rx).await;
    assert!(bob_events.iter().any(|m| m.opcode == codes::LOCK && m.json["action"] == "granted" && m.json["lock_type"] == "Update"));

    let alice_events = drain(&mut alice_rx).await;
    assert!(alice_events.iter().any(|m| m.opcode == codes::LOCK && m.json["action"] == "released" && m.json["lock_type"] == "Update"));
}

#[tokio::test]
async fn concurrent_update_is_denied_to_second_requester() {
    let harness = Harness::spawn(8, 60, WarpMode::Subspace, None).await;
    let mut alice_rx = harness.join(1, "alice", "Alice", None).await.expect("alice joins");
    let mut bob_rx = harness.join(2, "bob", "Bob", None).await.expect("bob joins");
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    let vessel_id = Uuid::new_v4();
    let acquire = |vessel_id: Uuid| LockPayload {
        action: LockAction::Acquire,
        lock_type: LockKind::Update,
        vessel_id: Some(vessel_id),
        kerbal_name: None,
        owner: None,
        reason: None,
    };

    harness.send(1, "alice", codes::LOCK, &acquire(vessel_id)).await;
    drain(&mut alice_rx).await;

    harness.send(2, "bob", codes::LOCK, &acquire(vessel_id)).await;
    let bob_events = drain(&mut bob_rx).await;
    assert!(bob_events.iter().any(|m| m.opcode == codes::LOCK && m.json["action"] == "denied"));
}

#[tokio::test]
async fn leaving_releases_every_lock_held() {
    let harness = Harness::spawn(8, 60, WarpMode::Subspace, None).await;
    let mut alice_rx = harness.join(1, "alice", "Alice", None).await.expect("alice joins");
    let mut bob_rx = harness.join(2, "bob", "Bob", None).await.expect("bob joins");
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    let vessel_id = Uuid::new_v4();
    harness
        .send(
            1,
            "alice",
            codes::LOCK,
            &LockPayload {
                action: LockAction::Acquire,
                lock_type: LockKind::Update,
                vessel_id: Some(vessel_id),
                kerbal_name: None,
                owner: None,
                reason: None,
            },
        )
        .await;
    drain(&mut alice_rx).await;

    harness.leave(1).await;
    let bob_events = drain(&mut bob_rx).await;
    assert!(bob_events.iter().any(|m| m.opcode == codes::LOCK && m.json["action"] == "released"));

    harness.send(2, "bob", codes::LOCK, &LockPayload {
        action: LockAction::Acquire,
        lock_type: LockKind::Update,
        vessel_id: Some(vessel_id),
        kerbal_name: None,
        owner: None,
        reason: None,
    }).await;
    let bob_events = drain(&mut bob_rx).await;
    assert!(bob_events.iter().any(|m| m.opcode == codes::LOCK && m.json["action"] == "granted"));
}
