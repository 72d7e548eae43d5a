// tests/scenario_replication.rs
//!
//! S4: scenario module blobs relay opaquely to every other session (never
//! back to the sender), and share-progress deltas accumulate server-side and
//! broadcast the new absolute totals to everyone, including the sender.

mod common;

use aetherlink::core::match_engine::warp::WarpMode;
use aetherlink::core::opcode::{codes, ScenarioPayload, ShareProgressPayload};
use base64::Engine;
use common::{drain, Harness};

#[tokio::test]
async fn scenario_blob_relays_to_others_not_sender() {
    let harness = Harness::spawn(8, 60, WarpMode::Subspace, None).await;
    let mut alice_rx = harness.join(1, "alice", "Alice", None).await.expect("join");
    let mut bob_rx = harness.join(2, "bob", "Bob", None).await.expect("join");
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    let blob = base64::engine::general_purpose::STANDARD.encode(b"contract-state");
    harness
        .send(1, "alice", codes::SCENARIO, &ScenarioPayload { module: "Contracts".to_string(), data: blob.clone() })
        .await;

    let bob_events = drain(&mut bob_rx).await;
    assert!(bob_events.iter().any(|m| m.opcode == codes::SCENARIO && m.json["module"] == "Contracts" && m.json["data"] == blob));

    let alice_events = drain(&mut alice_rx).await;
    assert!(alice_events.iter().all(|m| m.opcode != codes::SCENARIO));
}

#[tokio::test]
async fn share_progress_deltas_accumulate_and_broadcast_to_everyone() {
    let harness = Harness::spawn(8, 60, WarpMode::Subspace, None).await;
    let mut alice_rx = harness.join(1, "alice", "Alice", None).await.expect("join");
    let mut bob_rx = harness.join(2, "bob", "Bob", None).await.expect("join");
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    harness
        .send(
            1,
            "alice",
            codes::SHARE_PROGRESS,
            &ShareProgressPayload { science_delta: Some(10.0), funds_delta: Some(500.0), reputation_delta: None },
        )
        .await;
    drain(&mut alice_rx).await;
    drain(&mut bob_rx).await;

    harness
        .send(
            2,
            "bob",
            codes::SHARE_PROGRESS,
            &ShareProgressPayload { science_delta: Some(5.0), funds_delta: None, reputation_delta: Some(-2.0) },
        )
        .await;

    let alice_events = drain(&mut alice_rx).await;
    let bob_events = drain(&mut bob_rx).await;
    for events in [&alice_events, &bob_events] {
        let totals = events.iter().find(|m| m.opcode == codes::SHARE_PROGRESS).expect("share progress broadcast");
        assert_eq!(totals.json["science"], 15.0);
        assert_eq!(totals.json["funds"], 500.0);
        assert_eq!(totals.json["reputation"], -2.0);
    }
}
