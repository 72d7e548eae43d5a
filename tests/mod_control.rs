// tests/mod_control.rs
//!
//! S9: the `mod_control` policy decides whether a mod-list mismatch at join
//! is ignored, logged, or rejected.

mod common;

use aetherlink::config::{ModControl, ModControlPolicy};
use aetherlink::core::errors::EngineError;
use aetherlink::core::match_engine::warp::WarpMode;
use common::Harness;

fn manifest() -> ModControl {
    ModControl {
        required_mods: vec!["MechJeb".to_string()],
        optional_mods: vec!["KerbalAlarmClock".to_string()],
        forbidden_mods: vec!["HyperEdit".to_string()],
        allowed_parts: Vec::new(),
    }
}

#[tokio::test]
async fn off_policy_admits_any_mod_list() {
    let harness =
        Harness::spawn_with_mod_control(8, 60, WarpMode::Subspace, None, true, ModControlPolicy::Off, manifest()).await;
    harness.join_with_mods(1, "alice", "Alice", None, vec!["HyperEdit".to_string()]).await.expect("off policy never checks");
}

#[tokio::test]
async fn warn_policy_admits_mismatched_mod_list() {
    let harness =
        Harness::spawn_with_mod_control(8, 60, WarpMode::Subspace, None, true, ModControlPolicy::Warn, manifest()).await;
    harness
        .join_with_mods(1, "alice", "Alice", None, Vec::new())
        .await
        .expect("warn policy logs the mismatch but still admits");
}

#[tokio::test]
async fn enforce_policy_rejects_missing_required_mod() {
    let harness = Harness::spawn_with_mod_control(8, 60, WarpMode::Subspace, None, true, ModControlPolicy::Enforce, manifest()).await;
    let err = harness.join_with_mods(1, "alice", "Alice", None, Vec::new()).await.unwrap_err();
    match err {
        EngineError::ModIncompatible { missing_required, forbidden_present } => {
            assert_eq!(missing_required, vec!["MechJeb".to_string()]);
            assert!(forbidden_present.is_empty());
        }
        other => panic!("expected ModIncompatible, got {other:?}"),
    }
}

#[tokio::test]
async fn enforce_policy_rejects_forbidden_mod() {
    let harness = Harness::spawn_with_mod_control(8, 60, WarpMode::Subspace, None, true, ModControlPolicy::Enforce, manifest()).await;
    let err = harness
        .join_with_mods(1, "alice", "Alice", None, vec!["MechJeb".to_string(), "HyperEdit".to_string()])
        .await
        .unwrap_err();
    match err {
        EngineError::ModIncompatible { missing_required, forbidden_present } => {
            assert!(missing_required.is_empty());
            assert_eq!(forbidden_present, vec!["HyperEdit".to_string()]);
        }
        other => panic!("expected ModIncompatible, got {other:?}"),
    }
}

#[tokio::test]
async fn enforce_policy_admits_a_compatible_mod_list() {
    let harness = Harness::spawn_with_mod_control(8, 60, WarpMode::Subspace, None, true, ModControlPolicy::Enforce, manifest()).await;
    harness
        .join_with_mods(1, "alice", "Alice", None, vec!["MechJeb".to_string(), "KerbalAlarmClock".to_string()])
        .await
        .expect("required present, forbidden absent");
}
