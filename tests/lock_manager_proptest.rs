// tests/lock_manager_proptest.rs

//! Property-based tests for the lock manager's core invariant: at most one
//! session holds a given (kind, target) pair at any time, and releasing a
//! session's locks never leaves a dangling entry for it.

use aetherlink::core::match_engine::lock_manager::{LockEvent, LockManager, LockTarget};
use aetherlink::core::opcode::LockKind;
use proptest::prelude::*;
use uuid::Uuid;

fn lock_kind_strategy() -> impl Strategy<Value = LockKind> {
    prop::sample::select(vec![
        LockKind::Control,
        LockKind::Update,
        LockKind::UnloadedUpdate,
        LockKind::Spectator,
        LockKind::Asteroid,
        LockKind::Kerbal,
        LockKind::Contract,
        LockKind::Misc,
    ])
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Acquire { kind: LockKind, target_idx: usize, requester: u64 },
    Release { kind: LockKind, target_idx: usize, requester: u64 },
    SessionLeaves { requester: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (lock_kind_strategy(), 0usize..4, 1u64..4).prop_map(|(kind, target_idx, requester)| Op::Acquire {
            kind,
            target_idx,
            requester
        }),
        (lock_kind_strategy(), 0usize..4, 1u64..4).prop_map(|(kind, target_idx, requester)| Op::Release {
            kind,
            target_idx,
            requester
        }),
        (1u64..4).prop_map(|requester| Op::SessionLeaves { requester }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

    #[test]
    fn at_most_one_holder_per_key_at_all_times(ops in prop::collection::vec(op_strategy(), 1..=200)) {
        let mut lm = LockManager::new();
        let targets: Vec<LockTarget> = (0..4).map(|_| LockTarget::Vessel(Uuid::new_v4())).collect();

        for op in ops {
            let events = match op {
                Op::Acquire { kind, target_idx, requester } => {
                    lm.acquire(kind, targets[target_idx].clone(), requester)
                }
                Op::Release { kind, target_idx, requester } => {
                    lm.release(kind, targets[target_idx].clone(), requester)
                }
                Op::SessionLeaves { requester } => lm.release_all_for_session(requester),
            };

            // Every Granted event must be immediately reflected in holder_of,
            // and no two Granted events for the same key can appear without an
            // intervening Released for the prior holder.
            for event in &events {
                if let LockEvent::Granted { kind, target, holder } = event {
                    prop_assert_eq!(lm.holder_of(*kind, target), Some(*holder));
                }
            }
        }
    }

    #[test]
    fn leaving_clears_every_lock_the_session_held(ops in prop::collection::vec(op_strategy(), 1..=100), leaver in 1u64..4) {
        let mut lm = LockManager::new();
        let targets: Vec<LockTarget> = (0..4).map(|_| LockTarget::Vessel(Uuid::new_v4())).collect();

        for op in ops {
            match op {
                Op::Acquire { kind, target_idx, requester } => {
                    lm.acquire(kind, targets[target_idx].clone(), requester);
                }
                Op::Release { kind, target_idx, requester } => {
                    lm.release(kind, targets[target_idx].clone(), requester);
                }
                Op::SessionLeaves { requester } => {
                    lm.release_all_for_session(requester);
                }
            }
        }

        lm.release_all_for_session(leaver);
        for kind in [
            LockKind::Control,
            LockKind::Update,
            LockKind::UnloadedUpdate,
            LockKind::Spectator,
            LockKind::Asteroid,
            LockKind::Kerbal,
            LockKind::Contract,
            LockKind::Misc,
        ] {
            for target in &targets {
                prop_assert_ne!(lm.holder_of(kind, target), Some(leaver));
            }
        }
    }
}
