// benches/tick_bench.rs

//! Benchmarks the per-message cost of the opcode router and the two
//! subsystems most exposed to per-tick load: the lock manager and the warp
//! clock. These are the pieces most likely to regress if a future change
//! makes the router do more work per message.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uuid::Uuid;

use aetherlink::core::match_engine::admin::AdminState;
use aetherlink::core::match_engine::dispatcher::Dispatcher;
use aetherlink::core::match_engine::lock_manager::{LockManager, LockTarget};
use aetherlink::core::match_engine::player::Player;
use aetherlink::core::match_engine::router;
use aetherlink::core::match_engine::state::{GameMode, MatchState};
use aetherlink::core::match_engine::warp::{WarpMode, WarpState};
use aetherlink::core::opcode::{ClientMessage, LockKind, PlayerStatusPayload};

fn new_match_state() -> MatchState {
    let mut state = MatchState::new(
        Uuid::new_v4(),
        "bench-match".to_string(),
        None,
        GameMode::Sandbox,
        64,
        20,
        WarpMode::Subspace,
        AdminState::default(),
    );
    state.join(Player::new(1, "user-1".to_string(), "Jeb".to_string(), 0));
    state
}

fn bench_router_player_status(c: &mut Criterion) {
    let mut state = new_match_state();
    let dispatcher = Dispatcher::new();

    c.bench_function("route_player_status", |b| {
        b.iter(|| {
            let payload = PlayerStatusPayload { status: "in_flight".to_string(), vessel_id: None, body: None };
            let intent = router::route(&mut state, &dispatcher, 1, ClientMessage::PlayerStatus(payload));
            black_box(intent);
        });
    });
}

fn bench_lock_manager(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock_manager");

    group.bench_function("acquire_release_cycle", |b| {
        let mut locks = LockManager::new();
        let vessel = Uuid::new_v4();
        b.iter(|| {
            let target = LockTarget::Vessel(vessel);
            black_box(locks.acquire(LockKind::Update, target.clone(), 1));
            black_box(locks.release(LockKind::Update, target, 1));
        });
    });

    group.bench_function("control_forces_update", |b| {
        let mut locks = LockManager::new();
        let vessel = Uuid::new_v4();
        b.iter(|| {
            let target = LockTarget::Vessel(vessel);
            black_box(locks.acquire(LockKind::Control, target, 1));
            black_box(locks.release_all_for_session(1));
        });
    });

    group.finish();
}

fn bench_warp_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("warp_advance");

    group.bench_function("subspace_mode", |b| {
        let mut warp = WarpState::new(WarpMode::Subspace, 0.0);
        for session_id in 0..32 {
            warp.join(session_id);
            warp.set_rate(session_id, 1.0 + (session_id as f64 * 0.1));
        }
        b.iter(|| black_box(warp.advance(black_box(0.05))));
    });

    group.bench_function("mcu_mode", |b| {
        let mut warp = WarpState::new(WarpMode::Mcu, 0.0);
        for session_id in 0..32 {
            warp.join(session_id);
            warp.set_rate(session_id, 1.0 + (session_id as f64 * 0.1));
        }
        b.iter(|| black_box(warp.advance(black_box(0.05))));
    });

    group.finish();
}

criterion_group!(benches, bench_router_player_status, bench_lock_manager, bench_warp_advance);
criterion_main!(benches);
