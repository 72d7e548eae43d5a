// src/core/metrics.rs

//! Defines and registers Prometheus metrics for engine monitoring.
//!
//! Metrics are registered exactly once, globally, for the entire application
//! lifecycle via `lazy_static`.

use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};

lazy_static! {
    /// The number of matches currently running.
    pub static ref ACTIVE_MATCHES: Gauge =
        register_gauge!("aetherlink_active_matches", "Number of currently active matches.").unwrap();
    /// The number of players connected across all matches.
    pub static ref CONNECTED_PLAYERS: Gauge =
        register_gauge!("aetherlink_connected_players", "Number of currently connected players.").unwrap();
    /// Total ticks processed since startup.
    pub static ref TICKS_PROCESSED_TOTAL: Counter =
        register_counter!("aetherlink_ticks_processed_total", "Total number of ticks processed across all matches.").unwrap();
    /// Total ticks that exceeded their budget (2x tick period).
    pub static ref TICK_OVERRUNS_TOTAL: Counter =
        register_counter!("aetherlink_tick_overruns_total", "Total number of ticks that exceeded their time budget.").unwrap();
    /// Total messages dropped for protocol, authorization, or rate-limit reasons.
    pub static ref MESSAGES_DROPPED_TOTAL: Counter =
        register_counter!("aetherlink_messages_dropped_total", "Total number of inbound messages dropped.").unwrap();
    /// Total vessel anti-cheat rejections.
    pub static ref ANTICHEAT_REJECTIONS_TOTAL: Counter =
        register_counter!("aetherlink_anticheat_rejections_total", "Total number of vessel updates rejected by anti-cheat checks.").unwrap();
    /// Total assets currently stored across all kinds.
    pub static ref ASSETS_STORED: Gauge =
        register_gauge!("aetherlink_assets_stored", "Total number of assets currently stored.").unwrap();
    /// A histogram of tick processing latencies.
    pub static ref TICK_LATENCY_SECONDS: Histogram =
        register_histogram!("aetherlink_tick_latency_seconds", "Latency of a single match tick in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap()
}
