//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter once per process.
//! Module paths are hidden (`with_target(false)`); log lines carry structured fields such
//! as `entity_id`, `producer_id` and `burst_count` instead.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the given default level:
//!
//! ```bash
//! # Planner diagnostics, entity starts and bursts
//! RUST_LOG=info cargo run
//!
//! # Every routed envelope, delivery and confirmation
//! RUST_LOG=debug cargo run
//!
//! # Only the region
//! RUST_LOG=shard_scaling::framework::region=debug cargo run
//! ```
//!
//! A burst at `info` reads like:
//!
//! ```text
//! INFO Bursting
//! INFO Sending burst_count=0 item="Candies" customer=Han Solo
//! INFO Entity started entity_id=Han Solo shard_id=shard_4 entities=1
//! INFO Purchased entity_id=Han Solo item=Candies
//! ```
use tracing_subscriber::EnvFilter;

pub fn setup_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
