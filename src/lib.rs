//! # Shard Scaling
//!
//! > **A sharded, flow-controlled order workload on Tokio actors.**
//!
//! Customers are small stateful entities spread over shards by name. A producer on each
//! frontend node generates bursts of purchases, and it may only send as fast as the
//! customers confirm them.
//!
//! ## Core Concepts
//!
//! ### Demand before data
//! The producer never pushes. A [`ProducerController`](framework::ProducerController) hands it
//! one demand token at a time ([`SendNext`](framework::SendNext)); each token is spent by
//! exactly one send. Each customer gets one delivery at a time, and it must confirm that
//! delivery before it gets the next.
//!
//! ### One task per entity
//! The [`ShardRegion`](framework::ShardRegion) spawns a task per customer on the first message
//! addressed to it and passivates customers that go idle. Each task owns its state, so the
//! purchase history needs no lock.
//!
//! ### Planning, not mutating
//! Cluster formation settings are resolved by a pure function,
//! [`config::plan()`], from raw environment options into an immutable
//! [`BootstrapPlan`](config::BootstrapPlan).
//!
//! ## Module Tour
//!
//! ### 1. The Substrate ([`framework`])
//! Generic sharding: entity trait, message extractor, region, producer controller.
//!
//! ### 2. The Actors ([`customer_actor`], [`producer_actor`])
//! The customer entity and the burst producer.
//!
//! ### 3. The Interface ([`clients`])
//! [`CustomerClient`](clients::CustomerClient) wraps the region client.
//!
//! ### 4. The Orchestrator ([`lifecycle`], [`config`])
//! [`ShardingSystem`](lifecycle::ShardingSystem) wires everything for a role and shuts it
//! down in order.
//!
//! ## Running
//!
//! ```bash
//! # A frontend with no simulated CPU load and a burst every minute
//! IS_FRONTEND=true CUSTOMER_CPU_LOAD_PERCENT=0 BURST_INTERVAL_SECS=60 RUST_LOG=info cargo run
//! ```

pub mod clients;
pub mod config;
pub mod customer_actor;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod producer_actor;
