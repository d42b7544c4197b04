//! Type-safe wrappers around [`RegionClient`](crate::framework::RegionClient).

pub mod customer_client;

pub use customer_client::*;
