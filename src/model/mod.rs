//! Pure data structures shared by the producer and the customer entities.

pub mod customer;
pub mod entity_id;

pub use customer::*;
pub use entity_id::*;
