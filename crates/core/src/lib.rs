//! Pure domain logic for the Vendora ad scheduling engine.
//!
//! Zero internal dependencies: everything here is usable from the repository
//! layer, the scheduler, and any future CLI tooling without pulling in sqlx.

pub mod error;
pub mod retry;
pub mod scheduling;
pub mod slot_time;
pub mod types;
