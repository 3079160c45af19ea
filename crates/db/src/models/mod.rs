//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for inserts where callers provide input

pub mod campaign;
pub mod execution_log;
pub mod schedule;
pub mod status;
pub mod time_slot;
