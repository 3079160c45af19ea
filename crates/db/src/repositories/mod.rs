//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod campaign_repo;
pub mod execution_log_repo;
pub mod schedule_repo;
pub mod time_slot_repo;

pub use campaign_repo::CampaignRepo;
pub use execution_log_repo::ExecutionLogRepo;
pub use schedule_repo::ScheduleRepo;
pub use time_slot_repo::TimeSlotRepo;
