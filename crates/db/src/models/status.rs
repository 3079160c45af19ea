//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Campaign serving status. Only `Active` campaigns are swept.
    CampaignStatus {
        Draft = 1,
        Active = 2,
        Paused = 3,
        Archived = 4,
    }
}

define_status_enum! {
    /// Schedule occurrence lifecycle status.
    ScheduleStatus {
        Scheduled = 1,
        Running = 2,
        Completed = 3,
        Failed = 4,
        Cancelled = 5,
    }
}

impl ScheduleStatus {
    /// Map a raw status ID back to the enum. Returns `None` for IDs outside
    /// the seed data.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(ScheduleStatus::Scheduled),
            2 => Some(ScheduleStatus::Running),
            3 => Some(ScheduleStatus::Completed),
            4 => Some(ScheduleStatus::Failed),
            5 => Some(ScheduleStatus::Cancelled),
            _ => None,
        }
    }

    /// Lowercase status name matching the `schedule_statuses` seed rows.
    pub fn name(self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::Running => "running",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Failed => "failed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_status_ids_match_seed_data() {
        assert_eq!(CampaignStatus::Draft.id(), 1);
        assert_eq!(CampaignStatus::Active.id(), 2);
        assert_eq!(CampaignStatus::Paused.id(), 3);
        assert_eq!(CampaignStatus::Archived.id(), 4);
    }

    #[test]
    fn schedule_status_ids_match_seed_data() {
        assert_eq!(ScheduleStatus::Scheduled.id(), 1);
        assert_eq!(ScheduleStatus::Running.id(), 2);
        assert_eq!(ScheduleStatus::Completed.id(), 3);
        assert_eq!(ScheduleStatus::Failed.id(), 4);
        assert_eq!(ScheduleStatus::Cancelled.id(), 5);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = ScheduleStatus::Running.into();
        assert_eq!(id, 2);
    }

    #[test]
    fn schedule_status_names_match_seed_data() {
        assert_eq!(ScheduleStatus::Scheduled.name(), "scheduled");
        assert_eq!(ScheduleStatus::Cancelled.name(), "cancelled");
    }
}
