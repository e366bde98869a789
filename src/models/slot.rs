use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// An admin-defined bookable time window. Bookings reference slots and the
/// store rejects deleting a slot that is still referenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub label: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TimeSlot {
    /// Choice text for forms, e.g. "Morning (09:00-11:00)".
    pub fn display(&self) -> String {
        format!(
            "{} ({}-{})",
            self.label,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}
