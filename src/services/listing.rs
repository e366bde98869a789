use rusqlite::Connection;

use crate::db::queries;
use crate::models::{BookingDetail, Identity};
use crate::services::policy::{self, ListScope};

/// The booking set the given identity is allowed to see, newest preferred
/// date first, latest slot start first within a date.
pub fn visible_bookings(conn: &Connection, who: &Identity) -> anyhow::Result<Vec<BookingDetail>> {
    let scope = policy::list_scope(who);
    let owner_filter = match &scope {
        ListScope::All => None,
        ListScope::OwnedBy(user_id) => Some(user_id.as_str()),
    };
    queries::list_bookings(conn, owner_filter)
}
