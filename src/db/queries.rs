use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingDetail, ServiceType, TimeSlot, User};

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ── Users ──

/// Returns false when the username is already taken (unique constraint).
pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<bool> {
    let created_at = user.created_at.format(DATETIME_FMT).to_string();
    let result = conn.execute(
        "INSERT INTO users (id, username, password_hash, is_staff, is_superuser, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.username,
            user.password_hash,
            user.is_staff as i32,
            user.is_superuser as i32,
            created_at,
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, username, password_hash, is_staff, is_superuser, created_at
         FROM users WHERE username = ?1",
        params![username],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn username_exists(conn: &Connection, username: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let created_at_str: String = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        is_staff: row.get::<_, i32>(3)? != 0,
        is_superuser: row.get::<_, i32>(4)? != 0,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, DATETIME_FMT)?,
    })
}

// ── Sessions ──

pub fn create_session(
    conn: &Connection,
    token: &str,
    user_id: &str,
    expires_at: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, expires_at.format(DATETIME_FMT).to_string()],
    )?;
    Ok(())
}

/// Resolve a session token to its user, ignoring expired sessions.
pub fn get_session_user(
    conn: &Connection,
    token: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT u.id, u.username, u.password_hash, u.is_staff, u.is_superuser, u.created_at
         FROM sessions s
         INNER JOIN users u ON u.id = s.user_id
         WHERE s.token = ?1 AND s.expires_at > ?2",
        params![token, now.format(DATETIME_FMT).to_string()],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn delete_session(conn: &Connection, token: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(count > 0)
}

// ── Time slots ──

pub fn list_slots(conn: &Connection) -> anyhow::Result<Vec<TimeSlot>> {
    let mut stmt = conn.prepare(
        "SELECT id, label, start_time, end_time FROM time_slots ORDER BY start_time ASC, label ASC",
    )?;

    let rows = stmt.query_map([], |row| Ok(parse_slot_row(row)))?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

pub fn get_slot(conn: &Connection, id: &str) -> anyhow::Result<Option<TimeSlot>> {
    let result = conn.query_row(
        "SELECT id, label, start_time, end_time FROM time_slots WHERE id = ?1",
        params![id],
        |row| Ok(parse_slot_row(row)),
    );

    match result {
        Ok(slot) => Ok(Some(slot?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Returns false when the label is already taken (unique constraint).
pub fn create_slot(conn: &Connection, slot: &TimeSlot) -> anyhow::Result<bool> {
    let result = conn.execute(
        "INSERT INTO time_slots (id, label, start_time, end_time) VALUES (?1, ?2, ?3, ?4)",
        params![
            slot.id,
            slot.label,
            slot.start_time.format(TIME_FMT).to_string(),
            slot.end_time.format(TIME_FMT).to_string(),
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub enum SlotDeletion {
    Deleted,
    NotFound,
    /// The slot is still referenced by at least one booking; the foreign key
    /// (ON DELETE RESTRICT) rejected the delete.
    Protected,
}

pub fn delete_slot(conn: &Connection, id: &str) -> anyhow::Result<SlotDeletion> {
    match conn.execute("DELETE FROM time_slots WHERE id = ?1", params![id]) {
        Ok(0) => Ok(SlotDeletion::NotFound),
        Ok(_) => Ok(SlotDeletion::Deleted),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(SlotDeletion::Protected)
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_slot_row(row: &rusqlite::Row) -> anyhow::Result<TimeSlot> {
    let start_str: String = row.get(2)?;
    let end_str: String = row.get(3)?;
    Ok(TimeSlot {
        id: row.get(0)?,
        label: row.get(1)?,
        start_time: NaiveTime::parse_from_str(&start_str, TIME_FMT)?,
        end_time: NaiveTime::parse_from_str(&end_str, TIME_FMT)?,
    })
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, customer_name, email, phone, car_model, service_type, preferred_date, slot_id, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.id,
            booking.user_id,
            booking.customer_name,
            booking.email,
            booking.phone,
            booking.car_model,
            booking.service_type.as_str(),
            booking.preferred_date.format(DATE_FMT).to_string(),
            booking.slot_id,
            booking.notes,
            booking.created_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, user_id, customer_name, email, phone, car_model, service_type, preferred_date, slot_id, notes, created_at
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Overwrites the customer-editable fields. Owner and creation timestamp
/// never change on update.
pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings
         SET customer_name = ?1, email = ?2, phone = ?3, car_model = ?4,
             service_type = ?5, preferred_date = ?6, slot_id = ?7, notes = ?8
         WHERE id = ?9",
        params![
            booking.customer_name,
            booking.email,
            booking.phone,
            booking.car_model,
            booking.service_type.as_str(),
            booking.preferred_date.format(DATE_FMT).to_string(),
            booking.slot_id,
            booking.notes,
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// List bookings joined with slot and owner, newest preferred date first and
/// latest slot start first within a date. `owner_filter` restricts the set to
/// one owner; `None` returns everything.
pub fn list_bookings(
    conn: &Connection,
    owner_filter: Option<&str>,
) -> anyhow::Result<Vec<BookingDetail>> {
    const BASE: &str = "SELECT b.id, b.user_id, b.customer_name, b.email, b.phone, b.car_model, \
         b.service_type, b.preferred_date, b.slot_id, b.notes, b.created_at, \
         s.id, s.label, s.start_time, s.end_time, u.username \
         FROM bookings b \
         INNER JOIN time_slots s ON s.id = b.slot_id \
         INNER JOIN users u ON u.id = b.user_id";
    const ORDER: &str = " ORDER BY b.preferred_date DESC, s.start_time DESC";

    let mut details = vec![];
    match owner_filter {
        Some(owner_id) => {
            let sql = format!("{BASE} WHERE b.user_id = ?1{ORDER}");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![owner_id], |row| Ok(parse_detail_row(row)))?;
            for row in rows {
                details.push(row??);
            }
        }
        None => {
            let sql = format!("{BASE}{ORDER}");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| Ok(parse_detail_row(row)))?;
            for row in rows {
                details.push(row??);
            }
        }
    }
    Ok(details)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let service_str: String = row.get(6)?;
    let date_str: String = row.get(7)?;
    let created_at_str: String = row.get(10)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        customer_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        car_model: row.get(5)?,
        service_type: ServiceType::parse(&service_str)
            .ok_or_else(|| anyhow::anyhow!("unknown service type in store: {service_str}"))?,
        preferred_date: NaiveDate::parse_from_str(&date_str, DATE_FMT)?,
        slot_id: row.get(8)?,
        notes: row.get(9)?,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, DATETIME_FMT)?,
    })
}

fn parse_detail_row(row: &rusqlite::Row) -> anyhow::Result<BookingDetail> {
    let booking = parse_booking_row(row)?;
    let start_str: String = row.get(13)?;
    let end_str: String = row.get(14)?;
    let slot = TimeSlot {
        id: row.get(11)?,
        label: row.get(12)?,
        start_time: NaiveTime::parse_from_str(&start_str, TIME_FMT)?,
        end_time: NaiveTime::parse_from_str(&end_str, TIME_FMT)?,
    };

    Ok(BookingDetail {
        booking,
        slot,
        owner_username: row.get(15)?,
    })
}
