//! Database module for the USSD service
//!
//! Provides persistence for users, sessions, session state, bookings and the
//! menu catalog.

mod schema;
mod seed;

pub use schema::*;

use crate::catalog::{slot_by_value, Category, MenuItem, MenuReader};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Attempts at drawing an unused booking reference before giving up
const MAX_REFERENCE_ATTEMPTS: usize = 20;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Session {0} was modified concurrently")]
    SessionConflict(String),
    #[error("Invalid booking: {0}")]
    InvalidBooking(String),
    #[error("Could not allocate a unique booking reference")]
    ReferenceExhausted,
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Fetch the user for a phone number, creating an unregistered one
    pub fn get_or_create_user(&self, phone_number: &str) -> DbResult<UserProfile> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT OR IGNORE INTO ussd_users (phone_number, created_at, updated_at)
             VALUES (?1, ?2, ?2)",
            params![phone_number, now],
        )?;

        conn.query_row(
            "SELECT phone_number, first_name, last_name, created_at, updated_at
             FROM ussd_users WHERE phone_number = ?1",
            params![phone_number],
            parse_user_row,
        )
        .map_err(DbError::from)
    }

    #[cfg(test)]
    pub fn set_user_name(&self, phone_number: &str, first_name: &str, last_name: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE ussd_users SET first_name = ?1, last_name = ?2, updated_at = ?3
             WHERE phone_number = ?4",
            params![first_name, last_name, Utc::now().to_rfc3339(), phone_number],
        )?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Get or create the session and its state row.
    ///
    /// New state starts at `main_menu` with empty history and no draft.
    pub fn open_session(
        &self,
        session_id: &str,
        phone_number: &str,
        service_code: &str,
    ) -> DbResult<SessionRecord> {
        let mut conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;

        let created = tx.execute(
            "INSERT OR IGNORE INTO ussd_sessions (session_id, phone_number, service_code, is_active, started_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)",
            params![session_id, phone_number, service_code, now],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO ussd_session_states (session_id, updated_at) VALUES (?1, ?2)",
            params![session_id, now],
        )?;
        tx.commit()?;

        if created > 0 {
            tracing::info!(session_id = %session_id, phone = %phone_number, "Session started");
        }

        load_session(&conn, session_id)
    }

    #[cfg(test)]
    pub fn get_session(&self, session_id: &str) -> DbResult<SessionRecord> {
        let conn = self.conn()?;
        load_session(&conn, session_id)
    }

    /// Apply every write of one callback atomically.
    ///
    /// The state write only succeeds if the stored version still matches the
    /// version the caller read; otherwise nothing is written. Returns the
    /// booking created by this turn, if any.
    pub fn commit_turn(&self, commit: &TurnCommit) -> DbResult<Option<Booking>> {
        let validated = commit.booking.as_ref().map(validate_booking).transpose()?;

        let mut conn = self.conn()?;
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let tx = conn.transaction()?;

        if let Some(state) = &commit.state {
            let updated = tx.execute(
                "UPDATE ussd_session_states
                 SET current_menu = ?1, menu_history = ?2, temp_data = ?3,
                     version = version + 1, updated_at = ?4
                 WHERE session_id = ?5 AND version = ?6",
                params![
                    state.current_menu,
                    serde_json::to_string(&state.menu_history)?,
                    serde_json::to_string(&state.temp_data)?,
                    now_str,
                    commit.session_id,
                    commit.expected_version,
                ],
            )?;
            if updated == 0 {
                return Err(DbError::SessionConflict(commit.session_id.clone()));
            }
        }

        if let Some((first_name, last_name)) = &commit.user_name {
            tx.execute(
                "UPDATE ussd_users SET first_name = ?1, last_name = ?2, updated_at = ?3
                 WHERE phone_number = ?4",
                params![first_name, last_name, now_str, commit.phone_number],
            )?;
        }

        let booking = match (commit.booking.as_ref(), validated) {
            (Some(new), Some((booking_date, party_size))) => {
                let reference_number = unused_reference(&tx)?;
                tx.execute(
                    "INSERT INTO bookings (reference_number, phone_number, booking_date, time_slot, party_size, special_requests, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                    params![
                        reference_number,
                        commit.phone_number,
                        booking_date.format("%Y-%m-%d").to_string(),
                        new.time_slot,
                        party_size,
                        new.special_requests,
                        BookingStatus::Pending.as_str(),
                        now_str,
                    ],
                )?;
                Some(Booking {
                    reference_number,
                    phone_number: commit.phone_number.clone(),
                    booking_date,
                    time_slot: new.time_slot.clone(),
                    party_size,
                    special_requests: new.special_requests.clone(),
                    status: BookingStatus::Pending,
                    created_at: now,
                    updated_at: now,
                })
            }
            _ => None,
        };

        if commit.close_session {
            tx.execute(
                "UPDATE ussd_sessions SET is_active = 0, ended_at = ?1, updated_at = ?1
                 WHERE session_id = ?2",
                params![now_str, commit.session_id],
            )?;
        } else {
            tx.execute(
                "UPDATE ussd_sessions SET updated_at = ?1 WHERE session_id = ?2",
                params![now_str, commit.session_id],
            )?;
        }

        tx.commit()?;
        Ok(booking)
    }

    /// Close active sessions with no activity since `cutoff`
    pub fn expire_stale_sessions(&self, cutoff: DateTime<Utc>) -> DbResult<usize> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let closed = conn.execute(
            "UPDATE ussd_sessions SET is_active = 0, ended_at = ?1
             WHERE is_active = 1 AND updated_at < ?2",
            params![now, cutoff.to_rfc3339()],
        )?;
        Ok(closed)
    }

    /// Overwrite a state row without any version check
    #[cfg(test)]
    pub fn write_raw_state(&self, session_id: &str, state: &StoredState) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE ussd_session_states SET current_menu = ?1, menu_history = ?2, temp_data = ?3
             WHERE session_id = ?4",
            params![
                state.current_menu,
                serde_json::to_string(&state.menu_history)?,
                serde_json::to_string(&state.temp_data)?,
                session_id,
            ],
        )?;
        Ok(())
    }

    /// Run arbitrary SQL against the connection
    #[cfg(test)]
    pub fn execute_raw(&self, sql: &str) -> DbResult<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    // ==================== Booking Operations ====================

    /// Live bookings for a phone number dated on or after `from`
    pub fn bookings_from(&self, phone_number: &str, from: NaiveDate) -> DbResult<Vec<Booking>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT reference_number, phone_number, booking_date, time_slot, party_size,
                    special_requests, status, created_at, updated_at
             FROM bookings
             WHERE phone_number = ?1 AND booking_date >= ?2
               AND status IN ('pending', 'confirmed')
             ORDER BY booking_date ASC, time_slot ASC",
        )?;

        let rows = stmt.query_map(
            params![phone_number, from.format("%Y-%m-%d").to_string()],
            parse_booking_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Catalog Operations ====================

    /// Insert the starter catalog when no items exist yet
    pub fn seed_catalog_if_empty(&self) -> DbResult<usize> {
        let mut conn = self.conn()?;
        let existing: i64 = conn.query_row("SELECT COUNT(*) FROM menu_items", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(0);
        }

        let tx = conn.transaction()?;
        for category in Category::ALL {
            tx.execute(
                "INSERT OR IGNORE INTO menu_categories (slug) VALUES (?1)",
                params![category.slug()],
            )?;
        }
        for (order, item) in seed::SEED_ITEMS.iter().enumerate() {
            tx.execute(
                "INSERT INTO menu_items (category, name, price_cents, description, display_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    item.category.slug(),
                    item.name,
                    item.price_cents,
                    item.description,
                    order as i64
                ],
            )?;
        }
        tx.commit()?;

        tracing::info!(items = seed::SEED_ITEMS.len(), "Seeded menu catalog");
        Ok(seed::SEED_ITEMS.len())
    }

    /// Available items of an active category in display order
    pub fn available_items(&self, category: Category) -> DbResult<Vec<MenuItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT i.id, i.category, i.name, i.price_cents, i.description, i.is_available
             FROM menu_items i
             JOIN menu_categories c ON c.slug = i.category
             WHERE i.category = ?1 AND i.is_available = 1 AND c.is_active = 1
             ORDER BY i.display_order ASC, i.id ASC",
        )?;

        let rows = stmt.query_map(params![category.slug()], parse_item_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn get_menu_item(&self, id: i64) -> DbResult<Option<MenuItem>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, category, name, price_cents, description, is_available
             FROM menu_items WHERE id = ?1",
            params![id],
            parse_item_row,
        )
        .optional()
        .map_err(DbError::from)
    }

    /// Mark an item on or off the menu
    #[cfg(test)]
    pub fn set_item_available(&self, id: i64, available: bool) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE menu_items SET is_available = ?1 WHERE id = ?2",
            params![available, id],
        )?;
        Ok(())
    }
}

impl MenuReader for Database {
    fn menu_items(&self, category: Category) -> DbResult<Vec<MenuItem>> {
        self.available_items(category)
    }

    fn menu_item(&self, id: i64) -> DbResult<Option<MenuItem>> {
        self.get_menu_item(id)
    }

    fn upcoming_bookings(&self, phone_number: &str, from: NaiveDate) -> DbResult<Vec<Booking>> {
        self.bookings_from(phone_number, from)
    }
}

/// Check raw booking fields before anything is written
fn validate_booking(booking: &NewBooking) -> DbResult<(NaiveDate, u32)> {
    let date = NaiveDate::parse_from_str(booking.booking_date.trim(), "%Y-%m-%d").map_err(|_| {
        DbError::InvalidBooking(format!(
            "booking date {:?} is not YYYY-MM-DD",
            booking.booking_date
        ))
    })?;

    let party_size = booking
        .party_size
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            DbError::InvalidBooking(format!(
                "party size {:?} is not a positive number",
                booking.party_size
            ))
        })?;

    if slot_by_value(&booking.time_slot).is_none() {
        return Err(DbError::InvalidBooking(format!(
            "unknown time slot {:?}",
            booking.time_slot
        )));
    }

    Ok((date, party_size))
}

/// Draw `BK` + 6 digits until one is not taken
fn unused_reference(conn: &Connection) -> DbResult<String> {
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_REFERENCE_ATTEMPTS {
        let candidate = format!("BK{:06}", rng.gen_range(0..1_000_000));
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE reference_number = ?1)",
            params![candidate],
            |row| row.get(0),
        )?;
        if !taken {
            return Ok(candidate);
        }
    }
    Err(DbError::ReferenceExhausted)
}

fn load_session(conn: &Connection, session_id: &str) -> DbResult<SessionRecord> {
    conn.query_row(
        "SELECT s.session_id, s.phone_number, s.service_code, s.is_active, s.started_at, s.ended_at,
                st.current_menu, st.menu_history, st.temp_data, st.version
         FROM ussd_sessions s
         JOIN ussd_session_states st ON st.session_id = s.session_id
         WHERE s.session_id = ?1",
        params![session_id],
        |row| {
            let history_json: String = row.get(7)?;
            let temp_json: String = row.get(8)?;
            Ok(SessionRecord {
                session_id: row.get(0)?,
                phone_number: row.get(1)?,
                service_code: row.get(2)?,
                is_active: row.get(3)?,
                started_at: parse_datetime(&row.get::<_, String>(4)?),
                ended_at: row
                    .get::<_, Option<String>>(5)?
                    .map(|s| parse_datetime(&s)),
                state: StoredState {
                    current_menu: row.get(6)?,
                    menu_history: serde_json::from_str(&history_json).unwrap_or_default(),
                    temp_data: serde_json::from_str(&temp_json).unwrap_or_default(),
                },
                version: row.get(9)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::SessionNotFound(session_id.to_string()),
        other => DbError::Sqlite(other),
    })
}

fn parse_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        phone_number: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn parse_booking_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Booking> {
    let date_str: String = row.get(2)?;
    let booking_date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Booking {
        reference_number: row.get(0)?,
        phone_number: row.get(1)?,
        booking_date,
        time_slot: row.get(3)?,
        party_size: row.get(4)?,
        special_requests: row.get(5)?,
        status: BookingStatus::parse(&row.get::<_, String>(6)?).unwrap_or(BookingStatus::Pending),
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn parse_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MenuItem> {
    let slug: String = row.get(1)?;
    let category = Category::from_slug(&slug).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown category {slug}").into(),
        )
    })?;

    Ok(MenuItem {
        id: row.get(0)?,
        category,
        name: row.get(2)?,
        price_cents: row.get(3)?,
        description: row.get(4)?,
        is_available: row.get(5)?,
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
