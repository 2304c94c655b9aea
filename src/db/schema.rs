//! Database schema and types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// SQL schema for initialization
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ussd_users (
    phone_number TEXT PRIMARY KEY,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ussd_sessions (
    session_id TEXT PRIMARY KEY,
    phone_number TEXT NOT NULL,
    service_code TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    started_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    ended_at TEXT,

    FOREIGN KEY (phone_number) REFERENCES ussd_users(phone_number) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_ussd_sessions_active ON ussd_sessions(is_active, updated_at);

CREATE TABLE IF NOT EXISTS ussd_session_states (
    session_id TEXT PRIMARY KEY,
    current_menu TEXT NOT NULL DEFAULT 'main_menu',
    menu_history TEXT NOT NULL DEFAULT '[]',
    temp_data TEXT NOT NULL DEFAULT '{}',
    version INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (session_id) REFERENCES ussd_sessions(session_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS bookings (
    reference_number TEXT PRIMARY KEY,
    phone_number TEXT NOT NULL,
    booking_date TEXT NOT NULL,
    time_slot TEXT NOT NULL,
    party_size INTEGER NOT NULL,
    special_requests TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (phone_number) REFERENCES ussd_users(phone_number) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_bookings_phone_date ON bookings(phone_number, booking_date);

CREATE TABLE IF NOT EXISTS menu_categories (
    slug TEXT PRIMARY KEY,
    is_active BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS menu_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    price_cents INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    is_available BOOLEAN NOT NULL DEFAULT 1,
    display_order INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (category) REFERENCES menu_categories(slug) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_menu_items_category ON menu_items(category, display_order);
"#;

/// A caller known by phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Registered means both names are on record
    pub fn is_registered(&self) -> bool {
        !self.first_name.is_empty() && !self.last_name.is_empty()
    }
}

/// Session state exactly as persisted; decoded into typed state by the
/// state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    pub current_menu: String,
    pub menu_history: Vec<String>,
    pub temp_data: Value,
}

impl Default for StoredState {
    fn default() -> Self {
        Self {
            current_menu: "main_menu".to_string(),
            menu_history: Vec::new(),
            temp_data: Value::Object(serde_json::Map::new()),
        }
    }
}

/// A gateway session and its current state
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub phone_number: String,
    pub service_code: String,
    pub is_active: bool,
    pub state: StoredState,
    /// Bumped on every state write; commits must present the version they read
    pub version: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Booking fields as collected from the caller, not yet validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub booking_date: String,
    pub time_slot: String,
    pub party_size: String,
    pub special_requests: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}


/// Stored table booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub reference_number: String,
    pub phone_number: String,
    pub booking_date: NaiveDate,
    pub time_slot: String,
    pub party_size: u32,
    pub special_requests: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything one callback writes, applied in a single transaction
#[derive(Debug, Clone, Default)]
pub struct TurnCommit {
    pub session_id: String,
    pub phone_number: String,
    /// Version read when the session was opened
    pub expected_version: i64,
    pub state: Option<StoredState>,
    pub user_name: Option<(String, String)>,
    pub booking: Option<NewBooking>,
    pub close_session: bool,
}

impl TurnCommit {
    pub fn new(session: &SessionRecord) -> Self {
        Self {
            session_id: session.session_id.clone(),
            phone_number: session.phone_number.clone(),
            expected_version: session.version,
            ..Self::default()
        }
    }
}
