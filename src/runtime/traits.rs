//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the session runtime with mock implementations.

use crate::catalog::{Category, MenuItem, MenuReader};
use crate::db::{
    Booking, Database, DbResult, SessionRecord, TurnCommit, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Storage for users and session state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get or create the user for a phone number
    async fn load_user(&self, phone_number: &str) -> DbResult<UserProfile>;

    /// Get or create the session record with its current state
    async fn open_session(
        &self,
        session_id: &str,
        phone_number: &str,
        service_code: &str,
    ) -> DbResult<SessionRecord>;

    /// Apply the writes of one callback atomically
    async fn commit(&self, commit: &TurnCommit) -> DbResult<Option<Booking>>;

    /// Close active sessions idle since `cutoff`; returns how many
    async fn expire_stale(&self, cutoff: DateTime<Utc>) -> DbResult<usize>;
}

/// Combined storage trait for convenience
pub trait Storage: SessionStore + MenuReader {}
impl<T: SessionStore + MenuReader> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn load_user(&self, phone_number: &str) -> DbResult<UserProfile> {
        (**self).load_user(phone_number).await
    }

    async fn open_session(
        &self,
        session_id: &str,
        phone_number: &str,
        service_code: &str,
    ) -> DbResult<SessionRecord> {
        (**self)
            .open_session(session_id, phone_number, service_code)
            .await
    }

    async fn commit(&self, commit: &TurnCommit) -> DbResult<Option<Booking>> {
        (**self).commit(commit).await
    }

    async fn expire_stale(&self, cutoff: DateTime<Utc>) -> DbResult<usize> {
        (**self).expire_stale(cutoff).await
    }
}

impl<T: MenuReader + ?Sized> MenuReader for Arc<T> {
    fn menu_items(&self, category: Category) -> DbResult<Vec<MenuItem>> {
        (**self).menu_items(category)
    }

    fn menu_item(&self, id: i64) -> DbResult<Option<MenuItem>> {
        (**self).menu_item(id)
    }

    fn upcoming_bookings(&self, phone_number: &str, from: NaiveDate) -> DbResult<Vec<Booking>> {
        (**self).upcoming_bookings(phone_number, from)
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DatabaseStorage {
    async fn load_user(&self, phone_number: &str) -> DbResult<UserProfile> {
        self.db.get_or_create_user(phone_number)
    }

    async fn open_session(
        &self,
        session_id: &str,
        phone_number: &str,
        service_code: &str,
    ) -> DbResult<SessionRecord> {
        self.db.open_session(session_id, phone_number, service_code)
    }

    async fn commit(&self, commit: &TurnCommit) -> DbResult<Option<Booking>> {
        self.db.commit_turn(commit)
    }

    async fn expire_stale(&self, cutoff: DateTime<Utc>) -> DbResult<usize> {
        self.db.expire_stale_sessions(cutoff)
    }
}

impl MenuReader for DatabaseStorage {
    fn menu_items(&self, category: Category) -> DbResult<Vec<MenuItem>> {
        self.db.available_items(category)
    }

    fn menu_item(&self, id: i64) -> DbResult<Option<MenuItem>> {
        self.db.get_menu_item(id)
    }

    fn upcoming_bookings(&self, phone_number: &str, from: NaiveDate) -> DbResult<Vec<Booking>> {
        self.db.bookings_from(phone_number, from)
    }
}
