//! Test doubles and fixtures for the session runtime
//!
//! These enable state machine and runtime tests without real I/O.

use super::traits::*;
use super::UssdRuntime;
use crate::catalog::{Category, MenuItem, MenuReader};
use crate::config::Branding;
use crate::db::{
    Booking, Database, DbError, DbResult, SessionRecord, TurnCommit, UserProfile,
};
use crate::sms::{SmsError, SmsService};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Fixtures
// ============================================================================

pub fn registered_user() -> UserProfile {
    UserProfile {
        phone_number: "+254711000222".to_string(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn unregistered_user(phone_number: &str) -> UserProfile {
    UserProfile {
        phone_number: phone_number.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Fixed "today" for state machine tests
pub fn test_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 15).unwrap_or_default()
}

fn item(
    id: i64,
    category: Category,
    name: &str,
    price_cents: i64,
    description: &str,
    is_available: bool,
) -> MenuItem {
    MenuItem {
        id,
        category,
        name: name.to_string(),
        price_cents,
        description: description.to_string(),
        is_available,
    }
}

// ============================================================================
// Fixed Catalog
// ============================================================================

/// In-memory catalog and booking list
#[derive(Debug, Clone, Default)]
pub struct FixedCatalog {
    items: Vec<MenuItem>,
    bookings: Vec<Booking>,
    failing: bool,
}

impl FixedCatalog {
    pub fn sample() -> Self {
        Self {
            items: vec![
                item(1, Category::Breakfast, "Pancakes", 45000, "With honey", true),
                item(2, Category::Breakfast, "Full Breakfast", 65000, "Eggs and toast", true),
                item(5, Category::Appetizers, "Samosas", 30000, "Beef samosas", true),
                item(10, Category::Drinks, "Chai", 15000, "Kenyan spiced tea", true),
                item(11, Category::Drinks, "Smoothie", 30000, "Seasonal fruit", false),
                item(12, Category::Drinks, "Passion Juice", 25000, "Fresh", true),
                item(20, Category::MainDishes, "Nyama Choma", 120000, "Grilled goat", true),
            ],
            ..Self::default()
        }
    }

    pub fn with_bookings(mut self, bookings: Vec<Booking>) -> Self {
        self.bookings = bookings;
        self
    }

    /// Every read fails
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check(&self) -> DbResult<()> {
        if self.failing {
            return Err(DbError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        Ok(())
    }
}

impl MenuReader for FixedCatalog {
    fn menu_items(&self, category: Category) -> DbResult<Vec<MenuItem>> {
        self.check()?;
        Ok(self
            .items
            .iter()
            .filter(|item| item.category == category && item.is_available)
            .cloned()
            .collect())
    }

    fn menu_item(&self, id: i64) -> DbResult<Option<MenuItem>> {
        self.check()?;
        Ok(self.items.iter().find(|item| item.id == id).cloned())
    }

    fn upcoming_bookings(&self, phone_number: &str, from: NaiveDate) -> DbResult<Vec<Booking>> {
        self.check()?;
        Ok(self
            .bookings
            .iter()
            .filter(|b| b.phone_number == phone_number && b.booking_date >= from)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Recording SMS
// ============================================================================

/// SMS service that keeps every message it is asked to send
#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records messages but reports every send as failed
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `count` messages were sent (sends run in the background)
    pub async fn wait_for(&self, count: usize) -> Vec<(String, String)> {
        for _ in 0..200 {
            let messages = self.messages();
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.messages()
    }
}

#[async_trait]
impl SmsService for RecordingSms {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError> {
        self.sent
            .lock()
            .unwrap()
            .push((phone_number.to_string(), message.to_string()));
        if self.fail {
            return Err(SmsError::network("Recording SMS set to fail"));
        }
        Ok(())
    }

    fn provider(&self) -> &str {
        "recording"
    }
}

// ============================================================================
// Failing Storage
// ============================================================================

/// Real database storage whose commits always fail
pub struct FailingCommitStorage {
    inner: DatabaseStorage,
}

impl FailingCommitStorage {
    pub fn new(db: Database) -> Self {
        Self {
            inner: DatabaseStorage::new(db),
        }
    }
}

#[async_trait]
impl SessionStore for FailingCommitStorage {
    async fn load_user(&self, phone_number: &str) -> DbResult<UserProfile> {
        self.inner.load_user(phone_number).await
    }

    async fn open_session(
        &self,
        session_id: &str,
        phone_number: &str,
        service_code: &str,
    ) -> DbResult<SessionRecord> {
        self.inner
            .open_session(session_id, phone_number, service_code)
            .await
    }

    async fn commit(&self, _commit: &TurnCommit) -> DbResult<Option<Booking>> {
        Err(DbError::Sqlite(rusqlite::Error::InvalidQuery))
    }

    async fn expire_stale(&self, cutoff: DateTime<Utc>) -> DbResult<usize> {
        self.inner.expire_stale(cutoff).await
    }
}

impl MenuReader for FailingCommitStorage {
    fn menu_items(&self, category: Category) -> DbResult<Vec<MenuItem>> {
        self.inner.menu_items(category)
    }

    fn menu_item(&self, id: i64) -> DbResult<Option<MenuItem>> {
        self.inner.menu_item(id)
    }

    fn upcoming_bookings(&self, phone_number: &str, from: NaiveDate) -> DbResult<Vec<Booking>> {
        self.inner.upcoming_bookings(phone_number, from)
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

pub type TestRuntime = UssdRuntime<DatabaseStorage, Arc<RecordingSms>>;

/// Runtime over a seeded in-memory database with recorded SMS
pub fn test_runtime() -> (TestRuntime, Database, Arc<RecordingSms>) {
    let db = Database::open_in_memory().unwrap();
    db.seed_catalog_if_empty().unwrap();
    let sms = Arc::new(RecordingSms::new());
    let runtime = UssdRuntime::new(
        DatabaseStorage::new(db.clone()),
        Arc::clone(&sms),
        Branding::default(),
    );
    (runtime, db, sms)
}

/// Register a phone number directly in storage
pub fn register(db: &Database, phone_number: &str, first_name: &str, last_name: &str) {
    db.get_or_create_user(phone_number).unwrap();
    db.set_user_name(phone_number, first_name, last_name).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{local_date, spawn_session_sweeper, Callback, CallbackError};
    use chrono::FixedOffset;
    use crate::state_machine::Response;

    const PHONE: &str = "+254722333444";

    fn callback(session_id: &str, text: &str) -> Callback {
        Callback {
            session_id: session_id.to_string(),
            service_code: "*384*12#".to_string(),
            phone_number: PHONE.to_string(),
            text: text.to_string(),
        }
    }

    /// Send every cumulative prefix of `path` in one session
    async fn dial(runtime: &TestRuntime, session_id: &str, path: &str) -> Vec<Response> {
        let parts: Vec<&str> = path.split('*').collect();
        let mut responses = vec![runtime.handle(&callback(session_id, "")).await.unwrap()];
        if path.is_empty() {
            return responses;
        }
        for n in 1..=parts.len() {
            let text = parts[..n].join("*");
            responses.push(runtime.handle(&callback(session_id, &text)).await.unwrap());
        }
        responses
    }

    /// Send prefixes of `path` until one fails
    async fn dial_until_error(runtime: &TestRuntime, session_id: &str, path: &str) -> CallbackError {
        let parts: Vec<&str> = path.split('*').collect();
        for n in 0..=parts.len() {
            let text = parts[..n].join("*");
            if let Err(e) = runtime.handle(&callback(session_id, &text)).await {
                return e;
            }
        }
        panic!("no callback failed for {path}");
    }

    #[tokio::test]
    async fn test_new_number_gets_registration_welcome() {
        let (runtime, db, _sms) = test_runtime();

        let response = runtime.handle(&callback("s1", "")).await.unwrap();

        assert!(!response.terminate);
        assert!(response.text.contains("You need to register first."));
        assert!(!db.get_or_create_user(PHONE).unwrap().is_registered());
        assert_eq!(db.get_session("s1").unwrap().state.current_menu, "registration");
    }

    #[tokio::test]
    async fn test_registration_then_main_menu() {
        let (runtime, db, _sms) = test_runtime();

        let responses = dial(&runtime, "s1", "jane*doe*1").await;
        let done = responses.last().unwrap();
        assert!(done.terminate);
        assert!(done.text.starts_with("Registration successful!"));

        let user = db.get_or_create_user(PHONE).unwrap();
        assert_eq!((user.first_name.as_str(), user.last_name.as_str()), ("Jane", "Doe"));

        let next = runtime.handle(&callback("s2", "")).await.unwrap();
        assert!(next.text.starts_with("Welcome Jane!"));
    }

    #[tokio::test]
    async fn test_booking_end_to_end() {
        let (runtime, db, sms) = test_runtime();
        register(&db, PHONE, "Jane", "Doe");

        let responses = dial(&runtime, "s1", "2*2024-05-01*2*3*none*1").await;
        let done = responses.last().unwrap();

        assert!(done.terminate);
        assert!(done.text.contains("Booking successful"));

        let bookings = db
            .bookings_from(PHONE, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].time_slot, "11:00");
        assert_eq!(bookings[0].party_size, 3);
        assert_eq!(bookings[0].special_requests, "none");

        let session = db.get_session("s1").unwrap();
        assert!(!session.is_active);
        assert_eq!(session.state.current_menu, "main_menu");
        assert_eq!(session.state.temp_data, serde_json::json!({}));

        let sent = sms.wait_for(1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, PHONE);
        assert!(sent[0].1.contains(&bookings[0].reference_number));
    }

    #[tokio::test]
    async fn test_sms_failure_does_not_fail_booking() {
        let db = Database::open_in_memory().unwrap();
        let sms = Arc::new(RecordingSms::failing());
        let runtime = UssdRuntime::new(
            DatabaseStorage::new(db.clone()),
            Arc::clone(&sms),
            Branding::default(),
        );
        register(&db, PHONE, "Jane", "Doe");

        let responses = dial(&runtime, "s1", "2*2030-05-01*1*2*none*1").await;

        assert!(responses.last().unwrap().text.contains("Booking successful"));
        assert_eq!(sms.wait_for(1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_booking_date_fails_callback() {
        let (runtime, db, sms) = test_runtime();
        register(&db, PHONE, "Jane", "Doe");

        let responses = dial(&runtime, "s1", "2*tomorrow*2*3*none").await;
        assert!(responses.last().unwrap().text.starts_with("Confirm booking:"));

        let err = runtime
            .handle(&callback("s1", "2*tomorrow*2*3*none*1"))
            .await
            .unwrap_err();

        assert!(matches!(err, CallbackError::Storage(DbError::InvalidBooking(_))));
        let session = db.get_session("s1").unwrap();
        assert!(session.is_active);
        assert_eq!(session.state.current_menu, "book_table_menu");
        assert!(sms.messages().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_menu_falls_back_to_main_menu() {
        let (runtime, db, _sms) = test_runtime();
        register(&db, PHONE, "Jane", "Doe");
        db.open_session("s1", PHONE, "*384*12#").unwrap();
        db.write_raw_state(
            "s1",
            &crate::db::StoredState {
                current_menu: "ghost_menu".to_string(),
                menu_history: vec!["main_menu".to_string()],
                temp_data: serde_json::json!({"booking_date": "2024-05-01"}),
            },
        )
        .unwrap();

        let response = runtime.handle(&callback("s1", "7")).await.unwrap();

        assert!(!response.terminate);
        assert!(response.text.contains("1. View Menu"));
        let session = db.get_session("s1").unwrap();
        assert_eq!(session.state, crate::db::StoredState::default());
    }

    #[tokio::test]
    async fn test_my_bookings_empty() {
        let (runtime, db, _sms) = test_runtime();
        register(&db, PHONE, "Jane", "Doe");

        let responses = dial(&runtime, "s1", "3").await;
        let done = responses.last().unwrap();

        assert_eq!(done.text, "You have no bookings.\n");
        assert!(done.terminate);
    }

    #[tokio::test]
    async fn test_my_bookings_lists_future_booking() {
        let (runtime, db, _sms) = test_runtime();
        register(&db, PHONE, "Jane", "Doe");
        dial(&runtime, "s1", "2*2099-12-31*4*6*none*1").await;

        let responses = dial(&runtime, "s2", "3").await;
        let listing = responses.last().unwrap();

        assert!(listing.terminate);
        assert!(listing.text.starts_with("Your bookings:\n"));
        assert!(listing.text.contains("2099-12-31, 08:00 PM - 10:00 PM"));
        assert!(listing.text.contains("Party of 6"));
    }

    #[tokio::test]
    async fn test_upcoming_uses_local_date() {
        let (runtime, db, _sms) = test_runtime();
        let offset = FixedOffset::east_opt(23 * 3600).unwrap();
        let runtime = runtime.with_utc_offset(offset);
        register(&db, PHONE, "Jane", "Doe");

        let today = local_date(Utc::now(), offset);
        let yesterday = today.pred_opt().unwrap();
        dial(&runtime, "s1", &format!("2*{yesterday}*1*2*none*1")).await;
        dial(&runtime, "s2", &format!("2*{today}*2*5*none*1")).await;

        let responses = dial(&runtime, "s3", "3").await;
        let listing = responses.last().unwrap();

        assert!(listing.text.contains(&format!("{today}, 11:00 AM")), "{}", listing.text);
        assert!(!listing.text.contains(&yesterday.to_string()), "{}", listing.text);
    }

    #[tokio::test]
    async fn test_browse_seeded_catalog() {
        let (runtime, db, _sms) = test_runtime();
        register(&db, PHONE, "Jane", "Doe");

        let responses = dial(&runtime, "s1", "1*3*1").await;

        assert!(responses[2].text.starts_with("Drinks:\n1. Chai - KES 150.00"));
        assert!(responses[3].text.starts_with("Chai\nKES 150.00\nKenyan spiced tea"));
        let session = db.get_session("s1").unwrap();
        assert_eq!(session.state.current_menu, "item_detail");
        assert_eq!(session.state.menu_history.len(), 3);
    }

    #[tokio::test]
    async fn test_ended_session_is_not_resumed() {
        let (runtime, db, _sms) = test_runtime();
        register(&db, PHONE, "Jane", "Doe");
        dial(&runtime, "s1", "4").await;
        let version = db.get_session("s1").unwrap().version;

        let response = runtime.handle(&callback("s1", "4*1")).await.unwrap();

        assert!(response.terminate);
        assert!(response.text.starts_with("Session ended."));
        assert_eq!(db.get_session("s1").unwrap().version, version);
    }

    #[tokio::test]
    async fn test_locks_released_on_every_exit() {
        let (runtime, db, _sms) = test_runtime();
        register(&db, PHONE, "Jane", "Doe");

        // Abandoned mid-flow, then closed by the sweeper
        for i in 0..20 {
            runtime.handle(&callback(&format!("a{i}"), "")).await.unwrap();
        }
        assert_eq!(runtime.locks.tracked().await, 0);

        let sweeper = spawn_session_sweeper(DatabaseStorage::new(db.clone()), Duration::ZERO);
        for _ in 0..100 {
            if !db.get_session("a19").unwrap().is_active {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        sweeper.abort();
        assert!(!db.get_session("a19").unwrap().is_active);

        // Callback for an ended session
        let ended = runtime.handle(&callback("a0", "1")).await.unwrap();
        assert!(ended.text.starts_with("Session ended."));

        // Failed commit
        let err = dial_until_error(&runtime, "b1", "2*not-a-date*1*2*none*1").await;
        assert!(matches!(err, CallbackError::Storage(DbError::InvalidBooking(_))));

        assert_eq!(runtime.locks.tracked().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_callbacks_are_serialized() {
        let (runtime, db, _sms) = test_runtime();
        register(&db, PHONE, "Jane", "Doe");
        let runtime = Arc::new(runtime);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let runtime = Arc::clone(&runtime);
                tokio::spawn(async move { runtime.handle(&callback("s1", "1")).await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok(), "a callback hit a version conflict");
        }
        assert!(db.get_session("s1").unwrap().version >= 1);
    }

    #[tokio::test]
    async fn test_commit_failure_propagates() {
        let db = Database::open_in_memory().unwrap();
        let runtime = UssdRuntime::new(
            FailingCommitStorage::new(db),
            RecordingSms::new(),
            Branding::default(),
        );

        let err = runtime.handle(&callback("s1", "")).await.unwrap_err();

        assert!(matches!(err, CallbackError::Storage(_)));
    }

    #[tokio::test]
    async fn test_sweeper_closes_idle_sessions() {
        let (runtime, db, _sms) = test_runtime();
        runtime.handle(&callback("s1", "")).await.unwrap();

        let sweeper = spawn_session_sweeper(DatabaseStorage::new(db.clone()), Duration::ZERO);
        for _ in 0..100 {
            if !db.get_session("s1").unwrap().is_active {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        sweeper.abort();

        assert!(!db.get_session("s1").unwrap().is_active);
    }

    #[tokio::test]
    async fn test_fixed_catalog_failure() {
        let catalog = FixedCatalog::sample().failing();
        assert!(catalog.menu_items(Category::Drinks).is_err());
        assert!(catalog.upcoming_bookings(PHONE, test_today()).is_err());
    }
}
