//! Runtime for handling USSD sessions
//!
//! Owns everything around the pure state machine: loading and committing
//! session state, per-session serialization, notifications and expiry of
//! abandoned sessions.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{Callback, CallbackError, UssdRuntime};
pub use traits::*;

use crate::sms::SmsService;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = UssdRuntime<DatabaseStorage, Arc<dyn SmsService>>;

/// Longest pause between sweeps of stale sessions
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One async mutex per live session id
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    /// Wait for exclusive use of a session
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(session_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Forget a session's lock once nobody holds or waits on it
    pub async fn release(&self, session_id: &str) {
        let mut locks = self.locks.lock().await;
        // Waiters clone the Arc under the map lock, so a count of one is final
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
    }

    /// Number of sessions currently tracked
    #[cfg(test)]
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// Calendar date of `now` at the service's UTC offset
pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Periodically close sessions with no callback for longer than `ttl`
pub fn spawn_session_sweeper<S>(store: S, ttl: Duration) -> JoinHandle<()>
where
    S: SessionStore + 'static,
{
    let max_age = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::days(1));
    let period = ttl.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match store.expire_stale(Utc::now() - max_age).await {
                Ok(0) => {}
                Ok(closed) => tracing::info!(closed, "Closed stale sessions"),
                Err(e) => tracing::warn!(error = %e, "Stale session sweep failed"),
            }
        }
    })
}
