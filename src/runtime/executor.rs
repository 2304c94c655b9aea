//! Session runtime executor
//!
//! Runs one gateway callback end to end: load, transition, commit, notify.

use super::traits::Storage;
use super::{local_date, SessionLocks};

use crate::config::Branding;
use crate::db::{Booking, DbError, TurnCommit};
use crate::sms::{booking_confirmation, SmsService};
use crate::state_machine::{
    transition, Effect, MenuContext, Response, SessionState, TransitionError,
};
use chrono::{FixedOffset, Offset, Utc};
use std::sync::Arc;
use thiserror::Error;

/// One gateway callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    pub session_id: String,
    pub service_code: String,
    pub phone_number: String,
    /// Cumulative `*`-joined navigation text
    pub text: String,
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),
}

/// Generic session runtime that can work with any storage and SMS implementations
pub struct UssdRuntime<S, N>
where
    S: Storage + 'static,
    N: SmsService + 'static,
{
    storage: S,
    sms: Arc<N>,
    branding: Branding,
    /// Offset used to decide which bookings are still upcoming
    utc_offset: FixedOffset,
    pub(super) locks: SessionLocks,
}

impl<S, N> UssdRuntime<S, N>
where
    S: Storage + 'static,
    N: SmsService + 'static,
{
    pub fn new(storage: S, sms: N, branding: Branding) -> Self {
        Self {
            storage,
            sms: Arc::new(sms),
            branding,
            utc_offset: Utc.fix(),
            locks: SessionLocks::default(),
        }
    }

    pub fn with_utc_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    /// Decide and commit one callback, returning the reply for the gateway.
    ///
    /// Callbacks for the same session are serialized. State is committed
    /// before the reply is returned; a booking confirmation SMS is sent in
    /// the background afterwards.
    pub async fn handle(&self, callback: &Callback) -> Result<Response, CallbackError> {
        let guard = self.locks.acquire(&callback.session_id).await;
        let result = self.run_turn(callback).await;
        drop(guard);
        self.locks.release(&callback.session_id).await;
        result
    }

    async fn run_turn(&self, callback: &Callback) -> Result<Response, CallbackError> {
        let user = self.storage.load_user(&callback.phone_number).await?;
        let session = self
            .storage
            .open_session(
                &callback.session_id,
                &callback.phone_number,
                &callback.service_code,
            )
            .await?;

        if !session.is_active {
            tracing::info!(
                session_id = %callback.session_id,
                started_at = %session.started_at,
                ended_at = ?session.ended_at,
                "Callback for ended session"
            );
            return Ok(Response::end("Session ended. Please dial again."));
        }

        let state = SessionState::restore(&session.state);
        let ctx = MenuContext::new(
            &user,
            &self.branding,
            &self.storage,
            local_date(Utc::now(), self.utc_offset),
        );
        let result = transition(&state, &ctx, &callback.text)?;

        let mut commit = TurnCommit::new(&session);
        for effect in &result.effects {
            match effect {
                Effect::PersistState => commit.state = Some(result.new_state.to_stored()),
                Effect::SaveUserName {
                    first_name,
                    last_name,
                } => commit.user_name = Some((first_name.clone(), last_name.clone())),
                Effect::CreateBooking(booking) => commit.booking = Some(booking.clone()),
                Effect::EndSession => commit.close_session = true,
            }
        }

        // A fallback on restore (unknown menu, dropped draft) is written back
        // even when the transition itself left the state alone
        if commit.state.is_none() && state.to_stored() != session.state {
            commit.state = Some(result.new_state.to_stored());
        }

        let booking = self.storage.commit(&commit).await?;

        tracing::info!(
            session_id = %callback.session_id,
            phone = %callback.phone_number,
            menu = result.new_state.current_menu.name(),
            terminate = result.response.terminate,
            "Callback handled"
        );

        if let Some(booking) = booking {
            self.notify_booking(booking);
        }

        Ok(result.response)
    }

    fn notify_booking(&self, booking: Booking) {
        let sms = Arc::clone(&self.sms);
        let message = booking_confirmation(&self.branding.service_name, &booking);
        tokio::spawn(async move {
            // LoggingService records the outcome
            let _ = sms.send(&booking.phone_number, &message).await;
        });
    }
}
