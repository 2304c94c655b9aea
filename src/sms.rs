//! Outbound SMS notifications
//!
//! Messages are best-effort: failures are logged by [`LoggingService`] and
//! never reach the caller's USSD reply.

mod africastalking;
mod error;

pub use africastalking::AfricasTalking;
pub use error::{SmsError, SmsErrorKind};

use crate::catalog::slot_label;
use crate::db::Booking;
use async_trait::async_trait;
use std::sync::Arc;

/// Provider credentials; SMS is disabled unless username and key are set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmsConfig {
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub sender_id: Option<String>,
}

/// Common interface for SMS providers
#[async_trait]
pub trait SmsService: Send + Sync {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError>;

    /// Provider name for logs
    fn provider(&self) -> &str;
}

#[async_trait]
impl<T: SmsService + ?Sized> SmsService for Arc<T> {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError> {
        (**self).send(phone_number, message).await
    }

    fn provider(&self) -> &str {
        (**self).provider()
    }
}

/// Stand-in used when no provider is configured
pub struct DisabledSms;

#[async_trait]
impl SmsService for DisabledSms {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError> {
        tracing::info!(
            phone = %phone_number,
            chars = message.len(),
            "SMS disabled, message not sent"
        );
        Ok(())
    }

    fn provider(&self) -> &str {
        "disabled"
    }
}

/// Logging wrapper for SMS services
pub struct LoggingService {
    inner: Arc<dyn SmsService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn SmsService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SmsService for LoggingService {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError> {
        let start = std::time::Instant::now();
        let result = self.inner.send(phone_number, message).await;
        let duration = start.elapsed();

        match &result {
            Ok(()) => {
                tracing::info!(
                    provider = %self.inner.provider(),
                    phone = %phone_number,
                    duration_ms = %duration.as_millis(),
                    "SMS sent"
                );
            }
            Err(e) => {
                tracing::warn!(
                    provider = %self.inner.provider(),
                    phone = %phone_number,
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    error = %e.message,
                    "SMS failed"
                );
            }
        }

        result
    }

    fn provider(&self) -> &str {
        self.inner.provider()
    }
}

/// Build the configured provider, wrapped in logging
pub fn from_config(config: &SmsConfig) -> Result<Arc<dyn SmsService>, SmsError> {
    let inner: Arc<dyn SmsService> = match (&config.username, &config.api_key) {
        (Some(username), Some(api_key)) => {
            let provider =
                AfricasTalking::new(username.clone(), api_key.clone(), config.sender_id.clone())?;
            tracing::info!(endpoint = provider.url(), "Africa's Talking SMS enabled");
            Arc::new(provider)
        }
        _ => {
            tracing::info!("AT_USERNAME or AT_API_KEY not set, SMS disabled");
            Arc::new(DisabledSms)
        }
    };
    Ok(Arc::new(LoggingService::new(inner)))
}

/// Text of the confirmation sent after a booking commits
pub fn booking_confirmation(service_name: &str, booking: &Booking) -> String {
    format!(
        "{service_name}: your table for {} on {} at {} is booked. Reference: {}",
        booking.party_size,
        booking.booking_date.format("%Y-%m-%d"),
        slot_label(&booking.time_slot),
        booking.reference_number
    )
}
