//! Service configuration
//!
//! Everything is read from the process environment with baked-in defaults.

use crate::sms::SmsConfig;
use chrono::{FixedOffset, Offset, Utc};
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SESSION_TTL_SECS: u64 = 300;
/// East Africa Time
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 180;

/// Branding and contact details rendered into menu text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub service_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub contact_address: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            service_name: "Curbside Kitchen".to_string(),
            contact_phone: "+254700000000".to_string(),
            contact_email: "hello@curbside.kitchen".to_string(),
            contact_address: "Moi Avenue, Nairobi".to_string(),
        }
    }
}

/// Top-level configuration for the USSD service
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub port: u16,
    pub branding: Branding,
    pub sms: SmsConfig,
    /// Active sessions older than this are closed by the sweeper
    pub session_ttl: Duration,
    /// Local time of the restaurant, for "upcoming" bookings
    pub utc_offset: FixedOffset,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = get("USSD_DB_PATH").unwrap_or_else(|| {
            let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
            format!("{home}/.curbside-ussd/ussd.db")
        });

        let port = get("USSD_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let session_ttl = get("USSD_SESSION_TTL_SECS")
            .and_then(|s| s.parse().ok())
            .map_or(Duration::from_secs(DEFAULT_SESSION_TTL_SECS), Duration::from_secs);

        let utc_offset = get("USSD_UTC_OFFSET_MINUTES")
            .and_then(|m| m.parse::<i32>().ok())
            .and_then(|m| m.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(default_utc_offset);

        let defaults = Branding::default();
        let branding = Branding {
            service_name: get("USSD_SERVICE_NAME").unwrap_or(defaults.service_name),
            contact_phone: get("USSD_CONTACT_PHONE").unwrap_or(defaults.contact_phone),
            contact_email: get("USSD_CONTACT_EMAIL").unwrap_or(defaults.contact_email),
            contact_address: get("USSD_CONTACT_ADDRESS").unwrap_or(defaults.contact_address),
        };

        let sms = SmsConfig {
            username: get("AT_USERNAME").filter(|v| !v.is_empty()),
            api_key: get("AT_API_KEY").filter(|v| !v.is_empty()),
            sender_id: get("AT_SENDER_ID").filter(|v| !v.is_empty()),
        };

        Self {
            db_path,
            port,
            branding,
            sms,
            session_ttl,
            utc_offset,
        }
    }
}

fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix())
}
