//! SMS error types

use thiserror::Error;

/// SMS delivery error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SmsError {
    pub kind: SmsErrorKind,
    pub message: String,
}

impl SmsError {
    pub fn new(kind: SmsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(SmsErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(SmsErrorKind::Auth, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(SmsErrorKind::Rejected, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(SmsErrorKind::Unknown, message)
    }
}

/// Error classification for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsErrorKind {
    /// Timeouts, connection failures, 5xx
    Network,
    /// Bad username or API key (401, 403)
    Auth,
    /// Provider accepted the request but refused the recipient
    Rejected,
    Unknown,
}

impl SmsErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SmsErrorKind::Network => "network",
            SmsErrorKind::Auth => "auth",
            SmsErrorKind::Rejected => "rejected",
            SmsErrorKind::Unknown => "unknown",
        }
    }
}
