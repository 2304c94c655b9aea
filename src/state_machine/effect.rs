//! Effects produced by menu transitions

use crate::db::NewBooking;

/// Writes requested by a transition, applied by the session runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist the new session state
    PersistState,

    /// Store the confirmed registration names on the user record
    SaveUserName {
        first_name: String,
        last_name: String,
    },

    /// Create a booking from a confirmed draft
    CreateBooking(NewBooking),

    /// Mark the session inactive
    EndSession,
}

impl Effect {
    pub fn save_user_name(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Effect::SaveUserName {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}
