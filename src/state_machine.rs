//! USSD menu state machine
//!
//! A callback is decided by a pure transition over an explicit session
//! state. Handlers never touch storage; they return the next state, the
//! reply and a list of effects that the runtime commits.

mod booking;
mod browse;
mod effect;
pub mod input;
pub mod registration;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use state::{BookingDraft, Draft, Menu, MenuContext, RegistrationDraft, SessionState};
pub use transition::{transition, Response, TransitionError, TransitionResult};
