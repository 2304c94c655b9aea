//! Table booking flow
//!
//! Fields are collected strictly in order: date, time slot, party size,
//! special requests, then confirmation. The booking draft variant is the only
//! record of progress.

use super::state::{BookingDraft, Draft, MenuContext};
use super::transition::{Step, TransitionError, Turn};
use super::Effect;
use crate::catalog::{slot_for_selection, slot_label, TIME_SLOTS};
use crate::db::NewBooking;

const DATE_PROMPT: &str = "Enter booking date (YYYY-MM-DD):";
const PARTY_SIZE_PROMPT: &str = "Enter party size:";
const REQUESTS_PROMPT: &str = "Any special requests?\n(Reply 'none' if none)";

fn slot_prompt() -> String {
    let mut text = String::from("Select time slot:");
    for (i, slot) in TIME_SLOTS.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, slot.label));
    }
    text
}

fn summary(booking_date: &str, time_slot: &str, party_size: &str, special_requests: &str) -> String {
    format!(
        "Confirm booking:\nDate: {booking_date}\nTime: {}\nParty size: {party_size}\nRequests: {special_requests}\n\n1. Confirm\n2. Edit\n0. Cancel",
        slot_label(time_slot)
    )
}

pub(crate) fn book_table_menu(turn: &mut Turn, _ctx: &MenuContext<'_>) -> Result<Step, TransitionError> {
    let progress = match &turn.state.draft {
        Draft::Booking(progress) => Some(progress.clone()),
        _ => None,
    };

    let Some(progress) = progress else {
        turn.state.draft = Draft::Booking(BookingDraft::Started);
        return Ok(Step::proceed(DATE_PROMPT));
    };

    let input = turn.input.latest().to_string();

    let (next, step) = match progress {
        BookingDraft::Started => (
            BookingDraft::HasDate {
                booking_date: input,
            },
            Step::proceed(slot_prompt()),
        ),

        BookingDraft::HasDate { booking_date } => {
            let Some(slot) = slot_for_selection(&input) else {
                return Ok(Step::proceed(format!("Invalid time slot.\n{}", slot_prompt())));
            };
            (
                BookingDraft::HasSlot {
                    booking_date,
                    time_slot: slot.value.to_string(),
                },
                Step::proceed(PARTY_SIZE_PROMPT),
            )
        }

        BookingDraft::HasSlot {
            booking_date,
            time_slot,
        } => (
            BookingDraft::HasPartySize {
                booking_date,
                time_slot,
                party_size: input,
            },
            Step::proceed(REQUESTS_PROMPT),
        ),

        BookingDraft::HasPartySize {
            booking_date,
            time_slot,
            party_size,
        } => {
            let text = summary(&booking_date, &time_slot, &party_size, &input);
            (
                BookingDraft::Complete {
                    booking_date,
                    time_slot,
                    party_size,
                    special_requests: input,
                },
                Step::proceed(text),
            )
        }

        BookingDraft::Complete {
            booking_date,
            time_slot,
            party_size,
            special_requests,
        } => {
            return Ok(match input.as_str() {
                "1" => {
                    turn.effects.push(Effect::CreateBooking(NewBooking {
                        booking_date,
                        time_slot,
                        party_size,
                        special_requests,
                    }));
                    turn.state.reset();
                    Step::end(
                        "Booking successful!\nYou will receive an SMS with your booking reference.",
                    )
                }
                "2" => {
                    turn.state.draft = Draft::Empty;
                    Step::Restart
                }
                _ => {
                    turn.state.reset();
                    Step::end("Booking cancelled.")
                }
            });
        }
    };

    turn.state.draft = Draft::Booking(next);
    Ok(step)
}
