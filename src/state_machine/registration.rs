//! Registration gate
//!
//! Users without both names are routed here on every callback, whatever the
//! current menu says. Progress is carried by the registration draft alone, so
//! the flow can be re-entered from any state.

use super::state::{Draft, Menu, MenuContext, RegistrationDraft};
use super::transition::{Step, TransitionError, Turn};
use super::Effect;

/// Accept a name made only of letters; returns it title-cased.
pub fn valid_name(input: &str) -> Option<String> {
    let name = input.trim();
    if name.is_empty() || !name.chars().all(char::is_alphabetic) {
        return None;
    }

    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
}

pub(crate) fn registration(turn: &mut Turn, ctx: &MenuContext<'_>) -> Result<Step, TransitionError> {
    if turn.input.is_initial() {
        turn.state.current_menu = Menu::Registration;
        turn.state.menu_history.clear();
        return Ok(Step::proceed(format!(
            "Welcome to {}!\nYou need to register first.\n\nEnter your first name:",
            ctx.branding.service_name
        )));
    }

    let progress = match &turn.state.draft {
        Draft::Registration(progress) => Some(progress.clone()),
        _ => None,
    };

    match progress {
        None => {
            let Some(first_name) = valid_name(turn.input.latest()) else {
                return Ok(Step::proceed("Invalid input. Please enter a valid first name."));
            };
            turn.state.draft = Draft::Registration(RegistrationDraft::HasFirstName { first_name });
            Ok(Step::proceed("Enter your last name:"))
        }

        Some(RegistrationDraft::HasFirstName { first_name }) => {
            let Some(last_name) = valid_name(turn.input.latest()) else {
                return Ok(Step::proceed("Invalid input. Please enter a valid last name."));
            };
            let text = format!(
                "Confirm registration:\nName: {first_name} {last_name}\nPhone: {}\n\n1. Confirm\n2. Start Over\n0. Cancel",
                ctx.user.phone_number
            );
            turn.state.draft =
                Draft::Registration(RegistrationDraft::HasFullName { first_name, last_name });
            Ok(Step::proceed(text))
        }

        Some(RegistrationDraft::HasFullName {
            first_name,
            last_name,
        }) => match turn.input.latest() {
            "1" => {
                turn.effects.push(Effect::save_user_name(&first_name, &last_name));
                turn.state.reset();
                Ok(Step::end(format!(
                    "Registration successful!\nWelcome {first_name}!\n\nDial again to access our services."
                )))
            }
            "2" => {
                turn.state.draft = Draft::Empty;
                Ok(Step::Restart)
            }
            _ => {
                turn.state.reset();
                Ok(Step::end(
                    "Registration cancelled.\nYou need to register to use our services.",
                ))
            }
        },
    }
}
