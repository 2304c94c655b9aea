//! Pure menu transition function
//!
//! One callback is decided by one call to [`transition`]: the latest input is
//! routed through the registration gate or the handler of the current menu,
//! handlers may redirect within the same turn, and the final reply comes back
//! together with the effects the runtime must apply.

use super::booking::book_table_menu;
use super::browse::{category_menu, item_detail, view_menu};
use super::input::Input;
use super::registration::registration;
use super::state::{Draft, Menu, MenuContext, SessionState};
use super::Effect;
use crate::catalog::slot_label;
use crate::db::DbError;
use thiserror::Error;

/// Redirects a single callback may follow before it is treated as a loop
const MAX_REDIRECTS: usize = 4;

/// Text shown to the user and whether the session ends with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub terminate: bool,
}

impl Response {
    pub fn proceed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminate: false,
        }
    }

    pub fn end(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminate: true,
        }
    }
}

/// Result of a menu transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub response: Response,
    pub effects: Vec<Effect>,
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Catalog read failed: {0}")]
    Storage(#[from] DbError),
    #[error("Redirect loop at {}", .0.name())]
    RedirectLoop(Menu),
}

/// Decision of a single handler invocation
#[derive(Debug)]
pub(crate) enum Step {
    Reply(Response),
    /// Forward to another menu and render it in this turn
    Enter(Menu),
    /// Back to a parent menu and render it in this turn
    Back(Menu),
    /// Draft was discarded; render the current menu from its first screen
    Restart,
}

impl Step {
    pub(crate) fn proceed(text: impl Into<String>) -> Self {
        Step::Reply(Response::proceed(text))
    }

    pub(crate) fn end(text: impl Into<String>) -> Self {
        Step::Reply(Response::end(text))
    }
}

/// Working copy of the session for one callback
pub(crate) struct Turn {
    pub state: SessionState,
    pub input: Input,
    pub effects: Vec<Effect>,
}

pub(crate) type Handler = fn(&mut Turn, &MenuContext<'_>) -> Result<Step, TransitionError>;

/// Handler lookup. Registration is only reachable through the gate, so a
/// registered user parked there is served by the main menu.
fn handler_for(menu: Menu) -> Handler {
    match menu {
        Menu::Registration | Menu::MainMenu => main_menu,
        Menu::ViewMenu => view_menu,
        Menu::BreakfastMenu | Menu::AppetizersMenu | Menu::DrinksMenu | Menu::MainDishesMenu => {
            category_menu
        }
        Menu::ItemDetail => item_detail,
        Menu::BookTableMenu => book_table_menu,
        Menu::MyBookingsMenu => my_bookings_menu,
        Menu::ContactMenu => contact_menu,
    }
}

/// Decide one callback.
///
/// Pure apart from catalog reads through `ctx.reader`: the caller owns
/// persisting `new_state` and applying the effects.
pub fn transition(
    state: &SessionState,
    ctx: &MenuContext<'_>,
    text: &str,
) -> Result<TransitionResult, TransitionError> {
    let mut turn = Turn {
        state: state.clone(),
        input: Input::from_text(text),
        effects: Vec::new(),
    };

    let registered = ctx.user.is_registered();
    if registered && turn.state.current_menu == Menu::Registration {
        turn.state.reset();
    }

    let mut redirects = 0;
    let response = loop {
        let handler: Handler = if registered {
            handler_for(turn.state.current_menu)
        } else {
            registration
        };

        match handler(&mut turn, ctx)? {
            Step::Reply(response) => break response,
            Step::Enter(menu) => turn.state.enter(menu),
            Step::Back(menu) => turn.state.back_to(menu),
            Step::Restart => {}
        }

        turn.input = Input::fresh();
        redirects += 1;
        if redirects > MAX_REDIRECTS {
            return Err(TransitionError::RedirectLoop(turn.state.current_menu));
        }
    };

    let Turn {
        state: new_state,
        mut effects,
        ..
    } = turn;

    if new_state != *state {
        effects.push(Effect::PersistState);
    }
    if response.terminate {
        effects.push(Effect::EndSession);
    }

    tracing::debug!(
        from = state.current_menu.name(),
        to = new_state.current_menu.name(),
        terminate = response.terminate,
        "Menu transition"
    );

    Ok(TransitionResult {
        new_state,
        response,
        effects,
    })
}

// ============================================================================
// Top-level handlers
// ============================================================================

fn main_menu_text(ctx: &MenuContext<'_>) -> String {
    format!(
        "Welcome {}!\n\n1. View Menu\n2. Book Table\n3. My Bookings\n4. Contact Us\n0. Exit",
        ctx.user.first_name
    )
}

fn main_menu(turn: &mut Turn, ctx: &MenuContext<'_>) -> Result<Step, TransitionError> {
    if turn.input.is_initial() {
        return Ok(Step::proceed(main_menu_text(ctx)));
    }

    let target = match turn.input.latest() {
        "1" => Menu::ViewMenu,
        "2" => Menu::BookTableMenu,
        "3" => Menu::MyBookingsMenu,
        "4" => Menu::ContactMenu,
        "0" => {
            return Ok(Step::end(format!(
                "Session cancelled.\nThank you for using {}!",
                ctx.branding.service_name
            )))
        }
        _ => {
            return Ok(Step::proceed(format!(
                "Invalid option.\n\n{}",
                main_menu_text(ctx)
            )))
        }
    };

    // Every flow starts from the top level with a clean draft
    turn.state.draft = Draft::Empty;
    Ok(Step::Enter(target))
}

fn my_bookings_menu(_turn: &mut Turn, ctx: &MenuContext<'_>) -> Result<Step, TransitionError> {
    let bookings = ctx
        .reader
        .upcoming_bookings(&ctx.user.phone_number, ctx.today)?;

    if bookings.is_empty() {
        return Ok(Step::end("You have no bookings.\n"));
    }

    let mut text = String::from("Your bookings:\n");
    for booking in &bookings {
        text.push_str(&format!(
            "\n{}: {}, {}\nParty of {}\n",
            booking.reference_number,
            booking.booking_date,
            slot_label(&booking.time_slot),
            booking.party_size
        ));
    }
    text.push_str(&format!(
        "\nTo change a booking call {}.",
        ctx.branding.contact_phone
    ));

    Ok(Step::end(text))
}

fn contact_menu(_turn: &mut Turn, ctx: &MenuContext<'_>) -> Result<Step, TransitionError> {
    let branding = ctx.branding;
    Ok(Step::end(format!(
        "Contact {}:\nPhone: {}\nEmail: {}\nVisit: {}",
        branding.service_name, branding.contact_phone, branding.contact_email, branding.contact_address
    )))
}
