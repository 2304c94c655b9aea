//! HTTP request handlers

use super::types::{CallbackForm, UssdReply};
use super::AppState;
use crate::db::DbError;
use crate::runtime::CallbackError;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    routing::{get, post},
    Form, Router,
};

const INVALID_REQUEST: &str = "Invalid request";
const BOOKING_REJECTED: &str =
    "Sorry, we could not save your booking. Please check the date and party size and try again.";
const INTERNAL_FAILURE: &str = "Sorry, something went wrong. Please try again later.";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Gateway callback; other methods get a framed rejection
        .route(
            "/ussd/callback",
            post(ussd_callback).fallback(invalid_request),
        )
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// USSD Callback
// ============================================================

async fn ussd_callback(
    State(state): State<AppState>,
    form: Result<Form<CallbackForm>, FormRejection>,
) -> UssdReply {
    let Ok(Form(form)) = form else {
        return UssdReply::end(INVALID_REQUEST);
    };
    let Some(callback) = form.into_callback() else {
        tracing::debug!("Callback missing correlation fields");
        return UssdReply::end(INVALID_REQUEST);
    };

    match state.runtime.handle(&callback).await {
        Ok(response) => response.into(),
        Err(e) => {
            tracing::error!(
                session_id = %callback.session_id,
                phone = %callback.phone_number,
                error = %e,
                "Callback failed"
            );
            failure_reply(&e)
        }
    }
}

async fn invalid_request() -> UssdReply {
    UssdReply::end(INVALID_REQUEST)
}

fn failure_reply(error: &CallbackError) -> UssdReply {
    match error {
        CallbackError::Storage(DbError::InvalidBooking(_)) => UssdReply::end(BOOKING_REJECTED),
        _ => UssdReply::end(INTERNAL_FAILURE).with_status(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn get_version() -> &'static str {
    concat!("curbside_ussd ", env!("CARGO_PKG_VERSION"))
}
