//! API request and response types

use crate::runtime::Callback;
use crate::state_machine::Response as MenuResponse;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

/// Form body posted by the USSD gateway
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackForm {
    pub session_id: Option<String>,
    pub service_code: Option<String>,
    pub phone_number: Option<String>,
    /// Absent on the first callback of some gateways
    pub text: Option<String>,
}

impl CallbackForm {
    /// Returns `None` when a correlation field is missing or blank
    pub fn into_callback(self) -> Option<Callback> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(Callback {
            session_id: present(self.session_id)?,
            service_code: present(self.service_code)?,
            phone_number: present(self.phone_number)?,
            text: self.text.unwrap_or_default(),
        })
    }
}

/// Plain-text reply framed for the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UssdReply {
    pub status: StatusCode,
    pub body: String,
}

impl UssdReply {
    pub fn end(text: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: format!("END {text}"),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl From<MenuResponse> for UssdReply {
    fn from(response: MenuResponse) -> Self {
        let prefix = if response.terminate { "END" } else { "CON" };
        Self {
            status: StatusCode::OK,
            body: format!("{prefix} {}", response.text),
        }
    }
}

impl IntoResponse for UssdReply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.body,
        )
            .into_response()
    }
}
