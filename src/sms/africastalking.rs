//! Africa's Talking messaging provider

use super::{SmsError, SmsService};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const LIVE_URL: &str = "https://api.africastalking.com/version1/messaging";
const SANDBOX_URL: &str = "https://api.sandbox.africastalking.com/version1/messaging";

/// Recipient status codes meaning the message was accepted
const ACCEPTED_STATUS_CODES: [u16; 3] = [100, 101, 102];

pub struct AfricasTalking {
    client: Client,
    username: String,
    api_key: String,
    sender_id: Option<String>,
    url: String,
}

impl AfricasTalking {
    pub fn new(
        username: String,
        api_key: String,
        sender_id: Option<String>,
    ) -> Result<Self, SmsError> {
        let url = if username == "sandbox" {
            SANDBOX_URL
        } else {
            LIVE_URL
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SmsError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            username,
            api_key,
            sender_id,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> SmsError {
        match status.as_u16() {
            401 | 403 => SmsError::auth(format!("Authentication failed: {body}")),
            400 => SmsError::rejected(format!("Invalid request: {body}")),
            500..=599 => SmsError::network(format!("Server error: {body}")),
            _ => SmsError::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl SmsService for AfricasTalking {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError> {
        let mut form = vec![
            ("username", self.username.as_str()),
            ("to", phone_number),
            ("message", message),
        ];
        if let Some(sender_id) = &self.sender_id {
            form.push(("from", sender_id.as_str()));
        }

        let response = self
            .client
            .post(&self.url)
            .header("apiKey", &self.api_key)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SmsError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    SmsError::network(format!("Connection failed: {e}"))
                } else {
                    SmsError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SmsError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        let parsed: SendResponse = serde_json::from_str(&body)
            .map_err(|e| SmsError::unknown(format!("Failed to parse response: {e} - body: {body}")))?;
        parsed.check()
    }

    fn provider(&self) -> &str {
        "africastalking"
    }
}

// Africa's Talking API types

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(rename = "SMSMessageData")]
    data: MessageData,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Recipients", default)]
    recipients: Vec<Recipient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recipient {
    status_code: u16,
    #[serde(default)]
    status: String,
    #[serde(default)]
    number: String,
}

impl SendResponse {
    /// Every recipient must have been accepted
    fn check(&self) -> Result<(), SmsError> {
        if self.data.recipients.is_empty() {
            return Err(SmsError::rejected(format!(
                "No recipients accepted: {}",
                self.data.message
            )));
        }
        match self
            .data
            .recipients
            .iter()
            .find(|r| !ACCEPTED_STATUS_CODES.contains(&r.status_code))
        {
            Some(r) => Err(SmsError::rejected(format!(
                "{} refused ({}): {}",
                r.number, r.status_code, r.status
            ))),
            None => Ok(()),
        }
    }
}
