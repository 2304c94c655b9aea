//! Extraction of the latest user input from the gateway's navigation path

/// Return the last `*`-delimited segment of the cumulative navigation text.
///
/// `""` -> `""`, `"1"` -> `"1"`, `"1*2*3"` -> `"3"`, `"1*"` -> `""`.
pub fn latest_input(text: &str) -> &str {
    text.rsplit('*').next().unwrap_or_default()
}

/// Input as seen by a single handler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    latest: String,
    /// No navigation text at all: the session was just dialled, or a handler
    /// was entered within the same turn and must render its first screen.
    initial: bool,
}

impl Input {
    pub fn from_text(text: &str) -> Self {
        Self {
            latest: latest_input(text).to_string(),
            initial: text.is_empty(),
        }
    }

    /// Input for a handler entered mid-turn
    pub fn fresh() -> Self {
        Self {
            latest: String::new(),
            initial: true,
        }
    }

    pub fn latest(&self) -> &str {
        &self.latest
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }
}
