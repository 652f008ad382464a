use regex::Regex;
use thiserror::Error;

/// Shown instead of raw transport errors.
pub const CONNECTIVITY_MESSAGE: &str =
    "Connection failed. Please check your internet connection and try again.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    /// `{ "error": { "message" } }` answered by the identity API.
    #[error("{0}")]
    Auth(String),
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout("Request timed out. Please try again.".to_string())
        } else if err.is_decode() {
            Self::Parse(format!("Failed to decode response: {err}"))
        } else if err.is_builder() {
            Self::Serialization(format!("Failed to build request: {err}"))
        } else {
            Self::Network(format!("Unable to reach the server: {err}"))
        }
    }
}

impl AppError {
    /// Message safe to put in front of a user.
    ///
    /// Transport failures and server messages that mention connectivity are
    /// replaced by [`CONNECTIVITY_MESSAGE`]; empty messages use `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Network(_) | Self::Timeout(_) => CONNECTIVITY_MESSAGE.to_string(),
            Self::Auth(message) | Self::Http { message, .. } => paraphrase(message, fallback),
            Self::Config(_) | Self::Parse(_) | Self::Serialization(_) => fallback.to_string(),
        }
    }

    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Auth(message) | Self::Http { message, .. } => mentions_connectivity(message),
            Self::Config(_) | Self::Parse(_) | Self::Serialization(_) => false,
        }
    }
}

fn mentions_connectivity(message: &str) -> bool {
    Regex::new(r"(?i)network|fetch|connection").is_ok_and(|re| re.is_match(message))
}

fn paraphrase(message: &str, fallback: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        fallback.to_string()
    } else if mentions_connectivity(message) {
        CONNECTIVITY_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}
