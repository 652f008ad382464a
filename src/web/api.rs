//! HTTP helpers for the identity API with consistent timeouts and error
//! handling. Credentials ride on cookies only: the client keeps a cookie jar
//! and never attaches tokens itself.

use super::errors::AppError;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::APP_USER_AGENT;

/// Default request timeout applied to all helpers.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(base: Url) -> Result<Self, AppError> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    /// # Errors
    /// Returns an error if the HTTP client fails to initialize.
    pub fn with_timeout(base: Url, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self { client, base })
    }

    /// Posts JSON and parses a JSON response.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-2xx status or undecodable body.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self.client.post(self.url(path)?).json(body).send().await?;
        handle_json_response(response).await
    }

    /// Posts JSON and ignores the response body.
    ///
    /// # Errors
    /// Returns an error on transport failure or non-2xx status.
    pub async fn post_json_empty<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), AppError> {
        let response = self.client.post(self.url(path)?).json(body).send().await?;
        handle_empty_response(response).await
    }

    /// Posts an empty body, used to clear a session.
    ///
    /// # Errors
    /// Returns an error on transport failure or non-2xx status.
    pub async fn post_empty(&self, path: &str) -> Result<(), AppError> {
        let response = self.client.post(self.url(path)?).send().await?;
        handle_empty_response(response).await
    }

    /// Fetches JSON and returns `None` on 204, 401 or an empty body.
    ///
    /// # Errors
    /// Returns an error on transport failure, other non-2xx status or undecodable body.
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, AppError> {
        let response = self.client.get(self.url(path)?).send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT || status == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map_err(|err| AppError::Parse(format!("Failed to decode response: {err}")))
    }

    fn url(&self, path: &str) -> Result<Url, AppError> {
        let base = self.base.as_str().trim_end_matches('/');
        let path = path.trim().trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|err| AppError::Config(format!("Invalid request URL: {err}")))
    }
}

async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    if response.status().is_success() {
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|err| AppError::Parse(format!("Failed to decode response: {err}")))
    } else {
        Err(error_from_response(response).await)
    }
}

async fn handle_empty_response(response: Response) -> Result<(), AppError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from_response(response).await)
    }
}

/// `{ "error": { "message" } }` or `{ "message" }` become [`AppError::Auth`],
/// anything else a sanitized [`AppError::Http`].
async fn error_from_response(response: Response) -> AppError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| {
            envelope
                .error
                .and_then(|error| error.message)
                .or(envelope.message)
        })
        .filter(|message| !message.trim().is_empty());

    match message {
        Some(message) => AppError::Auth(truncate(message.trim())),
        None => AppError::Http {
            status,
            message: sanitize_body(&body),
        },
    }
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        truncate(trimmed)
    }
}

fn truncate(message: &str) -> String {
    message.chars().take(MAX_ERROR_CHARS).collect()
}
