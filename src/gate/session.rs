//! Session verification against the identity collaborator.
//!
//! The session is proven by cookie possession only: the caller's `cookie`
//! header is forwarded verbatim to the verification endpoint and nothing else
//! is sent. Results are never cached; every call goes to the network.

use axum::http::{header::COOKIE, HeaderMap, HeaderValue, StatusCode};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{future::Future, time::Duration};
use tracing::{debug, instrument};
use url::Url;

use crate::APP_USER_AGENT;

pub const DEFAULT_SESSION_PATH: &str = "/api/auth/session";

/// Signed-in user as reported by the identity collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

impl User {
    /// Name to greet the user with, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.email.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// A verified session. A session without a user is represented as `None`
/// wherever an `Option<Session>` is expected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    #[serde(default)]
    pub session: Option<SessionInfo>,
}

impl Session {
    /// Interpret a verification response body.
    ///
    /// A missing or falsy `user` (`null`, `false`, `0`, `""`) means no session.
    ///
    /// # Errors
    /// Returns an error if `user` is present but cannot be read as a user.
    pub fn from_value(value: Value) -> Result<Option<Self>, serde_json::Error> {
        let has_user = value.get("user").is_some_and(is_truthy);
        if !has_user {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<&str> {
        self.session.as_ref()?.expires_at.as_deref()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The caller's cookies as raw header bytes, kept out of logs.
#[derive(Debug)]
pub struct ForwardedCookie(SecretBox<[u8]>);

impl ForwardedCookie {
    /// Capture every `cookie` field of a request, joined with `"; "` the way
    /// HTTP/2 requires split cookie fields to be recombined. Bytes are kept
    /// as sent, whether or not they are UTF-8.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let mut joined: Vec<u8> = Vec::new();
        for value in headers.get_all(COOKIE).iter().filter(|value| !value.is_empty()) {
            if !joined.is_empty() {
                joined.extend_from_slice(b"; ");
            }
            joined.extend_from_slice(value.as_bytes());
        }

        if joined.is_empty() {
            None
        } else {
            Some(Self(SecretBox::new(joined.into_boxed_slice())))
        }
    }

    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }

    /// The recombined `cookie` header, marked sensitive.
    #[must_use]
    pub fn header_value(&self) -> Option<HeaderValue> {
        let mut value = HeaderValue::from_bytes(self.expose()).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("session endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("session endpoint returned {0}")]
    Status(StatusCode),
    #[error("malformed session body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Exchanges a credential cookie for a user-presence decision.
pub trait SessionVerifier: Send + Sync + 'static {
    fn verify(
        &self,
        cookie: Option<ForwardedCookie>,
    ) -> impl Future<Output = Result<Option<Session>, VerifyError>> + Send;
}

/// Verifies sessions over HTTP against the upstream's session endpoint.
#[derive(Clone, Debug)]
pub struct HttpSessionVerifier {
    client: Client,
    endpoint: Url,
}

impl HttpSessionVerifier {
    /// # Errors
    /// Returns an error if the endpoint cannot be built or the HTTP client fails to initialize.
    pub fn new(upstream: &Url, session_path: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = upstream.join(session_path)?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client, endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SessionVerifier for HttpSessionVerifier {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn verify(&self, cookie: Option<ForwardedCookie>) -> Result<Option<Session>, VerifyError> {
        let mut request = self.client.get(self.endpoint.clone());
        if let Some(value) = cookie.as_ref().and_then(ForwardedCookie::header_value) {
            request = request.header(COOKIE, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VerifyError::Status(status));
        }

        let body = response.bytes().await?;
        if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
            debug!("session endpoint reported no session");
            return Ok(None);
        }

        let value: Value = serde_json::from_slice(&body)?;
        Ok(Session::from_value(value)?)
    }
}
