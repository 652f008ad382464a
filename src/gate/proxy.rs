//! Pass-through forwarding to the upstream application.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use std::time::Duration;
use tracing::{error, instrument};
use url::Url;

use crate::APP_USER_AGENT;

/// Largest request body buffered for forwarding.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Headers that describe a single hop and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

#[derive(Clone, Debug)]
pub struct Upstream {
    client: Client,
    base: Url,
}

impl Upstream {
    /// # Errors
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(base: Url, connect_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client, base })
    }

    fn target(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(query);
        url
    }
}

fn copy_headers(source: &HeaderMap) -> HeaderMap {
    let mut headers = source.clone();
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers
}

/// Fallback handler: forward the request and stream the upstream response back.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn forward(State(upstream): State<Upstream>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let url = upstream.target(parts.uri.path(), parts.uri.query());

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(err) => {
            error!("Failed to read request body: {err}");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let result = upstream
        .client
        .request(parts.method, url)
        .headers(copy_headers(&parts.headers))
        .body(body)
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            error!("Failed to reach upstream: {err}");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = response.status();
    let headers = copy_headers(response.headers());
    let mut proxied = Response::new(Body::from_stream(response.bytes_stream()));
    *proxied.status_mut() = status;
    *proxied.headers_mut() = headers;
    proxied
}
