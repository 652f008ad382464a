//! The edge access gate, evaluated once per request before anything is
//! forwarded upstream.

use axum::{
    extract::{Request, State},
    http::{StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    policy::{decide, normalize_path, Access, Decision, RouteTable},
    session::{ForwardedCookie, SessionVerifier},
};

/// Route table plus the verifier used for protected paths.
pub struct Gate<V> {
    routes: Arc<RouteTable>,
    verifier: Arc<V>,
}

impl<V> Clone for Gate<V> {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

impl<V: SessionVerifier> Gate<V> {
    #[must_use]
    pub fn new(routes: RouteTable, verifier: V) -> Self {
        Self {
            routes: Arc::new(routes),
            verifier: Arc::new(verifier),
        }
    }

    /// Decide whether `path` may be served.
    ///
    /// Public paths never reach the verifier. For protected paths a single
    /// verification is attempted; any failure is treated as "no session".
    pub async fn evaluate(&self, path: &str, cookie: Option<ForwardedCookie>) -> Decision {
        if self.routes.classify(path) == Access::Public {
            debug!(path, "public route");
            return Decision::Allow;
        }

        let session = match self.verifier.verify(cookie).await {
            Ok(session) => session,
            Err(err) => {
                warn!(path, "session verification failed: {err}");
                None
            }
        };

        let decision = decide(path, session.as_ref());
        if let Decision::Redirect(target) = &decision {
            info!(path, location = %target, "no session, redirecting to login");
        }
        decision
    }
}

/// axum middleware: pass through or answer with `307` to the login page.
///
/// The path is normalized first and the request URI rewritten to it, so the
/// path that was classified is the path the proxy forwards.
pub async fn require_session<V: SessionVerifier>(
    State(gate): State<Gate<V>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(path) = normalize_path(request.uri().path()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if path != request.uri().path() {
        match with_path(request.uri(), &path) {
            Ok(uri) => {
                debug!(raw = %request.uri().path(), path = %path, "normalized request path");
                *request.uri_mut() = uri;
            }
            Err(err) => {
                warn!("Failed to rewrite request path: {err}");
                return StatusCode::BAD_REQUEST.into_response();
            }
        }
    }

    let cookie = ForwardedCookie::from_headers(request.headers());

    match gate.evaluate(&path, cookie).await {
        Decision::Allow => next.run(request).await,
        Decision::Redirect(target) => Redirect::temporary(&target).into_response(),
    }
}

fn with_path(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse()?);
    Ok(Uri::from_parts(parts)?)
}
