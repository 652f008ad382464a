//! End-to-end tests for the edge gate.
//!
//! An in-process axum server plays the upstream application: it answers the
//! session endpoint from the `cookie` header and echoes every other request.
//! The real gate router is driven with `tower::ServiceExt::oneshot`.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cambigo::gate::{self, Gate, HttpSessionVerifier, RouteTable, Upstream};
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

#[derive(Clone, Default)]
struct FakeUpstream {
    session_calls: Arc<AtomicUsize>,
}

async fn session(State(state): State<FakeUpstream>, headers: HeaderMap) -> Response {
    state.session_calls.fetch_add(1, Ordering::SeqCst);
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if cookie.contains("session_token=valid") {
        Json(json!({
            "user": {"id": "user-1", "email": "test@example.com", "emailVerified": true},
            "session": {"id": "session-1", "expiresAt": "2030-01-01T00:00:00.000Z"}
        }))
        .into_response()
    } else if cookie.contains("session_token=broken") {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    } else if cookie.contains("session_token=garbage") {
        (StatusCode::OK, "<html>not json</html>").into_response()
    } else if cookie.contains("session_token=gone") {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(Value::Null).into_response()
    }
}

async fn echo(method: Method, uri: Uri, body: Bytes) -> Response {
    let body = String::from_utf8_lossy(&body);
    (
        [("x-served-by", "upstream")],
        format!("{method} {uri} {body}").trim_end().to_string(),
    )
        .into_response()
}

async fn spawn(router: Router) -> Result<Url> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Url::parse(&format!("http://{addr}")).context("invalid upstream URL")
}

struct Harness {
    app: Router,
    session_calls: Arc<AtomicUsize>,
}

impl Harness {
    async fn new() -> Result<Self> {
        let state = FakeUpstream::default();
        let session_calls = Arc::clone(&state.session_calls);
        let upstream_app = Router::new()
            .route("/api/auth/session", get(session))
            .fallback(echo)
            .with_state(state);
        let base = spawn(upstream_app).await?;
        Self::with_base(base, session_calls)
    }

    fn with_base(base: Url, session_calls: Arc<AtomicUsize>) -> Result<Self> {
        let verifier =
            HttpSessionVerifier::new(&base, "/api/auth/session", Duration::from_secs(2))?;
        let upstream = Upstream::new(base, Duration::from_secs(2))?;
        let app = gate::router(Gate::new(RouteTable::default(), verifier), upstream);
        Ok(Self { app, session_calls })
    }

    async fn send(&self, request: Request<Body>) -> Result<Response> {
        Ok(self.app.clone().oneshot(request).await?)
    }

    fn calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }
}

fn get_request(path: &str, cookie: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    Ok(builder.body(Body::empty())?)
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn public_paths_pass_without_verification() -> Result<()> {
    let harness = Harness::new().await?;

    for method in [Method::GET, Method::POST, Method::DELETE] {
        for path in ["/", "/login", "/signup", "/forgot-password", "/reset-password"] {
            let request = Request::builder()
                .method(method.clone())
                .uri(path)
                .body(Body::empty())?;
            let response = harness.send(request).await?;
            assert_eq!(response.status(), StatusCode::OK, "{method} {path}");
        }
    }

    assert_eq!(harness.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn identity_api_is_forwarded_with_body() -> Result<()> {
    let harness = Harness::new().await?;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/sign-in/email")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"test@example.com"}"#))?;
    let response = harness.send(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await?,
        r#"POST /api/auth/sign-in/email {"email":"test@example.com"}"#
    );
    assert_eq!(harness.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn protected_path_without_session_redirects() -> Result<()> {
    let harness = Harness::new().await?;

    let response = harness.send(get_request("/flow/dashboard", None)?).await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        Some("/login?redirect=%2Fflow%2Fdashboard")
    );
    assert!(response.headers().get("x-served-by").is_none());
    assert_eq!(harness.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn nested_subpaths_keep_the_full_return_path() -> Result<()> {
    let harness = Harness::new().await?;

    let response = harness
        .send(get_request("/flow/projects/42/edit", None)?)
        .await?;

    assert_eq!(
        location(&response),
        Some("/login?redirect=%2Fflow%2Fprojects%2F42%2Fedit")
    );
    Ok(())
}

#[tokio::test]
async fn protected_path_with_session_is_proxied_unchanged() -> Result<()> {
    let harness = Harness::new().await?;

    let response = harness
        .send(get_request(
            "/settings?tab=profile",
            Some("better-auth.session_token=valid"),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-served-by")
            .and_then(|value| value.to_str().ok()),
        Some("upstream")
    );
    assert_eq!(body_text(response).await?, "GET /settings?tab=profile");
    Ok(())
}

#[tokio::test]
async fn verification_failures_redirect_like_no_session() -> Result<()> {
    let harness = Harness::new().await?;

    for cookie in [
        "better-auth.session_token=broken",
        "better-auth.session_token=garbage",
        "better-auth.session_token=gone",
        "better-auth.session_token=unknown",
    ] {
        let response = harness.send(get_request("/settings", Some(cookie))?).await?;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{cookie}");
        assert_eq!(location(&response), Some("/login?redirect=%2Fsettings"));
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_verifier_redirects() -> Result<()> {
    // Bind and drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let base = Url::parse(&format!("http://{addr}"))?;
    let harness = Harness::with_base(base, Arc::new(AtomicUsize::new(0)))?;

    let response = harness
        .send(get_request("/flow/dashboard", Some("better-auth.session_token=valid"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        Some("/login?redirect=%2Fflow%2Fdashboard")
    );

    let response = harness.send(get_request("/", None)?).await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn dot_segments_are_resolved_before_the_gate_decides() -> Result<()> {
    let harness = Harness::new().await?;

    for (path, location_header) in [
        ("/x/../settings", "/login?redirect=%2Fsettings"),
        ("/./settings", "/login?redirect=%2Fsettings"),
        ("/a/%2e%2e/flow/dashboard", "/login?redirect=%2Fflow%2Fdashboard"),
        ("/login/../flow", "/login?redirect=%2Fflow"),
        ("//settings", "/login?redirect=%2Fsettings"),
    ] {
        let response = harness.send(get_request(path, None)?).await?;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(location(&response), Some(location_header), "{path}");
        assert!(response.headers().get("x-served-by").is_none(), "{path}");
    }
    assert_eq!(harness.calls(), 5);
    Ok(())
}

#[tokio::test]
async fn normalized_path_is_what_gets_forwarded() -> Result<()> {
    let harness = Harness::new().await?;

    let response = harness
        .send(get_request(
            "/flow/../settings?tab=profile",
            Some("better-auth.session_token=valid"),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, "GET /settings?tab=profile");
    Ok(())
}

#[tokio::test]
async fn split_cookie_fields_are_all_sent_for_verification() -> Result<()> {
    let harness = Harness::new().await?;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/settings")
        .header(header::COOKIE, "theme=dark")
        .header(header::COOKIE, "better-auth.session_token=valid")
        .body(Body::empty())?;
    let response = harness.send(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, "GET /settings");
    assert_eq!(harness.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn repeated_requests_reverify_and_agree() -> Result<()> {
    let harness = Harness::new().await?;

    let first = harness.send(get_request("/flow/dashboard", None)?).await?;
    let second = harness.send(get_request("/flow/dashboard", None)?).await?;

    assert_eq!(location(&first), location(&second));
    assert_eq!(harness.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn unlisted_and_static_paths_are_public() -> Result<()> {
    let harness = Harness::new().await?;

    for path in ["/pricing", "/_next/static/chunks/main.js", "/flow-logo.png"] {
        let response = harness.send(get_request(path, None)?).await?;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
    assert_eq!(harness.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn health_is_served_locally_with_request_id() -> Result<()> {
    let harness = Harness::new().await?;

    let response = harness.send(get_request("/health", None)?).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    assert!(response.headers().get("x-served-by").is_none());

    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body.get("name"), Some(&json!("cambigo")));
    Ok(())
}
