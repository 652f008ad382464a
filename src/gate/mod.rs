use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod proxy;
pub mod session;
// OpenAPI document for the gate's own routes lives in openapi.rs.
mod openapi;

pub use middleware::Gate;
pub use openapi::openapi;
pub use policy::RouteTable;
pub use proxy::Upstream;
pub use session::{HttpSessionVerifier, SessionVerifier};

const REQUEST_ID: &str = "x-request-id";

/// Settings for one gate instance.
#[derive(Clone, Debug)]
pub struct GateConfig {
    pub port: u16,
    pub upstream: Url,
    pub session_path: String,
    pub session_timeout: Duration,
    pub upstream_connect_timeout: Duration,
    pub routes: RouteTable,
}

/// Build the gate router: `/health` is served locally, everything else is
/// gated and then proxied upstream.
pub fn router<V: SessionVerifier>(gate: Gate<V>, upstream: Upstream) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .fallback(proxy::forward)
        .with_state(upstream)
        .layer(from_fn_with_state(gate, middleware::require_session::<V>))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
}

/// Start the gate
/// # Errors
/// Return error if the upstream URL is unusable or the listener fails
pub async fn new(config: GateConfig) -> Result<()> {
    let verifier = HttpSessionVerifier::new(
        &config.upstream,
        &config.session_path,
        config.session_timeout,
    )
    .context("Failed to build session verifier")?;

    info!(
        "Verifying sessions against {} (timeout {}s)",
        verifier.endpoint(),
        config.session_timeout.as_secs()
    );

    let upstream = Upstream::new(config.upstream.clone(), config.upstream_connect_timeout)
        .context("Failed to build upstream client")?;
    let gate = Gate::new(config.routes, verifier);

    let app = router(gate, upstream);

    let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

    info!("Listening on [::]:{}, upstream {}", config.port, config.upstream);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
