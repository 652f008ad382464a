use super::handlers::health;
use utoipa::OpenApi;

/// `OpenAPI` document for the routes the gate serves itself.
///
/// Everything else is proxied upstream and documented there.
#[derive(OpenApi)]
#[openapi(
    paths(health::health),
    components(schemas(health::Health)),
    tags((name = "health", description = "Gate liveness and build information"))
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
