//! Request ID middleware.
//!
//! Every request carries an `x-request-id`, either from the upstream proxy or
//! freshly generated. The ID is tagged on the tracing span and the Sentry
//! scope, and echoed back in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream ID we accept before generating our own.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Attach a request ID to the span, the Sentry scope and the response.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn request_id_for(header: Option<&str>) -> String {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(request_id_middleware));
        let mut request = Request::builder().uri("/");
        if let Some(id) = header {
            request = request.header(REQUEST_ID_HEADER, id);
        }
        let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_upstream_id_echoed() {
        assert_eq!(request_id_for(Some("fly-abc123")).await, "fly-abc123");
    }

    #[tokio::test]
    async fn test_generated_when_missing_or_oversized() {
        let generated = request_id_for(None).await;
        assert!(Uuid::parse_str(&generated).is_ok());

        let oversized = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let replaced = request_id_for(Some(&oversized)).await;
        assert_ne!(replaced, oversized);
        assert!(Uuid::parse_str(&replaced).is_ok());
    }
}
