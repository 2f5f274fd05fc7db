//! The proxy server's router: a health check, with everything else forwarded
//! to the backend.

use axum::{Router, middleware, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    endpoints,
    logging::logging_middleware,
    proxy::{ProxyState, proxy_request},
};

/// Return a router with the health check and the fallback proxy.
///
/// CORS preflight requests are answered by the router and never reach the
/// backend.
pub fn build_router(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .fallback(proxy_request)
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
        .with_state(state)
}

async fn get_health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod build_router_tests {
    use axum::{
        Json, Router,
        http::{HeaderName, HeaderValue, Method, StatusCode, Uri},
    };
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        proxy::ProxyState,
        test_utils::{spawn_backend, unused_local_url},
    };

    use super::build_router;

    async fn server_for(origin: &str) -> TestServer {
        let state = ProxyState::with_origin(origin).expect("Could not create proxy state");

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn health_check_does_not_touch_backend() {
        let server = server_for(&unused_local_url().await).await;

        let response = server.get(endpoints::HEALTH).await;

        response.assert_status_ok();
        response.assert_text("ok");
    }

    #[tokio::test]
    async fn other_paths_are_forwarded() {
        let backend = spawn_backend(Router::new().fallback(|uri: Uri| async move {
            Json(json!({ "path": uri.path() }))
        }))
        .await;
        let server = server_for(&backend).await;

        let response = server.get("/api/categories").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["path"], "/api/categories/");
    }

    #[tokio::test]
    async fn responses_carry_cors_headers() {
        let backend = spawn_backend(Router::new().fallback(|| async { "[]" })).await;
        let server = server_for(&backend).await;

        let response = server
            .get("/api/budgets/")
            .add_header(
                HeaderName::from_static("origin"),
                HeaderValue::from_static("http://localhost:5173"),
            )
            .await;

        assert_eq!(response.header("access-control-allow-origin"), "*");
    }

    #[tokio::test]
    async fn preflight_is_answered_locally() {
        let server = server_for(&unused_local_url().await).await;

        let response = server
            .method(Method::OPTIONS, "/api/budgets/")
            .add_header(
                HeaderName::from_static("origin"),
                HeaderValue::from_static("http://localhost:5173"),
            )
            .add_header(
                HeaderName::from_static("access-control-request-method"),
                HeaderValue::from_static("POST"),
            )
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.header("access-control-allow-origin"), "*");
    }
}
