#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use storyhub_api::auth::jwt::{mint_lookup_token, JwtConfig};
use storyhub_api::config::{IdentityConfig, ServerConfig, SweepConfig};
use storyhub_api::router::build_app_router;
use storyhub_api::state::AppState;
use storyhub_core::types::ObjectId;
use storyhub_db::repositories::InMemoryStoryRepo;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-long-enough";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            lookup_token_expiry_mins: 5,
        },
        identity: IdentityConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 1,
        },
        sweep: SweepConfig::default(),
    }
}

/// Build the full application router over the given in-memory repository,
/// with the same middleware stack production uses.
pub fn build_test_app(repo: Arc<InMemoryStoryRepo>) -> Router {
    let config = test_config();
    let state = AppState {
        stories: repo,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// A valid access token for `user`. Lookup tokens carry the same claims as
/// end-user access tokens, so they double as test credentials.
pub fn token_for(user: ObjectId) -> String {
    mint_lookup_token(user, &test_config().jwt).unwrap()
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
