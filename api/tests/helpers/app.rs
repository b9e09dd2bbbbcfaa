use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode},
};
use serde_json::Value;
use std::sync::Once;
use util::state::AppState;

static ENV_INIT: Once = Once::new();

fn prime_test_env() {
    ENV_INIT.call_once(|| {
        // SAFETY: runs once, before the first config read in this process
        unsafe {
            std::env::set_var("JWT_SECRET", "integration-test-secret");
            std::env::set_var("JWT_DURATION_MINUTES", "30");
            std::env::set_var("DATABASE_PATH", "data/test.db");
        }
    });
}

/// A fresh router over its own in-memory database.
pub async fn make_test_app() -> (Router, AppState) {
    prime_test_env();
    let db = db::test_utils::setup_test_db().await;
    let app_state = AppState::new(db);
    let router = Router::new().nest("/api", api::routes::routes(app_state.clone()));
    (router, app_state)
}

pub fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn authed_post(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
