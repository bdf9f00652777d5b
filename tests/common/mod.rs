//! Common test utilities

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

use trailbook::aggregation::{AggregationEngine, AggregationMode};
use trailbook::api::{app, AppState};
use trailbook::auth::TokenRegistry;
use trailbook::domain::CallerIdentity;
use trailbook::store::VisitStore;

pub const USER_A_TOKEN: &str = "test_token_user_a";
pub const USER_B_TOKEN: &str = "test_token_user_b";
pub const ADMIN_TOKEN: &str = "test_token_admin";

pub struct TestIdentities {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub admin: Uuid,
}

/// Build a hermetic app with three seeded tokens and no event log
pub fn setup_app() -> (Router, TestIdentities) {
    let identities = TestIdentities {
        user_a: Uuid::new_v4(),
        user_b: Uuid::new_v4(),
        admin: Uuid::new_v4(),
    };

    let store = Arc::new(VisitStore::new());
    let engine = Arc::new(AggregationEngine::new(
        store.clone(),
        AggregationMode::Incremental,
    ));

    let mut tokens = TokenRegistry::new();
    tokens.insert_token(USER_A_TOKEN, CallerIdentity::user(identities.user_a));
    tokens.insert_token(USER_B_TOKEN, CallerIdentity::user(identities.user_b));
    tokens.insert_token(ADMIN_TOKEN, CallerIdentity::admin(identities.admin));

    let state = AppState::new(store, engine, None, Arc::new(tokens));
    (app(state), identities)
}

/// Send one request and decode the JSON response body (if any)
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("X-API-Key", token);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Request body for creating a visit
pub fn visit_body(place: &str, lat: f64, lon: f64, date: &str, notes: &str) -> Value {
    serde_json::json!({
        "location": {
            "place_name": place,
            "latitude": lat,
            "longitude": lon,
        },
        "visit_date": date,
        "notes": notes,
    })
}
