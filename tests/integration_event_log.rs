//! Event Log Integration Tests
//!
//! Verify that a restarted service rebuilt from the event log serves the
//! same visits and aggregates as the one that wrote it.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use uuid::Uuid;

use trailbook::aggregation::{AggregationEngine, AggregationMode};
use trailbook::api::{app, AppState};
use trailbook::auth::TokenRegistry;
use trailbook::domain::CallerIdentity;
use trailbook::event_log::EventLog;
use trailbook::store::VisitStore;

mod common;

use common::{send, visit_body, USER_A_TOKEN};

struct TempLog(PathBuf);

impl TempLog {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("trailbook-integration-{}.jsonl", Uuid::new_v4())))
    }
}

impl Drop for TempLog {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Boot an app over the given log path, replaying whatever it holds
fn boot(log_path: &PathBuf, user_a: Uuid) -> Router {
    let store = Arc::new(VisitStore::new());
    EventLog::replay_into(log_path, &store).unwrap();
    let event_log = Arc::new(EventLog::open(log_path).unwrap());

    let engine = Arc::new(AggregationEngine::new(
        store.clone(),
        AggregationMode::Incremental,
    ));

    let mut tokens = TokenRegistry::new();
    tokens.insert_token(USER_A_TOKEN, CallerIdentity::user(user_a));

    app(AppState::new(store, engine, Some(event_log), Arc::new(tokens)))
}

#[tokio::test]
async fn test_restart_replays_visits_and_aggregates() {
    let temp = TempLog::new();
    let user_a = Uuid::new_v4();

    // First life: two creates and one delete
    {
        let app = boot(&temp.0, user_a);

        let (status, kept) = send(
            &app,
            "POST",
            "/api/v1/visits",
            Some(USER_A_TOKEN),
            Some(visit_body("Lisbon", 38.7223, -9.1393, "2025-05-10", "keep me")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let kept_id = kept["id"].as_str().unwrap().to_string();

        let (_, gone) = send(
            &app,
            "POST",
            "/api/v1/visits",
            Some(USER_A_TOKEN),
            Some(visit_body("Porto", 41.1579, -8.6291, "2025-05-11", "drop me")),
        )
        .await;
        let gone_uri = format!("/api/v1/visits/{}", gone["id"].as_str().unwrap());
        let (status, _) = send(&app, "DELETE", &gone_uri, Some(USER_A_TOKEN), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Sanity check before "restart"
        let (_, fetched) = send(
            &app,
            "GET",
            &format!("/api/v1/visits/{}", kept_id),
            Some(USER_A_TOKEN),
            None,
        )
        .await;
        assert_eq!(fetched["notes"], "keep me");
    }

    // Second life: same log, fresh store
    let app = boot(&temp.0, user_a);

    let history_uri = format!("/api/v1/users/{}/history", user_a);
    let (status, history) = send(&app, "GET", &history_uri, Some(USER_A_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = history["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["notes"], "keep me");

    // Aggregates rebuilt from the replayed store: only Lisbon counts
    let (status, board) = send(
        &app,
        "GET",
        "/api/v1/leaderboard/locations?limit=10",
        Some(USER_A_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = board["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["location"], "38.7223,-9.1393");
    assert_eq!(entries[0]["count"], 1);

    // And the service keeps appending to the same log
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/visits",
        Some(USER_A_TOKEN),
        Some(visit_body("Faro", 37.0194, -7.9304, "2025-05-12", "")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(EventLog::replay(&temp.0).unwrap().len(), 4);
}
