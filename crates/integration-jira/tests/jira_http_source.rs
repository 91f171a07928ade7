use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use integration_jira::{JiraConfig, JiraPlanningSource, build_http_client};
use planner_core::{PlanningDataSource, SprintPointsScope};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const TOKEN: &str = "token-123";

#[derive(Clone)]
struct MockState {
    address: String,
    seen_paths: Arc<Mutex<Vec<String>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer token-123")
}

fn record(state: &MockState, path: String) {
    state.seen_paths.lock().expect("seen paths lock").push(path);
}

async fn accessible_resources(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    record(&state, "/oauth/token/accessible-resources".to_owned());
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad token"})));
    }
    (
        StatusCode::OK,
        Json(json!([
            {"id": "other-cloud", "url": "https://other.atlassian.net", "name": "other"},
            {"id": "cloud-1", "url": "https://acme.atlassian.net", "name": "acme", "scopes": ["read:jira-work"]}
        ])),
    )
}

async fn board_sprints(
    State(state): State<MockState>,
    Path((cloud_id, board_id)): Path<(String, u64)>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, format!("/ex/jira/{cloud_id}/board/{board_id}/sprint"));
    let state_filter = query.get("state").map(String::as_str).unwrap_or_default();
    let values = match state_filter {
        "closed" => json!([
            {"id": 1, "name": "Sprint 1", "state": "closed"},
            {"id": 2, "name": "Sprint 2", "state": "closed"}
        ]),
        "active" => json!([
            {"id": 3, "name": "Sprint 3", "state": "active", "goal": "Ship planner"}
        ]),
        _ => json!([]),
    };
    Json(json!({"isLast": true, "values": values, "self": state.address}))
}

async fn search(
    State(state): State<MockState>,
    Path(cloud_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, format!("/ex/jira/{cloud_id}/search/jql"));
    let jql = query.get("jql").cloned().unwrap_or_default();
    let issues = match jql.as_str() {
        "sprint = 2 AND status = Done" => json!([
            {"key": "PLAN-1", "fields": {"summary": "a", "customfield_10016": 5}},
            {"key": "PLAN-2", "fields": {"summary": "b", "customfield_10016": 8}}
        ]),
        "sprint = 2" => json!([
            {"key": "PLAN-1", "fields": {"summary": "a", "customfield_10016": 5}},
            {"key": "PLAN-2", "fields": {"summary": "b", "customfield_10016": 8}},
            {"key": "PLAN-3", "fields": {"summary": "c", "customfield_10016": 3}}
        ]),
        _ => json!([]),
    };
    Json(json!({"isLast": true, "issues": issues}))
}

async fn spawn_mock_jira() -> (String, MockState, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock jira listener");
    let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
    let base = format!("http://{address}");
    let state = MockState {
        address: base.clone(),
        seen_paths: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/oauth/token/accessible-resources", get(accessible_resources))
        .route(
            "/ex/jira/{cloud_id}/rest/agile/1.0/board/{board_id}/sprint",
            get(board_sprints),
        )
        .route("/ex/jira/{cloud_id}/rest/api/3/search/jql", get(search))
        .with_state(state.clone());

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        server.await.expect("run mock jira server");
    });
    (base, state, shutdown_tx, handle)
}

fn config_for(base: &str) -> JiraConfig {
    let mut config = JiraConfig::new("PLAN", 12);
    config.site_url = Some("https://acme.atlassian.net".to_owned());
    config.accessible_resources_url = format!("{base}/oauth/token/accessible-resources");
    config.gateway_url = format!("{base}/ex/jira");
    config
}

#[tokio::test]
async fn connect_resolves_cloud_and_reads_board_data() {
    let (base, state, shutdown_tx, handle) = spawn_mock_jira().await;
    let client = build_http_client(Duration::from_secs(5)).expect("http client");

    let source = JiraPlanningSource::connect(config_for(&base), client, TOKEN)
        .await
        .expect("connect to mock jira");
    assert_eq!(source.api_base(), format!("{base}/ex/jira/cloud-1"));

    let closed = source.closed_sprints().await.expect("closed sprints");
    assert_eq!(closed.len(), 2);

    let completed = source
        .sprint_points(2, SprintPointsScope::Completed)
        .await
        .expect("completed points");
    let planned = source
        .sprint_points(2, SprintPointsScope::Planned)
        .await
        .expect("planned points");
    assert_eq!(completed, 13.0);
    assert_eq!(planned, 16.0);
    assert_eq!(source.story_points_field().as_deref(), Some("customfield_10016"));

    let active = source
        .active_sprint()
        .await
        .expect("active sprint")
        .expect("sprint is active");
    assert_eq!(active.id, 3);
    assert_eq!(active.goal.as_deref(), Some("Ship planner"));

    let seen = state.seen_paths.lock().expect("seen paths lock").clone();
    assert_eq!(seen[0], "/oauth/token/accessible-resources");
    assert!(seen.iter().any(|path| path == "/ex/jira/cloud-1/board/12/sprint"));

    let _ = shutdown_tx.send(());
    handle.await.expect("mock server task");
}

#[tokio::test]
async fn rejected_token_maps_to_unauthorized() {
    let (base, _state, shutdown_tx, handle) = spawn_mock_jira().await;
    let client = build_http_client(Duration::from_secs(5)).expect("http client");

    let err = JiraPlanningSource::connect(config_for(&base), client, "wrong-token")
        .await
        .expect_err("bad token should fail");
    assert!(err.is_unauthorized());

    let _ = shutdown_tx.send(());
    handle.await.expect("mock server task");
}

#[tokio::test]
async fn configured_api_url_bypasses_accessible_resources() {
    let (base, state, shutdown_tx, handle) = spawn_mock_jira().await;
    let client = build_http_client(Duration::from_secs(5)).expect("http client");
    let mut config = config_for(&base);
    config.api_url = Some(format!("{base}/ex/jira/cloud-1"));

    let source = JiraPlanningSource::connect(config, client, TOKEN)
        .await
        .expect("connect with fixed api url");
    assert!(source.active_sprint().await.expect("active sprint").is_some());

    let seen = state.seen_paths.lock().expect("seen paths lock").clone();
    assert!(!seen.iter().any(|path| path.contains("accessible-resources")));

    let _ = shutdown_tx.send(());
    handle.await.expect("mock server task");
}
