use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use integration_jira::{JiraConfig, build_http_client};
use planner_app::{AppState, router};
use planner_core::{
    CoreError, FixedWorkloadEstimator, PlanningSettings, SprintPlanningService,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const TOKEN: &str = "token-123";

#[derive(Clone, Default)]
struct MockJira {
    active: Option<Value>,
    sprint_issues: Vec<Value>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer token-123")
}

fn rejected() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad token"}))).into_response()
}

async fn board_sprints(
    State(mock): State<Arc<MockJira>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    let values = match query.get("state").map(String::as_str) {
        Some("active") => mock.active.iter().cloned().collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    Json(json!({"isLast": true, "values": values})).into_response()
}

async fn search(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    let jql = query.get("jql").cloned().unwrap_or_default();
    let issues = if jql.contains("sprint is EMPTY") {
        json!([
            {"key": "PLAN-10", "fields": {"summary": "Checkout flow", "issuetype": {"name": "Story"}, "customfield_10016": 5}},
            {"key": "PLAN-11", "fields": {"summary": "Payments", "issuetype": {"name": "Epic"}, "customfield_10016": null}}
        ])
    } else {
        json!([])
    };
    Json(json!({"isLast": true, "issues": issues})).into_response()
}

async fn assignable_users(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    Json(json!([
        {"accountId": "u-1", "displayName": "Riley Chen", "active": true, "accountType": "atlassian"},
        {"accountId": "u-2", "displayName": "Dana Ortiz", "active": true, "accountType": "atlassian"},
        {"accountId": "bot", "displayName": "Automation", "active": true, "accountType": "app"}
    ]))
    .into_response()
}

async fn sprint_issues(State(mock): State<Arc<MockJira>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    Json(json!({
        "startAt": 0,
        "maxResults": 100,
        "total": mock.sprint_issues.len(),
        "issues": mock.sprint_issues,
    }))
    .into_response()
}

async fn spawn(app: Router) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let address: SocketAddr = listener.local_addr().expect("listener local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        server.await.expect("run server");
    });
    (format!("http://{address}"), shutdown_tx, handle)
}

async fn spawn_mock_jira(mock: MockJira) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/rest/agile/1.0/board/{board_id}/sprint", get(board_sprints))
        .route(
            "/rest/agile/1.0/board/{board_id}/sprint/{sprint_id}/issue",
            get(sprint_issues),
        )
        .route("/rest/api/3/search/jql", get(search))
        .route("/rest/api/3/user/assignable/search", get(assignable_users))
        .with_state(Arc::new(mock));
    spawn(app).await
}

fn app_state(jira: Result<JiraConfig, CoreError>, fallback_token: Option<&str>) -> AppState {
    let service = SprintPlanningService::new(PlanningSettings::default())
        .with_estimator(Arc::new(FixedWorkloadEstimator::uniform(1.0)));
    let client = build_http_client(Duration::from_secs(5)).expect("http client");
    AppState::new(service, jira, client).with_fallback_token(fallback_token.map(str::to_owned))
}

fn jira_config(jira_base: &str) -> JiraConfig {
    let mut config = JiraConfig::new("PLAN", 12);
    config.api_url = Some(jira_base.to_owned());
    config
}

async fn get_json(url: String, token: Option<&str>) -> (StatusCode, Value) {
    let client = reqwest::Client::new();
    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.expect("send request");
    let status = StatusCode::from_u16(response.status().as_u16()).expect("status code");
    let body = response.json::<Value>().await.expect("json body");
    (status, body)
}

#[tokio::test]
async fn health_reports_service_name() {
    let state = app_state(Err(CoreError::Configuration("unset".to_owned())), None);
    let (base, shutdown_tx, handle) = spawn(router(state)).await;

    let (status, body) = get_json(format!("{base}/health"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "service": "sprint-planner"}));

    let _ = shutdown_tx.send(());
    handle.await.expect("app task");
}

#[tokio::test]
async fn sprint_planning_without_history_uses_demo_velocity() {
    let (jira_base, jira_shutdown, jira_handle) = spawn_mock_jira(MockJira::default()).await;
    let state = app_state(Ok(jira_config(&jira_base)), None);
    let (base, shutdown_tx, handle) = spawn(router(state)).await;

    let (status, body) =
        get_json(format!("{base}/api/jira/sprint-planning"), Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["noSprints"], json!(true));
    assert_eq!(body["velocity"]["averageVelocity"], json!(29.6));
    assert_eq!(body["velocity"]["sprints"].as_array().map(Vec::len), Some(5));
    assert_eq!(body["velocity"]["recommendedCapacityBase"], json!(15));
    assert_eq!(body["currentSprint"], Value::Null);
    assert_eq!(body["backlog"]["totalPoints"], json!(26.0));
    assert_eq!(body["backlog"]["items"][1]["storyPoints"], json!(21.0));
    assert_eq!(body["team"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["recommendations"]["source"], json!("heuristic"));

    let _ = shutdown_tx.send(());
    handle.await.expect("app task");
    let _ = jira_shutdown.send(());
    jira_handle.await.expect("jira task");
}

#[tokio::test]
async fn missing_token_asks_client_to_log_out() {
    let (jira_base, jira_shutdown, jira_handle) = spawn_mock_jira(MockJira::default()).await;
    let state = app_state(Ok(jira_config(&jira_base)), None);
    let (base, shutdown_tx, handle) = spawn(router(state)).await;

    let (status, body) = get_json(format!("{base}/api/jira/sprint-planning"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["logout"], json!(true));
    assert!(body["error"].is_string());

    let _ = shutdown_tx.send(());
    handle.await.expect("app task");
    let _ = jira_shutdown.send(());
    jira_handle.await.expect("jira task");
}

#[tokio::test]
async fn rejected_token_asks_client_to_log_out() {
    let (jira_base, jira_shutdown, jira_handle) = spawn_mock_jira(MockJira::default()).await;
    let state = app_state(Ok(jira_config(&jira_base)), None);
    let (base, shutdown_tx, handle) = spawn(router(state)).await;

    let (status, body) =
        get_json(format!("{base}/api/jira/sprint-planning"), Some("expired")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["logout"], json!(true));

    let _ = shutdown_tx.send(());
    handle.await.expect("app task");
    let _ = jira_shutdown.send(());
    jira_handle.await.expect("jira task");
}

#[tokio::test]
async fn environment_token_is_used_when_header_is_missing() {
    let mock = MockJira {
        active: Some(json!({"id": 40, "name": "Sprint 40", "state": "active"})),
        sprint_issues: Vec::new(),
    };
    let (jira_base, jira_shutdown, jira_handle) = spawn_mock_jira(mock).await;
    let state = app_state(Ok(jira_config(&jira_base)), Some(TOKEN));
    let (base, shutdown_tx, handle) = spawn(router(state)).await;

    let (status, body) = get_json(format!("{base}/api/jira/sprint-planning"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentSprint"]["id"], json!(40));

    let _ = shutdown_tx.send(());
    handle.await.expect("app task");
    let _ = jira_shutdown.send(());
    jira_handle.await.expect("jira task");
}

#[tokio::test]
async fn sprint_status_without_active_sprint_is_not_found() {
    let (jira_base, jira_shutdown, jira_handle) = spawn_mock_jira(MockJira::default()).await;
    let state = app_state(Ok(jira_config(&jira_base)), None);
    let (base, shutdown_tx, handle) = spawn(router(state)).await;

    let (status, body) = get_json(format!("{base}/api/jira/sprint-status"), Some(TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "No active sprint found"}));

    let _ = shutdown_tx.send(());
    handle.await.expect("app task");
    let _ = jira_shutdown.send(());
    jira_handle.await.expect("jira task");
}

#[tokio::test]
async fn sprint_status_reports_progress_for_active_sprint() {
    let mock = MockJira {
        active: Some(json!({"id": 41, "name": "Sprint 41", "state": "active"})),
        sprint_issues: vec![
            json!({"key": "PLAN-1", "fields": {
                "summary": "Login", "issuetype": {"name": "Story"}, "customfield_10016": 5,
                "status": {"name": "Done", "statusCategory": {"key": "done"}},
                "priority": {"name": "Medium"}
            }}),
            json!({"key": "PLAN-2", "fields": {
                "summary": "Search", "issuetype": {"name": "Story"}, "customfield_10016": 3,
                "status": {"name": "To Do", "statusCategory": {"key": "new"}},
                "priority": {"name": "High"}
            }}),
        ],
    };
    let (jira_base, jira_shutdown, jira_handle) = spawn_mock_jira(mock).await;
    let state = app_state(Ok(jira_config(&jira_base)), None);
    let (base, shutdown_tx, handle) = spawn(router(state)).await;

    let (status, body) = get_json(format!("{base}/api/jira/sprint-status"), Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sprint"]["id"], json!(41));
    assert_eq!(body["progress"]["completionPct"], json!(62.5));
    assert_eq!(body["progress"]["status"], json!("Good Progress"));
    assert_eq!(body["progress"]["counts"]["done"], json!(1));
    assert_eq!(body["progress"]["highPriorityTodo"][0]["key"], json!("PLAN-2"));
    assert!(body.get("daysLeft").is_none());

    let _ = shutdown_tx.send(());
    handle.await.expect("app task");
    let _ = jira_shutdown.send(());
    jira_handle.await.expect("jira task");
}

#[tokio::test]
async fn incomplete_jira_settings_return_server_error() {
    let state = app_state(
        Err(CoreError::Configuration(
            "JIRA_PROJECT_KEY is not set".to_owned(),
        )),
        Some(TOKEN),
    );
    let (base, shutdown_tx, handle) = spawn(router(state)).await;

    let (status, body) = get_json(format!("{base}/api/jira/sprint-planning"), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("JIRA_PROJECT_KEY is not set"));

    let _ = shutdown_tx.send(());
    handle.await.expect("app task");
}
