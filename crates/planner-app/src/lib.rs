mod error;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use backend_openai::{OpenAiAdvisor, OpenAiConfig};
use integration_jira::{JiraConfig, JiraPlanningSource, build_http_client};
use planner_config::SprintPlannerConfig;
use planner_core::{
    CoreError, PlanningSettings, SeededWorkloadEstimator, SprintPlanningService,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

pub use error::ApiError;

pub const ENV_JIRA_ACCESS_TOKEN: &str = "JIRA_ACCESS_TOKEN";
const DEFAULT_JIRA_TIMEOUT_SECS: u64 = 20;

#[derive(Clone)]
pub struct AppState {
    service: Arc<SprintPlanningService>,
    jira: Arc<Result<JiraConfig, CoreError>>,
    http_client: reqwest::Client,
    fallback_token: Option<String>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("jira", &self.jira)
            .field(
                "fallback_token",
                &self.fallback_token.as_ref().map(|_| "<redacted>"),
            )
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// A Jira configuration error is kept rather than returned so the server
    /// still starts and reports it on the planning routes.
    pub fn new(
        service: SprintPlanningService,
        jira: Result<JiraConfig, CoreError>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            service: Arc::new(service),
            jira: Arc::new(jira),
            http_client,
            fallback_token: None,
        }
    }

    pub fn with_fallback_token(mut self, token: Option<String>) -> Self {
        self.fallback_token = token
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty());
        self
    }

    pub fn service(&self) -> &SprintPlanningService {
        &self.service
    }

    async fn connect(&self, request_token: Option<String>) -> Result<JiraPlanningSource, ApiError> {
        let token = request_token
            .or_else(|| self.fallback_token.clone())
            .ok_or(ApiError::MissingToken)?;
        let config = self.jira.as_ref().as_ref().map_err(Clone::clone)?;
        let source =
            JiraPlanningSource::connect(config.clone(), self.http_client.clone(), &token).await?;
        Ok(source)
    }
}

pub fn build_state(config: &SprintPlannerConfig) -> Result<AppState, CoreError> {
    let planning = config.planning_runtime();
    let jira = JiraConfig::from_settings(&config.jira_runtime());
    if let Err(error) = &jira {
        warn!(error = %error, "Jira settings are incomplete; planning routes will return errors");
    }
    let timeout = jira
        .as_ref()
        .map(|jira| jira.request_timeout)
        .unwrap_or(Duration::from_secs(DEFAULT_JIRA_TIMEOUT_SECS));
    let http_client = build_http_client(timeout)?;

    let mut service = SprintPlanningService::new(PlanningSettings {
        sprint_history_limit: planning.sprint_history_limit,
        reference_team_size: planning.reference_team_size,
    });
    if let Some(seed) = planning.workload_seed {
        info!(seed, "using seeded workload estimator");
        service = service.with_estimator(Arc::new(SeededWorkloadEstimator::new(seed)));
    }
    match OpenAiConfig::from_settings(&config.openai) {
        Ok(openai) => {
            info!(model = %openai.model, "OpenAI advisor enabled");
            service = service.with_advisor(Arc::new(OpenAiAdvisor::new(openai)?));
        }
        Err(error) => {
            info!(reason = %error, "OpenAI advisor disabled; recommendations are heuristic only");
        }
    }

    let fallback_token = std::env::var(ENV_JIRA_ACCESS_TOKEN).ok();
    Ok(AppState::new(service, jira, http_client).with_fallback_token(fallback_token))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/jira/sprint-planning", get(routes::sprint_planning))
        .route("/api/jira/sprint-status", get(routes::sprint_status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
