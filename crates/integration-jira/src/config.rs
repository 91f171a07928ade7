use std::time::Duration;

use planner_config::JiraRuntimeConfig;
use planner_core::CoreError;

pub const DEFAULT_ACCESSIBLE_RESOURCES_URL: &str =
    "https://api.atlassian.com/oauth/token/accessible-resources";
pub const DEFAULT_GATEWAY_URL: &str = "https://api.atlassian.com/ex/jira";
const DEFAULT_FETCH_LIMIT: u32 = 50;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraConfig {
    /// Site the caller's token should resolve to, e.g. `https://acme.atlassian.net`.
    pub site_url: Option<String>,
    /// Fixed API base. Skips accessible-resource resolution when set.
    pub api_url: Option<String>,
    pub accessible_resources_url: String,
    pub gateway_url: String,
    pub project_key: String,
    pub board_id: u64,
    pub story_points_field: Option<String>,
    pub fetch_limit: u32,
    pub request_timeout: Duration,
}

impl JiraConfig {
    pub fn new(project_key: impl Into<String>, board_id: u64) -> Self {
        Self {
            site_url: None,
            api_url: None,
            accessible_resources_url: DEFAULT_ACCESSIBLE_RESOURCES_URL.to_owned(),
            gateway_url: DEFAULT_GATEWAY_URL.to_owned(),
            project_key: project_key.into(),
            board_id,
            story_points_field: None,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self, CoreError> {
        let project_key = std::env::var("JIRA_PROJECT_KEY").unwrap_or_default();
        let board_id = std::env::var("JIRA_BOARD_ID").unwrap_or_default();
        let mut config = Self::new(
            validate_project_key(&project_key)?,
            parse_board_id(&board_id)?,
        );
        config.site_url = env_non_empty("JIRA_URL");
        config.story_points_field = env_non_empty("JIRA_STORY_POINTS_FIELD");
        Ok(config)
    }

    pub fn from_settings(settings: &JiraRuntimeConfig) -> Result<Self, CoreError> {
        let mut config = Self::new(
            validate_project_key(&settings.project_key)?,
            parse_board_id(&settings.board_id)?,
        );
        config.site_url = settings.site_url.clone();
        config.api_url = settings
            .api_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_owned());
        config.accessible_resources_url = settings.accessible_resources_url.clone();
        config.gateway_url = settings.gateway_url.trim_end_matches('/').to_owned();
        config.story_points_field = settings.story_points_field.clone();
        if settings.fetch_limit > 0 {
            config.fetch_limit = settings.fetch_limit;
        }
        if settings.request_timeout_secs > 0 {
            config.request_timeout = Duration::from_secs(settings.request_timeout_secs);
        }
        Ok(config)
    }
}

fn validate_project_key(raw: &str) -> Result<String, CoreError> {
    let project_key = raw.trim();
    if project_key.is_empty() {
        return Err(CoreError::Configuration(
            "JIRA_PROJECT_KEY is not set. Set it in the environment or jira.project_key in the config file."
                .to_owned(),
        ));
    }
    Ok(project_key.to_owned())
}

fn parse_board_id(raw: &str) -> Result<u64, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CoreError::Configuration(
            "JIRA_BOARD_ID is not set. Set it in the environment or jira.board_id in the config file."
                .to_owned(),
        ));
    }
    raw.parse::<u64>().map_err(|_| {
        CoreError::Configuration(format!(
            "JIRA_BOARD_ID must be a numeric board id, got `{raw}`."
        ))
    })
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
