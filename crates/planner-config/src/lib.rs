use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const ENV_SPRINT_PLANNER_CONFIG: &str = "SPRINT_PLANNER_CONFIG";
pub const ENV_SPRINT_PLANNER_BIND: &str = "SPRINT_PLANNER_BIND";
pub const ENV_JIRA_URL: &str = "JIRA_URL";
pub const ENV_JIRA_PROJECT_KEY: &str = "JIRA_PROJECT_KEY";
pub const ENV_JIRA_BOARD_ID: &str = "JIRA_BOARD_ID";
pub const ENV_JIRA_STORY_POINTS_FIELD: &str = "JIRA_STORY_POINTS_FIELD";
pub const ENV_OPENAI_MODEL: &str = "OPENAI_MODEL";

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3001";
const DEFAULT_ACCESSIBLE_RESOURCES_URL: &str =
    "https://api.atlassian.com/oauth/token/accessible-resources";
const DEFAULT_JIRA_GATEWAY_URL: &str = "https://api.atlassian.com/ex/jira";
const DEFAULT_SPRINT_HISTORY_LIMIT: usize = 5;
const MAX_SPRINT_HISTORY_LIMIT: usize = 50;
const DEFAULT_JIRA_FETCH_LIMIT: u32 = 50;
const MAX_JIRA_FETCH_LIMIT: u32 = 100;
const DEFAULT_JIRA_REQUEST_TIMEOUT_SECS: u64 = 20;
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;
const DEFAULT_REFERENCE_TEAM_SIZE: u32 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SprintPlannerConfig {
    #[serde(default)]
    pub server: ServerConfigToml,
    #[serde(default)]
    pub jira: JiraConfigToml,
    #[serde(default)]
    pub openai: OpenAiConfigToml,
    #[serde(default)]
    pub planning: PlanningConfigToml,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfigToml {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfigToml {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Blank `api_url` means the API base is derived per request from the
/// caller's token; blank `story_points_field` means discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JiraConfigToml {
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub api_url: String,
    #[serde(default = "default_accessible_resources_url")]
    pub accessible_resources_url: String,
    #[serde(default = "default_jira_gateway_url")]
    pub gateway_url: String,
    #[serde(default)]
    pub project_key: String,
    #[serde(default)]
    pub board_id: String,
    #[serde(default)]
    pub story_points_field: String,
    #[serde(default = "default_sprint_history_limit")]
    pub sprint_history_limit: usize,
    #[serde(default = "default_jira_fetch_limit")]
    pub fetch_limit: u32,
    #[serde(default = "default_jira_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for JiraConfigToml {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            api_url: String::new(),
            accessible_resources_url: default_accessible_resources_url(),
            gateway_url: default_jira_gateway_url(),
            project_key: String::new(),
            board_id: String::new(),
            story_points_field: String::new(),
            sprint_history_limit: default_sprint_history_limit(),
            fetch_limit: default_jira_fetch_limit(),
            request_timeout_secs: default_jira_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenAiConfigToml {
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfigToml {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            base_url: default_openai_base_url(),
            request_timeout_secs: default_openai_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanningConfigToml {
    #[serde(default = "default_reference_team_size")]
    pub reference_team_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_seed: Option<u64>,
}

impl Default for PlanningConfigToml {
    fn default() -> Self {
        Self {
            reference_team_size: default_reference_team_size(),
            workload_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraRuntimeConfig {
    pub site_url: Option<String>,
    pub api_url: Option<String>,
    pub accessible_resources_url: String,
    pub gateway_url: String,
    pub project_key: String,
    pub board_id: String,
    pub story_points_field: Option<String>,
    pub fetch_limit: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningRuntimeConfig {
    pub sprint_history_limit: usize,
    pub reference_team_size: u32,
    pub workload_seed: Option<u64>,
}

impl SprintPlannerConfig {
    pub fn jira_runtime(&self) -> JiraRuntimeConfig {
        JiraRuntimeConfig {
            site_url: non_empty(&self.jira.site_url),
            api_url: non_empty(&self.jira.api_url),
            accessible_resources_url: self.jira.accessible_resources_url.clone(),
            gateway_url: self.jira.gateway_url.clone(),
            project_key: self.jira.project_key.clone(),
            board_id: self.jira.board_id.clone(),
            story_points_field: non_empty(&self.jira.story_points_field),
            fetch_limit: self.jira.fetch_limit,
            request_timeout_secs: self.jira.request_timeout_secs,
        }
    }

    pub fn planning_runtime(&self) -> PlanningRuntimeConfig {
        PlanningRuntimeConfig {
            sprint_history_limit: self.jira.sprint_history_limit,
            reference_team_size: self.planning.reference_team_size,
            workload_seed: self.planning.workload_seed,
        }
    }

    /// Environment values win over the file for this process only; they are
    /// never written back.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        override_from_env(ENV_SPRINT_PLANNER_BIND, &mut self.server.bind_address)?;
        override_from_env(ENV_JIRA_URL, &mut self.jira.site_url)?;
        override_from_env(ENV_JIRA_PROJECT_KEY, &mut self.jira.project_key)?;
        override_from_env(ENV_JIRA_BOARD_ID, &mut self.jira.board_id)?;
        override_from_env(ENV_JIRA_STORY_POINTS_FIELD, &mut self.jira.story_points_field)?;
        override_from_env(ENV_OPENAI_MODEL, &mut self.openai.model)?;
        Ok(())
    }
}

pub fn load_from_env() -> Result<SprintPlannerConfig, ConfigError> {
    let path = config_path_from_env()?;
    let mut config = load_from_path(path)?;
    config.apply_env_overrides()?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<SprintPlannerConfig, ConfigError> {
    load_or_create_config(path.as_ref())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = resolve_home_dir().ok_or_else(|| {
        ConfigError::configuration("Unable to resolve home directory from HOME or USERPROFILE")
    })?;

    Ok(home
        .join(".config")
        .join("sprint-planner")
        .join("config.toml"))
}

fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    match std::env::var(ENV_SPRINT_PLANNER_CONFIG) {
        Ok(raw) => {
            if raw.trim().is_empty() {
                default_config_path()
            } else {
                Ok(raw.into())
            }
        }
        Err(std::env::VarError::NotPresent) => default_config_path(),
        Err(_) => Err(ConfigError::configuration(
            "SPRINT_PLANNER_CONFIG contained invalid UTF-8",
        )),
    }
}

fn resolve_home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("USERPROFILE")
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
}

fn override_from_env(name: &str, target: &mut String) -> Result<(), ConfigError> {
    match std::env::var(name) {
        Ok(raw) => {
            let value = raw.trim();
            if !value.is_empty() {
                *target = value.to_owned();
            }
            Ok(())
        }
        Err(std::env::VarError::NotPresent) => Ok(()),
        Err(_) => Err(ConfigError::configuration(format!(
            "{name} contained invalid UTF-8"
        ))),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn persist_config(path: &Path, config: &SprintPlannerConfig) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to serialize SPRINT_PLANNER_CONFIG for {}: {err}",
            path.display()
        ))
    })?;

    std::fs::write(path, rendered.as_bytes()).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to write SPRINT_PLANNER_CONFIG to {}: {err}",
            path.display()
        ))
    })
}

fn load_or_create_config(path: &Path) -> Result<SprintPlannerConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "Failed to create parent directory {} for SPRINT_PLANNER_CONFIG: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let default_config = SprintPlannerConfig::default();
            persist_config(path, &default_config)?;
            info!(path = %path.display(), "created default sprint planner config");

            toml::to_string_pretty(&default_config).map_err(|err| {
                ConfigError::configuration(format!(
                    "Failed to serialize default SPRINT_PLANNER_CONFIG: {err}"
                ))
            })?
        }
        Err(err) => {
            return Err(ConfigError::configuration(format!(
                "Failed to read SPRINT_PLANNER_CONFIG from {}: {err}",
                path.display()
            )));
        }
    };

    let mut config: SprintPlannerConfig = toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to parse SPRINT_PLANNER_CONFIG from {}: {err}",
            path.display()
        ))
    })?;

    let changed = normalize_config(&mut config);
    if changed {
        persist_config(path, &config)?;
    }

    Ok(config)
}

fn normalize_config(config: &mut SprintPlannerConfig) -> bool {
    let mut changed = false;

    changed |= normalize_non_empty_string(&mut config.server.bind_address, default_bind_address());

    changed |= normalize_trimmed(&mut config.jira.site_url);
    changed |= normalize_trimmed(&mut config.jira.api_url);
    changed |= normalize_non_empty_string(
        &mut config.jira.accessible_resources_url,
        default_accessible_resources_url(),
    );
    changed |= normalize_non_empty_string(&mut config.jira.gateway_url, default_jira_gateway_url());
    changed |= normalize_trimmed(&mut config.jira.project_key);
    changed |= normalize_trimmed(&mut config.jira.board_id);
    changed |= normalize_trimmed(&mut config.jira.story_points_field);
    changed |= normalize_bounded(
        &mut config.jira.sprint_history_limit,
        default_sprint_history_limit(),
        MAX_SPRINT_HISTORY_LIMIT,
    );
    changed |= normalize_bounded(
        &mut config.jira.fetch_limit,
        default_jira_fetch_limit(),
        MAX_JIRA_FETCH_LIMIT,
    );
    changed |= normalize_bounded(
        &mut config.jira.request_timeout_secs,
        default_jira_request_timeout_secs(),
        MAX_REQUEST_TIMEOUT_SECS,
    );

    changed |= normalize_non_empty_string(&mut config.openai.model, default_openai_model());
    changed |= normalize_non_empty_string(&mut config.openai.base_url, default_openai_base_url());
    changed |= normalize_bounded(
        &mut config.openai.request_timeout_secs,
        default_openai_request_timeout_secs(),
        MAX_REQUEST_TIMEOUT_SECS,
    );

    if config.planning.reference_team_size == 0 {
        config.planning.reference_team_size = default_reference_team_size();
        changed = true;
    }

    changed
}

fn normalize_non_empty_string(value: &mut String, default: String) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        if *value != default {
            *value = default;
            return true;
        }
        return false;
    }

    if trimmed != value {
        *value = trimmed.to_owned();
        return true;
    }
    false
}

fn normalize_trimmed(value: &mut String) -> bool {
    let trimmed = value.trim();
    if trimmed != value {
        *value = trimmed.to_owned();
        return true;
    }
    false
}

fn normalize_bounded<T>(value: &mut T, default: T, max: T) -> bool
where
    T: Copy + PartialOrd + Default,
{
    if *value == T::default() {
        *value = default;
        return true;
    }
    if *value > max {
        *value = max;
        return true;
    }
    false
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_owned()
}

fn default_accessible_resources_url() -> String {
    DEFAULT_ACCESSIBLE_RESOURCES_URL.to_owned()
}

fn default_jira_gateway_url() -> String {
    DEFAULT_JIRA_GATEWAY_URL.to_owned()
}

fn default_sprint_history_limit() -> usize {
    DEFAULT_SPRINT_HISTORY_LIMIT
}

fn default_jira_fetch_limit() -> u32 {
    DEFAULT_JIRA_FETCH_LIMIT
}

fn default_jira_request_timeout_secs() -> u64 {
    DEFAULT_JIRA_REQUEST_TIMEOUT_SECS
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_owned()
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_owned()
}

fn default_openai_request_timeout_secs() -> u64 {
    DEFAULT_OPENAI_REQUEST_TIMEOUT_SECS
}

fn default_reference_team_size() -> u32 {
    DEFAULT_REFERENCE_TEAM_SIZE
}
