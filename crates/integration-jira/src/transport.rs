use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use planner_core::CoreError;
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl JiraRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
        }
    }

    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_owned(), value.to_string()));
        self
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait JiraTransport: Send + Sync {
    async fn get(&self, request: JiraRequest) -> Result<Value, CoreError>;
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, CoreError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent("sprint-planner/integration-jira")
        .build()
        .map_err(|err| {
            CoreError::DependencyUnavailable(format!(
                "failed to initialize Jira HTTP client: {err}"
            ))
        })
}

#[derive(Clone)]
pub struct ReqwestJiraTransport {
    access_token: String,
    client: reqwest::Client,
}

impl fmt::Debug for ReqwestJiraTransport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReqwestJiraTransport")
            .field("access_token", &"<redacted>")
            .field("client", &self.client)
            .finish()
    }
}

impl ReqwestJiraTransport {
    pub fn new(client: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            client,
        }
    }
}

#[async_trait]
impl JiraTransport for ReqwestJiraTransport {
    async fn get(&self, request: JiraRequest) -> Result<Value, CoreError> {
        let response = self
            .client
            .get(&request.url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .query(&request.query)
            .send()
            .await
            .map_err(|err| {
                CoreError::DependencyUnavailable(format!("failed to call Jira API: {err}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            CoreError::DependencyUnavailable(format!(
                "failed to read response from Jira API: {err}"
            ))
        })?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(CoreError::Unauthorized(format!(
                "Jira rejected the access token: {}",
                truncate_for_error(&body)
            )));
        }
        if !status.is_success() {
            return Err(CoreError::DependencyUnavailable(format!(
                "Jira API returned HTTP {} for {}: {}",
                status,
                request.url,
                truncate_for_error(&body)
            )));
        }

        serde_json::from_str(&body).map_err(|err| {
            CoreError::DependencyUnavailable(format!("failed to parse Jira response JSON: {err}"))
        })
    }
}

pub(crate) fn truncate_for_error(body: &str) -> String {
    const MAX_LEN: usize = 200;
    if body.chars().count() <= MAX_LEN {
        body.to_owned()
    } else {
        format!("{}...", body.chars().take(MAX_LEN).collect::<String>())
    }
}
