use std::sync::Arc;

use async_trait::async_trait;
use planner_core::{
    CoreError, IssueRecord, PlanningDataSource, Sprint, SprintPointsScope, TeamMember,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::JiraConfig;
use crate::fields::{StoryPointsField, read_story_points};
use crate::resources::resolve_api_base;
use crate::transport::{JiraRequest, JiraTransport, ReqwestJiraTransport};

const SPRINT_PAGE_SIZE: u32 = 50;
const SPRINT_ISSUE_PAGE_SIZE: u32 = 100;
const SEARCH_PAGE_SIZE: u32 = 100;
const MAX_PAGES: usize = 50;

/// Jira-backed planning data for one board, bound to one caller's token.
pub struct JiraPlanningSource {
    config: JiraConfig,
    api_base: String,
    transport: Arc<dyn JiraTransport>,
    story_points: StoryPointsField,
}

impl std::fmt::Debug for JiraPlanningSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraPlanningSource")
            .field("config", &self.config)
            .field("api_base", &self.api_base)
            .field("story_points", &self.story_points)
            .finish_non_exhaustive()
    }
}

impl JiraPlanningSource {
    pub async fn connect(
        config: JiraConfig,
        client: reqwest::Client,
        access_token: &str,
    ) -> Result<Self, CoreError> {
        let transport = ReqwestJiraTransport::new(client, access_token);
        let api_base = resolve_api_base(&transport, &config).await?;
        Ok(Self::with_transport(config, api_base, Arc::new(transport)))
    }

    pub fn with_transport(
        config: JiraConfig,
        api_base: impl Into<String>,
        transport: Arc<dyn JiraTransport>,
    ) -> Self {
        let story_points = StoryPointsField::new(config.story_points_field.clone());
        Self {
            config,
            api_base: api_base.into().trim_end_matches('/').to_owned(),
            transport,
            story_points,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn story_points_field(&self) -> Option<String> {
        self.story_points.chosen()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn board_sprints_request(&self, state: &str, start_at: usize, max_results: u32) -> JiraRequest {
        JiraRequest::get(self.url(&format!(
            "/rest/agile/1.0/board/{}/sprint",
            self.config.board_id
        )))
        .query("state", state)
        .query("startAt", start_at)
        .query("maxResults", max_results)
    }

    async fn search(&self, jql: &str, limit: Option<u32>) -> Result<Vec<Value>, CoreError> {
        let page_size = limit.unwrap_or(SEARCH_PAGE_SIZE).min(SEARCH_PAGE_SIZE);
        let mut issues = Vec::new();
        let mut next_page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut request = JiraRequest::get(self.url("/rest/api/3/search/jql"))
                .query("jql", jql)
                .query("fields", self.story_points.search_fields())
                .query("maxResults", page_size);
            if let Some(token) = next_page_token.as_deref() {
                request = request.query("nextPageToken", token);
            }

            let payload = self.transport.get(request).await?;
            issues.extend(array_field(&payload, "issues"));

            if limit.is_some_and(|limit| issues.len() >= limit as usize) {
                issues.truncate(limit.unwrap_or_default() as usize);
                break;
            }
            next_page_token = payload
                .get("nextPageToken")
                .and_then(Value::as_str)
                .map(str::to_owned);
            let is_last = payload.get("isLast").and_then(Value::as_bool).unwrap_or(true);
            if is_last || next_page_token.is_none() {
                break;
            }
        }

        Ok(issues)
    }

    fn issue_records(&self, issues: &[Value]) -> Vec<IssueRecord> {
        let field = self.story_points.resolve(issues);
        issues
            .iter()
            .map(|issue| issue_record(issue, &field))
            .collect()
    }
}

#[async_trait]
impl PlanningDataSource for JiraPlanningSource {
    async fn closed_sprints(&self) -> Result<Vec<Sprint>, CoreError> {
        let mut sprints = Vec::new();
        let mut start_at = 0usize;

        for _ in 0..MAX_PAGES {
            let payload = self
                .transport
                .get(self.board_sprints_request("closed", start_at, SPRINT_PAGE_SIZE))
                .await?;
            let values = array_field(&payload, "values");
            let fetched = values.len();
            sprints.extend(values.iter().filter_map(parse_sprint));

            let is_last = payload.get("isLast").and_then(Value::as_bool).unwrap_or(true);
            if is_last || fetched == 0 {
                break;
            }
            start_at += fetched;
        }

        debug!(board_id = self.config.board_id, count = sprints.len(), "fetched closed sprints");
        Ok(sprints)
    }

    async fn sprint_points(
        &self,
        sprint_id: u64,
        scope: SprintPointsScope,
    ) -> Result<f64, CoreError> {
        let jql = match scope {
            SprintPointsScope::Completed => format!("sprint = {sprint_id} AND status = Done"),
            SprintPointsScope::Planned => format!("sprint = {sprint_id}"),
        };
        let issues = self.search(&jql, None).await?;
        let field = self.story_points.resolve(&issues);
        Ok(issues
            .iter()
            .filter_map(|issue| issue.get("fields"))
            .filter_map(|fields| read_story_points(fields, &field))
            .sum())
    }

    async fn backlog_issues(&self) -> Result<Vec<IssueRecord>, CoreError> {
        let jql = format!(
            "project = {} AND sprint is EMPTY AND assignee is EMPTY AND statusCategory != Done ORDER BY priority DESC",
            self.config.project_key
        );
        let issues = self.search(&jql, Some(self.config.fetch_limit)).await?;
        Ok(self.issue_records(&issues))
    }

    async fn assignable_users(&self) -> Result<Vec<TeamMember>, CoreError> {
        let payload = self
            .transport
            .get(
                JiraRequest::get(self.url("/rest/api/3/user/assignable/search"))
                    .query("project", &self.config.project_key)
                    .query("maxResults", self.config.fetch_limit),
            )
            .await?;
        let users = payload.as_array().cloned().unwrap_or_default();
        Ok(users.iter().filter_map(team_member).collect())
    }

    async fn active_sprint(&self) -> Result<Option<Sprint>, CoreError> {
        let payload = self
            .transport
            .get(self.board_sprints_request("active", 0, 1))
            .await?;
        Ok(array_field(&payload, "values").first().and_then(parse_sprint))
    }

    async fn sprint_issues(&self, sprint_id: u64) -> Result<Vec<IssueRecord>, CoreError> {
        let mut issues = Vec::new();
        let mut start_at = 0usize;

        for _ in 0..MAX_PAGES {
            let payload = self
                .transport
                .get(
                    JiraRequest::get(self.url(&format!(
                        "/rest/agile/1.0/board/{}/sprint/{sprint_id}/issue",
                        self.config.board_id
                    )))
                    .query("startAt", start_at)
                    .query("maxResults", SPRINT_ISSUE_PAGE_SIZE)
                    .query("fields", self.story_points.search_fields()),
                )
                .await?;
            let page = array_field(&payload, "issues");
            let fetched = page.len();
            issues.extend(page);

            let total = payload
                .get("total")
                .and_then(Value::as_u64)
                .map(|total| total as usize)
                .unwrap_or(issues.len());
            let max_results = payload
                .get("maxResults")
                .and_then(Value::as_u64)
                .map(|max| max as usize)
                .unwrap_or(SPRINT_ISSUE_PAGE_SIZE as usize);
            if fetched == 0 || start_at + max_results >= total {
                break;
            }
            start_at += max_results;
        }

        Ok(self.issue_records(&issues))
    }
}

fn array_field(payload: &Value, name: &str) -> Vec<Value> {
    payload
        .get(name)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn parse_sprint(value: &Value) -> Option<Sprint> {
    match serde_json::from_value::<Sprint>(value.clone()) {
        Ok(sprint) => Some(sprint),
        Err(error) => {
            warn!(error = %error, "skipping malformed Jira sprint");
            None
        }
    }
}

fn team_member(user: &Value) -> Option<TeamMember> {
    if user.get("active").and_then(Value::as_bool) == Some(false) {
        return None;
    }
    if user.get("accountType").and_then(Value::as_str) == Some("app") {
        return None;
    }
    let account_id = user.get("accountId").and_then(Value::as_str)?;
    let display_name = user
        .get("displayName")
        .and_then(Value::as_str)
        .unwrap_or(account_id);
    Some(TeamMember::new(account_id, display_name))
}

fn nested_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .and_then(Value::as_str)
}

fn is_flagged(fields: &Value) -> bool {
    match fields.get("flagged") {
        Some(Value::Bool(flagged)) => *flagged,
        Some(Value::Array(entries)) => !entries.is_empty(),
        _ => false,
    }
}

pub(crate) fn issue_record(issue: &Value, story_points_field: &str) -> IssueRecord {
    let fields = issue.get("fields").unwrap_or(&Value::Null);
    IssueRecord {
        key: issue
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        summary: nested_str(fields, &["summary"]).unwrap_or_default().to_owned(),
        issue_type: nested_str(fields, &["issuetype", "name"])
            .unwrap_or_default()
            .to_owned(),
        story_points: read_story_points(fields, story_points_field),
        status_name: nested_str(fields, &["status", "name"])
            .unwrap_or_default()
            .to_owned(),
        status_category: nested_str(fields, &["status", "statusCategory", "key"])
            .unwrap_or("unknown")
            .to_owned(),
        priority: nested_str(fields, &["priority", "name"]).map(str::to_owned),
        assignee: nested_str(fields, &["assignee", "displayName"]).map(str::to_owned),
        labels: fields
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default(),
        flagged: is_flagged(fields),
    }
}
