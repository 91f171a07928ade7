use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;
use crate::model::{IssueRecord, Sprint, TeamMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SprintPointsScope {
    Completed,
    Planned,
}

impl SprintPointsScope {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Planned => "planned",
        }
    }
}

/// Everything the planner reads from the issue tracker for one board.
#[async_trait]
pub trait PlanningDataSource: Send + Sync {
    /// Closed sprints in the order the tracker lists them, oldest first.
    async fn closed_sprints(&self) -> Result<Vec<Sprint>, CoreError>;
    async fn sprint_points(
        &self,
        sprint_id: u64,
        scope: SprintPointsScope,
    ) -> Result<f64, CoreError>;
    async fn backlog_issues(&self) -> Result<Vec<IssueRecord>, CoreError>;
    async fn assignable_users(&self) -> Result<Vec<TeamMember>, CoreError>;
    async fn active_sprint(&self) -> Result<Option<Sprint>, CoreError>;
    async fn sprint_issues(&self, sprint_id: u64) -> Result<Vec<IssueRecord>, CoreError>;
}

/// Turns a planning prompt into a JSON answer.
#[async_trait]
pub trait RecommendationAdvisor: Send + Sync {
    fn name(&self) -> &str;
    async fn advise(&self, prompt: &str) -> Result<Value, CoreError>;
}
