use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::backlog::normalize_backlog;
use crate::demo::{demo_sprints, demo_team};
use crate::error::CoreError;
use crate::model::{Recommendation, SprintPlanningReport, SprintRecord};
use crate::progress::{SprintStatusReport, sprint_status_report};
use crate::recommend::{
    RecommendationInputs, advisor_prompt, heuristic_recommendation, merge_advice,
};
use crate::source::{PlanningDataSource, RecommendationAdvisor, SprintPointsScope};
use crate::velocity::{DEFAULT_SPRINT_HISTORY_LIMIT, REFERENCE_TEAM_SIZE, summarize};
use crate::workload::{
    RandomWorkloadEstimator, TeamHealth, WorkloadEstimator, build_team_profiles,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanningSettings {
    pub sprint_history_limit: usize,
    pub reference_team_size: u32,
}

impl Default for PlanningSettings {
    fn default() -> Self {
        Self {
            sprint_history_limit: DEFAULT_SPRINT_HISTORY_LIMIT,
            reference_team_size: REFERENCE_TEAM_SIZE,
        }
    }
}

pub struct SprintPlanningService {
    settings: PlanningSettings,
    advisor: Option<Arc<dyn RecommendationAdvisor>>,
    estimator: Arc<dyn WorkloadEstimator>,
}

impl std::fmt::Debug for SprintPlanningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SprintPlanningService")
            .field("settings", &self.settings)
            .field("advisor", &self.advisor.as_ref().map(|advisor| advisor.name()))
            .finish_non_exhaustive()
    }
}

impl SprintPlanningService {
    pub fn new(settings: PlanningSettings) -> Self {
        Self {
            settings,
            advisor: None,
            estimator: Arc::new(RandomWorkloadEstimator),
        }
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn RecommendationAdvisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn WorkloadEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn settings(&self) -> PlanningSettings {
        self.settings
    }

    pub fn has_advisor(&self) -> bool {
        self.advisor.is_some()
    }

    pub async fn plan(
        &self,
        source: &dyn PlanningDataSource,
    ) -> Result<SprintPlanningReport, CoreError> {
        let (sprints, no_sprints) = self.sprint_history(source).await?;
        let current_sprint = recover(source.active_sprint().await, "active sprint", || None)?;
        let backlog = normalize_backlog(recover(
            source.backlog_issues().await,
            "backlog",
            Vec::new,
        )?);

        let mut members = recover(source.assignable_users().await, "team roster", Vec::new)?;
        if members.is_empty() {
            info!("no assignable users found; using demo team");
            members = demo_team();
        }

        let velocity = summarize(
            sprints,
            members.len(),
            self.settings.reference_team_size,
            no_sprints,
        );
        let team = build_team_profiles(&members, backlog.total_points, self.estimator.as_ref());
        let health = TeamHealth::assess(&team);
        let inputs = RecommendationInputs {
            velocity: &velocity,
            team_size: members.len(),
            backlog_points: backlog.total_points,
            health: &health,
        };
        let recommendations = self.recommend(&inputs).await;

        Ok(SprintPlanningReport {
            velocity,
            current_sprint,
            backlog,
            team,
            recommendations,
            no_sprints,
        })
    }

    pub async fn sprint_status(
        &self,
        source: &dyn PlanningDataSource,
        now: OffsetDateTime,
    ) -> Result<Option<SprintStatusReport>, CoreError> {
        let Some(sprint) = source.active_sprint().await? else {
            return Ok(None);
        };
        let issues = source.sprint_issues(sprint.id).await?;
        debug!(sprint_id = sprint.id, issues = issues.len(), "computing sprint progress");
        Ok(Some(sprint_status_report(sprint, &issues, now)))
    }

    async fn sprint_history(
        &self,
        source: &dyn PlanningDataSource,
    ) -> Result<(Vec<SprintRecord>, bool), CoreError> {
        let closed = recover(source.closed_sprints().await, "closed sprints", Vec::new)?;
        let skip = closed.len().saturating_sub(self.settings.sprint_history_limit);

        let mut records = Vec::new();
        for sprint in closed.into_iter().skip(skip).rev() {
            let completed = recover(
                source
                    .sprint_points(sprint.id, SprintPointsScope::Completed)
                    .await,
                "completed sprint points",
                || 0.0,
            )?;
            let planned = recover(
                source.sprint_points(sprint.id, SprintPointsScope::Planned).await,
                "planned sprint points",
                || 0.0,
            )?;
            records.push(SprintRecord::new(sprint.id, sprint.name, completed, planned));
        }

        if records.is_empty() {
            info!("no closed sprints found; using demo sprint history");
            return Ok((demo_sprints(), true));
        }
        Ok((records, false))
    }

    async fn recommend(&self, inputs: &RecommendationInputs<'_>) -> Recommendation {
        let defaults = heuristic_recommendation(inputs);
        let Some(advisor) = self.advisor.as_ref() else {
            return defaults;
        };

        match advisor.advise(&advisor_prompt(inputs)).await {
            Ok(advice) => match merge_advice(&defaults, &advice) {
                Some(recommendation) => recommendation,
                None => {
                    warn!(
                        advisor = advisor.name(),
                        "advisor reply was not a JSON object; using heuristic recommendation"
                    );
                    defaults
                }
            },
            Err(error) => {
                warn!(
                    advisor = advisor.name(),
                    error = %error,
                    "advisor request failed; using heuristic recommendation"
                );
                defaults
            }
        }
    }
}

fn recover<T>(
    result: Result<T, CoreError>,
    what: &'static str,
    fallback: impl FnOnce() -> T,
) -> Result<T, CoreError> {
    match result {
        Ok(value) => Ok(value),
        Err(error) if error.is_unauthorized() => Err(error),
        Err(error) => {
            warn!(error = %error, data = what, "planning data unavailable; using fallback");
            Ok(fallback())
        }
    }
}
