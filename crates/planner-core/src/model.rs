use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintRecord {
    pub id: u64,
    pub name: String,
    pub completed_points: f64,
    pub planned_points: f64,
    pub completion_rate: f64,
}

impl SprintRecord {
    pub fn new(id: u64, name: impl Into<String>, completed_points: f64, planned_points: f64) -> Self {
        let completion_rate = if planned_points > 0.0 {
            completed_points / planned_points
        } else {
            0.0
        };
        Self {
            id,
            name: name.into(),
            completed_points,
            planned_points,
            completion_rate,
        }
    }
}

/// Issue fields the planner reads, already lifted out of the upstream payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IssueRecord {
    pub key: String,
    pub summary: String,
    pub issue_type: String,
    pub story_points: Option<f64>,
    pub status_name: String,
    pub status_category: String,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    pub flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogItem {
    pub key: String,
    pub summary: String,
    pub story_points: f64,
    pub issue_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogSummary {
    pub items: Vec<BacklogItem>,
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub account_id: String,
    pub display_name: String,
}

impl TeamMember {
    pub fn new(account_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberProfile {
    pub name: String,
    pub workload_risk_level: RiskLevel,
    pub estimated_workload: f64,
    pub skill_type: String,
    pub burnout_risk: bool,
    pub specialization: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Llm,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended_capacity: u32,
    pub confidence: u32,
    pub risk_level: RiskLevel,
    pub team_health_score: u32,
    pub sprint_success_probability: u32,
    pub mitigations: Vec<String>,
    pub source: RecommendationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocitySummary {
    pub average_velocity: f64,
    pub recommended_capacity_base: u32,
    pub sprints: Vec<SprintRecord>,
    pub no_sprints: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintPlanningReport {
    pub velocity: VelocitySummary,
    pub current_sprint: Option<Sprint>,
    pub backlog: BacklogSummary,
    pub team: Vec<TeamMemberProfile>,
    pub recommendations: Recommendation,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_sprints: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}
