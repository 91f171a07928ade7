pub mod backlog;
pub mod demo;
pub mod error;
pub mod model;
pub mod progress;
pub mod recommend;
pub mod service;
pub mod source;
pub mod test_support;
pub mod velocity;
pub mod workload;

pub use error::CoreError;
pub use model::{
    BacklogItem, BacklogSummary, IssueRecord, Recommendation, RecommendationSource, RiskLevel,
    Sprint, SprintPlanningReport, SprintRecord, TeamMember, TeamMemberProfile, VelocitySummary,
};
pub use progress::{
    ProgressCounts, ProgressIssue, ProgressPoints, ProgressStatus, SprintProgress,
    SprintStatusReport,
};
pub use service::{PlanningSettings, SprintPlanningService};
pub use source::{PlanningDataSource, RecommendationAdvisor, SprintPointsScope};
pub use workload::{
    FixedWorkloadEstimator, RandomWorkloadEstimator, SeededWorkloadEstimator, WorkloadEstimator,
};
