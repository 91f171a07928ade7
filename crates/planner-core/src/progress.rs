use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::model::{IssueRecord, Sprint};
use crate::velocity::round_to_tenth;

const AT_RISK_MIN_POINTS: f64 = 5.0;
const AT_RISK_DAYS_LEFT: i64 = 3;
const UNKNOWN_DAYS_LEFT: i64 = 999;
const DEFAULT_PRIORITY: &str = "Medium";
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStatus {
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "Good Progress")]
    GoodProgress,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
    #[serde(rename = "Critical")]
    Critical,
}

impl ProgressStatus {
    pub fn from_completion(completion_pct: f64) -> Self {
        if completion_pct >= 75.0 {
            Self::OnTrack
        } else if completion_pct >= 50.0 {
            Self::GoodProgress
        } else if completion_pct >= 25.0 {
            Self::NeedsAttention
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounts {
    pub total: usize,
    pub done: usize,
    pub in_progress: usize,
    pub todo: usize,
    pub blocked: usize,
    pub at_risk: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoints {
    pub total: f64,
    pub done: f64,
    pub in_progress: f64,
    pub todo: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressIssue {
    pub key: String,
    pub summary: String,
    pub story_points: f64,
    pub priority: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl ProgressIssue {
    fn from_record(issue: &IssueRecord) -> Self {
        Self {
            key: issue.key.clone(),
            summary: issue.summary.clone(),
            story_points: issue.story_points.unwrap_or(0.0),
            priority: priority_name(issue).to_owned(),
            status: issue.status_name.clone(),
            assignee: issue.assignee.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintProgress {
    pub counts: ProgressCounts,
    pub points: ProgressPoints,
    pub completion_pct: f64,
    pub status: ProgressStatus,
    pub blocked_keys: Vec<String>,
    pub at_risk: Vec<ProgressIssue>,
    pub high_priority_todo: Vec<ProgressIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintStatusReport {
    pub sprint: Sprint,
    pub progress: SprintProgress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_left: Option<i64>,
}

fn priority_name(issue: &IssueRecord) -> &str {
    issue
        .priority
        .as_deref()
        .map(str::trim)
        .filter(|priority| !priority.is_empty())
        .unwrap_or(DEFAULT_PRIORITY)
}

fn is_high_priority(priority: &str) -> bool {
    matches!(priority, "Highest" | "High")
}

fn priority_rank(priority: &str) -> u8 {
    match priority {
        "Highest" => 0,
        "High" => 1,
        "Low" => 3,
        "Lowest" => 4,
        _ => 2,
    }
}

fn is_blocked(issue: &IssueRecord) -> bool {
    issue.flagged
        || issue.status_name.to_ascii_lowercase().contains("blocked")
        || issue
            .labels
            .iter()
            .any(|label| label.eq_ignore_ascii_case("blocked"))
}

fn by_points_desc(left: &ProgressIssue, right: &ProgressIssue) -> Ordering {
    right
        .story_points
        .partial_cmp(&left.story_points)
        .unwrap_or(Ordering::Equal)
}

/// `days_left` is the raw whole-day distance to the sprint end; `None` when
/// the sprint has no end date, which never marks in-progress work at risk.
pub fn compute_progress(issues: &[IssueRecord], days_left: Option<i64>) -> SprintProgress {
    let days_left = days_left.unwrap_or(UNKNOWN_DAYS_LEFT);
    let mut counts = ProgressCounts {
        total: issues.len(),
        ..ProgressCounts::default()
    };
    let mut points = ProgressPoints::default();
    let mut blocked_keys = Vec::new();
    let mut at_risk = Vec::new();
    let mut high_priority_todo = Vec::new();

    for issue in issues {
        let story_points = issue.story_points.unwrap_or(0.0);
        let priority = priority_name(issue);
        points.total += story_points;

        match issue.status_category.to_ascii_lowercase().as_str() {
            "done" => {
                counts.done += 1;
                points.done += story_points;
            }
            "indeterminate" => {
                counts.in_progress += 1;
                points.in_progress += story_points;
                if (story_points >= AT_RISK_MIN_POINTS || is_high_priority(priority))
                    && days_left <= AT_RISK_DAYS_LEFT
                {
                    at_risk.push(ProgressIssue::from_record(issue));
                }
            }
            _ => {
                counts.todo += 1;
                points.todo += story_points;
                if is_high_priority(priority) {
                    high_priority_todo.push(ProgressIssue::from_record(issue));
                }
            }
        }

        if is_blocked(issue) {
            blocked_keys.push(issue.key.clone());
        }
    }

    let completion = if points.total > 0.0 {
        points.done / points.total * 100.0
    } else if counts.total > 0 {
        counts.done as f64 / counts.total as f64 * 100.0
    } else {
        0.0
    };
    let completion_pct = round_to_tenth(completion);

    at_risk.sort_by(by_points_desc);
    high_priority_todo.sort_by(|left, right| {
        priority_rank(&left.priority)
            .cmp(&priority_rank(&right.priority))
            .then_with(|| by_points_desc(left, right))
    });

    counts.blocked = blocked_keys.len();
    counts.at_risk = at_risk.len();

    SprintProgress {
        counts,
        points,
        completion_pct,
        status: ProgressStatus::from_completion(completion_pct),
        blocked_keys,
        at_risk,
        high_priority_todo,
    }
}

pub fn parse_sprint_date(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).ok()
}

pub fn sprint_midpoint(sprint: &Sprint) -> Option<OffsetDateTime> {
    let start = parse_sprint_date(sprint.start_date.as_deref()?)?;
    let end = parse_sprint_date(sprint.end_date.as_deref()?)?;
    Some(start + (end - start) / 2)
}

/// Whole days until the sprint end, rounded towards the past like a calendar
/// countdown. Negative once the end date has passed.
pub fn days_left(sprint: &Sprint, now: OffsetDateTime) -> Option<i64> {
    let end = parse_sprint_date(sprint.end_date.as_deref()?)?;
    Some((end - now).whole_seconds().div_euclid(SECONDS_PER_DAY))
}

pub fn sprint_status_report(
    sprint: Sprint,
    issues: &[IssueRecord],
    now: OffsetDateTime,
) -> SprintStatusReport {
    let raw_days_left = days_left(&sprint, now);
    let progress = compute_progress(issues, raw_days_left);
    let midpoint = sprint_midpoint(&sprint).and_then(|midpoint| midpoint.format(&Rfc3339).ok());
    SprintStatusReport {
        sprint,
        progress,
        midpoint,
        days_left: raw_days_left.map(|days| days.max(0)),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn issue(key: &str, category: &str, points: Option<f64>, priority: Option<&str>) -> IssueRecord {
        IssueRecord {
            key: key.to_owned(),
            summary: format!("{key} summary"),
            issue_type: "Story".to_owned(),
            story_points: points,
            status_name: match category {
                "done" => "Done",
                "indeterminate" => "In Progress",
                _ => "To Do",
            }
            .to_owned(),
            status_category: category.to_owned(),
            priority: priority.map(str::to_owned),
            ..IssueRecord::default()
        }
    }

    fn sprint(start: Option<&str>, end: Option<&str>) -> Sprint {
        Sprint {
            id: 42,
            name: "Sprint 42".to_owned(),
            state: "active".to_owned(),
            start_date: start.map(str::to_owned),
            end_date: end.map(str::to_owned),
            complete_date: None,
            goal: None,
        }
    }

    #[test]
    fn completion_uses_points_and_buckets_issues() {
        let issues = vec![
            issue("PLAN-1", "done", Some(8.0), None),
            issue("PLAN-2", "indeterminate", Some(5.0), Some("Medium")),
            issue("PLAN-3", "new", Some(3.0), Some("High")),
            issue("PLAN-4", "new", Some(4.0), Some("Highest")),
        ];
        let progress = compute_progress(&issues, Some(10));

        assert_eq!(progress.counts.total, 4);
        assert_eq!(progress.counts.done, 1);
        assert_eq!(progress.counts.in_progress, 1);
        assert_eq!(progress.counts.todo, 2);
        assert_eq!(progress.points.total, 20.0);
        assert_eq!(progress.completion_pct, 40.0);
        assert_eq!(progress.status, ProgressStatus::NeedsAttention);
        assert!(progress.at_risk.is_empty());
        let high_priority = progress
            .high_priority_todo
            .iter()
            .map(|issue| issue.key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(high_priority, vec!["PLAN-4", "PLAN-3"]);
    }

    #[test]
    fn completion_falls_back_to_issue_counts_without_points() {
        let issues = vec![
            issue("PLAN-1", "done", None, None),
            issue("PLAN-2", "done", None, None),
            issue("PLAN-3", "new", None, None),
        ];
        let progress = compute_progress(&issues, None);
        assert_eq!(progress.completion_pct, 66.7);
        assert_eq!(progress.status, ProgressStatus::GoodProgress);
    }

    #[test]
    fn empty_sprint_is_critical() {
        let progress = compute_progress(&[], Some(5));
        assert_eq!(progress.completion_pct, 0.0);
        assert_eq!(progress.status, ProgressStatus::Critical);
    }

    #[test]
    fn in_progress_work_is_at_risk_near_the_end() {
        let issues = vec![
            issue("PLAN-1", "indeterminate", Some(5.0), None),
            issue("PLAN-2", "indeterminate", Some(2.0), Some("High")),
            issue("PLAN-3", "indeterminate", Some(8.0), Some("Low")),
            issue("PLAN-4", "indeterminate", Some(1.0), Some("Low")),
        ];
        let progress = compute_progress(&issues, Some(3));
        let keys = progress
            .at_risk
            .iter()
            .map(|issue| issue.key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["PLAN-3", "PLAN-1", "PLAN-2"]);
        assert_eq!(progress.counts.at_risk, 3);

        assert!(compute_progress(&issues, Some(4)).at_risk.is_empty());
        assert!(compute_progress(&issues, None).at_risk.is_empty());
    }

    #[test]
    fn blocked_detection_covers_flag_status_and_label() {
        let mut flagged = issue("PLAN-1", "indeterminate", None, None);
        flagged.flagged = true;
        let mut status = issue("PLAN-2", "indeterminate", None, None);
        status.status_name = "Blocked by vendor".to_owned();
        let mut label = issue("PLAN-3", "new", None, None);
        label.labels = vec!["BLOCKED".to_owned()];
        let clear = issue("PLAN-4", "new", None, None);

        let progress = compute_progress(&[flagged, status, label, clear], None);
        assert_eq!(progress.blocked_keys, vec!["PLAN-1", "PLAN-2", "PLAN-3"]);
        assert_eq!(progress.counts.blocked, 3);
    }

    #[test]
    fn status_labels_follow_completion_thresholds() {
        assert_eq!(ProgressStatus::from_completion(75.0), ProgressStatus::OnTrack);
        assert_eq!(ProgressStatus::from_completion(74.9), ProgressStatus::GoodProgress);
        assert_eq!(ProgressStatus::from_completion(25.0), ProgressStatus::NeedsAttention);
        assert_eq!(ProgressStatus::from_completion(24.9), ProgressStatus::Critical);
        assert_eq!(
            serde_json::to_value(ProgressStatus::OnTrack).expect("serialize status"),
            "On Track"
        );
    }

    #[test]
    fn midpoint_is_halfway_between_start_and_end() {
        let current = sprint(Some("2024-03-04T09:00:00.000Z"), Some("2024-03-18T09:00:00.000Z"));
        assert_eq!(sprint_midpoint(&current), Some(datetime!(2024-03-11 09:00 UTC)));
        assert_eq!(sprint_midpoint(&sprint(None, Some("2024-03-18T09:00:00Z"))), None);
    }

    #[test]
    fn days_left_counts_whole_days_and_goes_negative_after_end() {
        let current = sprint(None, Some("2024-03-18T09:00:00Z"));
        assert_eq!(days_left(&current, datetime!(2024-03-15 08:00 UTC)), Some(3));
        assert_eq!(days_left(&current, datetime!(2024-03-18 10:00 UTC)), Some(-1));
        let undated = sprint(None, Some("not a date"));
        assert_eq!(days_left(&undated, datetime!(2024-03-15 08:00 UTC)), None);
    }

    #[test]
    fn status_report_clamps_days_left_for_display() {
        let current = sprint(Some("2024-03-04T09:00:00Z"), Some("2024-03-18T09:00:00Z"));
        let report = sprint_status_report(
            current,
            &[issue("PLAN-1", "indeterminate", Some(5.0), None)],
            datetime!(2024-03-20 09:00 UTC),
        );
        assert_eq!(report.days_left, Some(0));
        assert_eq!(report.progress.counts.at_risk, 1);
        assert_eq!(report.midpoint.as_deref(), Some("2024-03-11T09:00:00Z"));
    }
}
