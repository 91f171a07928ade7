use crate::model::{SprintRecord, VelocitySummary};

pub const REFERENCE_TEAM_SIZE: u32 = 4;
pub const DEFAULT_SPRINT_HISTORY_LIMIT: usize = 5;

pub fn average_velocity(sprints: &[SprintRecord]) -> f64 {
    if sprints.is_empty() {
        return 0.0;
    }
    let total: f64 = sprints.iter().map(|sprint| sprint.completed_points).sum();
    total / sprints.len() as f64
}

/// Scales the average velocity from the reference team size to the actual one.
pub fn capacity_base(average_velocity: f64, team_size: usize, reference_team_size: u32) -> u32 {
    let reference = if reference_team_size == 0 {
        REFERENCE_TEAM_SIZE
    } else {
        reference_team_size
    };
    let scaled = average_velocity * team_size as f64 / f64::from(reference);
    if scaled.is_finite() && scaled > 0.0 {
        scaled.round() as u32
    } else {
        0
    }
}

pub fn average_completion_rate(sprints: &[SprintRecord]) -> Option<f64> {
    let rated = sprints
        .iter()
        .filter(|sprint| sprint.planned_points > 0.0)
        .map(|sprint| sprint.completion_rate)
        .collect::<Vec<_>>();
    if rated.is_empty() {
        return None;
    }
    Some(rated.iter().sum::<f64>() / rated.len() as f64)
}

pub fn summarize(
    sprints: Vec<SprintRecord>,
    team_size: usize,
    reference_team_size: u32,
    no_sprints: bool,
) -> VelocitySummary {
    let average = average_velocity(&sprints);
    VelocitySummary {
        average_velocity: round_to_tenth(average),
        recommended_capacity_base: capacity_base(average, team_size, reference_team_size),
        sprints,
        no_sprints,
    }
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
