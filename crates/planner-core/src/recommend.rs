use serde_json::{Map, Value};

use crate::model::{Recommendation, RecommendationSource, RiskLevel, VelocitySummary};
use crate::velocity::average_completion_rate;
use crate::workload::TeamHealth;

pub const DEFAULT_CONFIDENCE: u32 = 70;
pub const LOW_HEALTH_THRESHOLD: u32 = 60;
pub const LOW_HEALTH_CAPACITY_FACTOR: f64 = 0.85;
const DEFAULT_SUCCESS_RATE: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
pub struct RecommendationInputs<'a> {
    pub velocity: &'a VelocitySummary,
    pub team_size: usize,
    pub backlog_points: f64,
    pub health: &'a TeamHealth,
}

pub fn classify_risk(backlog_points: f64, capacity: u32) -> RiskLevel {
    let capacity = f64::from(capacity);
    if backlog_points > 2.0 * capacity {
        RiskLevel::High
    } else if backlog_points > capacity {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn fallback_capacity(capacity_base: u32, backlog_points: f64, health_score: u32) -> u32 {
    let mut capacity = f64::from(capacity_base).min(backlog_points.max(0.0));
    if health_score < LOW_HEALTH_THRESHOLD {
        capacity *= LOW_HEALTH_CAPACITY_FACTOR;
    }
    capacity.round() as u32
}

fn success_probability(velocity: &VelocitySummary, risk_level: RiskLevel) -> u32 {
    let base = average_completion_rate(&velocity.sprints).unwrap_or(DEFAULT_SUCCESS_RATE);
    let factor = match risk_level {
        RiskLevel::Low => 1.0,
        RiskLevel::Medium => 0.85,
        RiskLevel::High => 0.65,
    };
    clamp_percent(base * 100.0 * factor)
}

fn mitigations(inputs: &RecommendationInputs<'_>, risk_level: RiskLevel) -> Vec<String> {
    let health = inputs.health;
    let mut mitigations = Vec::new();
    if !health.high_risk_members.is_empty() {
        mitigations.push(format!(
            "Rebalance work away from overloaded members: {}",
            health.high_risk_members.join(", ")
        ));
    }
    if !health.burnout_members.is_empty() {
        mitigations.push(format!(
            "Schedule recovery time for members showing burnout risk: {}",
            health.burnout_members.join(", ")
        ));
    }
    if health.skill_gap {
        mitigations.push(
            "Cover missing backend, frontend or QA skills through pairing or borrowed capacity"
                .to_owned(),
        );
    }
    if risk_level == RiskLevel::High {
        mitigations.push(format!(
            "Trim sprint scope: backlog of {:.1} points is more than twice the capacity of {}",
            inputs.backlog_points, inputs.velocity.recommended_capacity_base
        ));
    } else if risk_level == RiskLevel::Medium {
        mitigations.push("Prioritize the backlog and mark stretch items before commitment".to_owned());
    }
    if health.score < LOW_HEALTH_THRESHOLD {
        mitigations.push("Reduce committed capacity by 15% until team health recovers".to_owned());
    }
    if mitigations.is_empty() {
        mitigations.push("Keep the current cadence and review velocity at the retrospective".to_owned());
    }
    mitigations
}

pub fn heuristic_recommendation(inputs: &RecommendationInputs<'_>) -> Recommendation {
    let base = inputs.velocity.recommended_capacity_base;
    let risk_level = classify_risk(inputs.backlog_points, base);
    Recommendation {
        recommended_capacity: fallback_capacity(base, inputs.backlog_points, inputs.health.score),
        confidence: DEFAULT_CONFIDENCE,
        risk_level,
        team_health_score: inputs.health.score,
        sprint_success_probability: success_probability(inputs.velocity, risk_level),
        mitigations: mitigations(inputs, risk_level),
        source: RecommendationSource::Heuristic,
        reasoning: None,
    }
}

pub fn advisor_prompt(inputs: &RecommendationInputs<'_>) -> String {
    let velocity = inputs.velocity;
    let history = velocity
        .sprints
        .iter()
        .map(|sprint| {
            format!(
                "- {}: completed {:.1} of {:.1} planned points",
                sprint.name, sprint.completed_points, sprint.planned_points
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let health = inputs.health;

    format!(
        "You are an agile delivery coach. Recommend the capacity for the next sprint.\n\
         \n\
         Team size: {team_size}\n\
         Average velocity: {average:.1} points\n\
         Velocity-based capacity: {base} points\n\
         Unplanned backlog: {backlog:.1} points\n\
         Team health score: {score}\n\
         Overloaded members: {overloaded}\n\
         Burnout risk: {burnout}\n\
         Skill gap: {skill_gap}\n\
         Recent sprints:\n{history}\n\
         \n\
         Respond with a JSON object with the keys recommended_capacity (integer), \
         confidence (0-100), risk_level (low, medium or high), team_health_score (0-100), \
         sprint_success_probability (0-100), mitigations (array of strings) and reasoning (string).",
        team_size = inputs.team_size,
        average = velocity.average_velocity,
        base = velocity.recommended_capacity_base,
        backlog = inputs.backlog_points,
        score = health.score,
        overloaded = list_or_none(&health.high_risk_members),
        burnout = list_or_none(&health.burnout_members),
        skill_gap = if health.skill_gap { "yes" } else { "no" },
        history = if history.is_empty() { "- none".to_owned() } else { history },
    )
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_owned()
    } else {
        names.join(", ")
    }
}

/// Overlays advisor output on the computed defaults, field by field. Returns
/// `None` when the advice is not a JSON object.
pub fn merge_advice(defaults: &Recommendation, advice: &Value) -> Option<Recommendation> {
    let advice = advice.as_object()?;
    let mut merged = defaults.clone();
    merged.source = RecommendationSource::Llm;

    if let Some(capacity) = number_field(advice, "recommended_capacity", "recommendedCapacity") {
        if capacity >= 0.0 {
            merged.recommended_capacity = capacity.round() as u32;
        }
    }
    if let Some(confidence) = number_field(advice, "confidence", "confidence") {
        merged.confidence = clamp_percent(confidence);
    }
    if let Some(risk_level) = field(advice, "risk_level", "riskLevel")
        .and_then(Value::as_str)
        .and_then(RiskLevel::parse)
    {
        merged.risk_level = risk_level;
    }
    if let Some(score) = number_field(advice, "team_health_score", "teamHealthScore") {
        merged.team_health_score = clamp_percent(score);
    }
    if let Some(probability) =
        number_field(advice, "sprint_success_probability", "sprintSuccessProbability")
    {
        merged.sprint_success_probability = clamp_percent(probability);
    }
    if let Some(mitigations) = field(advice, "mitigations", "mitigations").and_then(Value::as_array) {
        let mitigations = mitigations
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if !mitigations.is_empty() {
            merged.mitigations = mitigations;
        }
    }
    if let Some(reasoning) = field(advice, "reasoning", "reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|reasoning| !reasoning.is_empty())
    {
        merged.reasoning = Some(reasoning.to_owned());
    }

    Some(merged)
}

fn field<'a>(object: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    object.get(snake).or_else(|| object.get(camel))
}

fn number_field(object: &Map<String, Value>, snake: &str, camel: &str) -> Option<f64> {
    field(object, snake, camel)
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite())
}

fn clamp_percent(value: f64) -> u32 {
    value.clamp(0.0, 100.0).round() as u32
}
