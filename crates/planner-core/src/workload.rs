use std::collections::BTreeSet;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{RiskLevel, TeamMember, TeamMemberProfile};
use crate::velocity::round_to_tenth;

pub const MIN_WORKLOAD_MULTIPLIER: f64 = 0.8;
pub const MAX_WORKLOAD_MULTIPLIER: f64 = 1.3;
pub const HIGH_LOAD_RATIO: f64 = 1.4;
pub const MEDIUM_LOAD_RATIO: f64 = 1.1;
pub const BURNOUT_LOAD_RATIO: f64 = 1.25;

const HIGH_RISK_PENALTY: u32 = 15;
const BURNOUT_PENALTY: u32 = 20;
const SKILL_GAP_PENALTY: u32 = 25;

const SKILL_ROTATION: [(&str, &str); 4] = [
    ("fullstack", "Feature delivery"),
    ("backend", "APIs and integrations"),
    ("frontend", "User interface"),
    ("qa", "Test automation"),
];
const CORE_SKILLS: [&str; 3] = ["backend", "frontend", "qa"];

/// Source of the per-member load multiplier. Production draws it at random,
/// tests plug in fixed values.
pub trait WorkloadEstimator: Send + Sync {
    fn multiplier(&self, member_index: usize) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomWorkloadEstimator;

impl WorkloadEstimator for RandomWorkloadEstimator {
    fn multiplier(&self, _member_index: usize) -> f64 {
        rand::thread_rng().gen_range(MIN_WORKLOAD_MULTIPLIER..=MAX_WORKLOAD_MULTIPLIER)
    }
}

#[derive(Debug)]
pub struct SeededWorkloadEstimator {
    rng: Mutex<StdRng>,
}

impl SeededWorkloadEstimator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl WorkloadEstimator for SeededWorkloadEstimator {
    fn multiplier(&self, _member_index: usize) -> f64 {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(MIN_WORKLOAD_MULTIPLIER..=MAX_WORKLOAD_MULTIPLIER)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedWorkloadEstimator {
    multipliers: Vec<f64>,
}

impl FixedWorkloadEstimator {
    pub fn new(multipliers: Vec<f64>) -> Self {
        Self { multipliers }
    }

    pub fn uniform(multiplier: f64) -> Self {
        Self::new(vec![multiplier])
    }
}

impl WorkloadEstimator for FixedWorkloadEstimator {
    fn multiplier(&self, member_index: usize) -> f64 {
        if self.multipliers.is_empty() {
            return 1.0;
        }
        self.multipliers[member_index % self.multipliers.len()]
    }
}

pub fn classify_load(ratio: f64) -> RiskLevel {
    if ratio > HIGH_LOAD_RATIO {
        RiskLevel::High
    } else if ratio > MEDIUM_LOAD_RATIO {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn build_team_profiles(
    members: &[TeamMember],
    total_backlog_points: f64,
    estimator: &dyn WorkloadEstimator,
) -> Vec<TeamMemberProfile> {
    if members.is_empty() {
        return Vec::new();
    }

    let per_head = total_backlog_points / members.len() as f64;
    let workloads = (0..members.len())
        .map(|index| per_head * estimator.multiplier(index))
        .collect::<Vec<_>>();
    let team_average = workloads.iter().sum::<f64>() / workloads.len() as f64;

    members
        .iter()
        .zip(workloads)
        .enumerate()
        .map(|(index, (member, workload))| {
            let ratio = if team_average > 0.0 {
                workload / team_average
            } else {
                1.0
            };
            let (skill_type, specialization) = SKILL_ROTATION[index % SKILL_ROTATION.len()];
            TeamMemberProfile {
                name: member.display_name.clone(),
                workload_risk_level: classify_load(ratio),
                estimated_workload: round_to_tenth(workload),
                skill_type: skill_type.to_owned(),
                burnout_risk: ratio > BURNOUT_LOAD_RATIO,
                specialization: specialization.to_owned(),
            }
        })
        .collect()
}

/// True when some core skill has nobody on the team to cover it.
pub fn has_skill_gap(profiles: &[TeamMemberProfile]) -> bool {
    let mut covered = BTreeSet::new();
    for profile in profiles {
        if profile.skill_type == "fullstack" {
            covered.insert("backend");
            covered.insert("frontend");
        } else {
            covered.insert(profile.skill_type.as_str());
        }
    }
    CORE_SKILLS.iter().any(|skill| !covered.contains(skill))
}

pub fn team_health_score(high_risk_members: usize, burnout_members: usize, skill_gap: bool) -> u32 {
    let penalty = HIGH_RISK_PENALTY as usize * high_risk_members
        + BURNOUT_PENALTY as usize * burnout_members
        + if skill_gap { SKILL_GAP_PENALTY as usize } else { 0 };
    100usize.saturating_sub(penalty) as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamHealth {
    pub score: u32,
    pub high_risk_members: Vec<String>,
    pub burnout_members: Vec<String>,
    pub skill_gap: bool,
}

impl TeamHealth {
    pub fn assess(profiles: &[TeamMemberProfile]) -> Self {
        let high_risk_members = profiles
            .iter()
            .filter(|profile| profile.workload_risk_level == RiskLevel::High)
            .map(|profile| profile.name.clone())
            .collect::<Vec<_>>();
        let burnout_members = profiles
            .iter()
            .filter(|profile| profile.burnout_risk)
            .map(|profile| profile.name.clone())
            .collect::<Vec<_>>();
        let skill_gap = has_skill_gap(profiles);
        Self {
            score: team_health_score(high_risk_members.len(), burnout_members.len(), skill_gap),
            high_risk_members,
            burnout_members,
            skill_gap,
        }
    }
}
