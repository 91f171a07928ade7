use crate::model::{SprintRecord, TeamMember};

const DEMO_SPRINTS: [(u64, &str, f64, f64); 5] = [
    (9005, "Demo Sprint 5", 34.0, 40.0),
    (9004, "Demo Sprint 4", 28.0, 35.0),
    (9003, "Demo Sprint 3", 31.0, 36.0),
    (9002, "Demo Sprint 2", 25.0, 32.0),
    (9001, "Demo Sprint 1", 30.0, 34.0),
];

const DEMO_TEAM: [(&str, &str); 4] = [
    ("demo-user-1", "Alex Morgan"),
    ("demo-user-2", "Sam Rivera"),
    ("demo-user-3", "Jordan Lee"),
    ("demo-user-4", "Taylor Kim"),
];

pub fn demo_sprints() -> Vec<SprintRecord> {
    DEMO_SPRINTS
        .iter()
        .map(|(id, name, completed, planned)| SprintRecord::new(*id, *name, *completed, *planned))
        .collect()
}

pub fn demo_team() -> Vec<TeamMember> {
    DEMO_TEAM
        .iter()
        .map(|(account_id, display_name)| TeamMember::new(*account_id, *display_name))
        .collect()
}
