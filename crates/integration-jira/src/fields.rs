use std::sync::RwLock;

use serde_json::Value;
use tracing::info;

pub const DEFAULT_STORY_POINTS_FIELD: &str = "customfield_10016";
pub const STORY_POINT_CANDIDATES: [&str; 6] = [
    "customfield_10016",
    "customfield_10026",
    "customfield_10028",
    "customfield_10004",
    "customfield_10002",
    "story_points",
];
const BASE_ISSUE_FIELDS: [&str; 8] = [
    "summary",
    "issuetype",
    "status",
    "priority",
    "assignee",
    "labels",
    "flagged",
    "created",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrigin {
    Configured,
    Discovered,
    Default,
}

impl FieldOrigin {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Discovered => "discovered",
            Self::Default => "default",
        }
    }
}

/// Reads a story-point value that Jira may return as a number or a numeric string.
pub fn read_story_points(fields: &Value, field: &str) -> Option<f64> {
    let points = match fields.get(field)? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    points.filter(|points| points.is_finite())
}

pub fn discover_story_points_field(fields: &Value) -> Option<&'static str> {
    STORY_POINT_CANDIDATES
        .iter()
        .copied()
        .find(|candidate| matches!(fields.get(*candidate), Some(Value::Number(_))))
}

/// Chooses the story-point field once per source and remembers the choice.
#[derive(Debug)]
pub struct StoryPointsField {
    configured: Option<String>,
    chosen: RwLock<Option<String>>,
}

impl StoryPointsField {
    pub fn new(configured: Option<String>) -> Self {
        Self {
            configured: configured
                .map(|field| field.trim().to_owned())
                .filter(|field| !field.is_empty()),
            chosen: RwLock::new(None),
        }
    }

    pub fn chosen(&self) -> Option<String> {
        self.chosen
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Field list for a search. Before a choice is made every candidate is
    /// requested so the first response can drive discovery.
    pub fn search_fields(&self) -> String {
        let mut fields = BASE_ISSUE_FIELDS
            .iter()
            .map(|field| (*field).to_owned())
            .collect::<Vec<_>>();
        match self.chosen().or_else(|| self.configured.clone()) {
            Some(field) => fields.push(field),
            None => fields.extend(STORY_POINT_CANDIDATES.iter().map(|field| (*field).to_owned())),
        }
        fields.join(",")
    }

    /// Returns the field to read from `issues`. A configured field always
    /// wins; otherwise the first issue decides. Without issues the default is
    /// used without being remembered.
    pub fn resolve(&self, issues: &[Value]) -> String {
        if let Some(field) = self.chosen() {
            return field;
        }

        let (field, origin) = match &self.configured {
            Some(field) => (field.clone(), FieldOrigin::Configured),
            None => {
                let Some(first) = issues.first() else {
                    return DEFAULT_STORY_POINTS_FIELD.to_owned();
                };
                let fields = first.get("fields").unwrap_or(&Value::Null);
                match discover_story_points_field(fields) {
                    Some(field) => (field.to_owned(), FieldOrigin::Discovered),
                    None => (DEFAULT_STORY_POINTS_FIELD.to_owned(), FieldOrigin::Default),
                }
            }
        };

        let mut chosen = self
            .chosen
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = chosen.as_ref() {
            return existing.clone();
        }
        info!(field = %field, origin = origin.as_str(), "selected story points field");
        *chosen = Some(field.clone());
        field
    }
}
