mod config;
mod fields;
mod resources;
mod source;
#[cfg(test)]
mod stub;
mod transport;

pub use config::{DEFAULT_ACCESSIBLE_RESOURCES_URL, DEFAULT_GATEWAY_URL, JiraConfig};
pub use fields::{
    DEFAULT_STORY_POINTS_FIELD, STORY_POINT_CANDIDATES, StoryPointsField,
    discover_story_points_field, read_story_points,
};
pub use resources::{AccessibleResource, resolve_api_base, select_resource};
pub use source::JiraPlanningSource;
pub use transport::{JiraRequest, JiraTransport, ReqwestJiraTransport, build_http_client};
