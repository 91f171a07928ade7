use planner_core::CoreError;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::JiraConfig;
use crate::transport::{JiraRequest, JiraTransport};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessibleResource {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
}

fn host_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
}

/// Picks the resource whose site host matches `site_url`, else the first one.
pub fn select_resource<'a>(
    resources: &'a [AccessibleResource],
    site_url: Option<&str>,
) -> Option<&'a AccessibleResource> {
    let wanted = site_url.and_then(host_of);
    wanted
        .and_then(|wanted| {
            resources
                .iter()
                .find(|resource| host_of(&resource.url).as_deref() == Some(wanted.as_str()))
        })
        .or_else(|| resources.first())
}

pub fn parse_resources(payload: Value) -> Result<Vec<AccessibleResource>, CoreError> {
    serde_json::from_value(payload).map_err(|err| {
        CoreError::DependencyUnavailable(format!(
            "failed to parse Atlassian accessible resources: {err}"
        ))
    })
}

/// Returns the REST base for the caller's tenant, honoring a configured
/// `api_url` before asking Atlassian which cloud sites the token can reach.
pub async fn resolve_api_base(
    transport: &dyn JiraTransport,
    config: &JiraConfig,
) -> Result<String, CoreError> {
    if let Some(api_url) = config.api_url.as_deref() {
        debug!(api_url, "using configured Jira API base");
        return Ok(api_url.to_owned());
    }

    let payload = transport
        .get(JiraRequest::get(&config.accessible_resources_url))
        .await?;
    let resources = parse_resources(payload)?;
    let resource = select_resource(&resources, config.site_url.as_deref()).ok_or_else(|| {
        CoreError::Configuration(
            "The access token cannot reach any Jira site. Grant the app access to a Jira Cloud site."
                .to_owned(),
        )
    })?;

    info!(
        cloud_id = %resource.id,
        site = %resource.url,
        "resolved Jira cloud resource"
    );
    Ok(format!(
        "{}/{}",
        config.gateway_url.trim_end_matches('/'),
        resource.id
    ))
}
