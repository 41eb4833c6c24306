//! Bridge configuration
//!
//! Resolved once at startup from environment variables with hard defaults
//! pointing at the public Val Town endpoints.

use crate::error::{ClientError, ClientResult};
use std::env;
use url::Url;

/// Environment variable overriding the catalog endpoint.
pub const ENV_CATALOG_URL: &str = "VALTOWN_CATALOG_URL";
/// Environment variable overriding the per-tool address template.
pub const ENV_TOOL_URL_TEMPLATE: &str = "VALTOWN_TOOL_URL_TEMPLATE";

pub const DEFAULT_CATALOG_URL: &str = "https://ajax-mcp.web.val.run";
pub const DEFAULT_TOOL_URL_TEMPLATE: &str = "https://ajax-{name}.web.val.run";

/// Placeholder in the template that is substituted with the tool name.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Configuration for the Val Town bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address answering the full tool catalog on GET.
    pub catalog_url: Url,
    /// Address template for tool invocations; must contain `{name}`.
    pub tool_url_template: String,
}

impl BridgeConfig {
    pub fn new(catalog_url: &str, tool_url_template: &str) -> ClientResult<Self> {
        let catalog_url = Url::parse(catalog_url).map_err(|e| {
            ClientError::InvalidConfig(format!("invalid catalog URL '{}': {}", catalog_url, e))
        })?;

        if !tool_url_template.contains(NAME_PLACEHOLDER) {
            return Err(ClientError::InvalidConfig(format!(
                "tool URL template '{}' is missing the '{}' placeholder",
                tool_url_template, NAME_PLACEHOLDER
            )));
        }

        Ok(Self { catalog_url, tool_url_template: tool_url_template.to_string() })
    }

    /// Read configuration from the environment, falling back to the public
    /// Val Town endpoints.
    pub fn from_env() -> ClientResult<Self> {
        let catalog_url =
            env::var(ENV_CATALOG_URL).unwrap_or_else(|_| DEFAULT_CATALOG_URL.to_string());
        let tool_url_template = env::var(ENV_TOOL_URL_TEMPLATE)
            .unwrap_or_else(|_| DEFAULT_TOOL_URL_TEMPLATE.to_string());
        Self::new(&catalog_url, &tool_url_template)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_URL, DEFAULT_TOOL_URL_TEMPLATE)
            .expect("default endpoints are valid")
    }
}
