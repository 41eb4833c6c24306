//! Val Town HTTP client
//!
//! One GET fetches the catalog, one POST runs a tool. The client keeps no
//! state between calls: the catalog is refetched on every listing and
//! nothing about an invocation outlives its response.

use crate::config::BridgeConfig;
use crate::endpoint::tool_endpoint;
use crate::error::{ClientError, ClientResult};
use crate::outcome::{FailureKind, InvocationOutcome};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// One entry of the remote tool catalog.
///
/// Only `name` is ever interpreted; every other field is carried through
/// untouched via the flattened map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Catalog response body: `{ "tools": [...] }`.
#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

/// Client for the Val Town tool provider.
#[derive(Debug, Clone)]
pub struct ValTownClient {
    http: reqwest::Client,
    config: BridgeConfig,
}

impl ValTownClient {
    pub fn new(config: BridgeConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Fetch the remote tool catalog.
    ///
    /// A transport failure is an error; a body that is missing, malformed,
    /// or does not hold a `tools` list yields an empty catalog instead of
    /// failing the listing.
    pub async fn list_tools(&self) -> ClientResult<Vec<ToolDescriptor>> {
        debug!(url = %self.config.catalog_url, "fetching tool catalog");

        let response = self
            .http
            .get(self.config.catalog_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(ClientError::CatalogUnavailable)?;

        let status = response.status();
        match response.json::<CatalogResponse>().await {
            Ok(catalog) => {
                debug!(%status, tools = catalog.tools.len(), "catalog fetched");
                Ok(catalog.tools)
            }
            Err(e) => {
                warn!(%status, "catalog body unusable, relaying empty catalog: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Invoke a named tool with the given arguments.
    ///
    /// Exactly one outbound POST per call, no retries. Network and
    /// remote-service failures come back as in-band [`InvocationOutcome`]
    /// failures; the only `Err` is a tool name that cannot form a valid
    /// address.
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> ClientResult<InvocationOutcome> {
        let url = tool_endpoint(&self.config, name)?;
        debug!(tool = name, %url, "forwarding tool invocation");

        let response = match self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(arguments)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(tool = name, "tool endpoint unreachable: {}", e);
                return Ok(InvocationOutcome::failure(
                    FailureKind::Unreachable,
                    format!("Tool '{}' is not available or has not been deployed", name),
                ));
            }
        };

        let status = response.status();
        debug!(tool = name, %status, "tool endpoint answered");

        if status == StatusCode::NOT_FOUND {
            return Ok(InvocationOutcome::failure(
                FailureKind::NotFound,
                format!("Tool '{}' was not found", name),
            ));
        }

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("unknown error");
            return Ok(InvocationOutcome::failure(
                FailureKind::Api,
                format!("Val Town API error: {}", reason),
            ));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(InvocationOutcome::failure(
                    FailureKind::Malformed,
                    format!("Tool execution failed: {}", e),
                ));
            }
        };

        if let Some(error) = body.get("error").filter(|v| !v.is_null()) {
            let message =
                error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
            return Ok(InvocationOutcome::failure(
                FailureKind::Execution,
                format!("Val Town execution error: {}", message),
            ));
        }

        // Prefer the `result` envelope; tools answering bare JSON pass
        // through as-is.
        let payload = match body.get("result") {
            Some(result) => result.clone(),
            None => body,
        };
        Ok(InvocationOutcome::Success(payload))
    }
}
