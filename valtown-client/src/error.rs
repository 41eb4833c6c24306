//! Error handling for the Val Town client

use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur on the outbound side of the bridge.
///
/// Downstream failures of a tool invocation are deliberately NOT errors;
/// they are returned as [`crate::InvocationOutcome::Failure`] values. Only
/// caller mistakes (bad configuration, unusable tool names) and a failed
/// catalog fetch surface here.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid tool name '{0}': tool names must be hostname labels (ASCII letters, digits and '-', no edge hyphens)")]
    InvalidToolName(String),

    #[error("Catalog endpoint unreachable: {0}")]
    CatalogUnavailable(#[source] reqwest::Error),
}
