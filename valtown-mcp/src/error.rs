//! Error handling for the MCP layer

use crate::jsonrpc::JsonRpcError;
use thiserror::Error;
use valtown_client::ClientError;

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Errors that can occur while serving MCP requests.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] ClientError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// Convert to a JSON-RPC error object.
    ///
    /// Caller mistakes map to invalid-params; everything else, including a
    /// failed catalog fetch, is an internal error on the channel.
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            McpError::InvalidArguments(msg) => {
                JsonRpcError::invalid_params().with_data(serde_json::json!({ "message": msg }))
            }
            McpError::Bridge(ClientError::InvalidToolName(_)) => JsonRpcError::invalid_params()
                .with_data(serde_json::json!({ "message": self.to_string() })),
            _ => JsonRpcError::internal_error()
                .with_data(serde_json::json!({ "message": self.to_string() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{INTERNAL_ERROR, INVALID_PARAMS};

    #[test]
    fn invalid_tool_names_map_to_invalid_params() {
        let error = McpError::Bridge(ClientError::InvalidToolName("not a host".to_string()));
        assert_eq!(error.to_jsonrpc_error().code, INVALID_PARAMS);
    }

    #[test]
    fn bad_arguments_map_to_invalid_params() {
        let error = McpError::InvalidArguments("missing name".to_string());
        assert_eq!(error.to_jsonrpc_error().code, INVALID_PARAMS);
    }

    #[test]
    fn other_errors_map_to_internal() {
        let error = McpError::InvalidArguments(String::new());
        assert_eq!(error.to_jsonrpc_error().code, INVALID_PARAMS);

        let error = McpError::Io(std::io::Error::new(std::io::ErrorKind::Other, "pipe closed"));
        assert_eq!(error.to_jsonrpc_error().code, INTERNAL_ERROR);
    }
}
