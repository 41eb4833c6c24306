//! Invocation outcomes
//!
//! Downstream failures are values, not errors: the caller of
//! [`crate::ValTownClient::call_tool`] always receives a well-formed
//! outcome describing what happened, never a fault on the channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The tool endpoint could not be reached at the transport level.
    Unreachable,
    /// The remote answered 404.
    NotFound,
    /// The remote answered another non-2xx status.
    Api,
    /// The remote answered 2xx but the body carried an `error` field.
    Execution,
    /// The response body could not be interpreted.
    Malformed,
}

/// Result of a single tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// The tool ran and returned this payload.
    Success(Value),
    /// The tool did not run or reported an error.
    Failure { kind: FailureKind, message: String },
}

impl InvocationOutcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure { kind, message: message.into() }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kinds_serialize_snake_case() {
        assert_eq!(serde_json::to_value(FailureKind::NotFound).unwrap(), "not_found");
        assert_eq!(serde_json::to_value(FailureKind::Unreachable).unwrap(), "unreachable");
    }
}
