//! HTTP client for the Val Town tool provider
//!
//! This crate owns the outbound half of the bridge: it fetches the remote
//! tool catalog and forwards tool invocations to their per-tool run
//! endpoints, normalizing every downstream failure into an in-band
//! [`InvocationOutcome`].

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod outcome;

// Re-export key types
pub use client::{ToolDescriptor, ValTownClient};
pub use config::BridgeConfig;
pub use endpoint::tool_endpoint;
pub use error::{ClientError, ClientResult};
pub use outcome::{FailureKind, InvocationOutcome};
