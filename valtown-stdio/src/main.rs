use anyhow::Result;
use tracing::{error, info};
use valtown_client::{BridgeConfig, ValTownClient};
use valtown_mcp::{serve_stdio, McpServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = BridgeConfig::from_env()?;
    info!(catalog = %config.catalog_url, "Val Town MCP bridge starting");

    let server = McpServer::new(ValTownClient::new(config));

    tokio::select! {
        result = serve_stdio(server) => {
            if let Err(e) = &result {
                error!("Fatal error running server: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, closing transport");
        }
    }

    Ok(())
}
