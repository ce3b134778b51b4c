//! CMMS Development Proxy
//!
//! Run with: cargo run --bin cmms-proxy
//!
//! # Configuration
//!
//! Read from the config file's `[proxy]` section. Environment variables:
//! - `CMMS_PROXY_LISTEN`: Address to bind to (default: 127.0.0.1:5173)
//! - `CMMS_PROXY_TARGET`: Backend origin (default: http://localhost:8000)
//! - `RUST_LOG`: Log filter (default: cmms=info,tower_http=info)

use cmms::config::Config;
use cmms::proxy::serve;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    config.logging.init();

    tracing::info!("Starting CMMS proxy v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Forwarding /api/* to {}", config.proxy.target);

    serve(&config.proxy).await?;

    tracing::info!("CMMS proxy stopped");
    Ok(())
}
