//! Private Network Controller
//!
//! Attaches every cluster node to the Scaleway private networks declared as
//! `PrivateNetwork` resources:
//! - creates one cloud private NIC per (network, node) pair
//! - allocates each node an address from the network CIDR
//! - records the attachment as a `NetworkInterface` for the node agent
//!
//! Deletion is coordinated with the node agent through finalizers so that
//! addresses and NICs are only released once the host side is torn down.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconcile_helpers;
mod reconciler;
mod store;
mod watcher;

#[cfg(test)]
mod reconcile_helpers_test;
#[cfg(test)]
mod test_utils;

use anyhow::Context;
use config::ControllerConfig;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        anyhow::bail!("failed to install the rustls crypto provider");
    }

    info!("Starting private network controller");

    let config = ControllerConfig::from_env().context("loading configuration")?;

    info!("Configuration:");
    info!("  Scaleway API: {}", config.api_url);
    info!("  Default zone: {}", config.default_zone);
    info!(
        "  Access key: {}",
        config.access_key.as_deref().unwrap_or("(not set)")
    );
    info!("  Requeue after: {:?}", config.requeue_after);
    info!("  Probes address: {}", config.metrics_addr);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
