//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the clients together,
//! rebuilds the address pool from the cluster and runs the watchers and the
//! probes server until one of them stops.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::{HealthState, Metrics, run_health_server};
use crate::reconciler::Reconciler;
use crate::store::KubeStore;
use crate::watcher::{watch_nodes, watch_private_networks};
use crds::{NetworkInterface, PrivateNetwork};
use futures::channel::mpsc;
use ipam_client::MemoryIpam;
use k8s_openapi::api::core::v1::Node;
use kube::{Api, Client};
use scaleway_client::{CloudClientTrait, ScalewayClient};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Main controller for private network attachments.
pub struct Controller {
    private_network_watcher: JoinHandle<Result<(), ControllerError>>,
    node_watcher: JoinHandle<Result<(), ControllerError>>,
    health_server: JoinHandle<Result<(), std::io::Error>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing private network controller");

        let kube_client = Client::try_default().await?;

        let cloud = ScalewayClient::new(
            config.api_url.clone(),
            config.secret_key.clone(),
            config.default_zone.clone(),
        )?;

        info!("Validating Scaleway credentials...");
        cloud.validate_credentials().await.map_err(|e| {
            error!("Failed to validate Scaleway credentials: {}", e);
            error!("Please ensure:");
            error!("  1. SCW_SECRET_KEY is set to a valid secret key");
            error!("  2. The key has access to Instance and VPC in zone {}", config.default_zone);
            error!("  3. The API is reachable at {}", config.api_url);
            ControllerError::Cloud(e)
        })?;
        info!("Scaleway credentials validated");

        let metrics = Metrics::new()?;
        let reconciler = Reconciler::new(
            KubeStore::new(kube_client.clone()),
            cloud,
            MemoryIpam::new(),
            config.requeue_after,
            config.provider_id_pattern.clone(),
            metrics.clone(),
        );

        // Must finish before the first reconciliation hands out addresses
        info!("Rebuilding address pool from existing NetworkInterfaces...");
        reconciler.seed_address_pool().await.map_err(|e| {
            error!("Failed to rebuild the address pool, not starting: {}", e);
            e
        })?;

        let reconciler = Arc::new(reconciler);
        let health_state = Arc::new(HealthState::new(metrics));
        let (resync_tx, resync_rx) = mpsc::unbounded();

        let private_network_api: Api<PrivateNetwork> = Api::all(kube_client.clone());
        let network_interface_api: Api<NetworkInterface> = Api::all(kube_client.clone());
        let node_api: Api<Node> = Api::all(kube_client);

        let private_network_watcher = {
            let reconciler = Arc::clone(&reconciler);
            let concurrency = config.concurrency;
            tokio::spawn(async move {
                watch_private_networks(
                    private_network_api,
                    network_interface_api,
                    reconciler,
                    resync_rx,
                    concurrency,
                )
                .await
            })
        };

        let node_watcher = {
            let reconciler = Arc::clone(&reconciler);
            tokio::spawn(async move { watch_nodes(node_api, reconciler, resync_tx).await })
        };

        let health_server = {
            let state = Arc::clone(&health_state);
            let addr = config.metrics_addr;
            tokio::spawn(async move { run_health_server(addr, state).await })
        };

        health_state.set_ready(true);
        info!("All watchers started");

        Ok(Self {
            private_network_watcher,
            node_watcher,
            health_server,
        })
    }

    /// Runs until a watcher or the probes server exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Private network controller running");

        tokio::select! {
            result = &mut self.private_network_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("PrivateNetwork watcher panicked: {}", e)))??;
            }
            result = &mut self.node_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Node watcher panicked: {}", e)))??;
            }
            result = &mut self.health_server => {
                result
                    .map_err(|e| ControllerError::Watch(format!("Probes server panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Probes server error: {}", e)))?;
            }
        }

        Ok(())
    }
}
