//! Reconciliation logic for PrivateNetwork resources.
//!
//! This module is organized by the stage of the attachment lifecycle:
//! - `node_resolver`: Node to cloud server resolution
//! - `interface`: Per-node private NIC and NetworkInterface provisioning
//! - `deletion`: Two-finalizer teardown of a PrivateNetwork and its children

pub mod deletion;
pub mod interface;
pub mod node_resolver;


use crate::backoff::BackoffTracker;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconcile_helpers::{network_labels, next_status, status_needs_update, validate_spec};
use crate::store::ObjectStoreTrait;
use crds::{FINALIZER, FinalizerExt, IP_FINALIZER, NetworkState, PrivateNetwork, add_finalizer};
use ipam_client::{IpamClientTrait, Prefix};
use kube::ResourceExt;
use regex::Regex;
use scaleway_client::CloudClientTrait;
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of a successful reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Converged, wait for the next change
    Done,
    /// Not converged yet, run again after the delay
    RequeueAfter(Duration),
}

/// Reconciles PrivateNetwork resources.
pub struct Reconciler {
    pub(crate) store: Box<dyn ObjectStoreTrait>,
    pub(crate) cloud: Box<dyn CloudClientTrait>,
    pub(crate) ipam: Box<dyn IpamClientTrait>,
    pub(crate) requeue_after: Duration,
    pub(crate) provider_id_pattern: Regex,
    pub(crate) metrics: Metrics,
    /// Error count tracking per PrivateNetwork name
    backoff: BackoffTracker,
}

impl Reconciler {
    pub fn new(
        store: impl ObjectStoreTrait + 'static,
        cloud: impl CloudClientTrait + 'static,
        ipam: impl IpamClientTrait + 'static,
        requeue_after: Duration,
        provider_id_pattern: Regex,
        metrics: Metrics,
    ) -> Self {
        Self {
            store: Box::new(store),
            cloud: Box::new(cloud),
            ipam: Box::new(ipam),
            requeue_after,
            provider_id_pattern,
            metrics,
            backoff: BackoffTracker::new(),
        }
    }

    /// Object store shared with the node watcher
    pub fn store(&self) -> &dyn ObjectStoreTrait {
        self.store.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn backoff(&self) -> &BackoffTracker {
        &self.backoff
    }

    /// Run one reconciliation pass for the PrivateNetwork `name`.
    ///
    /// The object is re-read from the store; a missing object is treated as
    /// already deleted. Failures are mirrored into `status.error` before being
    /// returned so the caller can apply error backoff.
    pub async fn reconcile_private_network(&self, name: &str) -> Result<ReconcileOutcome, ControllerError> {
        let Some(pn) = self.store.get_private_network(name).await? else {
            debug!("PrivateNetwork {} not found, already deleted", name);
            return Ok(ReconcileOutcome::Done);
        };

        let result = self.reconcile_inner(&pn).await;
        if let Err(e) = &result {
            let state = if pn.is_deleting() {
                NetworkState::Deleting
            } else {
                NetworkState::Failed
            };
            let attached = pn.status.as_ref().map_or(0, |s| s.attached_nodes);
            self.report_status(&pn, state, attached, Some(e.to_string())).await;
        }
        result
    }

    async fn reconcile_inner(&self, pn: &PrivateNetwork) -> Result<ReconcileOutcome, ControllerError> {
        let prefix = self.ipam.ensure_prefix(&pn.spec.cidr).await?;

        if pn.is_deleting() {
            if !pn.has_finalizer(FINALIZER) {
                debug!("PrivateNetwork {} is deleting without our finalizer, nothing to do", pn.name_any());
                return Ok(ReconcileOutcome::Done);
            }
            return self.finalize_private_network(pn, &prefix).await;
        }

        self.sync_private_network(pn, &prefix).await
    }

    async fn sync_private_network(
        &self,
        pn: &PrivateNetwork,
        prefix: &Prefix,
    ) -> Result<ReconcileOutcome, ControllerError> {
        let name = pn.name_any();
        validate_spec(pn).map_err(ControllerError::InvalidSpec)?;

        let mut pn = pn.clone();
        if add_finalizer(&mut pn.metadata, FINALIZER) {
            info!("Adding finalizer to PrivateNetwork {}", name);
            pn = self.store.update_private_network(&pn).await?;
        }

        let previous_attached = pn.status.as_ref().map_or(0, |s| s.attached_nodes);

        if let Err(e) = self.cloud.get_private_network(&pn.spec.zone, &pn.spec.id).await {
            warn!(
                "Private network {} for PrivateNetwork {} is not available yet: {}",
                pn.spec.id, name, e
            );
            self.report_status(&pn, NetworkState::Pending, previous_attached, Some(e.to_string()))
                .await;
            return Ok(ReconcileOutcome::RequeueAfter(self.requeue_after));
        }

        let nodes = self.store.list_nodes().await?;
        for node in &nodes {
            match self.sync_interface(&pn, node, prefix).await {
                Ok(()) => {}
                Err(e) if e.is_invariant_violation() => {
                    error!("PrivateNetwork {}: {}", name, e);
                    self.report_status(&pn, NetworkState::Failed, previous_attached, Some(e.to_string()))
                        .await;
                    return Ok(ReconcileOutcome::RequeueAfter(self.requeue_after));
                }
                Err(e) => return Err(e),
            }
        }

        let node_names: HashSet<&str> = nodes
            .iter()
            .filter_map(|n| n.metadata.name.as_deref())
            .collect();
        let interfaces = self.store.list_network_interfaces(&network_labels(&name)).await?;
        let mut attached = 0;
        for nic in &interfaces {
            if !node_names.contains(nic.spec.node_name.as_str()) {
                warn!(
                    "NetworkInterface {} of PrivateNetwork {} is for absent node {}",
                    nic.name_any(),
                    name,
                    nic.spec.node_name
                );
            } else if !nic.is_deleting() {
                attached += 1;
            }
        }

        self.report_status(&pn, NetworkState::Ready, attached, None).await;
        debug!("PrivateNetwork {} attached to {} node(s)", name, attached);
        Ok(ReconcileOutcome::Done)
    }

    /// Patch the status if it changed. Failures are logged, the next pass retries.
    pub(crate) async fn report_status(
        &self,
        pn: &PrivateNetwork,
        state: NetworkState,
        attached_nodes: u32,
        error: Option<String>,
    ) {
        let current = pn.status.as_ref();
        if !status_needs_update(current, state, attached_nodes, error.as_deref()) {
            return;
        }
        let status = next_status(current, state, attached_nodes, error);
        if let Err(e) = self.store.patch_private_network_status(&pn.name_any(), &status).await {
            warn!("Failed to update status of PrivateNetwork {}: {}", pn.name_any(), e);
        }
    }

    /// Rebuild the address pool from existing NetworkInterfaces.
    ///
    /// Run once at startup, before any reconciliation, so addresses held by
    /// interfaces created by a previous process are never handed out again.
    /// Returns the number of addresses claimed. A listing failure is an error:
    /// a partial pool would hand out addresses that are already taken.
    pub async fn seed_address_pool(&self) -> Result<usize, ControllerError> {
        let networks = self.store.list_private_networks().await?;
        info!("Seeding address pool from {} PrivateNetwork(s)", networks.len());

        let mut claimed = 0;
        for pn in &networks {
            let prefix = match self.ipam.ensure_prefix(&pn.spec.cidr).await {
                Ok(prefix) => prefix,
                Err(e) => {
                    warn!("Skipping PrivateNetwork {} while seeding: {}", pn.name_any(), e);
                    continue;
                }
            };

            for nic in self.store.list_network_interfaces(&network_labels(&pn.name_any())).await? {
                // already released
                if !nic.has_finalizer(IP_FINALIZER) {
                    continue;
                }
                let ip: IpAddr = match nic.host_address().parse() {
                    Ok(ip) => ip,
                    Err(_) => {
                        warn!(
                            "NetworkInterface {} has unparsable address {:?}",
                            nic.name_any(),
                            nic.spec.address
                        );
                        continue;
                    }
                };
                match self.ipam.claim_ip(&prefix.cidr, ip).await {
                    Ok(()) => claimed += 1,
                    Err(e) => warn!("Failed to claim {} for NetworkInterface {}: {}", ip, nic.name_any(), e),
                }
            }
        }

        info!("Address pool seeded with {} address(es)", claimed);
        Ok(claimed)
    }
}
