//! Per-node attachment
//!
//! For every (PrivateNetwork, Node) pair the controller ensures one cloud
//! private NIC on the node's server and one NetworkInterface object recording
//! the NIC and the address allocated to the node.

use super::Reconciler;
use crate::error::ControllerError;
use crate::reconcile_helpers::{build_network_interface, interface_labels};
use crds::{FinalizerExt, NetworkInterface, NetworkInterfaceStatus, PrivateNetwork};
use ipam_client::Prefix;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use scaleway_client::{PrivateNic, Server};
use std::net::IpAddr;
use tracing::{debug, info, warn};

impl Reconciler {
    /// Ensure `node` is attached to `pn`
    pub(crate) async fn sync_interface(
        &self,
        pn: &PrivateNetwork,
        node: &Node,
        prefix: &Prefix,
    ) -> Result<(), ControllerError> {
        let pn_name = pn.name_any();
        let node_name = node.name_any();

        let server = self.resolve_node(node).await?;
        let nic = self.ensure_private_nic(pn, &server).await?;

        let existing = self
            .store
            .list_network_interfaces(&interface_labels(&pn_name, &node_name))
            .await?;
        match existing.as_slice() {
            [] => self.create_interface(pn, &node_name, &nic, prefix).await,
            [current] => self.refresh_interface(current, &nic).await,
            _ => Err(ControllerError::DuplicateInterfaces {
                node: node_name,
                count: existing.len(),
            }),
        }
    }

    /// Reuse the server's NIC on the network, or create one
    async fn ensure_private_nic(&self, pn: &PrivateNetwork, server: &Server) -> Result<PrivateNic, ControllerError> {
        let nics = self.cloud.list_private_nics(&server.zone, &server.id).await?;
        if let Some(nic) = nics.into_iter().find(|n| n.private_network_id == pn.spec.id) {
            debug!("Server {} already has private NIC {} on {}", server.id, nic.id, pn.spec.id);
            return Ok(nic);
        }

        let nic = self
            .cloud
            .create_private_nic(&server.zone, &server.id, &pn.spec.id)
            .await?;
        self.metrics.private_nics_created_total.inc();
        info!(
            "Created private NIC {} on server {} for private network {}",
            nic.id, server.id, pn.spec.id
        );
        Ok(nic)
    }

    /// Allocate an address and record the attachment
    ///
    /// The address goes back to the pool only when nothing can hold it: the object
    /// was never built, or the API server refused the create. Any other create
    /// failure may have persisted the object, so the address stays allocated.
    async fn create_interface(
        &self,
        pn: &PrivateNetwork,
        node_name: &str,
        nic: &PrivateNic,
        prefix: &Prefix,
    ) -> Result<(), ControllerError> {
        let ip = self.ipam.acquire_ip(&prefix.cidr, pn.available_ranges()).await?;
        let desired = match build_network_interface(pn, node_name, prefix.with_suffix(ip), nic) {
            Ok(desired) => desired,
            Err(e) => {
                self.release_unused(prefix, ip).await;
                return Err(e);
            }
        };

        let mut created = match self.store.create_network_interface(&desired).await {
            Ok(created) => created,
            Err(e) if e.is_rejected() => {
                self.release_unused(prefix, ip).await;
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "Create of NetworkInterface for node {} failed with an unknown outcome, keeping {} allocated: {}",
                    node_name, ip, e
                );
                return Err(e);
            }
        };

        // status is dropped on create
        created.status = desired.status;
        self.store.update_network_interface_status(&created).await?;
        self.metrics.interfaces_created_total.inc();
        info!(
            "Created NetworkInterface {} for node {} with address {}",
            created.name_any(),
            node_name,
            created.spec.address
        );
        Ok(())
    }

    async fn release_unused(&self, prefix: &Prefix, ip: IpAddr) {
        if let Err(e) = self.ipam.release_ip(&prefix.cidr, ip).await {
            warn!("Failed to release unused address {}: {}", ip, e);
        }
    }

    /// Bring an existing NetworkInterface back in line with the cloud NIC
    async fn refresh_interface(&self, current: &NetworkInterface, nic: &PrivateNic) -> Result<(), ControllerError> {
        if current.is_deleting() {
            return Ok(());
        }

        let mut updated = current.clone();
        if updated.spec.id != nic.id {
            info!(
                "NetworkInterface {} points at NIC {:?}, updating to {}",
                current.name_any(),
                current.spec.id,
                nic.id
            );
            updated.spec.id = nic.id.clone();
            updated = self.store.update_network_interface(&updated).await?;
        }

        let mac = current.status.as_ref().and_then(|s| s.mac_address.as_deref());
        if mac != Some(nic.mac_address.as_str()) {
            updated.status = Some(NetworkInterfaceStatus {
                mac_address: Some(nic.mac_address.clone()),
            });
            self.store.update_network_interface_status(&updated).await?;
        }
        Ok(())
    }
}
