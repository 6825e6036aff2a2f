//! PrivateNetwork teardown
//!
//! Deletion is ordered by two finalizers on every NetworkInterface:
//! the node agent clears `scaleway.com/finalizer` once the host side is
//! unconfigured, then the controller releases the address, detaches the cloud
//! NIC and clears `scaleway.com/finalizer-ip`. The PrivateNetwork keeps its own
//! finalizer until no NetworkInterface is left, at which point the address
//! prefix is dropped.

use super::{ReconcileOutcome, Reconciler};
use crate::error::ControllerError;
use crate::reconcile_helpers::network_labels;
use crds::{FINALIZER, FinalizerExt, IP_FINALIZER, NetworkInterface, NetworkState, PrivateNetwork, remove_finalizer};
use ipam_client::Prefix;
use kube::ResourceExt;
use std::net::IpAddr;
use tracing::{debug, info, warn};

impl Reconciler {
    /// Advance the teardown of a deleting PrivateNetwork by one step
    pub(crate) async fn finalize_private_network(
        &self,
        pn: &PrivateNetwork,
        prefix: &Prefix,
    ) -> Result<ReconcileOutcome, ControllerError> {
        let name = pn.name_any();
        let children = self.store.list_network_interfaces(&network_labels(&name)).await?;

        if children.is_empty() {
            match self.ipam.delete_prefix(&prefix.cidr).await {
                Ok(_) => debug!("Deleted address prefix {}", prefix.cidr),
                Err(e) if e.is_not_found() => debug!("Address prefix {} already gone", prefix.cidr),
                Err(e) => return Err(e.into()),
            }
            let mut pn = pn.clone();
            if remove_finalizer(&mut pn.metadata, FINALIZER) {
                self.store.update_private_network(&pn).await?;
            }
            info!("PrivateNetwork {} finalized", name);
            return Ok(ReconcileOutcome::Done);
        }

        let remaining = children.iter().filter(|c| !c.is_deleting()).count() as u32;
        self.report_status(pn, NetworkState::Deleting, remaining, None).await;

        for child in &children {
            let child_name = child.name_any();
            if !child.is_deleting() {
                info!("Deleting NetworkInterface {}", child_name);
                self.store.delete_network_interface(&child_name).await?;
            } else if child.has_finalizer(FINALIZER) {
                debug!("NetworkInterface {} is waiting for the node agent", child_name);
            } else if child.has_finalizer(IP_FINALIZER) {
                self.finalize_interface(pn, prefix, child).await?;
            }
        }

        debug!(
            "PrivateNetwork {} still has {} NetworkInterface(s), requeuing",
            name,
            children.len()
        );
        Ok(ReconcileOutcome::RequeueAfter(self.requeue_after))
    }

    /// Release the address and cloud NIC of a NetworkInterface the node agent is done with.
    ///
    /// Every step tolerates having already happened, so a pass interrupted
    /// between steps is completed by the next one.
    async fn finalize_interface(
        &self,
        pn: &PrivateNetwork,
        prefix: &Prefix,
        child: &NetworkInterface,
    ) -> Result<(), ControllerError> {
        let child_name = child.name_any();

        match child.host_address().parse::<IpAddr>() {
            Ok(ip) => match self.ipam.release_ip(&prefix.cidr, ip).await {
                Ok(()) => debug!("Released {} from NetworkInterface {}", ip, child_name),
                Err(e) if e.is_not_found() => debug!("{} was already released", ip),
                Err(e) => return Err(e.into()),
            },
            Err(_) => warn!(
                "NetworkInterface {} has unparsable address {:?}, nothing to release",
                child_name, child.spec.address
            ),
        }

        match self.store.get_node(&child.spec.node_name).await? {
            Some(node) => {
                let server = self.resolve_node(&node).await?;
                let nics = self.cloud.list_private_nics(&server.zone, &server.id).await?;
                if let Some(nic) = nics.iter().find(|n| n.private_network_id == pn.spec.id) {
                    self.cloud
                        .delete_private_nic(&server.zone, &server.id, &nic.id)
                        .await?;
                    self.metrics.private_nics_deleted_total.inc();
                    info!("Deleted private NIC {} from server {}", nic.id, server.id);
                }
            }
            None => debug!(
                "Node {} is gone, skipping private NIC removal for {}",
                child.spec.node_name, child_name
            ),
        }

        let mut child = child.clone();
        remove_finalizer(&mut child.metadata, IP_FINALIZER);
        self.store.update_network_interface(&child).await?;
        self.metrics.interfaces_finalized_total.inc();
        info!("NetworkInterface {} finalized", child_name);
        Ok(())
    }
}
