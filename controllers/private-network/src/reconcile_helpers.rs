//! Helper functions for common reconciliation patterns
//!
//! Object construction, spec validation and status diffing shared by the
//! reconciler sub-modules.

use crate::error::ControllerError;
use chrono::Utc;
use crds::{
    FINALIZER, IP_FINALIZER, NODE_LABEL, NetworkInterface, NetworkInterfaceSpec,
    NetworkInterfaceStatus, NetworkState, PRIVATE_NETWORK_LABEL, PrivateNetwork,
    PrivateNetworkStatus,
};
use ipam_client::{AddressRange, Prefix};
use kube::Resource;
use kube::api::ObjectMeta;
use scaleway_client::PrivateNic;
use std::net::IpAddr;

/// Label pairs selecting every NetworkInterface of a PrivateNetwork
pub fn network_labels(pn_name: &str) -> [(&str, &str); 1] {
    [(PRIVATE_NETWORK_LABEL, pn_name)]
}

/// Label pairs selecting the NetworkInterfaces of one (PrivateNetwork, Node) pair
pub fn interface_labels<'a>(pn_name: &'a str, node_name: &'a str) -> [(&'static str, &'a str); 2] {
    [(PRIVATE_NETWORK_LABEL, pn_name), (NODE_LABEL, node_name)]
}

/// Build a new NetworkInterface for `node_name`, owned by `pn`.
///
/// The object inherits the parent's labels and annotations, carries the two
/// identifying labels and both finalizers, and is named `<pn>-<random>` by the API server.
pub fn build_network_interface(
    pn: &PrivateNetwork,
    node_name: &str,
    address: String,
    nic: &PrivateNic,
) -> Result<NetworkInterface, ControllerError> {
    let pn_name = pn
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| ControllerError::MissingField("PrivateNetwork metadata.name".to_string()))?;
    let owner = pn
        .controller_owner_ref(&())
        .ok_or_else(|| ControllerError::MissingField("PrivateNetwork metadata.uid".to_string()))?;

    let mut labels = pn.metadata.labels.clone().unwrap_or_default();
    labels.insert(PRIVATE_NETWORK_LABEL.to_string(), pn_name.to_string());
    labels.insert(NODE_LABEL.to_string(), node_name.to_string());

    Ok(NetworkInterface {
        metadata: ObjectMeta {
            generate_name: Some(format!("{}-", pn_name)),
            labels: Some(labels),
            annotations: pn.metadata.annotations.clone(),
            finalizers: Some(vec![FINALIZER.to_string(), IP_FINALIZER.to_string()]),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: NetworkInterfaceSpec {
            node_name: node_name.to_string(),
            address,
            id: nic.id.clone(),
        },
        status: Some(NetworkInterfaceStatus {
            mac_address: Some(nic.mac_address.clone()),
        }),
    })
}

/// Check a PrivateNetwork spec before any side effect.
///
/// Returns the validation message on failure.
pub fn validate_spec(pn: &PrivateNetwork) -> Result<(), String> {
    if pn.spec.id.is_empty() {
        return Err("spec.id must not be empty".to_string());
    }
    let prefix = Prefix::parse(&pn.spec.cidr).map_err(|e| format!("spec.cidr: {}", e))?;

    for raw in pn.available_ranges() {
        let range = AddressRange::parse(raw)
            .map_err(|e| format!("spec.ipam.static.availableRanges: {}", e))?;
        if !prefix.network.contains(range.start) || !prefix.network.contains(range.end) {
            return Err(format!(
                "spec.ipam.static.availableRanges: {} is not inside {}",
                raw, pn.spec.cidr
            ));
        }
    }

    for route in &pn.spec.routes {
        Prefix::parse(&route.to).map_err(|e| format!("spec.routes.to: {}", e))?;
        let via: IpAddr = route
            .via
            .parse()
            .map_err(|_| format!("spec.routes.via: invalid address {:?}", route.via))?;
        if !prefix.network.contains(via) {
            return Err(format!(
                "spec.routes.via: {} is not inside {}",
                via, pn.spec.cidr
            ));
        }
    }

    Ok(())
}

/// Check if a PrivateNetwork status needs updating.
/// `lastReconciled` is ignored so unchanged passes do not write.
pub fn status_needs_update(
    current: Option<&PrivateNetworkStatus>,
    state: NetworkState,
    attached_nodes: u32,
    error: Option<&str>,
) -> bool {
    match current {
        None => true,
        Some(status) => {
            status.state != state
                || status.attached_nodes != attached_nodes
                || status.error.as_deref() != error
        }
    }
}

/// Build the next status, stamping `lastReconciled` only when the state changes
pub fn next_status(
    current: Option<&PrivateNetworkStatus>,
    state: NetworkState,
    attached_nodes: u32,
    error: Option<String>,
) -> PrivateNetworkStatus {
    let last_reconciled = match current {
        Some(status) if status.state == state => status.last_reconciled,
        _ => Some(Utc::now()),
    };
    PrivateNetworkStatus {
        state,
        attached_nodes,
        error,
        last_reconciled,
    }
}
