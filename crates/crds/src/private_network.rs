//! PrivateNetwork CRD
//!
//! Declares a cloud private network that every cluster node should be
//! attached to. The controller creates one `NetworkInterface` per node.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "vpc.scaleway.com",
    version = "v1alpha1",
    kind = "PrivateNetwork",
    status = "PrivateNetworkStatus",
    shortname = "pn",
    printcolumn = r#"{"name":"CIDR", "type":"string", "jsonPath":".spec.cidr"}"#,
    printcolumn = r#"{"name":"Zone", "type":"string", "jsonPath":".spec.zone"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNetworkSpec {
    /// Cloud private network ID
    pub id: String,

    /// Zone of the private network (e.g. "fr-par-1")
    #[serde(default)]
    pub zone: String,

    /// Address block handed out to node interfaces (e.g. "10.0.0.0/24")
    pub cidr: String,

    /// Address management settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipam: Option<PrivateNetworkIpam>,

    /// Routes installed by the node agent through this network
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<PrivateNetworkRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNetworkIpam {
    /// Static allocation restricted to a set of ranges
    #[serde(default, rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_ranges: Option<PrivateNetworkIpamStatic>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNetworkIpamStatic {
    /// Ranges written as "10.0.0.10-10.0.0.50" or as a CIDR
    #[serde(default)]
    pub available_ranges: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNetworkRoute {
    /// Destination CIDR
    pub to: String,

    /// Gateway address, must be inside the network CIDR
    pub via: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNetworkStatus {
    /// Reconciliation state
    pub state: NetworkState,

    /// Number of nodes with a NetworkInterface on this network
    #[serde(default)]
    pub attached_nodes: u32,

    /// Error message of the last failed pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Set when the state last changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,
}

/// PrivateNetwork state
///
/// Serializes as PascalCase ("Ready", "Failed", etc.)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum NetworkState {
    /// Not reconciled yet, or waiting for the cloud provider
    #[default]
    Pending,

    /// Every node has an interface
    Ready,

    /// Teardown in progress
    Deleting,

    /// Last pass failed
    Failed,
}

impl PrivateNetwork {
    /// Static ranges configured for this network, empty when allocation may use the whole CIDR
    pub fn available_ranges(&self) -> &[String] {
        self.spec
            .ipam
            .as_ref()
            .and_then(|ipam| ipam.static_ranges.as_ref())
            .map(|s| s.available_ranges.as_slice())
            .unwrap_or_default()
    }
}
