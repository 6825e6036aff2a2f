//! NetworkInterface CRD
//!
//! One node's attachment to one PrivateNetwork. Created by the private
//! network controller, consumed by the node agent that configures the host.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "vpc.scaleway.com",
    version = "v1alpha1",
    kind = "NetworkInterface",
    status = "NetworkInterfaceStatus",
    shortname = "nic",
    printcolumn = r#"{"name":"Node", "type":"string", "jsonPath":".spec.nodeName"}"#,
    printcolumn = r#"{"name":"Address", "type":"string", "jsonPath":".spec.address"}"#,
    printcolumn = r#"{"name":"MAC", "type":"string", "jsonPath":".status.macAddress"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceSpec {
    /// Node this interface belongs to
    pub node_name: String,

    /// Allocated address with prefix length (e.g. "10.0.0.2/24")
    #[serde(default)]
    pub address: String,

    /// Cloud private NIC ID
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceStatus {
    /// MAC address of the cloud private NIC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

impl NetworkInterface {
    /// Address without its prefix length suffix
    pub fn host_address(&self) -> &str {
        self.spec
            .address
            .split_once('/')
            .map_or(self.spec.address.as_str(), |(ip, _)| ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_address_strips_suffix() {
        let nic = NetworkInterface::new(
            "pn-a-x7k2p",
            NetworkInterfaceSpec {
                node_name: "node-1".to_string(),
                address: "10.0.0.2/24".to_string(),
                id: "nic-uuid".to_string(),
            },
        );
        assert_eq!(nic.host_address(), "10.0.0.2");
    }

    #[test]
    fn test_host_address_without_suffix() {
        let nic = NetworkInterface::new(
            "pn-a-x7k2p",
            NetworkInterfaceSpec {
                node_name: "node-1".to_string(),
                address: "10.0.0.2".to_string(),
                id: String::new(),
            },
        );
        assert_eq!(nic.host_address(), "10.0.0.2");
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = NetworkInterfaceStatus {
            mac_address: Some("02:00:00:00:00:01".to_string()),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["macAddress"], "02:00:00:00:00:01");
    }
}
