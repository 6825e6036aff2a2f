//! Cluster object store
//!
//! `ObjectStoreTrait` is the seam between the reconciler and the Kubernetes API so the
//! whole state machine can run against an in-memory store in unit tests.
//! `KubeStore` is the production implementation over `kube::Api`.

use crate::error::ControllerError;
use crds::{NetworkInterface, PrivateNetwork, PrivateNetworkStatus};
use k8s_openapi::api::core::v1::Node;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Object store operations used by the reconciler
///
/// Updates go through `replace` semantics: a stale `resourceVersion` is a conflict
/// and surfaces as an error, the next pass re-reads current state.
#[async_trait::async_trait]
pub trait ObjectStoreTrait: Send + Sync {
    /// `Ok(None)` when the PrivateNetwork does not exist
    async fn get_private_network(&self, name: &str) -> Result<Option<PrivateNetwork>, ControllerError>;
    async fn list_private_networks(&self) -> Result<Vec<PrivateNetwork>, ControllerError>;
    /// Replace metadata and spec (used for finalizer changes)
    async fn update_private_network(&self, pn: &PrivateNetwork) -> Result<PrivateNetwork, ControllerError>;
    async fn patch_private_network_status(
        &self,
        name: &str,
        status: &PrivateNetworkStatus,
    ) -> Result<(), ControllerError>;

    /// List NetworkInterfaces matching every `(label, value)` pair
    async fn list_network_interfaces(
        &self,
        labels: &[(&str, &str)],
    ) -> Result<Vec<NetworkInterface>, ControllerError>;
    async fn create_network_interface(&self, nic: &NetworkInterface) -> Result<NetworkInterface, ControllerError>;
    /// Replace metadata and spec; clearing the last finalizer of a deleting object removes it
    async fn update_network_interface(&self, nic: &NetworkInterface) -> Result<NetworkInterface, ControllerError>;
    async fn update_network_interface_status(&self, nic: &NetworkInterface) -> Result<(), ControllerError>;
    /// Issue a delete request; an object that is already gone is not an error
    async fn delete_network_interface(&self, name: &str) -> Result<(), ControllerError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, ControllerError>;
    /// `Ok(None)` when the node does not exist
    async fn get_node(&self, name: &str) -> Result<Option<Node>, ControllerError>;
}

/// Render label pairs as a label selector (`a=b,c=d`)
pub fn label_selector(labels: &[(&str, &str)]) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

fn object_name(meta: &kube::api::ObjectMeta, kind: &str) -> Result<String, ControllerError> {
    meta.name
        .clone()
        .ok_or_else(|| ControllerError::MissingField(format!("{} metadata.name", kind)))
}

/// `ObjectStoreTrait` over the Kubernetes API. All three kinds are cluster-scoped.
#[derive(Clone)]
pub struct KubeStore {
    private_networks: Api<PrivateNetwork>,
    network_interfaces: Api<NetworkInterface>,
    nodes: Api<Node>,
}

impl KubeStore {
    /// Create a store from a Kubernetes client
    pub fn new(client: Client) -> Self {
        Self {
            private_networks: Api::all(client.clone()),
            network_interfaces: Api::all(client.clone()),
            nodes: Api::all(client),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStoreTrait for KubeStore {
    async fn get_private_network(&self, name: &str) -> Result<Option<PrivateNetwork>, ControllerError> {
        Ok(self.private_networks.get_opt(name).await?)
    }

    async fn list_private_networks(&self) -> Result<Vec<PrivateNetwork>, ControllerError> {
        Ok(self.private_networks.list(&ListParams::default()).await?.items)
    }

    async fn update_private_network(&self, pn: &PrivateNetwork) -> Result<PrivateNetwork, ControllerError> {
        let name = object_name(&pn.metadata, "PrivateNetwork")?;
        Ok(self.private_networks.replace(&name, &PostParams::default(), pn).await?)
    }

    async fn patch_private_network_status(
        &self,
        name: &str,
        status: &PrivateNetworkStatus,
    ) -> Result<(), ControllerError> {
        let patch = serde_json::json!({ "status": status });
        self.private_networks
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn list_network_interfaces(
        &self,
        labels: &[(&str, &str)],
    ) -> Result<Vec<NetworkInterface>, ControllerError> {
        let lp = ListParams::default().labels(&label_selector(labels));
        Ok(self.network_interfaces.list(&lp).await?.items)
    }

    async fn create_network_interface(&self, nic: &NetworkInterface) -> Result<NetworkInterface, ControllerError> {
        Ok(self.network_interfaces.create(&PostParams::default(), nic).await?)
    }

    async fn update_network_interface(&self, nic: &NetworkInterface) -> Result<NetworkInterface, ControllerError> {
        let name = object_name(&nic.metadata, "NetworkInterface")?;
        Ok(self.network_interfaces.replace(&name, &PostParams::default(), nic).await?)
    }

    async fn update_network_interface_status(&self, nic: &NetworkInterface) -> Result<(), ControllerError> {
        let name = object_name(&nic.metadata, "NetworkInterface")?;
        let patch = serde_json::json!({ "status": nic.status });
        self.network_interfaces
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn delete_network_interface(&self, name: &str) -> Result<(), ControllerError> {
        match self.network_interfaces.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let e = ControllerError::from(e);
                if e.is_not_found() {
                    debug!("NetworkInterface {} already deleted", name);
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ControllerError> {
        Ok(self.nodes.list(&ListParams::default()).await?.items)
    }

    async fn get_node(&self, name: &str) -> Result<Option<Node>, ControllerError> {
        Ok(self.nodes.get_opt(name).await?)
    }
}
