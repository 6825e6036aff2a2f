//! Test utilities for unit testing reconcilers
//!
//! `MockStore` is an in-memory object store that mimics the parts of API server
//! behaviour the reconciler relies on: `generateName`, finalizer-gated deletion,
//! status being ignored on create, and label-selector listing.

use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::store::ObjectStoreTrait;
use crds::*;
use ipam_client::MemoryIpam;
use k8s_openapi::api::core::v1::{Node, NodeSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use regex::Regex;
use scaleway_client::MockScalewayClient;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fixed requeue delay used by test reconcilers
pub const TEST_REQUEUE: Duration = Duration::from_secs(30);

fn deletion_time() -> Time {
    serde_json::from_value(serde_json::json!("2025-01-01T00:00:00Z")).unwrap()
}

fn no_finalizers(meta: &ObjectMeta) -> bool {
    meta.finalizers.as_ref().is_none_or(|f| f.is_empty())
}

/// In-memory `ObjectStoreTrait`
#[derive(Clone, Default)]
pub struct MockStore {
    private_networks: Arc<Mutex<BTreeMap<String, PrivateNetwork>>>,
    network_interfaces: Arc<Mutex<BTreeMap<String, NetworkInterface>>>,
    nodes: Arc<Mutex<BTreeMap<String, Node>>>,
    next_id: Arc<AtomicUsize>,
    fail_list_private_networks: Arc<AtomicBool>,
    fail_list_network_interfaces: Arc<AtomicBool>,
    create_failure: Arc<Mutex<Option<CreateFailure>>>,
}

/// How `create_network_interface` fails once armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateFailure {
    /// The API server refuses the object and stores nothing
    Rejected,
    /// The object is stored but the response is lost
    LostResponse,
}

impl MockStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Add a PrivateNetwork (for test setup)
    pub fn add_private_network(&self, pn: PrivateNetwork) {
        let name = pn.metadata.name.clone().unwrap();
        self.private_networks.lock().unwrap().insert(name, pn);
    }

    /// Add a NetworkInterface as-is, status included (for test setup)
    pub fn add_network_interface(&self, nic: NetworkInterface) {
        let name = nic.metadata.name.clone().unwrap();
        self.network_interfaces.lock().unwrap().insert(name, nic);
    }

    /// Add a node (for test setup)
    pub fn add_node(&self, node: Node) {
        let name = node.metadata.name.clone().unwrap();
        self.nodes.lock().unwrap().insert(name, node);
    }

    /// Remove a node, as if it left the cluster
    pub fn remove_node(&self, name: &str) {
        self.nodes.lock().unwrap().remove(name);
    }

    /// Make `list_private_networks` fail
    pub fn set_fail_list_private_networks(&self, fail: bool) {
        self.fail_list_private_networks.store(fail, Ordering::SeqCst);
    }

    /// Make `list_network_interfaces` fail
    pub fn set_fail_list_network_interfaces(&self, fail: bool) {
        self.fail_list_network_interfaces.store(fail, Ordering::SeqCst);
    }

    /// Make every following `create_network_interface` fail
    pub fn set_create_failure(&self, failure: Option<CreateFailure>) {
        *self.create_failure.lock().unwrap() = failure;
    }

    /// Issue a delete request on a PrivateNetwork, as `kubectl delete` would
    pub fn delete_private_network(&self, name: &str) {
        let mut pns = self.private_networks.lock().unwrap();
        let remove = match pns.get_mut(name) {
            Some(pn) if no_finalizers(&pn.metadata) => true,
            Some(pn) => {
                pn.metadata.deletion_timestamp.get_or_insert_with(deletion_time);
                false
            }
            None => false,
        };
        if remove {
            pns.remove(name);
        }
    }

    /// Clear a finalizer on a NetworkInterface, as the node agent does
    pub fn clear_interface_finalizer(&self, name: &str, finalizer: &str) {
        let mut nics = self.network_interfaces.lock().unwrap();
        let remove = match nics.get_mut(name) {
            Some(nic) => {
                remove_finalizer(&mut nic.metadata, finalizer);
                nic.metadata.deletion_timestamp.is_some() && no_finalizers(&nic.metadata)
            }
            None => false,
        };
        if remove {
            nics.remove(name);
        }
    }

    /// Current PrivateNetwork, if it still exists
    pub fn private_network(&self, name: &str) -> Option<PrivateNetwork> {
        self.private_networks.lock().unwrap().get(name).cloned()
    }

    /// Every stored NetworkInterface
    pub fn network_interfaces(&self) -> Vec<NetworkInterface> {
        self.network_interfaces.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl ObjectStoreTrait for MockStore {
    async fn get_private_network(&self, name: &str) -> Result<Option<PrivateNetwork>, ControllerError> {
        Ok(self.private_network(name))
    }

    async fn list_private_networks(&self) -> Result<Vec<PrivateNetwork>, ControllerError> {
        if self.fail_list_private_networks.load(Ordering::SeqCst) {
            return Err(ControllerError::Watch("mock store unavailable".to_string()));
        }
        Ok(self.private_networks.lock().unwrap().values().cloned().collect())
    }

    async fn update_private_network(&self, pn: &PrivateNetwork) -> Result<PrivateNetwork, ControllerError> {
        let name = pn.metadata.name.clone().unwrap();
        let mut pns = self.private_networks.lock().unwrap();
        let stored = pns
            .get(&name)
            .cloned()
            .ok_or_else(|| ControllerError::MissingField(format!("PrivateNetwork {} not found", name)))?;

        let mut updated = pn.clone();
        updated.metadata.deletion_timestamp = stored.metadata.deletion_timestamp.clone();
        updated.metadata.resource_version = Some(self.next_id().to_string());
        updated.status = stored.status;

        if updated.metadata.deletion_timestamp.is_some() && no_finalizers(&updated.metadata) {
            pns.remove(&name);
        } else {
            pns.insert(name, updated.clone());
        }
        Ok(updated)
    }

    async fn patch_private_network_status(
        &self,
        name: &str,
        status: &PrivateNetworkStatus,
    ) -> Result<(), ControllerError> {
        let mut pns = self.private_networks.lock().unwrap();
        let pn = pns
            .get_mut(name)
            .ok_or_else(|| ControllerError::MissingField(format!("PrivateNetwork {} not found", name)))?;
        pn.status = Some(status.clone());
        Ok(())
    }

    async fn list_network_interfaces(
        &self,
        labels: &[(&str, &str)],
    ) -> Result<Vec<NetworkInterface>, ControllerError> {
        if self.fail_list_network_interfaces.load(Ordering::SeqCst) {
            return Err(ControllerError::Watch("mock store unavailable".to_string()));
        }
        Ok(self
            .network_interfaces
            .lock()
            .unwrap()
            .values()
            .filter(|nic| {
                let nic_labels = nic.metadata.labels.clone().unwrap_or_default();
                labels
                    .iter()
                    .all(|(k, v)| nic_labels.get(*k).map(String::as_str) == Some(*v))
            })
            .cloned()
            .collect())
    }

    async fn create_network_interface(&self, nic: &NetworkInterface) -> Result<NetworkInterface, ControllerError> {
        let failure = *self.create_failure.lock().unwrap();
        if failure == Some(CreateFailure::Rejected) {
            return Err(ControllerError::Kube(kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".to_string(),
                message: "admission webhook denied the request".to_string(),
                reason: "Invalid".to_string(),
                code: 422,
            })));
        }

        let mut created = nic.clone();
        let id = self.next_id();
        if created.metadata.name.is_none() {
            let base = created.metadata.generate_name.clone().unwrap_or_default();
            created.metadata.name = Some(format!("{}{:05}", base, id));
        }
        created.metadata.uid = Some(format!("uid-{}", id));
        created.metadata.resource_version = Some(id.to_string());
        created.status = None;

        let name = created.metadata.name.clone().unwrap();
        let mut nics = self.network_interfaces.lock().unwrap();
        if nics.contains_key(&name) {
            return Err(ControllerError::MissingField(format!("NetworkInterface {} already exists", name)));
        }
        nics.insert(name, created.clone());
        if failure == Some(CreateFailure::LostResponse) {
            return Err(ControllerError::Watch("request timed out".to_string()));
        }
        Ok(created)
    }

    async fn update_network_interface(&self, nic: &NetworkInterface) -> Result<NetworkInterface, ControllerError> {
        let name = nic.metadata.name.clone().unwrap();
        let mut nics = self.network_interfaces.lock().unwrap();
        let stored = nics
            .get(&name)
            .cloned()
            .ok_or_else(|| ControllerError::MissingField(format!("NetworkInterface {} not found", name)))?;

        let mut updated = nic.clone();
        updated.metadata.deletion_timestamp = stored.metadata.deletion_timestamp.clone();
        updated.metadata.resource_version = Some(self.next_id().to_string());
        updated.status = stored.status;

        if updated.metadata.deletion_timestamp.is_some() && no_finalizers(&updated.metadata) {
            nics.remove(&name);
        } else {
            nics.insert(name, updated.clone());
        }
        Ok(updated)
    }

    async fn update_network_interface_status(&self, nic: &NetworkInterface) -> Result<(), ControllerError> {
        let name = nic.metadata.name.clone().unwrap();
        let mut nics = self.network_interfaces.lock().unwrap();
        let stored = nics
            .get_mut(&name)
            .ok_or_else(|| ControllerError::MissingField(format!("NetworkInterface {} not found", name)))?;
        stored.status = nic.status.clone();
        Ok(())
    }

    async fn delete_network_interface(&self, name: &str) -> Result<(), ControllerError> {
        let mut nics = self.network_interfaces.lock().unwrap();
        let remove = match nics.get_mut(name) {
            Some(nic) if no_finalizers(&nic.metadata) => true,
            Some(nic) => {
                nic.metadata.deletion_timestamp.get_or_insert_with(deletion_time);
                false
            }
            None => false,
        };
        if remove {
            nics.remove(name);
        }
        Ok(())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ControllerError> {
        Ok(self.nodes.lock().unwrap().values().cloned().collect())
    }

    async fn get_node(&self, name: &str) -> Result<Option<Node>, ControllerError> {
        Ok(self.nodes.lock().unwrap().get(name).cloned())
    }
}

/// Helper to create a test PrivateNetwork
pub fn create_test_private_network(name: &str, id: &str, cidr: &str) -> PrivateNetwork {
    PrivateNetwork {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            uid: Some(format!("uid-{}", name)),
            labels: Some(BTreeMap::from([("team".to_string(), "net".to_string())])),
            ..Default::default()
        },
        spec: PrivateNetworkSpec {
            id: id.to_string(),
            zone: "fr-par-1".to_string(),
            cidr: cidr.to_string(),
            ..Default::default()
        },
        status: None,
    }
}

/// Helper to create a test Node
pub fn create_test_node(name: &str, provider_id: Option<&str>) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(NodeSpec {
            provider_id: provider_id.map(str::to_string),
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to create a NetworkInterface already attached to a node
pub fn create_test_network_interface(name: &str, pn_name: &str, node_name: &str, address: &str) -> NetworkInterface {
    NetworkInterface {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([
                (PRIVATE_NETWORK_LABEL.to_string(), pn_name.to_string()),
                (NODE_LABEL.to_string(), node_name.to_string()),
            ])),
            finalizers: Some(vec![FINALIZER.to_string(), IP_FINALIZER.to_string()]),
            ..Default::default()
        },
        spec: NetworkInterfaceSpec {
            node_name: node_name.to_string(),
            address: address.to_string(),
            id: String::new(),
        },
        status: None,
    }
}

/// Reconciler wired to in-memory collaborators, with handles to inspect them
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub store: MockStore,
    pub cloud: MockScalewayClient,
    pub ipam: MemoryIpam,
    pub metrics: Metrics,
}

/// Build a reconciler over `MockStore`, `MockScalewayClient` and `MemoryIpam`
pub fn create_test_reconciler() -> TestHarness {
    let store = MockStore::new();
    let cloud = MockScalewayClient::new("fr-par-1");
    let ipam = MemoryIpam::new();
    let metrics = Metrics::new().unwrap();
    let pattern = Regex::new(crate::config::DEFAULT_PROVIDER_ID_PATTERN).unwrap();

    let reconciler = Reconciler::new(
        store.clone(),
        cloud.clone(),
        ipam.clone(),
        TEST_REQUEUE,
        pattern,
        metrics.clone(),
    );

    TestHarness {
        reconciler,
        store,
        cloud,
        ipam,
        metrics,
    }
}

impl TestHarness {
    /// Register a server in the cloud and a node pointing at it by provider ID
    pub fn add_node_with_server(&self, node_name: &str, server_id: &str) {
        self.cloud.add_server(server_id, node_name, "fr-par-1");
        let provider_id = format!("scaleway://instance/fr-par-1/{}", server_id);
        self.store.add_node(create_test_node(node_name, Some(&provider_id)));
    }

    /// Register a PrivateNetwork in both the cluster and the cloud
    pub fn add_network(&self, pn: PrivateNetwork) {
        let name = pn.metadata.name.clone().unwrap();
        self.cloud.add_private_network(&pn.spec.id, &name, &pn.spec.zone);
        self.store.add_private_network(pn);
    }
}
