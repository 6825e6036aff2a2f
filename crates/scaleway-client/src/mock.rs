//! Mock ScalewayClient for unit testing
//!
//! This module provides a mock implementation of CloudClientTrait that can be used
//! in unit tests without talking to the Scaleway API.

use crate::cloud_trait::CloudClientTrait;
use crate::error::ScalewayError;
use crate::models::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock ScalewayClient for testing
///
/// Servers and private networks are registered up front; private NICs are
/// created and deleted through the trait like the real API would.
#[derive(Debug, Clone)]
pub struct MockScalewayClient {
    default_zone: String,
    servers: Arc<Mutex<HashMap<String, Server>>>,
    private_networks: Arc<Mutex<HashMap<String, PrivateNetwork>>>,
    // server id -> attached NICs
    nics: Arc<Mutex<HashMap<String, Vec<PrivateNic>>>>,
    created_nics: Arc<AtomicUsize>,
    deleted_nics: Arc<AtomicUsize>,
    fail_get_server: Arc<AtomicBool>,
    fail_credentials: Arc<AtomicBool>,
}

impl MockScalewayClient {
    /// Create a new mock client
    pub fn new(default_zone: impl Into<String>) -> Self {
        Self {
            default_zone: default_zone.into(),
            servers: Arc::new(Mutex::new(HashMap::new())),
            private_networks: Arc::new(Mutex::new(HashMap::new())),
            nics: Arc::new(Mutex::new(HashMap::new())),
            created_nics: Arc::new(AtomicUsize::new(0)),
            deleted_nics: Arc::new(AtomicUsize::new(0)),
            fail_get_server: Arc::new(AtomicBool::new(false)),
            fail_credentials: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add a server to the mock store (for test setup)
    pub fn add_server(&self, id: &str, name: &str, zone: &str) {
        let server = Server {
            id: id.to_string(),
            name: name.to_string(),
            zone: zone.to_string(),
            state: "running".to_string(),
            private_nics: Vec::new(),
        };
        self.servers.lock().unwrap().insert(id.to_string(), server);
    }

    /// Add a private network to the mock store (for test setup)
    pub fn add_private_network(&self, id: &str, name: &str, zone: &str) {
        let network = PrivateNetwork {
            id: id.to_string(),
            name: name.to_string(),
            zone: zone.to_string(),
            subnets: Vec::new(),
        };
        self.private_networks.lock().unwrap().insert(id.to_string(), network);
    }

    /// Make every `get_server` call fail with an API error
    pub fn set_fail_get_server(&self, fail: bool) {
        self.fail_get_server.store(fail, Ordering::SeqCst);
    }

    /// Make `validate_credentials` fail with an authentication error
    pub fn set_fail_credentials(&self, fail: bool) {
        self.fail_credentials.store(fail, Ordering::SeqCst);
    }

    /// NICs currently attached to a server
    pub fn nics_for(&self, server_id: &str) -> Vec<PrivateNic> {
        self.nics.lock().unwrap().get(server_id).cloned().unwrap_or_default()
    }

    /// Number of successful `create_private_nic` calls
    pub fn created_nic_count(&self) -> usize {
        self.created_nics.load(Ordering::SeqCst)
    }

    /// Number of NICs actually removed by `delete_private_nic`
    pub fn deleted_nic_count(&self) -> usize {
        self.deleted_nics.load(Ordering::SeqCst)
    }

    fn generate_mac(n: usize) -> String {
        let bytes = (n as u32).to_be_bytes();
        format!(
            "02:00:{:02x}:{:02x}:{:02x}:{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[3]
        )
    }

    fn zone_matches(&self, wanted: &str, actual: &str) -> bool {
        let wanted = if wanted.is_empty() { self.default_zone.as_str() } else { wanted };
        actual.is_empty() || wanted == actual
    }
}

#[async_trait::async_trait]
impl CloudClientTrait for MockScalewayClient {
    fn default_zone(&self) -> &str {
        &self.default_zone
    }

    async fn validate_credentials(&self) -> Result<(), ScalewayError> {
        if self.fail_credentials.load(Ordering::SeqCst) {
            return Err(ScalewayError::Authentication("invalid secret key".to_string()));
        }
        Ok(())
    }

    async fn get_private_network(&self, zone: &str, id: &str) -> Result<PrivateNetwork, ScalewayError> {
        self.private_networks
            .lock()
            .unwrap()
            .get(id)
            .filter(|pn| self.zone_matches(zone, &pn.zone))
            .cloned()
            .ok_or_else(|| ScalewayError::NotFound(format!("private network {}", id)))
    }

    async fn get_server(&self, zone: &str, id: &str) -> Result<Server, ScalewayError> {
        if self.fail_get_server.load(Ordering::SeqCst) {
            return Err(ScalewayError::Api(format!("GET server {} failed: 500", id)));
        }
        let mut server = self
            .servers
            .lock()
            .unwrap()
            .get(id)
            .filter(|s| self.zone_matches(zone, &s.zone))
            .cloned()
            .ok_or_else(|| ScalewayError::NotFound(format!("server {}", id)))?;
        server.private_nics = self.nics_for(id);
        Ok(server)
    }

    async fn list_servers(&self, zone: &str, name: &str) -> Result<Vec<Server>, ScalewayError> {
        let mut servers: Vec<Server> = self
            .servers
            .lock()
            .unwrap()
            .values()
            .filter(|s| self.zone_matches(zone, &s.zone))
            .filter(|s| name.is_empty() || s.name == name)
            .cloned()
            .collect();
        servers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(servers)
    }

    async fn list_private_nics(&self, _zone: &str, server_id: &str) -> Result<Vec<PrivateNic>, ScalewayError> {
        if !self.servers.lock().unwrap().contains_key(server_id) {
            return Err(ScalewayError::NotFound(format!("server {}", server_id)));
        }
        Ok(self.nics_for(server_id))
    }

    async fn create_private_nic(
        &self,
        _zone: &str,
        server_id: &str,
        private_network_id: &str,
    ) -> Result<PrivateNic, ScalewayError> {
        if !self.servers.lock().unwrap().contains_key(server_id) {
            return Err(ScalewayError::NotFound(format!("server {}", server_id)));
        }

        let mut nics = self.nics.lock().unwrap();
        let attached = nics.entry(server_id.to_string()).or_default();
        if attached.iter().any(|n| n.private_network_id == private_network_id) {
            return Err(ScalewayError::InvalidRequest(format!(
                "server {} is already attached to private network {}",
                server_id, private_network_id
            )));
        }

        let n = self.created_nics.fetch_add(1, Ordering::SeqCst) + 1;
        let nic = PrivateNic {
            id: uuid::Uuid::new_v4().to_string(),
            server_id: server_id.to_string(),
            private_network_id: private_network_id.to_string(),
            mac_address: Self::generate_mac(n),
            state: "available".to_string(),
        };
        attached.push(nic.clone());
        Ok(nic)
    }

    async fn delete_private_nic(&self, _zone: &str, server_id: &str, nic_id: &str) -> Result<(), ScalewayError> {
        let mut nics = self.nics.lock().unwrap();
        if let Some(attached) = nics.get_mut(server_id) {
            let before = attached.len();
            attached.retain(|n| n.id != nic_id);
            if attached.len() < before {
                self.deleted_nics.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}
