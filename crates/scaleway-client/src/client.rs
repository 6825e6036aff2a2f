//! Scaleway API client
//!
//! Implements the Instance (`/instance/v1`) and VPC (`/vpc/v1`) calls used by
//! the private network controller.

use crate::cloud_trait::CloudClientTrait;
use crate::common::HttpClient;
use crate::error::ScalewayError;
use crate::models::*;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Page size used when listing servers
const SERVERS_PER_PAGE: u64 = 50;

/// Scaleway API client
#[derive(Debug, Clone)]
pub struct ScalewayClient {
    http: HttpClient,
    default_zone: String,
}

impl ScalewayClient {
    /// Create a new Scaleway client
    ///
    /// # Arguments
    /// * `base_url` - API base URL (e.g., "https://api.scaleway.com")
    /// * `secret_key` - API secret key, sent as `X-Auth-Token`
    /// * `default_zone` - Zone used when a caller passes an empty zone
    pub fn new(base_url: String, secret_key: String, default_zone: String) -> Result<Self, ScalewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ScalewayError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, secret_key),
            default_zone,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    fn zone<'a>(&'a self, zone: &'a str) -> &'a str {
        if zone.is_empty() { &self.default_zone } else { zone }
    }

    fn servers_path(&self, zone: &str) -> String {
        format!("/instance/v1/zones/{}/servers", self.zone(zone))
    }

    fn private_nics_path(&self, zone: &str, server_id: &str) -> String {
        format!("{}/{}/private_nics", self.servers_path(zone), server_id)
    }
}

#[async_trait::async_trait]
impl CloudClientTrait for ScalewayClient {
    fn default_zone(&self) -> &str {
        &self.default_zone
    }

    async fn validate_credentials(&self) -> Result<(), ScalewayError> {
        debug!("Validating Scaleway credentials");
        let path = format!("{}?per_page=1", self.servers_path(""));
        let _: ListServersResponse = self.http.get(&path).await?;
        debug!("Credentials validated successfully");
        Ok(())
    }

    async fn get_private_network(&self, zone: &str, id: &str) -> Result<PrivateNetwork, ScalewayError> {
        let path = format!("/vpc/v1/zones/{}/private-networks/{}", self.zone(zone), id);
        debug!("Fetching private network {} from Scaleway", id);
        self.http.get(&path).await
    }

    async fn get_server(&self, zone: &str, id: &str) -> Result<Server, ScalewayError> {
        let path = format!("{}/{}", self.servers_path(zone), id);
        debug!("Fetching server {} from Scaleway", id);
        let response: ServerResponse = self.http.get(&path).await?;
        Ok(response.server)
    }

    async fn list_servers(&self, zone: &str, name: &str) -> Result<Vec<Server>, ScalewayError> {
        let mut servers = Vec::new();
        let mut page: u64 = 1;

        loop {
            let page_str = page.to_string();
            let per_page = SERVERS_PER_PAGE.to_string();
            let query = self.http.build_query_string(&[
                ("name", name),
                ("page", &page_str),
                ("per_page", &per_page),
            ]);
            let path = format!("{}?{}", self.servers_path(zone), query);

            let (response, total): (ListServersResponse, Option<u64>) =
                self.http.get_with_total(&path).await?;
            let fetched = response.servers.len() as u64;
            servers.extend(response.servers);

            let done = match total {
                Some(total) => servers.len() as u64 >= total,
                None => fetched < SERVERS_PER_PAGE,
            };
            if done || fetched == 0 {
                break;
            }
            page += 1;
        }

        // The API filter is a substring match; keep exact names only
        if !name.is_empty() {
            servers.retain(|s| s.name == name);
        }
        debug!("Found {} servers named {:?} in zone {}", servers.len(), name, self.zone(zone));
        Ok(servers)
    }

    async fn list_private_nics(&self, zone: &str, server_id: &str) -> Result<Vec<PrivateNic>, ScalewayError> {
        let response: ListPrivateNicsResponse =
            self.http.get(&self.private_nics_path(zone, server_id)).await?;
        Ok(response.private_nics)
    }

    async fn create_private_nic(
        &self,
        zone: &str,
        server_id: &str,
        private_network_id: &str,
    ) -> Result<PrivateNic, ScalewayError> {
        let body = serde_json::json!({ "private_network_id": private_network_id });
        let response: PrivateNicResponse = self
            .http
            .post(&self.private_nics_path(zone, server_id), &body)
            .await?;
        info!(
            "Created private NIC {} on server {} for private network {}",
            response.private_nic.id, server_id, private_network_id
        );
        Ok(response.private_nic)
    }

    async fn delete_private_nic(&self, zone: &str, server_id: &str, nic_id: &str) -> Result<(), ScalewayError> {
        let path = format!("{}/{}", self.private_nics_path(zone, server_id), nic_id);
        match self.http.delete(&path).await {
            Ok(()) => {
                info!("Deleted private NIC {} from server {}", nic_id, server_id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("Private NIC {} already gone from server {}", nic_id, server_id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
