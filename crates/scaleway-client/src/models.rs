//! Scaleway API models
//!
//! Only the fields the controller reads are modelled; unknown fields are ignored.
//! See: https://www.scaleway.com/en/developers/api/instance/

use serde::{Deserialize, Serialize};

/// Instance server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub zone: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub private_nics: Vec<PrivateNic>,
}

/// Attachment of a server to a private network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateNic {
    pub id: String,
    pub server_id: String,
    pub private_network_id: String,
    pub mac_address: String,
    #[serde(default)]
    pub state: String,
}

/// VPC private network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateNetwork {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub subnets: Vec<String>,
}

/// `GET /servers/{id}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ServerResponse {
    pub server: Server,
}

/// `GET /servers` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ListServersResponse {
    #[serde(default)]
    pub servers: Vec<Server>,
}

/// `GET /servers/{id}/private_nics` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ListPrivateNicsResponse {
    #[serde(default)]
    pub private_nics: Vec<PrivateNic>,
}

/// `POST /servers/{id}/private_nics` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct PrivateNicResponse {
    pub private_nic: PrivateNic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_response_ignores_unknown_fields() {
        let body = serde_json::json!({
            "server": {
                "id": "11111111-1111-1111-1111-111111111111",
                "name": "node-1",
                "zone": "fr-par-1",
                "state": "running",
                "commercial_type": "DEV1-S",
                "private_nics": [{
                    "id": "nic-1",
                    "server_id": "11111111-1111-1111-1111-111111111111",
                    "private_network_id": "pn-1",
                    "mac_address": "02:00:00:00:00:01",
                    "state": "available"
                }]
            }
        });
        let resp: ServerResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.server.private_nics.len(), 1);
        assert_eq!(resp.server.private_nics[0].private_network_id, "pn-1");
    }

    #[test]
    fn test_list_servers_defaults_to_empty() {
        let resp: ListServersResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(resp.servers.is_empty());
    }
}
