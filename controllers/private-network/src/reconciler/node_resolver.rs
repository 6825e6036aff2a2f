//! Node to cloud server resolution
//!
//! A node's `spec.providerID` looks like `scaleway://instance/fr-par-1/<uuid>`
//! (or the legacy `scaleway://<uuid>`). When it carries a valid server ID the
//! server is fetched directly; otherwise, or when that lookup fails, the server
//! is found by name, which must match exactly one server.

use super::Reconciler;
use crate::error::ControllerError;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use regex::Regex;
use scaleway_client::Server;
use tracing::{debug, warn};

/// Location parsed out of a node's provider ID
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderLocation {
    /// Zone from the long form, empty for the legacy form
    pub zone: String,
    /// Server ID, when the ID part is a valid UUID
    pub server_id: Option<String>,
}

/// Parse a provider ID with `pattern`.
///
/// Returns `None` when the pattern does not match at all. A match whose ID part
/// is empty or not a UUID yields `server_id: None`, which sends resolution to
/// the name-based fallback.
pub fn parse_provider_id(pattern: &Regex, provider_id: &str) -> Option<ProviderLocation> {
    let caps = pattern.captures(provider_id)?;
    let zone = caps
        .name("zone")
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let raw_id = ["uuid", "uuid2"]
        .iter()
        .filter_map(|group| caps.name(group))
        .map(|m| m.as_str())
        .find(|id| !id.is_empty());
    let server_id = raw_id
        .filter(|id| uuid::Uuid::parse_str(id).is_ok())
        .map(str::to_string);

    Some(ProviderLocation { zone, server_id })
}

impl Reconciler {
    /// Map a cluster node to its cloud server
    pub(crate) async fn resolve_node(&self, node: &Node) -> Result<Server, ControllerError> {
        let node_name = node.name_any();
        let provider_id = node
            .spec
            .as_ref()
            .and_then(|spec| spec.provider_id.as_deref())
            .unwrap_or_default();
        let location = parse_provider_id(&self.provider_id_pattern, provider_id).unwrap_or_default();

        if let Some(server_id) = &location.server_id {
            match self.cloud.get_server(&location.zone, server_id).await {
                Ok(server) => {
                    debug!("Node {} resolved to server {} by provider ID", node_name, server.id);
                    return Ok(server);
                }
                Err(e) => warn!(
                    "Failed to get server {} for node {}, falling back to name lookup: {}",
                    server_id, node_name, e
                ),
            }
        }

        let mut servers = self.cloud.list_servers(&location.zone, &node_name).await?;
        if servers.len() != 1 {
            return Err(ControllerError::ServerResolution {
                count: servers.len(),
                name: node_name,
            });
        }
        let server = servers.remove(0);
        debug!("Node {} resolved to server {} by name", node_name, server.id);
        Ok(server)
    }
}
