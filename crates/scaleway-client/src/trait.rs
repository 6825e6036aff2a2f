//! CloudClient trait for mocking
//!
//! This trait abstracts the ScalewayClient to enable mocking in unit tests.
//! The concrete ScalewayClient implements this trait, and tests can use mock implementations.

use crate::error::ScalewayError;
use crate::models::*;

/// Trait for the cloud network operations used by the controller
///
/// An empty `zone` means "the client's default zone".
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait CloudClientTrait: Send + Sync {
    /// Zone used when the caller passes an empty zone
    fn default_zone(&self) -> &str;

    /// Validate the credentials with a cheap authenticated request
    async fn validate_credentials(&self) -> Result<(), ScalewayError>;

    // VPC Operations
    async fn get_private_network(&self, zone: &str, id: &str) -> Result<PrivateNetwork, ScalewayError>;

    // Instance Operations
    async fn get_server(&self, zone: &str, id: &str) -> Result<Server, ScalewayError>;
    async fn list_servers(&self, zone: &str, name: &str) -> Result<Vec<Server>, ScalewayError>;
    async fn list_private_nics(&self, zone: &str, server_id: &str) -> Result<Vec<PrivateNic>, ScalewayError>;
    async fn create_private_nic(&self, zone: &str, server_id: &str, private_network_id: &str) -> Result<PrivateNic, ScalewayError>;
    /// Detach a private NIC. A NIC that is already gone is not an error.
    async fn delete_private_nic(&self, zone: &str, server_id: &str, nic_id: &str) -> Result<(), ScalewayError>;
}
