//! Address pool trait for mocking
//!
//! The controller only talks to the pool through this trait so tests and
//! alternative backends can be swapped in.

use crate::error::IpamError;
use crate::prefix::Prefix;
use std::net::IpAddr;

/// Address pool operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait IpamClientTrait: Send + Sync {
    /// Create the prefix if it does not exist yet and return its current view
    async fn ensure_prefix(&self, cidr: &str) -> Result<Prefix, IpamError>;

    /// Get the current view of a prefix
    async fn get_prefix(&self, cidr: &str) -> Result<Prefix, IpamError>;

    /// Allocate the lowest free address, restricted to `ranges` when not empty
    async fn acquire_ip(&self, cidr: &str, ranges: &[String]) -> Result<IpAddr, IpamError>;

    /// Mark a specific address as used. Claiming an address twice is not an error.
    async fn claim_ip(&self, cidr: &str, ip: IpAddr) -> Result<(), IpamError>;

    /// Return an address to the pool
    async fn release_ip(&self, cidr: &str, ip: IpAddr) -> Result<(), IpamError>;

    /// Drop the prefix and every allocation in it
    async fn delete_prefix(&self, cidr: &str) -> Result<Prefix, IpamError>;
}
