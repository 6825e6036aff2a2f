//! Address pool errors

use thiserror::Error;

/// Errors that can occur when using the address pool
#[derive(Debug, Error)]
pub enum IpamError {
    /// Prefix or address is not known to the pool
    #[error("Not found: {0}")]
    NotFound(String),

    /// CIDR string could not be parsed
    #[error("Invalid CIDR {cidr}: {reason}")]
    InvalidCidr {
        /// Offending CIDR
        cidr: String,
        /// Parser message
        reason: String,
    },

    /// Address range string could not be parsed
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Address is not part of the prefix
    #[error("Address {ip} is outside prefix {cidr}")]
    OutOfRange {
        /// Prefix CIDR
        cidr: String,
        /// Offending address
        ip: String,
    },

    /// No free address left
    #[error("No free address left in prefix {0}")]
    Exhausted(String),
}

impl IpamError {
    /// True for errors that mean "already gone"
    pub fn is_not_found(&self) -> bool {
        matches!(self, IpamError::NotFound(_))
    }
}
