//! Controller-specific error types.
//!
//! This module defines error types specific to the private network controller
//! that are not covered by upstream library errors.

use ipam_client::IpamError;
use kube::Error as KubeError;
use scaleway_client::ScalewayError;
use thiserror::Error;

/// Errors that can occur in the private network controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error (includes resourceVersion conflicts)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Scaleway API error
    #[error("Scaleway error: {0}")]
    Cloud(#[from] ScalewayError),

    /// Address pool error
    #[error("IPAM error: {0}")]
    Ipam(#[from] IpamError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// PrivateNetwork spec rejected before any side effect
    #[error("Invalid PrivateNetwork spec: {0}")]
    InvalidSpec(String),

    /// Name-based server lookup did not match exactly one server
    #[error("found {count} servers with name {name} instead of 1")]
    ServerResolution {
        /// Number of servers returned by the lookup
        count: usize,
        /// Node name used as the server name filter
        name: String,
    },

    /// More than one NetworkInterface exists for a (PrivateNetwork, Node) pair
    #[error("node {node} has {count} networkInterfaces instead of at most one")]
    DuplicateInterfaces {
        /// Node name
        node: String,
        /// Number of NetworkInterface objects found
        count: usize,
    },

    /// Object is missing a field the controller relies on
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Invariant violations stop the pass with a fixed-delay reschedule instead of backoff
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            ControllerError::ServerResolution { .. } | ControllerError::DuplicateInterfaces { .. }
        )
    }

    /// True when the Kubernetes API answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, ControllerError::Kube(KubeError::Api(ae)) if ae.code == 404)
    }

    /// True when the Kubernetes API answered with a 4xx, so the request was not applied.
    ///
    /// Transport failures and 5xx answers leave it unknown whether a write landed.
    pub fn is_rejected(&self) -> bool {
        matches!(self, ControllerError::Kube(KubeError::Api(ae)) if (400..500).contains(&ae.code))
    }
}
