//! VPC Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the private network controller.

pub mod finalizers;
pub mod network_interface;
pub mod private_network;

pub use finalizers::*;
pub use network_interface::*;
pub use private_network::*;

/// Label carrying the owning PrivateNetwork name on every NetworkInterface
pub const PRIVATE_NETWORK_LABEL: &str = "private-network";

/// Label carrying the node name on every NetworkInterface
pub const NODE_LABEL: &str = "node";
