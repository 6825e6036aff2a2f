//! Scaleway REST API Client
//!
//! A small client for the parts of the Scaleway Instance and VPC APIs the
//! private network controller needs: servers, their private NICs, and
//! private networks.
//!
//! # Example
//!
//! ```no_run
//! use scaleway_client::{CloudClientTrait, ScalewayClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ScalewayClient::new(
//!     "https://api.scaleway.com".to_string(),
//!     "secret-key".to_string(),
//!     "fr-par-1".to_string(),
//! )?;
//!
//! // Find the server backing a node and attach it to a private network
//! let servers = client.list_servers("", "node-1").await?;
//! let nic = client
//!     .create_private_nic(&servers[0].zone, &servers[0].id, "pn-uuid")
//!     .await?;
//! println!("attached with MAC {}", nic.mac_address);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod cloud_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::ScalewayClient;
pub use common::HttpClient;
pub use error::ScalewayError;
pub use models::*;
pub use cloud_trait::CloudClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockScalewayClient;
