//! IP address pool
//!
//! Hands out addresses from named CIDR blocks ("prefixes"). Prefixes are keyed
//! by their CIDR string and (re-)created idempotently, so callers can call
//! [`IpamClientTrait::ensure_prefix`] on every reconciliation pass.
//!
//! # Example
//!
//! ```no_run
//! use ipam_client::{IpamClientTrait, MemoryIpam};
//!
//! # async fn example() -> Result<(), ipam_client::IpamError> {
//! let ipam = MemoryIpam::new();
//! let prefix = ipam.ensure_prefix("10.0.0.0/24").await?;
//! let ip = ipam.acquire_ip(&prefix.cidr, &[]).await?;
//! assert_eq!(prefix.with_suffix(ip), "10.0.0.1/24");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod prefix;
pub mod range;
#[path = "trait.rs"]
pub mod ipam_trait;

pub use error::IpamError;
pub use ipam_trait::IpamClientTrait;
pub use memory::MemoryIpam;
pub use prefix::Prefix;
pub use range::AddressRange;
