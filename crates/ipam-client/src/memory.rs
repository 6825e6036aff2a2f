//! In-memory address pool
//!
//! Keeps every prefix in a process-local map. State is lost on restart; the
//! controller re-seeds it from the addresses recorded on existing
//! NetworkInterface objects before it starts reconciling.

use crate::error::IpamError;
use crate::ipam_trait::IpamClientTrait;
use crate::prefix::Prefix;
use crate::range::AddressRange;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// In-memory address pool
#[derive(Debug, Clone, Default)]
pub struct MemoryIpam {
    prefixes: Arc<Mutex<HashMap<String, Prefix>>>,
}

impl MemoryIpam {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of prefixes currently held
    pub fn prefix_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Prefix>> {
        // A poisoned map is still structurally valid
        self.prefixes.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Pick the lowest assignable, unused address of `prefix` inside `ranges`
fn next_free(prefix: &Prefix, ranges: &[AddressRange]) -> Option<IpAddr> {
    ranges
        .iter()
        .flat_map(AddressRange::iter)
        .find(|ip| prefix.is_assignable(*ip) && !prefix.used.contains(ip))
}

#[async_trait::async_trait]
impl IpamClientTrait for MemoryIpam {
    async fn ensure_prefix(&self, cidr: &str) -> Result<Prefix, IpamError> {
        let mut prefixes = self.lock();
        if let Some(existing) = prefixes.get(cidr) {
            return Ok(existing.clone());
        }
        let prefix = Prefix::parse(cidr)?;
        debug!(cidr, "created prefix");
        prefixes.insert(cidr.to_string(), prefix.clone());
        Ok(prefix)
    }

    async fn get_prefix(&self, cidr: &str) -> Result<Prefix, IpamError> {
        self.lock()
            .get(cidr)
            .cloned()
            .ok_or_else(|| IpamError::NotFound(format!("prefix {}", cidr)))
    }

    async fn acquire_ip(&self, cidr: &str, ranges: &[String]) -> Result<IpAddr, IpamError> {
        let mut prefixes = self.lock();
        let prefix = prefixes
            .get_mut(cidr)
            .ok_or_else(|| IpamError::NotFound(format!("prefix {}", cidr)))?;

        let ranges = if ranges.is_empty() {
            vec![AddressRange::from_network(prefix.network)]
        } else {
            ranges
                .iter()
                .map(|r| AddressRange::parse(r))
                .collect::<Result<Vec<_>, _>>()?
        };

        let ip = next_free(prefix, &ranges).ok_or_else(|| IpamError::Exhausted(cidr.to_string()))?;
        prefix.used.insert(ip);
        debug!(cidr, %ip, "acquired address");
        Ok(ip)
    }

    async fn claim_ip(&self, cidr: &str, ip: IpAddr) -> Result<(), IpamError> {
        let mut prefixes = self.lock();
        let prefix = prefixes
            .get_mut(cidr)
            .ok_or_else(|| IpamError::NotFound(format!("prefix {}", cidr)))?;
        if !prefix.network.contains(ip) {
            return Err(IpamError::OutOfRange {
                cidr: cidr.to_string(),
                ip: ip.to_string(),
            });
        }
        prefix.used.insert(ip);
        Ok(())
    }

    async fn release_ip(&self, cidr: &str, ip: IpAddr) -> Result<(), IpamError> {
        let mut prefixes = self.lock();
        let prefix = prefixes
            .get_mut(cidr)
            .ok_or_else(|| IpamError::NotFound(format!("prefix {}", cidr)))?;
        if !prefix.used.remove(&ip) {
            return Err(IpamError::NotFound(format!("address {} in prefix {}", ip, cidr)));
        }
        debug!(cidr, %ip, "released address");
        Ok(())
    }

    async fn delete_prefix(&self, cidr: &str) -> Result<Prefix, IpamError> {
        self.lock()
            .remove(cidr)
            .ok_or_else(|| IpamError::NotFound(format!("prefix {}", cidr)))
    }
}
