//! Prefix model

use crate::error::IpamError;
use ipnetwork::IpNetwork;
use std::collections::BTreeSet;
use std::net::IpAddr;

/// A CIDR block and the addresses currently allocated from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    /// CIDR string as given by the caller, used as the pool key
    pub cidr: String,
    /// Parsed network
    pub network: IpNetwork,
    /// Allocated addresses
    pub used: BTreeSet<IpAddr>,
}

impl Prefix {
    /// Parse `cidr` into an empty prefix
    pub fn parse(cidr: &str) -> Result<Self, IpamError> {
        let network: IpNetwork = cidr.parse().map_err(|e: ipnetwork::IpNetworkError| {
            IpamError::InvalidCidr {
                cidr: cidr.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            cidr: cidr.to_string(),
            network,
            used: BTreeSet::new(),
        })
    }

    /// Prefix length of the network
    pub fn prefix_len(&self) -> u8 {
        self.network.prefix()
    }

    /// Render `ip` with this prefix's length, e.g. "10.0.0.2/24"
    pub fn with_suffix(&self, ip: IpAddr) -> String {
        format!("{}/{}", ip, self.prefix_len())
    }

    /// True if `ip` may be handed out: inside the network and not the
    /// network or broadcast address of an IPv4 block larger than /31
    pub fn is_assignable(&self, ip: IpAddr) -> bool {
        if !self.network.contains(ip) {
            return false;
        }
        match self.network {
            IpNetwork::V4(net) if net.prefix() < 31 => {
                IpAddr::V4(net.network()) != ip && IpAddr::V4(net.broadcast()) != ip
            }
            IpNetwork::V6(net) if net.prefix() < 127 => IpAddr::V6(net.network()) != ip,
            _ => true,
        }
    }

    /// Number of addresses that can still be allocated from the whole block
    pub fn available(&self) -> u128 {
        let total: u128 = match self.network {
            IpNetwork::V4(net) if net.prefix() < 31 => u128::from(net.size()).saturating_sub(2),
            IpNetwork::V4(net) => u128::from(net.size()),
            IpNetwork::V6(net) if net.prefix() < 127 => net.size().saturating_sub(1),
            IpNetwork::V6(net) => net.size(),
        };
        total.saturating_sub(self.used.len() as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Prefix::parse("10.0.0.0/33").unwrap_err();
        assert!(matches!(err, IpamError::InvalidCidr { .. }));
    }

    #[test]
    fn test_network_and_broadcast_not_assignable() {
        let prefix = Prefix::parse("10.0.0.0/24").unwrap();
        assert!(!prefix.is_assignable("10.0.0.0".parse().unwrap()));
        assert!(!prefix.is_assignable("10.0.0.255".parse().unwrap()));
        assert!(prefix.is_assignable("10.0.0.1".parse().unwrap()));
        assert!(!prefix.is_assignable("10.0.1.1".parse().unwrap()));
    }

    #[test]
    fn test_point_to_point_block_uses_both_addresses() {
        let prefix = Prefix::parse("10.0.0.0/31").unwrap();
        assert!(prefix.is_assignable("10.0.0.0".parse().unwrap()));
        assert!(prefix.is_assignable("10.0.0.1".parse().unwrap()));
        assert_eq!(prefix.available(), 2);
    }

    #[test]
    fn test_with_suffix() {
        let prefix = Prefix::parse("192.168.4.0/22").unwrap();
        assert_eq!(prefix.with_suffix("192.168.5.7".parse().unwrap()), "192.168.5.7/22");
        assert_eq!(prefix.available(), 1022);
    }
}
