//! Address ranges used to restrict allocation inside a prefix

use crate::error::IpamError;
use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Inclusive address range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    /// First address
    pub start: IpAddr,
    /// Last address
    pub end: IpAddr,
}

impl AddressRange {
    /// Parse "10.0.0.10-10.0.0.20", a CIDR, or a single address
    pub fn parse(raw: &str) -> Result<Self, IpamError> {
        let raw = raw.trim();
        if let Some((start, end)) = raw.split_once('-') {
            let start: IpAddr = start
                .trim()
                .parse()
                .map_err(|_| IpamError::InvalidRange(raw.to_string()))?;
            let end: IpAddr = end
                .trim()
                .parse()
                .map_err(|_| IpamError::InvalidRange(raw.to_string()))?;
            if start.is_ipv4() != end.is_ipv4() || to_u128(start) > to_u128(end) {
                return Err(IpamError::InvalidRange(raw.to_string()));
            }
            return Ok(Self { start, end });
        }
        if raw.contains('/') {
            let net: IpNetwork = raw
                .parse()
                .map_err(|_| IpamError::InvalidRange(raw.to_string()))?;
            return Ok(Self::from_network(net));
        }
        let ip: IpAddr = raw
            .parse()
            .map_err(|_| IpamError::InvalidRange(raw.to_string()))?;
        Ok(Self { start: ip, end: ip })
    }

    /// Range spanning every address of `net`
    pub fn from_network(net: IpNetwork) -> Self {
        match net {
            IpNetwork::V4(n) => Self {
                start: IpAddr::V4(n.network()),
                end: IpAddr::V4(n.broadcast()),
            },
            IpNetwork::V6(n) => {
                let start = u128::from(n.network());
                let host_bits = 128 - u32::from(n.prefix());
                let end = if host_bits >= 128 {
                    u128::MAX
                } else {
                    start | ((1u128 << host_bits) - 1)
                };
                Self {
                    start: IpAddr::V6(n.network()),
                    end: IpAddr::V6(Ipv6Addr::from(end)),
                }
            }
        }
    }

    /// True if `ip` falls in the range
    pub fn contains(&self, ip: IpAddr) -> bool {
        ip.is_ipv4() == self.start.is_ipv4()
            && to_u128(self.start) <= to_u128(ip)
            && to_u128(ip) <= to_u128(self.end)
    }

    /// Iterate over every address of the range in ascending order
    pub fn iter(&self) -> impl Iterator<Item = IpAddr> {
        let v4 = self.start.is_ipv4();
        (to_u128(self.start)..=to_u128(self.end)).map(move |n| from_u128(n, v4))
    }
}

fn to_u128(ip: IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

fn from_u128(n: u128, v4: bool) -> IpAddr {
    if v4 {
        // Ranges are built from IPv4 bounds, so `n` always fits
        IpAddr::V4(Ipv4Addr::from(u32::try_from(n).unwrap_or(u32::MAX)))
    } else {
        IpAddr::V6(Ipv6Addr::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dash_range() {
        let range = AddressRange::parse("10.0.0.10 - 10.0.0.12").unwrap();
        let all: Vec<IpAddr> = range.iter().collect();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], "10.0.0.10".parse::<IpAddr>().unwrap());
        assert!(range.contains("10.0.0.11".parse().unwrap()));
        assert!(!range.contains("10.0.0.13".parse().unwrap()));
    }

    #[test]
    fn test_parse_cidr_range() {
        let range = AddressRange::parse("10.0.0.16/30").unwrap();
        assert_eq!(range.start, "10.0.0.16".parse::<IpAddr>().unwrap());
        assert_eq!(range.end, "10.0.0.19".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_parse_rejects_reversed_and_mixed() {
        assert!(AddressRange::parse("10.0.0.20-10.0.0.10").is_err());
        assert!(AddressRange::parse("10.0.0.1-fd00::1").is_err());
        assert!(AddressRange::parse("not-an-ip").is_err());
    }

    #[test]
    fn test_v6_range_from_network() {
        let range = AddressRange::parse("fd00::/126").unwrap();
        assert_eq!(range.end, "fd00::3".parse::<IpAddr>().unwrap());
        assert!(!range.contains("10.0.0.1".parse().unwrap()));
    }
}
