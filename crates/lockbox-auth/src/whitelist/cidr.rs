//! CIDR whitelist parsing and matching for IPv4 and IPv6.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::entries;

/// A network block: an address plus prefix length.
///
/// A bare address parses as a single-host block (`/32` or `/128`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpNet {
    addr: IpAddr,
    prefix: u8,
}

/// Error returned when a whitelist entry is not an address or CIDR block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidNet(pub String);

impl fmt::Display for InvalidNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid IP or CIDR block: {}", self.0)
    }
}

impl std::error::Error for InvalidNet {}

impl IpNet {
    /// Prefix length of this block.
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Network address as written.
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Whether `ip` falls inside this block.
    ///
    /// IPv4-mapped IPv6 addresses are compared as IPv4. Families never match
    /// each other otherwise.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, normalize(ip)) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for IpNet {
    type Err = InvalidNet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidNet(s.to_string());
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };

        let addr = normalize(IpAddr::from_str(addr).map_err(|_| invalid())?);
        let max = if addr.is_ipv4() { 32 } else { 128 };
        let prefix = match prefix {
            Some(p) if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => {
                p.parse::<u8>().map_err(|_| invalid())?
            }
            Some(_) => return Err(invalid()),
            None => max,
        };
        if prefix > max {
            return Err(invalid());
        }

        Ok(Self { addr, prefix })
    }
}

impl fmt::Display for IpNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

fn normalize(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

fn mask_u32(prefix: u8) -> u32 {
    if prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix)) }
}

fn mask_u128(prefix: u8) -> u128 {
    if prefix == 0 { 0 } else { u128::MAX << (128 - u32::from(prefix)) }
}

/// Whether every comma-separated entry is a valid address or CIDR block.
///
/// The empty list is valid and means "no restriction".
pub fn validate_cidr_list(text: &str) -> bool {
    entries(text).all(|entry| entry.parse::<IpNet>().is_ok())
}

/// Whether `ip` falls in any block of the list.
///
/// An unparsable `ip` never matches, and neither does an empty list; callers
/// decide whether an empty whitelist means unrestricted.
pub fn check_ip_whitelist(text: &str, ip: &str) -> bool {
    let Ok(ip) = IpAddr::from_str(ip.trim()) else {
        return false;
    };
    entries(text)
        .filter_map(|entry| entry.parse::<IpNet>().ok())
        .any(|net| net.contains(ip))
}
