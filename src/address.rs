use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
};
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Ipv4,
    Ipv6,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {family:?} address: {text}")]
pub struct AddressError {
    pub text: String,
    pub family: Family,
}

/// An IPv4 or IPv6 socket endpoint.
///
/// Renders as `ip:port` without brackets, so `::1` port 1 becomes `::1:1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InetAddress {
    addr: SocketAddr,
}

impl InetAddress {
    /// Wildcard (or loopback) address of the given family.
    pub fn new(port: u16, family: Family, loopback_only: bool) -> Self {
        let ip = match (family, loopback_only) {
            (Family::Ipv4, false) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            (Family::Ipv4, true) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            (Family::Ipv6, false) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            (Family::Ipv6, true) => IpAddr::V6(Ipv6Addr::LOCALHOST),
        };
        InetAddress {
            addr: SocketAddr::new(ip, port),
        }
    }

    pub fn from_ip(text: &str, port: u16, family: Family) -> Result<Self, AddressError> {
        let invalid = || AddressError {
            text: text.to_string(),
            family,
        };
        let ip = match family {
            Family::Ipv4 => IpAddr::V4(text.parse::<Ipv4Addr>().map_err(|_| invalid())?),
            Family::Ipv6 => IpAddr::V6(text.parse::<Ipv6Addr>().map_err(|_| invalid())?),
        };
        Ok(InetAddress {
            addr: SocketAddr::new(ip, port),
        })
    }

    /// Builds an IPv4 endpoint from wire bytes (address and port in network order).
    pub fn from_v4(octets: [u8; 4], port: [u8; 2]) -> Self {
        InetAddress {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::from(octets)), u16::from_be_bytes(port)),
        }
    }

    /// Builds an IPv6 endpoint from wire bytes (address and port in network order).
    pub fn from_v6(octets: [u8; 16], port: [u8; 2]) -> Self {
        InetAddress {
            addr: SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), u16::from_be_bytes(port)),
        }
    }

    pub fn family(&self) -> Family {
        match self.addr {
            SocketAddr::V4(_) => Family::Ipv4,
            SocketAddr::V6(_) => Family::Ipv6,
        }
    }

    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn to_addr(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn to_addr_port(&self) -> String {
        format!("{}:{}", self.addr.ip(), self.addr.port())
    }
}

impl From<SocketAddr> for InetAddress {
    fn from(addr: SocketAddr) -> Self {
        InetAddress { addr }
    }
}

impl fmt::Display for InetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr.ip(), self.addr.port())
    }
}
