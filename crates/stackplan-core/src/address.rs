//! IPv4 address and CIDR helpers.
//!
//! All predicates here are total: malformed input yields `false` or a
//! negative sentinel, never a panic or an error. Octets are one to three
//! decimal digits with a value of at most 255, so `010.001.000.001` is
//! accepted while `256.0.0.1` and `1.2.3` are not.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Error, Result};

/// Sentinel returned by [`SubnetMembership::code`] when the address is malformed.
pub const INVALID_IP_CODE: i64 = -1;
/// Sentinel returned by [`SubnetMembership::code`] when the CIDR is malformed.
pub const INVALID_CIDR_CODE: i64 = -2;
/// Sentinel returned by [`SubnetMembership::code`] when the address is outside the subnet.
pub const OUTSIDE_SUBNET_CODE: i64 = -3;

fn parse_octets(input: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = input.split('.');

    for octet in &mut octets {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse::<u8>().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }

    Some(octets)
}

fn parse_prefix_len(input: &str) -> Option<u8> {
    let well_formed = match input.as_bytes() {
        [digit] => digit.is_ascii_digit(),
        [tens, units] => matches!(tens, b'1'..=b'3') && units.is_ascii_digit(),
        _ => false,
    };
    if !well_formed {
        return None;
    }
    input.parse::<u8>().ok().filter(|len| *len <= 32)
}

/// Parses a dotted-quad IPv4 address, returning `None` when malformed.
#[must_use]
pub fn parse_ipv4(input: &str) -> Option<Ipv4Addr> {
    parse_octets(input).map(Ipv4Addr::from)
}

/// Parses a dotted-quad IPv4 address.
///
/// # Errors
///
/// Returns [`Error::InvalidIpAddress`] if `input` is malformed.
pub fn parse_ipv4_address(input: &str) -> Result<Ipv4Addr> {
    parse_ipv4(input).ok_or_else(|| Error::InvalidIpAddress(input.to_string()))
}

/// Returns true if `input` is four octets in `0..=255` joined by dots.
#[must_use]
pub fn is_valid_ip_address(input: &str) -> bool {
    parse_octets(input).is_some()
}

/// Returns true if `input` has the form `A.B.C.D/N` with valid octets and `N` in `0..=32`.
///
/// Host bits are not required to be zero.
#[must_use]
pub fn is_valid_cidr(input: &str) -> bool {
    input.parse::<Ipv4Cidr>().is_ok()
}

/// An IPv4 address paired with a prefix length.
///
/// Unlike a strict network type, the address may carry host bits
/// (`10.0.0.5/24` is accepted as-is).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Cidr {
    /// Creates a CIDR from an address and prefix length.
    ///
    /// # Errors
    ///
    /// Returns an error if `prefix_len` is greater than 32.
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            return Err(Error::InvalidCidr(format!("{address}/{prefix_len}")));
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }

    /// Address portion as written.
    #[must_use]
    pub const fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Prefix length in bits.
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Network mask as a 32-bit integer.
    #[must_use]
    pub const fn netmask(&self) -> u32 {
        if self.prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix_len as u32)
        }
    }

    /// Address with the host bits cleared.
    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & self.netmask())
    }

    /// Returns true if `ip` shares the network portion of this CIDR.
    #[must_use]
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let mask = self.netmask();
        u32::from(ip) & mask == u32::from(self.address) & mask
    }

    /// Leading octets used as an allocation base: two for `/16`, three otherwise.
    #[must_use]
    pub fn base_prefix(&self) -> String {
        let octets = self.address.octets();
        if self.prefix_len == 16 {
            format!("{}.{}", octets[0], octets[1])
        } else {
            format!("{}.{}.{}", octets[0], octets[1], octets[2])
        }
    }
}

impl FromStr for Ipv4Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidCidr(s.to_string());
        let (address, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let address = parse_ipv4(address).ok_or_else(invalid)?;
        let prefix_len = parse_prefix_len(prefix).ok_or_else(invalid)?;
        Ok(Self {
            address,
            prefix_len,
        })
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// Outcome of testing an address against a CIDR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubnetMembership {
    /// Address lies inside the subnet; carries its 32-bit value.
    Member(u32),
    /// Address string is malformed.
    InvalidIp,
    /// CIDR string is malformed.
    InvalidCidr,
    /// Address is well formed but outside the subnet.
    OutsideSubnet,
}

impl SubnetMembership {
    /// Returns true for [`SubnetMembership::Member`].
    #[must_use]
    pub const fn is_member(&self) -> bool {
        matches!(self, Self::Member(_))
    }

    /// Numeric value of a member address.
    #[must_use]
    pub const fn value(&self) -> Option<u32> {
        match self {
            Self::Member(value) => Some(*value),
            _ => None,
        }
    }

    /// Address value for members, or a negative sentinel (`-1`, `-2`, `-3`).
    ///
    /// `0.0.0.0` maps to `0`, so sentinels never collide with an address.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Member(value) => *value as i64,
            Self::InvalidIp => INVALID_IP_CODE,
            Self::InvalidCidr => INVALID_CIDR_CODE,
            Self::OutsideSubnet => OUTSIDE_SUBNET_CODE,
        }
    }

    /// `(code, is_member)` pair.
    #[must_use]
    pub const fn as_tuple(&self) -> (i64, bool) {
        (self.code(), self.is_member())
    }
}

/// Tests whether `ip` lies in `cidr`.
///
/// The address is checked first, so a malformed address paired with a
/// malformed CIDR reports [`SubnetMembership::InvalidIp`].
#[must_use]
pub fn check_ip_in_subnet(ip: &str, cidr: &str) -> SubnetMembership {
    let address = match parse_ipv4_address(ip) {
        Ok(address) => address,
        Err(err) => {
            debug!(ip, cidr, %err, "subnet check skipped");
            return SubnetMembership::InvalidIp;
        }
    };
    let subnet = match cidr.parse::<Ipv4Cidr>() {
        Ok(subnet) => subnet,
        Err(err) => {
            debug!(ip, cidr, %err, "subnet check skipped");
            return SubnetMembership::InvalidCidr;
        }
    };

    if subnet.contains(address) {
        SubnetMembership::Member(u32::from(address))
    } else {
        SubnetMembership::OutsideSubnet
    }
}

/// Leading octets of a CIDR string used as an allocation base.
///
/// Two octets for `/16`, three for anything else. Malformed input yields
/// whatever leading dotted components are present.
#[must_use]
pub fn base_ip_from_cidr(cidr: &str) -> String {
    if let Ok(parsed) = cidr.parse::<Ipv4Cidr>() {
        return parsed.base_prefix();
    }

    let (address, prefix) = cidr.split_once('/').unwrap_or((cidr, ""));
    let keep = if prefix == "16" { 2 } else { 3 };
    address.split('.').take(keep).collect::<Vec<_>>().join(".")
}
