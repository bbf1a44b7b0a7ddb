//! IPv4 range arithmetic and the address forms entries match on.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::Ipv4Network;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, SetElement};

/// The lowest non-zero bit of a byte.
///
/// e.g. `lowbit(0b1110_0100) == 0b0000_0100`
fn lowbit(x: u8) -> u8 {
    x & (x ^ x.wrapping_sub(1))
}

/// Last address covered by `ip` under `mask`: all host bits set.
fn ip_masked_last(ip: [u8; 4], mask: [u8; 4]) -> [u8; 4] {
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = ip[i] | !mask[i];
    }
    out
}

/// First address past the range covered by `ip` under `mask`.
///
/// Walks the octets right to left. The low bit of the lowest non-zero mask
/// octet is the increment; a carry out of an octet shows up as the produced
/// value dropping below the bit that was added, and propagates into the next
/// mask octet up.
fn ip_masked_end(ip: [u8; 4], mask: [u8; 4]) -> [u8; 4] {
    let mut out = ip;

    let mut previous_lowbit = 0u8;
    for i in (0..4).rev() {
        if mask[i] == 0 {
            continue;
        }
        let current_lowbit = lowbit(mask[i]);
        if previous_lowbit == 0 {
            // Lowest non-zero octet of the mask.
            //
            // e.g. 255.255.224.0
            //              ^ we are here
            out[i] = out[i].wrapping_add(current_lowbit);
        } else if previous_lowbit > out[i + 1] {
            // The previous octet overflowed.
            out[i] = out[i].wrapping_add(current_lowbit);
        }
        previous_lowbit = current_lowbit;
    }
    out
}

/// The address right after `ip`, with full carry propagation. Wraps to
/// 0.0.0.0 past the top of the address space.
fn ip_next(ip: [u8; 4]) -> [u8; 4] {
    let mut out = ip;

    let mut carry = 1u8;
    for i in (0..4).rev() {
        if carry != 0 {
            out[i] = out[i].wrapping_add(carry);
            carry = if out[i] < ip[i] { 1 } else { 0 };
        }
    }
    out
}

/// A contiguous range of IPv4 addresses: a single host, a CIDR block or an
/// explicit inclusive interval. Immutable once constructed; CIDR blocks are
/// normalized to their network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpRange {
    Host(Ipv4Addr),
    Net(Ipv4Network),
    Interval(Ipv4Addr, Ipv4Addr),
}

impl IpRange {
    /// The first address of the range, inclusive.
    pub fn first(&self) -> Ipv4Addr {
        match *self {
            IpRange::Host(host) => host,
            IpRange::Net(net) => net.network(),
            IpRange::Interval(first, _) => first,
        }
    }

    /// The last address of the range, inclusive.
    pub fn last(&self) -> Ipv4Addr {
        match *self {
            IpRange::Host(host) => host,
            IpRange::Net(net) => {
                Ipv4Addr::from(ip_masked_last(net.network().octets(), net.mask().octets()))
            }
            IpRange::Interval(_, last) => last,
        }
    }

    /// The first address past the range: `last() + 1` with carry. This is
    /// the exclusive bound kernel interval sets are keyed on.
    pub fn end(&self) -> Ipv4Addr {
        match *self {
            IpRange::Host(host) => Ipv4Addr::from(ip_next(host.octets())),
            IpRange::Net(net) => {
                Ipv4Addr::from(ip_masked_end(net.network().octets(), net.mask().octets()))
            }
            IpRange::Interval(_, last) => Ipv4Addr::from(ip_next(last.octets())),
        }
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IpRange::Host(host) => write!(f, "{}", host),
            IpRange::Net(net) => write!(f, "{}", net),
            IpRange::Interval(first, last) => write!(f, "{}-{}", first, last),
        }
    }
}

impl FromStr for IpRange {
    type Err = Error;

    /// Tries a bare host first, then CIDR notation, then an `a-b` interval.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(host) = s.parse::<Ipv4Addr>() {
            return Ok(IpRange::Host(host));
        }

        if s.contains('/') {
            if let Ok(net) = s.parse::<Ipv4Network>() {
                let normalized = Ipv4Network::new(net.network(), net.prefix())
                    .map_err(|_| Error::InvalidRange(s.to_string()))?;
                return Ok(IpRange::Net(normalized));
            }
        }

        if let Some((first, last)) = s.split_once('-') {
            let first = first.trim().parse::<Ipv4Addr>();
            let last = last.trim().parse::<Ipv4Addr>();
            if let (Ok(first), Ok(last)) = (first, last) {
                return Ok(IpRange::Interval(first, last));
            }
        }

        Err(Error::InvalidRange(s.to_string()))
    }
}

impl Serialize for IpRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IpRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Where a policy or NAT rule takes its addresses from: either inline
/// ranges, materialized as an anonymous interval set, or a reference to a
/// named [`IpSet`].
///
/// The JSON form disambiguates on shape: an array of range strings is the
/// immediate form, a bare string names a set.
///
/// [`IpSet`]: crate::IpSet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Immediate(Vec<IpRange>),
    Ipset(String),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ipset(name) => write!(f, "ipset:{}", name),
            Address::Immediate(ranges) => {
                let parts: Vec<String> = ranges.iter().map(|r| r.to_string()).collect();
                write!(f, "[{}]", parts.join(","))
            }
        }
    }
}

/// Converts ranges into interval set elements keyed on `[first, end)`.
pub(crate) fn set_elements_from_ranges(ranges: &[IpRange]) -> Vec<SetElement> {
    ranges
        .iter()
        .map(|range| {
            SetElement::interval(
                range.first().octets().to_vec(),
                range.end().octets().to_vec(),
            )
        })
        .collect()
}
