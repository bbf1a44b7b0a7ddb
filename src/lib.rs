//! User-space control plane for the Linux nf_tables packet filter and NAT
//! engine.
//!
//! The crate accepts a declarative configuration — address sets, zones,
//! services, forwarding policies and source-NAT rules — and maintains an
//! equivalent, incrementally updatable ruleset in the kernel's netfilter
//! tables. Entries are compiled into ordered lists of nf_tables expressions,
//! tagged with a stable identifier carried in each rule's user data, and
//! staged against a transactional kernel session; a commit either applies
//! the whole batch or nothing.
//!
//! The heart of the crate is [`EntryTable`], the ordered, identity-stable
//! entry list kept per kernel chain, and [`Firewall`], which owns the
//! session, the `yafw` table and chains, and the address-set and zone
//! registries that entries reference by name.
//!
//! Talking to the kernel goes through the [`Session`] trait. The crate
//! ships [`MemorySession`], an in-process emulation of the nf_tables
//! transactional interface; a netlink-backed session can be plugged in
//! without touching the engine.

use std::convert::TryFrom;

#[macro_use]
extern crate log;

mod error;
pub use error::{BuilderError, Error, KernelError};

mod table;
pub use table::Table;

mod chain;
pub use chain::{
    Chain, ChainPolicy, ChainPriority, ChainType, Hook, HookClass, FILTER_PRIORITY,
    NAT_DEST_PRIORITY, NAT_SOURCE_PRIORITY,
};

mod rule;
pub use rule::Rule;

mod set;
pub use set::{Set, SetElement, SetFlags, SetKey};

mod session;
pub use session::{MemorySession, Session};

pub mod expr;

mod addr;
pub use addr::{Address, IpRange};

mod iface;
pub use iface::{list_interfaces, Interface, InterfaceInfo};

mod ipset;
pub use ipset::IpSet;

mod zone;
pub use zone::{Zone, ZoneTable};

mod service;
pub use service::Service;

mod policy;
pub use policy::{Policy, PolicyAction};

mod nat;
pub use nat::{DnatRule, SnatRule, SnatTarget};

mod entry;
pub use entry::{Entry, EntryTable, Resolver};

mod firewall;
pub use firewall::Firewall;

pub mod api;
pub mod config;

#[cfg(test)]
mod tests;

/// Denotes a protocol family. Used to specify which protocol a table or set
/// belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum ProtocolFamily {
    Unspec = libc::NFPROTO_UNSPEC,
    /// Inet - Means both IPv4 and IPv6
    Inet = libc::NFPROTO_INET,
    Ipv4 = libc::NFPROTO_IPV4,
    Arp = libc::NFPROTO_ARP,
    NetDev = libc::NFPROTO_NETDEV,
    Bridge = libc::NFPROTO_BRIDGE,
    Ipv6 = libc::NFPROTO_IPV6,
}

impl Default for ProtocolFamily {
    fn default() -> Self {
        Self::Unspec
    }
}

impl TryFrom<i32> for ProtocolFamily {
    type Error = Error;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            libc::NFPROTO_UNSPEC => Ok(ProtocolFamily::Unspec),
            libc::NFPROTO_INET => Ok(ProtocolFamily::Inet),
            libc::NFPROTO_IPV4 => Ok(ProtocolFamily::Ipv4),
            libc::NFPROTO_ARP => Ok(ProtocolFamily::Arp),
            libc::NFPROTO_NETDEV => Ok(ProtocolFamily::NetDev),
            libc::NFPROTO_BRIDGE => Ok(ProtocolFamily::Bridge),
            libc::NFPROTO_IPV6 => Ok(ProtocolFamily::Ipv6),
            _ => Err(Error::InvalidProtocolFamily(value)),
        }
    }
}
