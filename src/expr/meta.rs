use super::{Expression, Register};

/// A meta expression refers to meta data associated with a packet.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum MetaType {
    /// Packet input interface name (dev->name).
    IifName = libc::NFT_META_IIFNAME as u32,
    /// Packet output interface name (dev->name).
    OifName = libc::NFT_META_OIFNAME as u32,
    /// Netfilter protocol (Transport layer protocol).
    NfProto = libc::NFT_META_NFPROTO as u32,
    /// Layer 4 protocol number.
    L4Proto = libc::NFT_META_L4PROTO as u32,
}

/// Loads packet meta data into a register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Meta {
    pub dreg: Register,
    pub key: MetaType,
}

impl Meta {
    pub fn new(key: MetaType) -> Self {
        Meta {
            dreg: Register::Reg1,
            key,
        }
    }
}

impl Expression for Meta {
    fn get_name() -> &'static str {
        "meta"
    }
}
