use super::{Expression, Register};
use crate::ProtocolFamily;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(i32)]
pub enum NatType {
    /// Source NAT. Changes the source address of a packet.
    SNat = libc::NFT_NAT_SNAT,
    /// Destination NAT. Changes the destination address of a packet.
    DNat = libc::NFT_NAT_DNAT,
}

/// A source or destination NAT statement. Rewrites the address (and possibly
/// port) of packets to values previously loaded into registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nat {
    pub nat_type: NatType,
    pub family: ProtocolFamily,
    pub addr_min: Option<Register>,
    pub addr_max: Option<Register>,
    pub proto_min: Option<Register>,
    pub proto_max: Option<Register>,
}

impl Nat {
    pub fn new(nat_type: NatType, family: ProtocolFamily) -> Self {
        Nat {
            nat_type,
            family,
            addr_min: None,
            addr_max: None,
            proto_min: None,
            proto_max: None,
        }
    }

    pub fn with_addr_range(mut self, min: Register, max: Register) -> Self {
        self.addr_min = Some(min);
        self.addr_max = Some(max);
        self
    }
}

impl Expression for Nat {
    fn get_name() -> &'static str {
        "nat"
    }
}
