use std::net::Ipv4Addr;

use super::{
    Bitwise, Cmp, CmpOp, ConnTrackState, Conntrack, ConntrackKey, Counter, ExpressionVariant,
    Immediate, Log, LogFlags, Lookup, Masquerade, Meta, MetaType, Nat, NatType, Payload,
    PayloadBase, Range, Register, Verdict,
};
use crate::addr::IpRange;
use crate::iface::encode_ifname;
use crate::{BuilderError, ProtocolFamily, Set};

// Offsets into the IPv4 and transport headers of the fields the engine
// matches on.
const IPV4_SADDR_OFFSET: u32 = 12;
const IPV4_DADDR_OFFSET: u32 = 16;
const L4_SPORT_OFFSET: u32 = 0;
const L4_DPORT_OFFSET: u32 = 2;

/// Fluent assembly of the expression list of one rule.
///
/// Each method appends one or more expressions and hands the builder back,
/// so a rule body reads as a chain of loads and compares; [`build`] yields
/// the ordered list. There is no dataflow analysis: methods that load data
/// overwrite the scratch register, and callers are expected to emit paired
/// load/compare sequences against register one.
///
/// [`build`]: #method.build
#[derive(Debug, Default)]
pub struct ExprBuilder {
    exprs: Vec<ExpressionVariant>,
}

impl ExprBuilder {
    pub fn new() -> Self {
        ExprBuilder::default()
    }

    /// Returns the assembled expression list, in append order.
    pub fn build(self) -> Vec<ExpressionVariant> {
        self.exprs
    }

    pub fn append(mut self, expr: impl Into<ExpressionVariant>) -> Self {
        self.exprs.push(expr.into());
        self
    }

    pub fn extend(mut self, exprs: Vec<ExpressionVariant>) -> Self {
        self.exprs.extend(exprs);
        self
    }

    /// Loads the name of the interface the packet leaves through.
    pub fn meta_egress_interface(self, register: Register) -> Self {
        self.append(Meta {
            dreg: register,
            key: MetaType::OifName,
        })
    }

    /// Loads the name of the interface the packet arrived on.
    pub fn meta_ingress_interface(self, register: Register) -> Self {
        self.append(Meta {
            dreg: register,
            key: MetaType::IifName,
        })
    }

    /// Loads the layer 4 protocol number.
    pub fn meta_l4_protocol(self, register: Register) -> Self {
        self.append(Meta {
            dreg: register,
            key: MetaType::L4Proto,
        })
    }

    pub fn compare_l4_protocol(self, register: Register, protocol: u8) -> Self {
        self.append(Cmp::new(CmpOp::Eq, protocol).with_sreg(register))
    }

    pub fn load_source_port(self, register: Register) -> Self {
        self.append(Payload {
            dreg: register,
            base: PayloadBase::Transport,
            offset: L4_SPORT_OFFSET,
            len: 2,
        })
    }

    pub fn load_destination_port(self, register: Register) -> Self {
        self.append(Payload {
            dreg: register,
            base: PayloadBase::Transport,
            offset: L4_DPORT_OFFSET,
            len: 2,
        })
    }

    pub fn compare_port(self, register: Register, port: u16) -> Self {
        self.append(Cmp::new(CmpOp::Eq, port.to_be_bytes()).with_sreg(register))
    }

    /// Inclusive range comparison of a previously loaded port.
    pub fn compare_port_range(self, register: Register, min: u16, max: u16) -> Self {
        let mut range = Range::new(CmpOp::Eq, min.to_be_bytes(), max.to_be_bytes());
        range.sreg = register;
        self.append(range)
    }

    /// Loads the IPv4 source address from the network header.
    pub fn payload_ip_source(self, register: Register) -> Self {
        self.append(Payload {
            dreg: register,
            base: PayloadBase::Network,
            offset: IPV4_SADDR_OFFSET,
            len: 4,
        })
    }

    /// Loads the IPv4 destination address from the network header.
    pub fn payload_ip_destination(self, register: Register) -> Self {
        self.append(Payload {
            dreg: register,
            base: PayloadBase::Network,
            offset: IPV4_DADDR_OFFSET,
            len: 4,
        })
    }

    pub fn compare_interface_name(
        self,
        register: Register,
        name: &str,
    ) -> Result<Self, BuilderError> {
        let encoded = encode_ifname(name)?;
        Ok(self.append(Cmp::new(CmpOp::Eq, encoded).with_sreg(register)))
    }

    /// Matches a previously loaded address against a range, emitted as a
    /// pair of compares: `register >= first && register < end`.
    pub fn compare_ip_range(self, register: Register, range: &IpRange) -> Self {
        self.append(Cmp::new(CmpOp::Gte, range.first()).with_sreg(register))
            .append(Cmp::new(CmpOp::Lt, range.end()).with_sreg(register))
    }

    /// Membership test of a previously loaded value against a kernel set.
    pub fn lookup_set(self, register: Register, set: &Set) -> Result<Self, BuilderError> {
        let mut lookup = Lookup::new(set)?;
        lookup.sreg = register;
        Ok(self.append(lookup))
    }

    /// Post-routing source rewrite to the egress interface address.
    pub fn masquerade(self) -> Self {
        self.append(Masquerade)
    }

    /// Source NAT to an address picked from the inclusive range
    /// `first..=last`: the bounds are loaded as immediates into registers
    /// one and two, then handed to the NAT statement.
    pub fn source_nat_range(self, first: Ipv4Addr, last: Ipv4Addr) -> Self {
        self.append(Immediate::new(first, Register::Reg1))
            .append(Immediate::new(last, Register::Reg2))
            .append(
                Nat::new(NatType::SNat, ProtocolFamily::Ipv4)
                    .with_addr_range(Register::Reg1, Register::Reg2),
            )
    }

    /// Matches packets whose conntrack state intersects `states`: loads the
    /// state word, masks it and compares the result against zero.
    pub fn conntrack_state(self, states: ConnTrackState) -> Self {
        self.append(Conntrack::new(ConntrackKey::State))
            .append(Bitwise {
                sreg: Register::Reg1,
                dreg: Register::Reg1,
                len: 4,
                mask: states.bits().to_ne_bytes().to_vec(),
                xor: 0u32.to_ne_bytes().to_vec(),
            })
            .append(Cmp::new(CmpOp::Neq, 0u32.to_ne_bytes()))
    }

    pub fn log_prefix(self, prefix: &str) -> Result<Self, BuilderError> {
        let log = Log::new(None, Some(prefix))?.with_flags(LogFlags::IP_OPT | LogFlags::TCP_OPT);
        Ok(self.append(log))
    }

    pub fn counter(self) -> Self {
        self.append(Counter::new())
    }

    pub fn verdict_accept(self) -> Self {
        self.append(Verdict::Accept)
    }

    pub fn verdict_drop(self) -> Self {
        self.append(Verdict::Drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_range_compare_is_a_cmp_pair() {
        let range: IpRange = "192.168.1.0/24".parse().unwrap();
        let exprs = ExprBuilder::new()
            .payload_ip_source(Register::Reg1)
            .compare_ip_range(Register::Reg1, &range)
            .build();

        assert_eq!(exprs.len(), 3);
        match (&exprs[1], &exprs[2]) {
            (ExpressionVariant::Cmp(gte), ExpressionVariant::Cmp(lt)) => {
                assert_eq!(gte.op, CmpOp::Gte);
                assert_eq!(gte.data, vec![192, 168, 1, 0]);
                assert_eq!(lt.op, CmpOp::Lt);
                assert_eq!(lt.data, vec![192, 168, 2, 0]);
            }
            other => panic!("unexpected expressions: {:?}", other),
        }
    }

    #[test]
    fn conntrack_state_masks_and_compares() {
        let exprs = ExprBuilder::new()
            .conntrack_state(ConnTrackState::ESTABLISHED | ConnTrackState::RELATED)
            .verdict_accept()
            .build();

        assert_eq!(exprs.len(), 4);
        match &exprs[1] {
            ExpressionVariant::Bitwise(bitwise) => {
                assert_eq!(bitwise.mask, 6u32.to_ne_bytes().to_vec());
            }
            other => panic!("unexpected expression: {:?}", other),
        }
        assert!(matches!(exprs[3], ExpressionVariant::Verdict(Verdict::Accept)));
    }

    #[test]
    fn oversized_interface_name_is_rejected() {
        let result = ExprBuilder::new()
            .compare_interface_name(Register::Reg1, "an-interface-name-way-too-long");
        assert!(result.is_err());
    }

    #[test]
    fn source_nat_range_loads_both_bounds() {
        let exprs = ExprBuilder::new()
            .source_nat_range(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 9))
            .build();

        assert_eq!(exprs.len(), 3);
        match &exprs[2] {
            ExpressionVariant::Nat(nat) => {
                assert_eq!(nat.nat_type, NatType::SNat);
                assert_eq!(nat.addr_min, Some(Register::Reg1));
                assert_eq!(nat.addr_max, Some(Register::Reg2));
            }
            other => panic!("unexpected expression: {:?}", other),
        }
    }
}
