use serde::{Deserialize, Serialize};

use crate::expr::{ExprBuilder, ExpressionVariant, Register};

/// An L4 match predicate: a protocol number plus optional source and
/// destination port ranges. A zero port bound means "any port" on that side;
/// the protocol is always matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub name: String,
    pub protocol: u8,
    #[serde(default)]
    pub source_port_min: u16,
    #[serde(default)]
    pub source_port_max: u16,
    #[serde(default)]
    pub destination_port_min: u16,
    #[serde(default)]
    pub destination_port_max: u16,
}

impl Service {
    /// Compiles the predicate into its match expressions.
    pub fn exprs(&self) -> Vec<ExpressionVariant> {
        let mut builder = ExprBuilder::new()
            .meta_l4_protocol(Register::Reg1)
            .compare_l4_protocol(Register::Reg1, self.protocol);

        if self.source_port_min != 0 && self.source_port_max != 0 {
            builder = builder
                .load_source_port(Register::Reg1)
                .compare_port_range(Register::Reg1, self.source_port_min, self.source_port_max);
        }

        if self.destination_port_min != 0 && self.destination_port_max != 0 {
            builder = builder.load_destination_port(Register::Reg1).compare_port_range(
                Register::Reg1,
                self.destination_port_min,
                self.destination_port_max,
            );
        }

        builder.build()
    }
}
