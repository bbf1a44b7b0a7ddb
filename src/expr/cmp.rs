use super::{Expression, Register, ToSlice};

/// Comparison operator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CmpOp {
    /// Equals.
    Eq,
    /// Not equal.
    Neq,
    /// Less than.
    Lt,
    /// Less than, or equal.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than, or equal.
    Gte,
}

impl CmpOp {
    /// Returns the corresponding `NFT_*` constant for this comparison
    /// operation.
    pub fn to_raw(self) -> u32 {
        use self::CmpOp::*;
        match self {
            Eq => libc::NFT_CMP_EQ as u32,
            Neq => libc::NFT_CMP_NEQ as u32,
            Lt => libc::NFT_CMP_LT as u32,
            Lte => libc::NFT_CMP_LTE as u32,
            Gt => libc::NFT_CMP_GT as u32,
            Gte => libc::NFT_CMP_GTE as u32,
        }
    }
}

/// Comparator expression. Allows comparing the content of the netfilter
/// register with any value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmp {
    pub sreg: Register,
    pub op: CmpOp,
    pub data: Vec<u8>,
}

impl Cmp {
    /// Returns a new comparison expression comparing the value loaded in the
    /// register with the data in `data` using the comparison operator `op`.
    pub fn new(op: CmpOp, data: impl ToSlice) -> Self {
        Cmp {
            sreg: Register::Reg1,
            op,
            data: data.to_slice().into_owned(),
        }
    }

    pub fn with_sreg(mut self, sreg: Register) -> Self {
        self.sreg = sreg;
        self
    }
}

impl Expression for Cmp {
    fn get_name() -> &'static str {
        "cmp"
    }
}

/// Range expression: an inclusive comparison of a register against a pair
/// of bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    pub sreg: Register,
    pub op: CmpOp,
    pub from: Vec<u8>,
    pub to: Vec<u8>,
}

impl Range {
    pub fn new(op: CmpOp, from: impl ToSlice, to: impl ToSlice) -> Self {
        Range {
            sreg: Register::Reg1,
            op,
            from: from.to_slice().into_owned(),
            to: to.to_slice().into_owned(),
        }
    }
}

impl Expression for Range {
    fn get_name() -> &'static str {
        "range"
    }
}
