use super::{Expression, Register, ToSlice};
use crate::BuilderError;

/// Expression for performing bitwise masking and XOR on the data in a
/// register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitwise {
    pub sreg: Register,
    pub dreg: Register,
    pub len: u32,
    pub mask: Vec<u8>,
    pub xor: Vec<u8>,
}

impl Bitwise {
    /// Returns a new `Bitwise` instance that masks the value in register one
    /// with `mask`, xors it with `xor` and writes it back.
    pub fn new(mask: impl ToSlice, xor: impl ToSlice) -> Result<Self, BuilderError> {
        let mask = mask.to_slice().into_owned();
        let xor = xor.to_slice().into_owned();
        if mask.len() != xor.len() {
            return Err(BuilderError::IncompatibleLength);
        }
        Ok(Bitwise {
            sreg: Register::Reg1,
            dreg: Register::Reg1,
            len: mask.len() as u32,
            mask,
            xor,
        })
    }
}

impl Expression for Bitwise {
    fn get_name() -> &'static str {
        "bitwise"
    }
}
