use super::{Expression, Register};
use crate::{BuilderError, Set};

/// Tests whether the value in a register is a member of a named set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    pub set: String,
    pub set_id: Option<u32>,
    pub sreg: Register,
}

impl Lookup {
    /// Creates a new lookup entry. May return `BuilderError::MissingSetName`
    /// if the set has no name.
    pub fn new(set: &Set) -> Result<Self, BuilderError> {
        Ok(Lookup {
            set: set
                .get_name()
                .ok_or(BuilderError::MissingSetName)?
                .to_string(),
            set_id: set.get_id(),
            sreg: Register::Reg1,
        })
    }
}

impl Expression for Lookup {
    fn get_name() -> &'static str {
        "lookup"
    }
}
