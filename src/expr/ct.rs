use super::{Expression, Register};

bitflags::bitflags! {
    /// Connection state bits as the conntrack engine reports them.
    pub struct ConnTrackState: u32 {
        const INVALID = 1;
        const ESTABLISHED = 2;
        const RELATED = 4;
        const NEW = 8;
        const UNTRACKED = 64;
    }
}

/// The conntrack attribute to load into a register.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum ConntrackKey {
    State = libc::NFT_CT_STATE as u32,
}

impl Default for ConntrackKey {
    fn default() -> Self {
        ConntrackKey::State
    }
}

/// A conntrack expression loads connection-tracking data associated with a
/// packet into a register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conntrack {
    pub dreg: Register,
    pub key: ConntrackKey,
}

impl Conntrack {
    pub fn new(key: ConntrackKey) -> Self {
        Conntrack {
            dreg: Register::Reg1,
            key,
        }
    }
}

impl Expression for Conntrack {
    fn get_name() -> &'static str {
        "ct"
    }
}
