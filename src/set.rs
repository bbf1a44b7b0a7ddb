use crate::{ProtocolFamily, Table};

bitflags::bitflags! {
    /// Set construction flags, mirroring `NFT_SET_*`.
    pub struct SetFlags: u32 {
        const ANONYMOUS = 0x1;
        const CONSTANT = 0x2;
        const INTERVAL = 0x4;
    }
}

impl Default for SetFlags {
    fn default() -> Self {
        SetFlags::empty()
    }
}

/// The data type of a set key. Determines the length of every element key.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SetKey {
    /// A 4-byte IPv4 address.
    Ipv4Addr,
    /// An IFNAMSIZ-byte, null-padded interface name.
    InterfaceName,
}

impl SetKey {
    pub fn key_len(&self) -> u32 {
        match *self {
            SetKey::Ipv4Addr => 4,
            SetKey::InterfaceName => libc::IFNAMSIZ as u32,
        }
    }
}

impl Default for SetKey {
    fn default() -> Self {
        SetKey::Ipv4Addr
    }
}

/// A named collection of values, addressable by name from rules through
/// `lookup` expressions. Anonymous sets are bound to the rule that uses them
/// and get their name assigned by the session when staged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Set {
    pub family: ProtocolFamily,
    pub table: String,
    pub name: String,
    /// Session-assigned identity, used to reference a set staged in the same
    /// batch before the kernel has seen its name.
    pub id: Option<u32>,
    pub key_type: SetKey,
    pub flags: SetFlags,
}

impl Set {
    /// Creates a new set instance inside the given [`Table`].
    ///
    /// [`Table`]: crate::Table
    pub fn new(table: &Table) -> Set {
        Set {
            family: table.get_family(),
            table: table.get_name().to_string(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_key_type(mut self, key_type: SetKey) -> Self {
        self.key_type = key_type;
        self
    }

    pub fn with_flags(mut self, flags: SetFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn get_name(&self) -> Option<&str> {
        if self.name.is_empty() {
            None
        } else {
            Some(&self.name)
        }
    }

    pub fn get_id(&self) -> Option<u32> {
        self.id
    }
}

/// One element of a [`Set`]. For interval sets `key` is the inclusive start
/// and `key_end` the exclusive end of the range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetElement {
    pub key: Vec<u8>,
    pub key_end: Option<Vec<u8>>,
}

impl SetElement {
    pub fn new(key: Vec<u8>) -> Self {
        SetElement { key, key_end: None }
    }

    pub fn interval(key: Vec<u8>, key_end: Vec<u8>) -> Self {
        SetElement {
            key,
            key_end: Some(key_end),
        }
    }
}
