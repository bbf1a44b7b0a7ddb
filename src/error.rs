use thiserror::Error;

/// Errors raised while assembling netfilter objects in Rust, before anything
/// reaches a kernel session.
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("The length of the arguments are not compatible with each other")]
    IncompatibleLength,

    #[error("The interface name does not fit in IFNAMSIZ bytes")]
    InterfaceNameTooLong,

    #[error("The log prefix would exceed the kernel limit of 127 bytes")]
    PrefixTooLong,

    #[error("Missing name for the set")]
    MissingSetName,
}

/// Errors surfaced by a kernel session while staging mutations or committing
/// a batch.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("table {0:?} does not exist")]
    NoSuchTable(String),

    #[error("chain {0:?} does not exist")]
    NoSuchChain(String),

    #[error("set {0:?} does not exist")]
    NoSuchSet(String),

    #[error("no rule with handle {0}")]
    NoSuchRule(u64),

    #[error("no element {0:?} in set {1:?}")]
    NoSuchElement(String, String),

    #[error("{0} {1:?} already exists")]
    AlreadyExists(&'static str, String),

    #[error("a staged rule is missing its table, chain or handle")]
    IncompleteRule,

    #[error("a staged set has neither a name nor the anonymous flag")]
    UnnamedSet,

    #[error("set element does not match the key length of set {0:?}")]
    InvalidElement(String),

    #[error("error while communicating with the kernel: {0}")]
    Transport(String),
}

/// Engine-level errors reported to callers of the firewall API. Validation
/// failures leave the engine untouched; kernel failures may leave it out of
/// sync with the ruleset, which the engine does not attempt to roll back.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot parse {0:?} as an IPv4 range")]
    InvalidRange(String),

    #[error("invalid protocol family {0}")]
    InvalidProtocolFamily(i32),

    #[error("ipset {0:?} does not exist")]
    UnknownIpset(String),

    #[error("zone {0:?} does not exist")]
    UnknownZone(String),

    #[error("interface {0:?} does not exist")]
    UnknownInterface(String),

    #[error("no entry with id {0}")]
    EntryNotFound(u64),

    #[error("source NAT to a specific address is not implemented")]
    SnatTargetUnimplemented,

    #[error("destination NAT is not implemented")]
    DnatUnimplemented,

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Kernel(#[from] KernelError),
}
