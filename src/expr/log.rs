use super::Expression;
use crate::BuilderError;

// NF_LOG_PREFIXLEN counts the trailing null byte.
const PREFIX_MAX: usize = 127;

bitflags::bitflags! {
    /// Log detail flags, mirroring `NF_LOG_*`.
    pub struct LogFlags: u32 {
        const TCP_SEQ = 0x01;
        const TCP_OPT = 0x02;
        const IP_OPT = 0x04;
        const UID = 0x08;
        const MAC_DECODE = 0x20;
    }
}

impl Default for LogFlags {
    fn default() -> Self {
        LogFlags::empty()
    }
}

/// A Log expression will log all packets that match the rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
    /// The NFLOG group the log line is sent to, if any.
    pub group: Option<u16>,
    /// A prefix prepended to each log line.
    pub prefix: Option<String>,
    pub flags: LogFlags,
}

impl Log {
    pub fn new(
        group: Option<u16>,
        prefix: Option<impl Into<String>>,
    ) -> Result<Self, BuilderError> {
        let prefix = prefix.map(Into::into);
        if let Some(prefix) = &prefix {
            if prefix.len() > PREFIX_MAX {
                return Err(BuilderError::PrefixTooLong);
            }
        }
        Ok(Log {
            group,
            prefix,
            flags: LogFlags::empty(),
        })
    }

    pub fn with_flags(mut self, flags: LogFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl Expression for Log {
    fn get_name() -> &'static str {
        "log"
    }
}
