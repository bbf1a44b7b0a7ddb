use crate::Table;

pub type ChainPriority = i32;

/// Standard priority of a filter chain. Lower priorities run earlier.
pub const FILTER_PRIORITY: ChainPriority = 0;
/// Priority of source-NAT chains; runs after filtering, on post-routing.
pub const NAT_SOURCE_PRIORITY: ChainPriority = 100;
/// Priority of destination-NAT chains; runs before filtering, on pre-routing.
pub const NAT_DEST_PRIORITY: ChainPriority = -100;

/// The netfilter event hooks a chain can register for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum HookClass {
    /// Hook into the pre-routing stage of netfilter. Corresponds to `NF_INET_PRE_ROUTING`.
    PreRouting = libc::NF_INET_PRE_ROUTING as u32,
    /// Hook into the input stage of netfilter. Corresponds to `NF_INET_LOCAL_IN`.
    In = libc::NF_INET_LOCAL_IN as u32,
    /// Hook into the forward stage of netfilter. Corresponds to `NF_INET_FORWARD`.
    Forward = libc::NF_INET_FORWARD as u32,
    /// Hook into the output stage of netfilter. Corresponds to `NF_INET_LOCAL_OUT`.
    Out = libc::NF_INET_LOCAL_OUT as u32,
    /// Hook into the post-routing stage of netfilter. Corresponds to `NF_INET_POST_ROUTING`.
    PostRouting = libc::NF_INET_POST_ROUTING as u32,
}

/// Hook point and priority a base chain registers with. Chains on the same
/// hook run in ascending priority order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Hook {
    class: HookClass,
    priority: ChainPriority,
}

impl Hook {
    pub fn new(class: HookClass, priority: ChainPriority) -> Self {
        Hook { class, priority }
    }

    pub fn get_class(&self) -> HookClass {
        self.class
    }

    pub fn get_priority(&self) -> ChainPriority {
        self.priority
    }
}

/// A chain policy. Decides what to do with a packet that was processed by the
/// chain but did not match any rules.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum ChainPolicy {
    /// Accept the packet.
    Accept = libc::NF_ACCEPT as u32,
    /// Drop the packet.
    Drop = libc::NF_DROP as u32,
}

/// Base chain type.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ChainType {
    /// Used to filter packets.
    Filter,
    /// Used to reroute packets if IP headers or packet marks are modified.
    Route,
    /// Used to perform NAT.
    Nat,
}

impl ChainType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            ChainType::Filter => "filter",
            ChainType::Route => "route",
            ChainType::Nat => "nat",
        }
    }
}

/// Abstraction of an nf_tables chain. Chains reside inside [`Table`]s and
/// they hold [`Rule`]s.
///
/// There are two types of chains, "base chain" and "regular chain". Setting
/// a hook (see [`with_hook`]) makes the chain a base chain, an entry point
/// for packets from the networking stack; without one the chain only
/// receives traffic via jump or goto verdicts.
///
/// [`Rule`]: crate::Rule
/// [`with_hook`]: #method.with_hook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chain {
    table: String,
    name: String,
    chain_type: Option<ChainType>,
    hook: Option<Hook>,
    policy: Option<ChainPolicy>,
}

impl Chain {
    /// Creates a new chain instance inside the given [`Table`].
    ///
    /// [`Table`]: crate::Table
    pub fn new(table: &Table) -> Chain {
        Chain {
            table: table.get_name().to_string(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_type(mut self, chain_type: ChainType) -> Self {
        self.chain_type = Some(chain_type);
        self
    }

    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_policy(mut self, policy: ChainPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn get_table(&self) -> &str {
        &self.table
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_type(&self) -> Option<ChainType> {
        self.chain_type
    }

    pub fn get_hook(&self) -> Option<&Hook> {
        self.hook.as_ref()
    }

    pub fn get_policy(&self) -> Option<ChainPolicy> {
        self.policy
    }
}
