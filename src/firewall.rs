//! The engine facade: owns the kernel session, the `yafw` table and chains,
//! the registries and the per-chain entry tables, and serializes every
//! mutation into a stage → commit → re-read cycle.

use std::collections::HashMap;

use crate::addr::set_elements_from_ranges;
use crate::entry::{EntryTable, Resolver};
use crate::expr::{ConnTrackState, ExprBuilder};
use crate::iface::Interface;
use crate::ipset::IpSet;
use crate::nat::{DnatRule, SnatRule};
use crate::policy::Policy;
use crate::zone::{Zone, ZoneTable};
use crate::{
    Chain, ChainPolicy, ChainType, Error, Hook, HookClass, ProtocolFamily, Rule, Session, Set,
    SetFlags, SetKey, Table, FILTER_PRIORITY, NAT_DEST_PRIORITY, NAT_SOURCE_PRIORITY,
};

const TABLE_NAME: &str = "yafw";

/// The control plane's view of the kernel ruleset.
///
/// All mutating operations are synchronous with their kernel commit and
/// must be externally serialized; the engine is a single critical section
/// with no internal locking.
pub struct Firewall {
    session: Box<dyn Session>,
    table: Table,
    forward: Chain,
    postrouting: Chain,
    prerouting: Chain,

    ipsets: HashMap<String, IpSet>,
    zones: ZoneTable,

    policies: EntryTable<Policy>,
    snat: EntryTable<SnatRule>,
    dnat: EntryTable<DnatRule>,
}

impl Firewall {
    /// Builds the chain layout in the kernel and returns an engine bound to
    /// it. A `yafw` table left over from a previous run is torn down first.
    pub fn new(mut session: Box<dyn Session>) -> Result<Self, Error> {
        for stale in session.list_tables()? {
            if stale.get_name() == TABLE_NAME {
                session.flush_table(&stale);
                session.del_table(&stale);
                if let Err(err) = session.flush() {
                    warn!("cannot tear down stale table: {}", err);
                }
            }
        }

        let table = Table::new(ProtocolFamily::Ipv4).with_name(TABLE_NAME);
        let forward = Chain::new(&table)
            .with_name("forward")
            .with_type(ChainType::Filter)
            .with_hook(Hook::new(HookClass::Forward, FILTER_PRIORITY))
            .with_policy(ChainPolicy::Drop);
        let postrouting = Chain::new(&table)
            .with_name("postrouting")
            .with_type(ChainType::Nat)
            .with_hook(Hook::new(HookClass::PostRouting, NAT_SOURCE_PRIORITY));
        let prerouting = Chain::new(&table)
            .with_name("prerouting")
            .with_type(ChainType::Nat)
            .with_hook(Hook::new(HookClass::PreRouting, NAT_DEST_PRIORITY));

        session.add_table(&table);
        session.add_chain(&forward);
        session.add_chain(&postrouting);
        session.add_chain(&prerouting);

        // Return traffic of admitted connections bypasses the policies.
        let mut established = Rule::new(&forward);
        established.exprs = ExprBuilder::new()
            .conntrack_state(ConnTrackState::ESTABLISHED | ConnTrackState::RELATED)
            .verdict_accept()
            .build();
        session.add_rule(established);

        session.flush()?;

        let policies = EntryTable::new(&table, &forward);
        let snat = EntryTable::new(&table, &postrouting);
        let dnat = EntryTable::new(&table, &prerouting);

        Ok(Firewall {
            session,
            table,
            forward,
            postrouting,
            prerouting,
            ipsets: HashMap::new(),
            zones: ZoneTable::new(),
            policies,
            snat,
            dnat,
        })
    }

    /// Removes the engine's table, and with it every chain, set and rule it
    /// manages.
    pub fn stop(&mut self) {
        self.session.flush_table(&self.table);
        self.session.del_table(&self.table);
        if let Err(err) = self.session.flush() {
            warn!("cannot remove table on shutdown: {}", err);
        }
    }

    // === Policies ===

    /// Policies in match precedence order.
    pub fn policies(&self) -> &[Policy] {
        self.policies.all()
    }

    pub fn append_policy(&mut self, policy: Policy) -> Result<u64, Error> {
        self.update_policy(policy, None)
    }

    pub fn insert_policy_before(&mut self, policy: Policy, before: u64) -> Result<u64, Error> {
        self.update_policy(policy, Some(before))
    }

    pub fn update_policy(&mut self, policy: Policy, before: Option<u64>) -> Result<u64, Error> {
        let Firewall {
            session,
            table,
            ipsets,
            zones,
            policies,
            ..
        } = self;
        let mut resolver = Resolver {
            session: session.as_mut(),
            table,
            ipsets,
            zones,
        };
        policies.update(&mut resolver, policy, before)
    }

    pub fn remove_policy(&mut self, id: u64) -> Result<(), Error> {
        self.policies.remove(self.session.as_mut(), id)
    }

    // === Source NAT ===

    pub fn snat_rules(&self) -> &[SnatRule] {
        self.snat.all()
    }

    pub fn append_snat_rule(&mut self, rule: SnatRule) -> Result<u64, Error> {
        self.update_snat_rule(rule, None)
    }

    pub fn update_snat_rule(&mut self, rule: SnatRule, before: Option<u64>) -> Result<u64, Error> {
        let Firewall {
            session,
            table,
            ipsets,
            zones,
            snat,
            ..
        } = self;
        let mut resolver = Resolver {
            session: session.as_mut(),
            table,
            ipsets,
            zones,
        };
        snat.update(&mut resolver, rule, before)
    }

    pub fn remove_snat_rule(&mut self, id: u64) -> Result<(), Error> {
        self.snat.remove(self.session.as_mut(), id)
    }

    // === Destination NAT (placeholder) ===

    pub fn dnat_rules(&self) -> &[DnatRule] {
        self.dnat.all()
    }

    pub fn append_dnat_rule(&mut self, rule: DnatRule) -> Result<u64, Error> {
        let Firewall {
            session,
            table,
            ipsets,
            zones,
            dnat,
            ..
        } = self;
        let mut resolver = Resolver {
            session: session.as_mut(),
            table,
            ipsets,
            zones,
        };
        dnat.update(&mut resolver, rule, None)
    }

    pub fn remove_dnat_rule(&mut self, id: u64) -> Result<(), Error> {
        self.dnat.remove(self.session.as_mut(), id)
    }

    // === IPSets ===

    /// Registers a new ipset. Returns `None` if the name is already taken.
    pub fn new_ipset(&mut self, name: &str) -> Option<&mut IpSet> {
        if self.ipsets.contains_key(name) {
            return None;
        }
        self.ipsets.insert(name.to_string(), IpSet::new(name));
        self.ipsets.get_mut(name)
    }

    pub fn find_ipset(&self, name: &str) -> Option<&IpSet> {
        self.ipsets.get(name)
    }

    pub fn ipset_mut(&mut self, name: &str) -> Option<&mut IpSet> {
        self.ipsets.get_mut(name)
    }

    /// Flushes an ipset's pending mutations into the kernel: incremental
    /// deltas once the backing set exists, a full `ipset-<name>` creation
    /// otherwise.
    ///
    /// The pending queues are cleared whether or not the commit goes
    /// through; a failed flush therefore loses the queued deltas.
    pub fn update_ipset(&mut self, name: &str) -> Result<(), Error> {
        let Firewall {
            session,
            table,
            ipsets,
            ..
        } = self;
        let ipset = ipsets
            .get_mut(name)
            .ok_or_else(|| Error::UnknownIpset(name.to_string()))?;

        let will_add = std::mem::take(&mut ipset.will_add);
        let will_delete = std::mem::take(&mut ipset.will_delete);

        if let Some(set) = &ipset.set {
            if !will_add.is_empty() {
                session.set_add_elements(set, set_elements_from_ranges(&will_add))?;
            }
            if !will_delete.is_empty() {
                session.set_delete_elements(set, set_elements_from_ranges(&will_delete))?;
            }
        } else {
            let elements = set_elements_from_ranges(ipset.members());
            let mut set = Set::new(table)
                .with_name(format!("ipset-{}", name))
                .with_key_type(SetKey::Ipv4Addr)
                .with_flags(SetFlags::INTERVAL);
            session.add_set(&mut set, elements)?;
            ipset.set = Some(set);
        }

        session.flush()?;

        Ok(())
    }

    // === Zones ===

    /// Registers a new zone. Returns `None` if the name is already taken.
    pub fn add_zone(&mut self, name: &str) -> Option<&mut Zone> {
        self.zones.add_zone(name)
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    pub fn zone_mut(&mut self, name: &str) -> Option<&mut Zone> {
        self.zones.find_mut(name)
    }

    /// Flushes a zone's membership diff into the kernel.
    pub fn update_zone(&mut self, name: &str) -> Result<(), Error> {
        let Firewall {
            session,
            table,
            zones,
            ..
        } = self;
        zones.update(name, session.as_mut(), table)
    }

    /// Moves an interface into a zone; the interface leaves its previous
    /// zone and both zones are re-flushed.
    pub fn assign_interface(&mut self, iface: &Interface, zone: &str) -> Result<(), Error> {
        let Firewall {
            session,
            table,
            zones,
            ..
        } = self;
        zones.assign_interface(iface, zone, session.as_mut(), table)
    }

    pub fn delete_zone(&mut self, name: &str) {
        self.zones.delete_zone(name)
    }

    // === Introspection ===

    /// The table the engine manages.
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn forward_chain(&self) -> &Chain {
        &self.forward
    }

    pub fn postrouting_chain(&self) -> &Chain {
        &self.postrouting
    }

    pub fn prerouting_chain(&self) -> &Chain {
        &self.prerouting
    }

    #[cfg(test)]
    pub(crate) fn session_mut(&mut self) -> &mut dyn Session {
        self.session.as_mut()
    }

    #[cfg(test)]
    pub(crate) fn policy_table(&self) -> &EntryTable<Policy> {
        &self.policies
    }

    #[cfg(test)]
    pub(crate) fn snat_table(&self) -> &EntryTable<SnatRule> {
        &self.snat
    }
}
