//! The rule-table engine: ordered, identity-stable entry lists per kernel
//! chain, compiled to tagged rules and edited incrementally.

use std::collections::HashMap;

use crate::addr::{set_elements_from_ranges, Address};
use crate::iface::Interface;
use crate::ipset::IpSet;
use crate::zone::ZoneTable;
use crate::{Chain, Error, Rule, Session, Set, SetFlags, SetKey, Table};

/// One logical firewall entry, standing for a short run of kernel rules.
///
/// An entry resolves its by-name references into an artifact, then compiles
/// itself into fresh rules; the engine owns identity, ordering, tagging and
/// the commit cycle.
pub trait Entry {
    /// Resolves the entry's address and zone references against the
    /// registries. An unresolvable reference fails the surrounding update.
    fn build_artifact(&mut self, resolver: &mut Resolver<'_>) -> Result<(), Error>;

    /// The engine-assigned identifier. Zero on an entry the engine has not
    /// seen yet.
    fn id(&self) -> u64;

    fn set_id(&mut self, id: u64);

    /// Compiles the entry into rules, in match order. Table, chain and tag
    /// are stamped by the engine afterwards.
    fn to_rules(&self) -> Result<Vec<Rule>, Error>;
}

/// The registries and session an entry needs while building its artifact,
/// borrowed from the firewall for the duration of one update.
pub struct Resolver<'a> {
    pub(crate) session: &'a mut dyn Session,
    pub(crate) table: &'a Table,
    pub(crate) ipsets: &'a HashMap<String, IpSet>,
    pub(crate) zones: &'a ZoneTable,
}

impl<'a> Resolver<'a> {
    /// Turns an address into the kernel set rules will look it up in:
    /// the named ipset's backing set for references, a fresh anonymous
    /// interval set (staged into the current batch) for immediate ranges.
    pub fn address_set(&mut self, address: &Address) -> Result<Set, Error> {
        match address {
            Address::Ipset(name) => self
                .ipsets
                .get(name)
                .and_then(|ipset| ipset.kernel_set())
                .cloned()
                .ok_or_else(|| Error::UnknownIpset(name.clone())),
            Address::Immediate(ranges) => {
                let mut set = Set::new(self.table)
                    .with_key_type(SetKey::Ipv4Addr)
                    .with_flags(SetFlags::ANONYMOUS | SetFlags::CONSTANT | SetFlags::INTERVAL);
                self.session
                    .add_set(&mut set, set_elements_from_ranges(ranges))?;
                Ok(set)
            }
        }
    }

    /// The kernel set holding a zone's interfaces.
    pub fn zone_set(&self, name: &str) -> Result<Set, Error> {
        self.zones
            .find(name)
            .and_then(|zone| zone.kernel_set())
            .cloned()
            .ok_or_else(|| Error::UnknownZone(name.to_string()))
    }

    /// Resolves an interface name against the kernel.
    pub fn interface(&self, name: &str) -> Result<Interface, Error> {
        Interface::by_name(name)
    }
}

/// An ordered collection of entries bound to one kernel chain.
///
/// `list` order is the single source of truth for match precedence; after
/// any successful mutation the kernel chain shows the same order for the
/// engine's tagged rules. `rule_map` tracks, per entry id, the committed
/// rules last observed for it, and `counter` mints ids that are never
/// reused.
pub struct EntryTable<T: Entry> {
    table: Table,
    chain: Chain,
    list: Vec<T>,
    rule_map: HashMap<u64, Vec<Rule>>,
    counter: u64,
}

impl<T: Entry> EntryTable<T> {
    pub(crate) fn new(table: &Table, chain: &Chain) -> Self {
        EntryTable {
            table: table.clone(),
            chain: chain.clone(),
            list: Vec::new(),
            rule_map: HashMap::new(),
            counter: 0,
        }
    }

    /// Entries in match precedence order.
    pub fn all(&self) -> &[T] {
        &self.list
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.list.iter().find(|e| e.id() == id)
    }

    #[cfg(test)]
    pub(crate) fn rules_for(&self, id: u64) -> Option<&[Rule]> {
        self.rule_map.get(&id).map(Vec::as_slice)
    }

    /// Unified insert, move and modify. An append is an update without an
    /// anchor; an insertion is an update with one.
    ///
    /// A fresh entry gets the next id and lands at the end of the list, or
    /// just before `before` if given. A known entry is plucked from its
    /// slot first; without an explicit `before`, its previous successor
    /// becomes the anchor so the entry stays in place. The entry's old
    /// rules are staged for deletion, its fresh rules staged at the anchor,
    /// and the whole edit commits as one transaction; afterwards the
    /// kernel handles are re-read through the entry's tag.
    ///
    /// A failure after the list splice (reference resolution, commit) leaves
    /// the list already mutated; the engine does not roll back.
    pub(crate) fn update(
        &mut self,
        resolver: &mut Resolver<'_>,
        mut entry: T,
        mut before: Option<u64>,
    ) -> Result<u64, Error> {
        let is_new = !self.rule_map.contains_key(&entry.id());
        if is_new {
            self.counter += 1;
            entry.set_id(self.counter);
            self.rule_map.insert(entry.id(), Vec::new());
        }
        let id = entry.id();

        if let Some(anchor) = before {
            if !self.rule_map.contains_key(&anchor) {
                // unknown anchor, treat as append
                before = None;
            }
        }

        let mut before_handle = None;
        if !is_new {
            if let Some(slot) = self.list.iter().position(|e| e.id() == id) {
                if slot + 1 < self.list.len() {
                    let successor = self.list[slot + 1].id();
                    if before.is_none() {
                        before = Some(successor);
                    }
                    before_handle = self.rule_map[&successor]
                        .first()
                        .and_then(|rule| rule.handle);
                }
                self.list.remove(slot);
            }
        }

        let slot = match before.and_then(|anchor| self.list.iter().position(|e| e.id() == anchor)) {
            Some(index) => {
                let anchor = before.unwrap_or_default();
                before_handle = self.rule_map[&anchor]
                    .first()
                    .and_then(|rule| rule.handle);
                self.list.insert(index, entry);
                index
            }
            None => {
                self.list.push(entry);
                self.list.len() - 1
            }
        };

        self.list[slot].build_artifact(resolver)?;

        if !is_new {
            for rule in &self.rule_map[&id] {
                resolver.session.del_rule(rule)?;
            }
        }

        for mut rule in self.list[slot].to_rules()? {
            rule.table = self.table.get_name().to_string();
            rule.chain = self.chain.get_name().to_string();
            rule.set_tag(id);

            match before_handle {
                Some(handle) => {
                    rule.position = Some(handle);
                    resolver.session.insert_rule(rule);
                }
                None => resolver.session.add_rule(rule),
            }
        }

        resolver.session.flush()?;

        let rules = self.rules_by_tag(&mut *resolver.session, id)?;
        self.rule_map.insert(id, rules);

        Ok(id)
    }

    /// Deletes every kernel rule tagged with `id` and forgets the entry.
    pub(crate) fn remove(&mut self, session: &mut dyn Session, id: u64) -> Result<(), Error> {
        let rules = self
            .rule_map
            .get(&id)
            .ok_or(Error::EntryNotFound(id))?;

        for rule in rules {
            session.del_rule(rule)?;
        }
        session.flush()?;

        self.rule_map.remove(&id);
        if let Some(slot) = self.list.iter().position(|e| e.id() == id) {
            self.list.remove(slot);
        }

        Ok(())
    }

    /// Re-reads the chain and keeps the rules whose user data round-trips
    /// to `tag`.
    fn rules_by_tag(&self, session: &mut dyn Session, tag: u64) -> Result<Vec<Rule>, Error> {
        let rules = session.get_rules(&self.table, &self.chain)?;
        Ok(rules
            .into_iter()
            .filter(|rule| rule.tag() == Some(tag))
            .collect())
    }
}
