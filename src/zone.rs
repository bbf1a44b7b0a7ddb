//! Zones: named groups of interfaces used as a match dimension in policies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::iface::{encode_ifname, Interface};
use crate::{Error, Session, Set, SetElement, SetKey, Table};

/// A named set of network interfaces, materialized as an interface-name set
/// in the kernel. `old_members` snapshots the membership at the last flush;
/// the next flush emits the difference as incremental deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip)]
    members: BTreeMap<String, Interface>,
    #[serde(skip)]
    old_members: BTreeMap<String, Interface>,
    #[serde(skip)]
    pub(crate) set: Option<Set>,
}

impl Zone {
    fn new(name: impl Into<String>) -> Self {
        Zone {
            name: name.into(),
            description: String::new(),
            members: BTreeMap::new(),
            old_members: BTreeMap::new(),
            set: None,
        }
    }

    pub fn add_interface(&mut self, iface: Interface) -> &mut Self {
        self.members.entry(iface.name.clone()).or_insert(iface);
        self
    }

    pub fn remove_interface(&mut self, name: &str) -> &mut Self {
        self.members.remove(name);
        self
    }

    pub fn members(&self) -> impl Iterator<Item = &Interface> {
        self.members.values()
    }

    /// The kernel set backing this zone, present once it has been flushed.
    pub fn kernel_set(&self) -> Option<&Set> {
        self.set.as_ref()
    }

    fn element(iface: &Interface) -> Result<SetElement, Error> {
        Ok(SetElement::new(encode_ifname(&iface.name)?))
    }

    fn elements(&self) -> Result<Vec<SetElement>, Error> {
        self.members.values().map(Zone::element).collect()
    }
}

/// The zone registry: zones by name plus a reverse index from interface
/// name to zone name. The reverse index enforces that an interface belongs
/// to at most one zone.
#[derive(Debug, Default)]
pub struct ZoneTable {
    zones: BTreeMap<String, Zone>,
    interfaces: BTreeMap<String, String>,
}

impl ZoneTable {
    pub fn new() -> Self {
        ZoneTable::default()
    }

    /// Registers a new zone. Returns `None` if a zone with that name already
    /// exists.
    pub fn add_zone(&mut self, name: &str) -> Option<&mut Zone> {
        if self.zones.contains_key(name) {
            return None;
        }
        self.zones.insert(name.to_string(), Zone::new(name));
        self.zones.get_mut(name)
    }

    pub fn find(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Zone> {
        self.zones.get_mut(name)
    }

    /// The zone an interface currently belongs to, if any.
    pub fn zone_of(&self, ifname: &str) -> Option<&str> {
        self.interfaces.get(ifname).map(String::as_str)
    }

    pub fn all(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    /// Flushes a zone's membership into the kernel: an incremental diff
    /// against the last flushed snapshot when the set exists, a full
    /// `zone-<name>` set creation otherwise.
    pub fn update(
        &mut self,
        name: &str,
        session: &mut dyn Session,
        table: &Table,
    ) -> Result<(), Error> {
        let zone = self
            .zones
            .get_mut(name)
            .ok_or_else(|| Error::UnknownZone(name.to_string()))?;

        if let Some(set) = &zone.set {
            for (key, member) in &zone.members {
                if !zone.old_members.contains_key(key) {
                    session.set_add_elements(set, vec![Zone::element(member)?])?;
                }
            }
            for (key, member) in &zone.old_members {
                if !zone.members.contains_key(key) {
                    session.set_delete_elements(set, vec![Zone::element(member)?])?;
                }
            }
        } else {
            let elements = zone.elements()?;
            let mut set = Set::new(table)
                .with_name(format!("zone-{}", zone.name))
                .with_key_type(SetKey::InterfaceName);
            session.add_set(&mut set, elements)?;
            zone.set = Some(set);
        }

        session.flush()?;

        zone.old_members = zone.members.clone();

        Ok(())
    }

    /// Moves an interface into a zone, removing it from its previous zone
    /// first. Both zones are re-flushed.
    pub fn assign_interface(
        &mut self,
        iface: &Interface,
        zone: &str,
        session: &mut dyn Session,
        table: &Table,
    ) -> Result<(), Error> {
        if !self.zones.contains_key(zone) {
            return Err(Error::UnknownZone(zone.to_string()));
        }

        if let Some(old_zone) = self.interfaces.get(&iface.name).cloned() {
            if old_zone != zone {
                if let Some(old) = self.zones.get_mut(&old_zone) {
                    old.remove_interface(&iface.name);
                }
                self.update(&old_zone, session, table)?;
            }
        }

        if let Some(target) = self.zones.get_mut(zone) {
            target.add_interface(iface.clone());
        }
        self.interfaces
            .insert(iface.name.clone(), zone.to_string());
        self.update(zone, session, table)?;

        Ok(())
    }

    /// Unregisters a zone and clears its interfaces from the reverse index.
    pub fn delete_zone(&mut self, name: &str) {
        if let Some(zone) = self.zones.remove(name) {
            for member in zone.members.keys() {
                self.interfaces.remove(member);
            }
        }
    }
}
