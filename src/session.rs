//! The transactional interface the engine drives the kernel through.
//!
//! Mutating calls only stage messages; nothing reaches the ruleset until
//! [`Session::flush`] commits the whole batch atomically. Reads
//! ([`Session::list_tables`], [`Session::get_rules`]) always reflect the
//! last committed state.

use std::collections::BTreeMap;
use std::mem;

use crate::{Chain, KernelError, Rule, Set, SetElement, SetFlags, Table};

/// A kernel session: transactional staging plus an explicit commit.
///
/// Every engine operation follows the same shape — stage, flush, re-read
/// tagged rules — so implementations must assign rule handles at commit
/// time and return them from [`get_rules`].
///
/// [`get_rules`]: #tymethod.get_rules
pub trait Session: Send {
    /// Lists the tables currently committed, all families.
    fn list_tables(&mut self) -> Result<Vec<Table>, KernelError>;

    /// Stages the creation of a table.
    fn add_table(&mut self, table: &Table);

    /// Stages the removal of every rule in every chain of a table.
    fn flush_table(&mut self, table: &Table);

    /// Stages the removal of a table and everything it contains.
    fn del_table(&mut self, table: &Table);

    /// Stages the creation of a chain.
    fn add_chain(&mut self, chain: &Chain);

    /// Stages the creation of a set, populated with `elements`. Assigns the
    /// set id (and a generated name for anonymous sets) immediately, so the
    /// set can be referenced by rules staged in the same batch.
    fn add_set(&mut self, set: &mut Set, elements: Vec<SetElement>) -> Result<(), KernelError>;

    /// Stages an incremental addition of elements to a committed set.
    fn set_add_elements(
        &mut self,
        set: &Set,
        elements: Vec<SetElement>,
    ) -> Result<(), KernelError>;

    /// Stages an incremental removal of elements from a committed set.
    fn set_delete_elements(
        &mut self,
        set: &Set,
        elements: Vec<SetElement>,
    ) -> Result<(), KernelError>;

    /// Stages a rule at the end of its chain.
    fn add_rule(&mut self, rule: Rule);

    /// Stages a rule just before the rule whose handle is carried in
    /// `rule.position`.
    fn insert_rule(&mut self, rule: Rule);

    /// Stages the removal of a committed rule, addressed by its handle.
    fn del_rule(&mut self, rule: &Rule) -> Result<(), KernelError>;

    /// Returns the committed rules of a chain, in evaluation order, with
    /// their handles and user data.
    fn get_rules(&mut self, table: &Table, chain: &Chain) -> Result<Vec<Rule>, KernelError>;

    /// Returns the committed elements of a set.
    fn get_set_elements(&mut self, set: &Set) -> Result<Vec<SetElement>, KernelError>;

    /// Commits all staged mutations in one atomic transaction. The staged
    /// batch is consumed whether or not the commit succeeds.
    fn flush(&mut self) -> Result<(), KernelError>;
}

#[derive(Debug, Clone)]
enum Op {
    AddTable(Table),
    FlushTable(String),
    DelTable(String),
    AddChain(Chain),
    AddSet(Set, Vec<SetElement>),
    AddElements(Set, Vec<SetElement>),
    DelElements(Set, Vec<SetElement>),
    AddRule(Rule),
    InsertRule(Rule),
    DelRule(String, String, u64),
}

#[derive(Debug, Clone, Default)]
struct ChainState {
    chain: Chain,
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct SetState {
    set: Set,
    elements: Vec<SetElement>,
}

#[derive(Debug, Clone)]
struct TableState {
    table: Table,
    chains: BTreeMap<String, ChainState>,
    sets: BTreeMap<String, SetState>,
}

/// An in-process emulation of the nf_tables transactional interface.
///
/// Rule handles are assigned at commit, monotonically increasing and never
/// reused, and `insert_rule` splices before the rule whose handle matches
/// the staged position, matching kernel behaviour. A failed commit leaves
/// the committed state untouched and discards the batch.
///
/// This backs the test suite and the daemon's standalone mode; production
/// deployments provide a netlink-backed [`Session`] instead.
#[derive(Debug, Default)]
pub struct MemorySession {
    staged: Vec<Op>,
    tables: BTreeMap<String, TableState>,
    next_handle: u64,
    next_set_id: u32,
}

impl MemorySession {
    pub fn new() -> Self {
        MemorySession {
            next_set_id: 1,
            ..Default::default()
        }
    }

    fn apply(
        tables: &mut BTreeMap<String, TableState>,
        next_handle: &mut u64,
        op: Op,
    ) -> Result<(), KernelError> {
        match op {
            Op::AddTable(table) => {
                tables
                    .entry(table.get_name().to_string())
                    .or_insert_with(|| TableState {
                        table,
                        chains: BTreeMap::new(),
                        sets: BTreeMap::new(),
                    });
            }
            Op::FlushTable(name) => {
                let state = tables
                    .get_mut(&name)
                    .ok_or_else(|| KernelError::NoSuchTable(name.clone()))?;
                for chain in state.chains.values_mut() {
                    chain.rules.clear();
                }
            }
            Op::DelTable(name) => {
                tables
                    .remove(&name)
                    .ok_or_else(|| KernelError::NoSuchTable(name))?;
            }
            Op::AddChain(chain) => {
                let state = tables
                    .get_mut(chain.get_table())
                    .ok_or_else(|| KernelError::NoSuchTable(chain.get_table().to_string()))?;
                state
                    .chains
                    .entry(chain.get_name().to_string())
                    .or_insert_with(|| ChainState {
                        chain,
                        rules: Vec::new(),
                    });
            }
            Op::AddSet(set, elements) => {
                let state = tables
                    .get_mut(&set.table)
                    .ok_or_else(|| KernelError::NoSuchTable(set.table.clone()))?;
                let name = set.name.clone();
                if state.sets.contains_key(&name) {
                    return Err(KernelError::AlreadyExists("set", name));
                }
                Self::check_elements(&set, &elements)?;
                state.sets.insert(name, SetState { set, elements });
            }
            Op::AddElements(set, elements) => {
                let state = Self::set_state(tables, &set)?;
                Self::check_elements(&state.set, &elements)?;
                // Re-adding an identical element is a no-op, as in the kernel.
                for element in elements {
                    if !state.elements.contains(&element) {
                        state.elements.push(element);
                    }
                }
            }
            Op::DelElements(set, elements) => {
                let state = Self::set_state(tables, &set)?;
                for element in elements {
                    let index = state
                        .elements
                        .iter()
                        .position(|e| *e == element)
                        .ok_or_else(|| {
                            KernelError::NoSuchElement(
                                format!("{:?}", element.key),
                                set.name.clone(),
                            )
                        })?;
                    state.elements.remove(index);
                }
            }
            Op::AddRule(mut rule) => {
                let chain = Self::chain_state(tables, &rule)?;
                *next_handle += 1;
                rule.handle = Some(*next_handle);
                chain.rules.push(rule);
            }
            Op::InsertRule(mut rule) => {
                let position = rule.position.ok_or(KernelError::IncompleteRule)?;
                let chain = Self::chain_state(tables, &rule)?;
                let index = chain
                    .rules
                    .iter()
                    .position(|r| r.handle == Some(position))
                    .ok_or(KernelError::NoSuchRule(position))?;
                *next_handle += 1;
                rule.handle = Some(*next_handle);
                chain.rules.insert(index, rule);
            }
            Op::DelRule(table, chain, handle) => {
                let state = tables
                    .get_mut(&table)
                    .ok_or_else(|| KernelError::NoSuchTable(table))?;
                let chain = state
                    .chains
                    .get_mut(&chain)
                    .ok_or_else(|| KernelError::NoSuchChain(chain))?;
                let index = chain
                    .rules
                    .iter()
                    .position(|r| r.handle == Some(handle))
                    .ok_or(KernelError::NoSuchRule(handle))?;
                chain.rules.remove(index);
            }
        }
        Ok(())
    }

    fn set_state<'a>(
        tables: &'a mut BTreeMap<String, TableState>,
        set: &Set,
    ) -> Result<&'a mut SetState, KernelError> {
        tables
            .get_mut(&set.table)
            .ok_or_else(|| KernelError::NoSuchTable(set.table.clone()))?
            .sets
            .get_mut(&set.name)
            .ok_or_else(|| KernelError::NoSuchSet(set.name.clone()))
    }

    fn chain_state<'a>(
        tables: &'a mut BTreeMap<String, TableState>,
        rule: &Rule,
    ) -> Result<&'a mut ChainState, KernelError> {
        tables
            .get_mut(&rule.table)
            .ok_or_else(|| KernelError::NoSuchTable(rule.table.clone()))?
            .chains
            .get_mut(&rule.chain)
            .ok_or_else(|| KernelError::NoSuchChain(rule.chain.clone()))
    }

    fn check_elements(set: &Set, elements: &[SetElement]) -> Result<(), KernelError> {
        let len = set.key_type.key_len() as usize;
        for element in elements {
            if element.key.len() != len {
                return Err(KernelError::InvalidElement(set.name.clone()));
            }
            if let Some(end) = &element.key_end {
                if end.len() != len {
                    return Err(KernelError::InvalidElement(set.name.clone()));
                }
            }
        }
        Ok(())
    }
}

impl Session for MemorySession {
    fn list_tables(&mut self) -> Result<Vec<Table>, KernelError> {
        Ok(self.tables.values().map(|t| t.table.clone()).collect())
    }

    fn add_table(&mut self, table: &Table) {
        self.staged.push(Op::AddTable(table.clone()));
    }

    fn flush_table(&mut self, table: &Table) {
        self.staged
            .push(Op::FlushTable(table.get_name().to_string()));
    }

    fn del_table(&mut self, table: &Table) {
        self.staged.push(Op::DelTable(table.get_name().to_string()));
    }

    fn add_chain(&mut self, chain: &Chain) {
        self.staged.push(Op::AddChain(chain.clone()));
    }

    fn add_set(&mut self, set: &mut Set, elements: Vec<SetElement>) -> Result<(), KernelError> {
        if set.id.is_none() {
            set.id = Some(self.next_set_id);
            self.next_set_id += 1;
        }
        if set.name.is_empty() {
            if !set.flags.contains(SetFlags::ANONYMOUS) {
                return Err(KernelError::UnnamedSet);
            }
            set.name = format!("__set{}", set.id.unwrap_or(0));
        }
        self.staged.push(Op::AddSet(set.clone(), elements));
        Ok(())
    }

    fn set_add_elements(
        &mut self,
        set: &Set,
        elements: Vec<SetElement>,
    ) -> Result<(), KernelError> {
        self.staged.push(Op::AddElements(set.clone(), elements));
        Ok(())
    }

    fn set_delete_elements(
        &mut self,
        set: &Set,
        elements: Vec<SetElement>,
    ) -> Result<(), KernelError> {
        self.staged.push(Op::DelElements(set.clone(), elements));
        Ok(())
    }

    fn add_rule(&mut self, rule: Rule) {
        self.staged.push(Op::AddRule(rule));
    }

    fn insert_rule(&mut self, rule: Rule) {
        self.staged.push(Op::InsertRule(rule));
    }

    fn del_rule(&mut self, rule: &Rule) -> Result<(), KernelError> {
        let handle = rule.handle.ok_or(KernelError::IncompleteRule)?;
        self.staged
            .push(Op::DelRule(rule.table.clone(), rule.chain.clone(), handle));
        Ok(())
    }

    fn get_rules(&mut self, table: &Table, chain: &Chain) -> Result<Vec<Rule>, KernelError> {
        let state = self
            .tables
            .get(table.get_name())
            .ok_or_else(|| KernelError::NoSuchTable(table.get_name().to_string()))?;
        let chain = state
            .chains
            .get(chain.get_name())
            .ok_or_else(|| KernelError::NoSuchChain(chain.get_name().to_string()))?;
        Ok(chain.rules.clone())
    }

    fn get_set_elements(&mut self, set: &Set) -> Result<Vec<SetElement>, KernelError> {
        let state = self
            .tables
            .get(&set.table)
            .ok_or_else(|| KernelError::NoSuchTable(set.table.clone()))?;
        let set_state = state
            .sets
            .get(&set.name)
            .ok_or_else(|| KernelError::NoSuchSet(set.name.clone()))?;
        Ok(set_state.elements.clone())
    }

    fn flush(&mut self) -> Result<(), KernelError> {
        let staged = mem::take(&mut self.staged);
        trace!("committing {} staged messages", staged.len());

        // All-or-nothing: run the batch against a scratch copy and only
        // publish it if every message applies.
        let mut tables = self.tables.clone();
        let mut next_handle = self.next_handle;
        for op in staged {
            Self::apply(&mut tables, &mut next_handle, op)?;
        }
        self.tables = tables;
        self.next_handle = next_handle;
        Ok(())
    }
}
