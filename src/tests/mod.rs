mod addr;
mod entry;
mod ipset;

use crate::{Chain, Firewall, MemorySession, Rule};

pub(crate) fn test_firewall() -> Firewall {
    Firewall::new(Box::new(MemorySession::new())).expect("firewall init")
}

/// Committed rules of one of the engine's chains, in evaluation order.
pub(crate) fn chain_rules(firewall: &mut Firewall, chain: &Chain) -> Vec<Rule> {
    let table = firewall.table().clone();
    let chain = chain.clone();
    firewall
        .session_mut()
        .get_rules(&table, &chain)
        .expect("chain exists")
}

/// Entry ids in kernel evaluation order, read back through the rule tags.
pub(crate) fn tagged_order(firewall: &mut Firewall, chain: &Chain) -> Vec<u64> {
    chain_rules(firewall, chain)
        .iter()
        .filter_map(|rule| rule.tag())
        .collect()
}
