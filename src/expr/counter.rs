use super::Expression;

/// A counter expression adds a counter to the rule that is incremented to
/// count number of packets and number of bytes for all packets that have
/// matched the rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counter {
    pub nb_bytes: u64,
    pub nb_packets: u64,
}

impl Counter {
    pub fn new() -> Self {
        Counter::default()
    }
}

impl Expression for Counter {
    fn get_name() -> &'static str {
        "counter"
    }
}
