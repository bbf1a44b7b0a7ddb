use super::Expression;

/// Sets the source IP to that of the output interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Masquerade;

impl Expression for Masquerade {
    fn get_name() -> &'static str {
        "masq"
    }
}
