use crate::chain::Chain;
use crate::expr::ExpressionVariant;

/// An nf_tables firewall rule: an ordered expression list plus the table and
/// chain it belongs to. The kernel assigns the handle when the rule is
/// committed; rules read back with [`Session::get_rules`] carry it, freshly
/// built rules do not.
///
/// [`Session::get_rules`]: crate::Session::get_rules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    pub table: String,
    pub chain: String,
    /// Expressions are evaluated from first to last. As soon as one does not
    /// match the packet, evaluation stops and the next rule in the chain is
    /// tried.
    pub exprs: Vec<ExpressionVariant>,
    /// Kernel-assigned identity of a committed rule.
    pub handle: Option<u64>,
    /// Handle of the rule this one is staged before, for insertions at a
    /// non-terminal position.
    pub position: Option<u64>,
    /// Opaque bytes stored with the rule and returned verbatim on reads.
    pub userdata: Option<Vec<u8>>,
}

impl Rule {
    /// Creates a new rule object in the given [`Chain`].
    ///
    /// [`Chain`]: crate::Chain
    pub fn new(chain: &Chain) -> Rule {
        Rule {
            table: chain.get_table().to_string(),
            chain: chain.get_name().to_string(),
            ..Default::default()
        }
    }

    /// Adds an expression at the end of this rule.
    pub fn add_expr(&mut self, expr: impl Into<ExpressionVariant>) {
        self.exprs.push(expr.into());
    }

    pub fn with_expr(mut self, expr: impl Into<ExpressionVariant>) -> Self {
        self.add_expr(expr);
        self
    }

    /// Stamps the rule with an entry id, stored as 8 bytes of big-endian
    /// user data. The byte layout is load-bearing: it is how rules are
    /// re-associated with their entry after a commit cycle.
    pub fn set_tag(&mut self, id: u64) {
        self.userdata = Some(id.to_be_bytes().to_vec());
    }

    /// Reads back the entry id stamped with [`set_tag`], if the user data
    /// holds exactly eight bytes.
    ///
    /// [`set_tag`]: #method.set_tag
    pub fn tag(&self) -> Option<u64> {
        let data = self.userdata.as_ref()?;
        if data.len() != 8 {
            return None;
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(data);
        Some(u64::from_be_bytes(raw))
    }
}
