use crate::addr::IpRange;
use crate::Set;

/// A named, mutable collection of address ranges, materialized as an
/// interval set in the kernel.
///
/// Mutations accumulate in two pending queues that the next flush turns
/// into incremental kernel deltas. The queues stay disjoint: adding a range
/// that is pending deletion cancels the deletion, and vice versa.
#[derive(Debug, Clone)]
pub struct IpSet {
    name: String,
    members: Vec<IpRange>,
    pub(crate) will_add: Vec<IpRange>,
    pub(crate) will_delete: Vec<IpRange>,
    pub(crate) set: Option<Set>,
}

fn find_range(ranges: &[IpRange], wanted: &IpRange) -> Option<usize> {
    ranges.iter().position(|r| r == wanted)
}

impl IpSet {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        IpSet {
            name: name.into(),
            members: Vec::new(),
            will_add: Vec::new(),
            will_delete: Vec::new(),
            set: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical membership, pending mutations already folded in.
    pub fn members(&self) -> &[IpRange] {
        &self.members
    }

    /// The kernel set backing this ipset, present once it has been flushed.
    pub fn kernel_set(&self) -> Option<&Set> {
        self.set.as_ref()
    }

    pub fn add_range(&mut self, range: IpRange) -> &mut Self {
        if find_range(&self.will_add, &range).is_some() {
            // already queued for addition
            return self;
        }

        if find_range(&self.members, &range).is_none() {
            self.members.push(range);
            self.will_add.push(range);

            if let Some(index) = find_range(&self.will_delete, &range) {
                self.will_delete.remove(index);
            }
        }

        self
    }

    pub fn delete_range(&mut self, range: IpRange) -> &mut Self {
        if find_range(&self.will_delete, &range).is_some() {
            // already queued for deletion
            return self;
        }

        if let Some(index) = find_range(&self.members, &range) {
            self.members.remove(index);
            self.will_delete.push(range);

            if let Some(index) = find_range(&self.will_add, &range) {
                self.will_add.remove(index);
            }
        }

        self
    }
}
