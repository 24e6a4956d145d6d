use dv_core::{Group, GroupedNodes, OTHER_GROUP, RawNode};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::GroupParse;

/// Accumulates raw declarations per group while the document is scanned.
pub(crate) struct GroupBuilder {
    groups: Vec<(String, Vec<RawNode>)>,
    index_by_name: FxHashMap<String, usize>,
    warnings: Vec<String>,
}

impl GroupBuilder {
    pub(crate) fn new() -> Self {
        let mut builder = Self {
            groups: Vec::new(),
            index_by_name: FxHashMap::default(),
            warnings: Vec::new(),
        };
        builder.slot(OTHER_GROUP);
        builder
    }

    pub(crate) fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Append nodes to the named group, creating it on first use. Blocks that
    /// resolve to the same name share one group.
    pub(crate) fn extend_group(&mut self, name: &str, nodes: Vec<RawNode>) {
        let slot = self.slot(name);
        self.groups[slot].1.extend(nodes);
    }

    pub(crate) fn extend_other(&mut self, nodes: Vec<RawNode>) {
        self.extend_group(OTHER_GROUP, nodes);
    }

    /// Add nodes whose id no group has claimed yet to the `"Other"` bucket.
    pub(crate) fn claim_unassigned(&mut self, nodes: Vec<RawNode>) {
        let mut assigned: FxHashSet<String> = self
            .groups
            .iter()
            .flat_map(|(_, members)| members.iter().map(|node| node.id.clone()))
            .collect();
        let unassigned: Vec<RawNode> = nodes
            .into_iter()
            .filter(|node| assigned.insert(node.id.clone()))
            .collect();
        self.extend_other(unassigned);
    }

    pub(crate) fn node_count(&self) -> usize {
        self.groups.iter().map(|(_, members)| members.len()).sum()
    }

    pub(crate) fn finish(self) -> GroupParse {
        let groups = self
            .groups
            .into_iter()
            .map(|(name, members)| Group {
                name,
                members: members.into_iter().map(RawNode::normalize).collect(),
            })
            .collect();
        GroupParse {
            groups: GroupedNodes::from_groups(groups),
            warnings: self.warnings,
        }
    }

    fn slot(&mut self, name: &str) -> usize {
        if let Some(&index) = self.index_by_name.get(name) {
            return index;
        }
        let index = self.groups.len();
        self.groups.push((name.to_string(), Vec::new()));
        self.index_by_name.insert(name.to_string(), index);
        index
    }
}
