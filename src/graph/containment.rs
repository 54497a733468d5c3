use crate::graph::model::{Node, Scope, Slot};
use ahash::AHashMap;

/// Resolves the ordered children of every scope from the nodes' scope relations.
///
/// Built from scratch for each use; never cached between mutations.
pub struct Containment<'g> {
    root: Vec<&'g Node>,
    scoped: AHashMap<&'g Scope, Vec<&'g Node>>,
    owned: AHashMap<&'g str, Vec<&'g Node>>,
}

impl<'g> Containment<'g> {
    pub fn new(nodes: impl IntoIterator<Item = &'g Node>) -> Self {
        let mut root = Vec::new();
        let mut scoped: AHashMap<&'g Scope, Vec<&'g Node>> = AHashMap::new();
        let mut owned: AHashMap<&'g str, Vec<&'g Node>> = AHashMap::new();

        for node in nodes {
            match &node.scope {
                Some(scope) => {
                    scoped.entry(scope).or_default().push(node);
                    owned.entry(scope.owner.as_str()).or_default().push(node);
                }
                None => root.push(node),
            }
        }

        sort_by_sequence(&mut root);
        scoped.values_mut().for_each(sort_by_sequence);
        owned.values_mut().for_each(sort_by_sequence);

        Self {
            root,
            scoped,
            owned,
        }
    }

    /// The top-level sequence of the script.
    pub fn root(&self) -> &[&'g Node] {
        &self.root
    }

    /// Children of a scope, or of the root when `scope` is `None`.
    pub fn children(&self, scope: Option<&Scope>) -> &[&'g Node] {
        match scope {
            Some(scope) => self.scoped.get(scope).map(Vec::as_slice).unwrap_or(&[]),
            None => &self.root,
        }
    }

    pub fn slot_children(&self, owner: &str, slot: &Slot) -> &[&'g Node] {
        self.children(Some(&Scope::new(owner, slot.clone())))
    }

    /// Every node placed in any slot of `owner`, in sequence order.
    pub fn owned_by(&self, owner: &str) -> &[&'g Node] {
        self.owned.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Case slots opened on `owner`, in the order their case nodes were attached.
    pub fn case_slots(&self, owner: &str) -> Vec<Slot> {
        self.owned_by(owner)
            .iter()
            .filter_map(|node| match node.scope.as_ref().map(|s| &s.slot) {
                Some(slot @ Slot::Case(_)) => Some(slot.clone()),
                _ => None,
            })
            .collect()
    }

    /// All nodes whose containment chain leads to `id`, depth first.
    pub fn descendants(&self, id: &str) -> Vec<&'g Node> {
        let mut found = Vec::new();
        let mut pending = vec![id];
        while let Some(owner) = pending.pop() {
            for &child in self.owned_by(owner) {
                found.push(child);
                pending.push(child.id.as_str());
            }
        }
        found
    }
}

fn sort_by_sequence(nodes: &mut Vec<&Node>) {
    nodes.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.id.cmp(&b.id)));
}
