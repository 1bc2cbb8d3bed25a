use indexmap::IndexMap;
use mosaic_ids::NodeId;
use smallvec::SmallVec;

/// Role linking a hierarchy node to its parent.
pub const PARENT_ROLE: &str = "parentNodeRef";
/// Role linking a hierarchy node to the data node it organises.
pub const ASSOCIATED_ROLE: &str = "associatedNodeRef";
/// Role linking a displayable node to its display nodes.
pub const DISPLAY_ROLE: &str = "displayNodeRef";

/// Most roles point at a single node.
pub type RoleTargets = SmallVec<[NodeId; 1]>;

/// Outgoing references of one node: role name -> ordered target ids.
/// Roles keep insertion order so export is stable. A role never maps to an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    roles: IndexMap<String, RoleTargets>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every target of `role`. An empty iterator removes the role.
    pub fn set<I>(&mut self, role: &str, targets: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        let targets: RoleTargets = targets.into_iter().filter(|t| !t.is_nil()).collect();
        if targets.is_empty() {
            self.roles.shift_remove(role);
        } else {
            self.roles.insert(role.to_string(), targets);
        }
    }

    pub fn set_single(&mut self, role: &str, target: NodeId) {
        self.set(role, [target]);
    }

    /// Appends `target` to `role` unless it is already there.
    pub fn add(&mut self, role: &str, target: NodeId) -> bool {
        if target.is_nil() {
            return false;
        }
        let targets = self.roles.entry(role.to_string()).or_default();
        if targets.contains(&target) {
            return false;
        }
        targets.push(target);
        true
    }

    pub fn clear(&mut self, role: &str) -> bool {
        self.roles.shift_remove(role).is_some()
    }

    pub fn get(&self, role: &str) -> &[NodeId] {
        self.roles.get(role).map(|t| t.as_slice()).unwrap_or(&[])
    }

    pub fn first(&self, role: &str) -> Option<&NodeId> {
        self.roles.get(role).and_then(|t| t.first())
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Every `(role, target)` pair in role order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeId)> {
        self.roles
            .iter()
            .flat_map(|(role, targets)| targets.iter().map(move |t| (role.as_str(), t)))
    }

    pub fn targets(&self) -> impl Iterator<Item = &NodeId> {
        self.roles.values().flat_map(|targets| targets.iter())
    }

    pub fn contains_target(&self, target: &NodeId) -> bool {
        self.targets().any(|t| t == target)
    }

    /// Drops `target` from every role. Returns how many references were removed.
    pub fn remove_target(&mut self, target: &NodeId) -> usize {
        let mut removed = 0;
        for targets in self.roles.values_mut() {
            let before = targets.len();
            targets.retain(|t| t != target);
            removed += before - targets.len();
        }
        self.roles.retain(|_, targets| !targets.is_empty());
        removed
    }

    /// Replaces each target for which `map` returns a new id. Returns the number replaced.
    pub fn rewrite<F>(&mut self, mut map: F) -> usize
    where
        F: FnMut(&NodeId) -> Option<NodeId>,
    {
        let mut changed = 0;
        for targets in self.roles.values_mut() {
            for target in targets.iter_mut() {
                if let Some(next) = map(target) {
                    if next != *target {
                        *target = next;
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.roles.values().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
