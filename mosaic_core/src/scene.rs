use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use log::{debug, info};
use mosaic_ids::{IdRegistry, NodeId};
use mosaic_scene::{NodeRecord, SceneDocument, Value, write_scene_text};
use rustc_hash::FxHashSet;

use crate::hierarchy::scan_children;
use crate::{
    EventBus, Node, NodeKind, PARENT_ROLE, Result, SORTING_ATTRIBUTE, SceneConfig, SceneError,
    SceneEvent,
};

static NEXT_SCENE_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// The live node graph.
///
/// Nodes are kept in attach order, which is the order used for export and for breaking
/// sorting-value ties. `modified_time` increases on every structural change and is what
/// derived caches compare against.
#[derive(Debug)]
pub struct Scene {
    instance: u64,
    pub(crate) nodes: IndexMap<NodeId, Node>,
    pub(crate) registry: IdRegistry,
    pub(crate) modified_time: u64,
    max_sorting_value: f64,
    config: SceneConfig,
    events: EventBus<SceneEvent>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            instance: NEXT_SCENE_INSTANCE.fetch_add(1, Ordering::Relaxed),
            nodes: IndexMap::new(),
            registry: IdRegistry::new(),
            modified_time: 0,
            max_sorting_value: 0.0,
            config,
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SceneConfig) {
        self.config = config;
    }

    /// Distinguishes scenes from one another for caches that may be pointed at several.
    pub fn instance_id(&self) -> u64 {
        self.instance
    }

    pub fn modified_time(&self) -> u64 {
        self.modified_time
    }

    pub fn events(&self) -> &EventBus<SceneEvent> {
        &self.events
    }

    pub fn registry(&self) -> &IdRegistry {
        &self.registry
    }

    pub(crate) fn emit(&self, event: &SceneEvent) {
        self.events.emit(event);
    }

    pub(crate) fn bump(&mut self) -> u64 {
        self.modified_time += 1;
        self.modified_time
    }

    pub(crate) fn next_sorting_value(&mut self) -> f64 {
        self.max_sorting_value += 1.0;
        self.max_sorting_value
    }

    fn note_sorting_value(&mut self, value: f64) {
        if value > self.max_sorting_value {
            self.max_sorting_value = value;
        }
    }
}

// ---- queries ----

impl Scene {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Position of the node in attach order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn nodes_by_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.kind() == kind)
    }

    pub fn nodes_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.nodes.values().filter(move |n| n.name == name)
    }

    pub fn first_node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name == name)
    }

    pub fn parent_of(&self, id: &str) -> Option<&NodeId> {
        self.get(id).and_then(Node::parent_id)
    }

    /// Nodes holding at least one reference to `target`, in scene order.
    pub fn referencing_nodes(&self, target: &str) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.references.targets().any(|t| t == target))
            .map(|n| n.id().clone())
            .collect()
    }

    /// Every live node reachable from `id` through references, excluding `id` itself.
    pub fn referenced_nodes(&self, id: &str) -> Vec<NodeId> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        seen.insert(id);
        let mut stack = vec![id];
        let mut out = Vec::new();

        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            for target in node.references.targets() {
                if self.contains(target) && seen.insert(target.as_str()) {
                    out.push(target.clone());
                    stack.push(target.as_str());
                }
            }
        }
        out
    }

    /// `base`, then `base_1`, `base_2`, ... whichever is first unused by a live node.
    pub fn generate_unique_name(&self, base: &str) -> String {
        if !self.name_in_use(base) {
            return base.to_string();
        }
        let mut n = 1u64;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.name_in_use(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn name_in_use(&self, name: &str) -> bool {
        self.nodes.values().any(|n| n.name == name)
    }

    /// True if `ancestor` is `node` or sits above it on the parent chain.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: &str, node: &str) -> bool {
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            current = self.parent_of(id).map(NodeId::as_str);
        }
        false
    }
}

// ---- mutation ----

impl Scene {
    /// Attaches `node`, generating an id when it has none.
    ///
    /// Singleton kinds always live under their fixed id; adding a second one copies its
    /// content into the existing node and returns the existing id.
    pub fn add(&mut self, mut node: Node) -> Result<NodeId> {
        if let Some(owner) = NodeKind::singleton_owner(node.id()).filter(|k| *k != node.kind()) {
            return Err(SceneError::ReservedId {
                id: node.id().clone(),
                owner: owner.type_tag(),
            });
        }
        if let Some(singleton_id) = node.kind().singleton_id() {
            if self.contains(&singleton_id) {
                self.modify_node(&singleton_id, |existing| existing.copy_content_from(node))?;
                debug!("merged singleton into {singleton_id}");
                return Ok(singleton_id);
            }
            node.assign_id(singleton_id);
        }

        let id = if node.id().is_nil() {
            self.registry.reserve_next_id(node.type_tag())
        } else {
            node.id().clone()
        };
        self.registry.register_id(id.clone())?;

        let kind = node.kind();
        self.attach(node, id.clone());
        debug!("added {id}");
        self.emit(&SceneEvent::NodeAdded {
            id: id.clone(),
            kind,
        });
        Ok(id)
    }

    /// Creates and attaches an empty node of `kind`.
    pub fn create(&mut self, kind: NodeKind) -> Result<NodeId> {
        self.add(Node::new(kind))
    }

    /// Inserts a node whose id is already registered. Fires no events.
    pub(crate) fn attach(&mut self, mut node: Node, id: NodeId) {
        if node.name.is_empty() && self.config.unique_names {
            node.name = self.generate_unique_name(node.type_tag());
        }
        match node.explicit_sorting_value() {
            Some(value) => self.note_sorting_value(value),
            None => {
                let value = self.next_sorting_value();
                node.set_sorting_value(value);
            }
        }
        let time = self.bump();
        node.assign_id(id.clone());
        node.touch(time);
        self.nodes.insert(id, node);
    }

    /// Drops a node attached by an unfinished import. Fires no events.
    pub(crate) fn detach_silently(&mut self, id: &NodeId) {
        if self.nodes.shift_remove(id.as_str()).is_some() {
            self.registry.release_id(id);
            self.bump();
        }
    }

    /// Detaches `id` and frees its id. References held by other nodes are left in place
    /// unless `clear_references_on_remove` is set.
    pub fn remove(&mut self, id: &str) -> Result<Node> {
        let Some(kind) = self.get(id).map(Node::kind) else {
            return Err(SceneError::NodeNotFound(NodeId::from(id)));
        };
        let id = NodeId::from(id);

        self.emit(&SceneEvent::NodeAboutToBeRemoved {
            id: id.clone(),
            kind,
        });
        let Some(node) = self.nodes.shift_remove(id.as_str()) else {
            return Err(SceneError::NodeNotFound(id));
        };
        self.registry.release_id(&id);
        self.bump();

        if self.config.clear_references_on_remove {
            self.remove_references_to(&id)?;
        }

        debug!("removed {id}");
        self.emit(&SceneEvent::NodeRemoved { id, kind });
        Ok(node)
    }

    /// Strips every reference to `target` from the scene. Returns the nodes that changed.
    pub fn remove_references_to(&mut self, target: &str) -> Result<Vec<NodeId>> {
        let holders = self.referencing_nodes(target);
        let target = NodeId::from(target);
        for holder in &holders {
            self.modify_node(holder, |n| {
                n.references.remove_target(&target);
            })?;
        }
        Ok(holders)
    }

    /// Removes every node, last attached first.
    pub fn clear(&mut self) {
        let removed: Vec<(NodeId, NodeKind)> = self
            .nodes
            .values()
            .rev()
            .map(|n| (n.id().clone(), n.kind()))
            .collect();

        for (id, kind) in &removed {
            self.emit(&SceneEvent::NodeAboutToBeRemoved {
                id: id.clone(),
                kind: *kind,
            });
        }

        self.nodes.clear();
        self.registry.clear();
        self.max_sorting_value = 0.0;
        self.bump();

        for (id, kind) in removed {
            self.emit(&SceneEvent::NodeRemoved { id, kind });
        }
        info!("scene cleared");
        self.emit(&SceneEvent::SceneCleared);
    }

    /// Runs `f` on the node, then marks it and the scene modified and fires `NodeModified`.
    pub fn modify_node<R>(&mut self, id: &str, f: impl FnOnce(&mut Node) -> R) -> Result<R> {
        let time = self.modified_time + 1;
        let Some(node) = self.nodes.get_mut(id) else {
            return Err(SceneError::NodeNotFound(NodeId::from(id)));
        };

        let result = f(node);
        node.touch(time);
        let sorting = node.explicit_sorting_value();
        let event = SceneEvent::NodeModified {
            id: node.id().clone(),
            kind: node.kind(),
        };

        if let Some(value) = sorting {
            self.note_sorting_value(value);
        }
        self.modified_time = time;
        self.emit(&event);
        Ok(result)
    }

    pub fn set_reference<I>(&mut self, id: &str, role: &str, targets: I) -> Result<()>
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.modify_node(id, |n| n.references.set(role, targets))
    }

    pub fn add_reference(&mut self, id: &str, role: &str, target: NodeId) -> Result<bool> {
        self.modify_node(id, |n| n.references.add(role, target))
    }

    pub fn clear_reference(&mut self, id: &str, role: &str) -> Result<bool> {
        self.modify_node(id, |n| n.references.clear(role))
    }

    /// Re-parents `child`, placing it after its new siblings. `None` detaches it from the
    /// hierarchy.
    pub fn set_parent(&mut self, child: &str, parent: Option<&str>) -> Result<()> {
        if !self.contains(child) {
            return Err(SceneError::NodeNotFound(NodeId::from(child)));
        }

        let Some(parent) = parent else {
            self.modify_node(child, |n| {
                n.references.clear(PARENT_ROLE);
            })?;
            return Ok(());
        };

        if parent == child {
            return Err(SceneError::SelfParent(NodeId::from(child)));
        }
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(NodeId::from(parent)));
        }
        if self.config.reject_hierarchy_cycles && self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::CyclicHierarchy {
                child: NodeId::from(child),
                parent: NodeId::from(parent),
            });
        }

        let sorting = self.next_sorting_value();
        let parent = NodeId::from(parent);
        self.modify_node(child, |n| {
            n.references.set_single(PARENT_ROLE, parent);
            n.set_sorting_value(sorting);
        })
    }

    fn siblings_of(&self, child: &str) -> Result<(Vec<NodeId>, usize)> {
        let node = self
            .get(child)
            .ok_or_else(|| SceneError::NodeNotFound(NodeId::from(child)))?;
        let parent = node
            .parent_id()
            .ok_or_else(|| SceneError::NoParent(NodeId::from(child)))?;
        let siblings = scan_children(self, parent);
        let index = siblings
            .iter()
            .position(|s| s == child)
            .ok_or_else(|| SceneError::NoParent(NodeId::from(child)))?;
        Ok((siblings, index))
    }

    fn sorting_of(&self, id: &str) -> f64 {
        self.get(id).map(Node::sorting_value).unwrap_or(0.0)
    }

    /// Moves `child` to position `index` among its siblings by picking a sorting value
    /// next to or between its new neighbours.
    pub fn set_index_in_parent(&mut self, child: &str, index: usize) -> Result<()> {
        let (siblings, old_index) = self.siblings_of(child)?;
        let len = siblings.len();
        if index >= len {
            return Err(SceneError::IndexOutOfRange {
                index: index as i64,
                len,
            });
        }

        let mut value = self.sorting_of(&siblings[index]);
        if index == 0 {
            value -= 1.0;
        } else if index == len - 1 {
            value += 1.0;
        } else if index > old_index {
            value = 0.5 * (value + self.sorting_of(&siblings[index + 1]));
        } else if index < old_index {
            value = 0.5 * (value + self.sorting_of(&siblings[index - 1]));
        }

        self.modify_node(child, |n| n.set_sorting_value(value))
    }

    /// Shifts `child` by `increment` places among its siblings, swapping sorting values
    /// with each neighbour it passes.
    pub fn move_in_parent(&mut self, child: &str, increment: i64) -> Result<()> {
        if increment == 0 {
            return Ok(());
        }
        let (siblings, old_index) = self.siblings_of(child)?;
        let parent = match self.parent_of(child) {
            Some(parent) => parent.clone(),
            None => return Err(SceneError::NoParent(NodeId::from(child))),
        };

        let target = old_index as i64 + increment;
        if target < 0 || target >= siblings.len() as i64 {
            return Err(SceneError::IndexOutOfRange {
                index: target,
                len: siblings.len(),
            });
        }

        let step = increment.signum();
        let mut index = old_index as i64;
        for _ in 0..increment.abs() {
            let siblings = scan_children(self, &parent);
            let (Some(a), Some(b)) = (
                siblings.get(index as usize),
                siblings.get((index + step) as usize),
            ) else {
                break;
            };
            let (value_a, value_b) = (self.sorting_of(a), self.sorting_of(b));
            if let Some(node) = self.nodes.get_mut(a.as_str()) {
                node.set_sorting_value(value_b);
            }
            if let Some(node) = self.nodes.get_mut(b.as_str()) {
                node.set_sorting_value(value_a);
            }
            index += step;
        }

        self.modify_node(child, |_| ())
    }
}

// ---- serialization ----

impl Scene {
    /// Snapshot of the live graph in attach order.
    pub fn export(&self) -> SceneDocument {
        SceneDocument {
            vars: IndexMap::new(),
            records: self.nodes.values().map(node_to_record).collect(),
        }
    }

    pub fn to_text(&self) -> String {
        write_scene_text(&self.export())
    }
}

fn node_to_record(node: &Node) -> NodeRecord {
    let mut record = NodeRecord::new(node.id().clone(), node.type_tag());
    if !node.name.is_empty() {
        record.name = Some(node.name.clone());
    }
    for role in node.references.roles() {
        record
            .references
            .insert(role.to_string(), node.references.get(role).to_vec());
    }
    record.attributes = node.attributes.clone();
    if node.kind().is_hierarchy() {
        record.attributes.insert(
            SORTING_ATTRIBUTE.to_string(),
            Value::Number(node.sorting_value()),
        );
    }
    record
}
