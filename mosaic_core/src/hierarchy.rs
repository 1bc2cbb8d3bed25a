// hierarchy.rs - Lazily rebuilt parent/child index over a scene
//
// The cache stores the scene's modified time at its last rebuild. Every query first
// compares that stamp with the scene; any mutation anywhere in the scene makes the whole
// cache stale, and the next query rebuilds it with one linear scan.

use log::{debug, warn};
use mosaic_ids::NodeId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Node, Scene};

/// Hierarchy children of `parent` by linear scan, ordered by sorting value then attach order.
pub fn scan_children(scene: &Scene, parent: &str) -> Vec<NodeId> {
    let mut children: Vec<(f64, usize, NodeId)> = scene
        .nodes()
        .enumerate()
        .filter(|(_, n)| n.kind().is_hierarchy() && n.parent_id().is_some_and(|p| p == parent))
        .map(|(i, n)| (n.sorting_value(), i, n.id().clone()))
        .collect();
    sort_children(&mut children);
    children.into_iter().map(|(_, _, id)| id).collect()
}

fn sort_children(children: &mut [(f64, usize, NodeId)]) {
    children.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
}

#[derive(Debug, Default)]
pub struct HierarchyCache {
    children_by_parent: FxHashMap<NodeId, Vec<NodeId>>,
    parent_by_child: FxHashMap<NodeId, NodeId>,
    hierarchy_by_associated: FxHashMap<NodeId, NodeId>,
    /// (scene instance, scene modified time) at the last rebuild
    cached_at: Option<(u64, u64)>,
    rebuilds: u64,
}

impl HierarchyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(&self, scene: &Scene) -> bool {
        self.cached_at != Some((scene.instance_id(), scene.modified_time()))
    }

    /// Number of full rebuilds performed so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Drops all cached data; the next query rebuilds.
    pub fn clear(&mut self) {
        self.children_by_parent.clear();
        self.parent_by_child.clear();
        self.hierarchy_by_associated.clear();
        self.cached_at = None;
    }

    pub fn rebuild(&mut self, scene: &Scene) {
        self.clear();

        let mut grouped: FxHashMap<NodeId, Vec<(f64, usize, NodeId)>> = FxHashMap::default();
        for (position, node) in scene.nodes().enumerate() {
            if !node.kind().is_hierarchy() {
                continue;
            }
            if let Some(parent) = node.parent_id() {
                grouped.entry(parent.clone()).or_default().push((
                    node.sorting_value(),
                    position,
                    node.id().clone(),
                ));
                self.parent_by_child
                    .insert(node.id().clone(), parent.clone());
            }
            if let Some(associated) = node.associated_node_id() {
                self.hierarchy_by_associated
                    .entry(associated.clone())
                    .or_insert_with(|| node.id().clone());
            }
        }

        for (parent, mut children) in grouped {
            sort_children(&mut children);
            self.children_by_parent
                .insert(parent, children.into_iter().map(|(_, _, id)| id).collect());
        }

        self.cached_at = Some((scene.instance_id(), scene.modified_time()));
        self.rebuilds += 1;
        debug!(
            "hierarchy cache rebuilt at time {} ({} parents)",
            scene.modified_time(),
            self.children_by_parent.len()
        );
    }

    fn ensure_fresh(&mut self, scene: &Scene) {
        if self.is_stale(scene) {
            self.rebuild(scene);
        }
    }

    /// Direct hierarchy children of `parent`, ordered by sorting value.
    pub fn children_of(&mut self, scene: &Scene, parent: &str) -> &[NodeId] {
        self.ensure_fresh(scene);
        self.children_by_parent
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn nth_child(&mut self, scene: &Scene, parent: &str, n: usize) -> Option<NodeId> {
        self.children_of(scene, parent).get(n).cloned()
    }

    /// Depth-first pre-order descendants of `parent`. Terminates on cyclic data; each
    /// node is listed at most once.
    pub fn descendants_of(&mut self, scene: &Scene, parent: &str) -> Vec<NodeId> {
        self.ensure_fresh(scene);

        let mut out = Vec::new();
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        visited.insert(parent);

        let mut stack: Vec<&NodeId> = self
            .children_by_parent
            .get(parent)
            .map(|c| c.iter().rev().collect())
            .unwrap_or_default();

        while let Some(id) = stack.pop() {
            if !visited.insert(id.as_str()) {
                warn!("hierarchy cycle through {id} under {parent}");
                continue;
            }
            out.push(id.clone());
            if let Some(children) = self.children_by_parent.get(id.as_str()) {
                stack.extend(children.iter().rev());
            }
        }
        out
    }

    pub fn parent_of(&mut self, scene: &Scene, child: &str) -> Option<NodeId> {
        self.ensure_fresh(scene);
        self.parent_by_child.get(child).cloned()
    }

    /// Walks parents up from `id` to the first node without a live parent.
    /// Returns `id` itself for top-level nodes and stops early on a cycle.
    pub fn top_parent_of(&mut self, scene: &Scene, id: &str) -> NodeId {
        self.ensure_fresh(scene);

        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut current: &str = id;
        loop {
            visited.insert(current);
            match self.parent_by_child.get(current) {
                Some(parent) if scene.contains(parent) && !visited.contains(parent.as_str()) => {
                    current = parent.as_str();
                }
                _ => return NodeId::from(current),
            }
        }
    }

    pub fn index_in_parent(&mut self, scene: &Scene, child: &str) -> Option<usize> {
        let parent = self.parent_of(scene, child)?;
        self.children_of(scene, &parent)
            .iter()
            .position(|c| c == child)
    }

    /// Hierarchy node organising `node` through `associatedNodeRef`.
    pub fn associated_hierarchy_of(&mut self, scene: &Scene, node: &str) -> Option<NodeId> {
        self.ensure_fresh(scene);
        self.hierarchy_by_associated.get(node).cloned()
    }

    /// Live data nodes associated with the children of `parent`, or with all of its
    /// descendants when `recursive` is set.
    pub fn associated_children_of(
        &mut self,
        scene: &Scene,
        parent: &str,
        recursive: bool,
    ) -> Vec<NodeId> {
        let hierarchy_nodes = if recursive {
            self.descendants_of(scene, parent)
        } else {
            self.children_of(scene, parent).to_vec()
        };
        hierarchy_nodes
            .iter()
            .filter_map(|id| scene.get(id).and_then(Node::associated_node_id))
            .filter(|assoc| scene.contains(assoc))
            .cloned()
            .collect()
    }
}
