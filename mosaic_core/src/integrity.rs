use mosaic_ids::NodeId;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::Scene;

/// A reference whose target is not attached to the scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub holder: NodeId,
    pub role: String,
    pub target: NodeId,
}

impl Scene {
    /// Every reference in the scene that points at a node which is not live.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut out = Vec::new();
        for node in self.nodes() {
            for (role, target) in node.references.iter() {
                if !self.contains(target) {
                    out.push(DanglingReference {
                        holder: node.id().clone(),
                        role: role.to_string(),
                        target: target.clone(),
                    });
                }
            }
        }
        out
    }

    /// Loops in the parent chain of hierarchy nodes. Each loop is listed once, starting
    /// from the member reached first in scene order.
    pub fn hierarchy_cycles(&self) -> Vec<Vec<NodeId>> {
        let mut cycles = Vec::new();
        let mut done: FxHashSet<&str> = FxHashSet::default();

        for start in self.nodes().filter(|n| n.kind().is_hierarchy()) {
            let mut path: Vec<&str> = Vec::new();
            let mut on_path: FxHashMap<&str, usize> = FxHashMap::default();
            let mut current = Some(start.id().as_str());

            while let Some(id) = current {
                if done.contains(id) {
                    break;
                }
                if let Some(&position) = on_path.get(id) {
                    cycles.push(path[position..].iter().map(|s| NodeId::from(*s)).collect());
                    break;
                }
                on_path.insert(id, path.len());
                path.push(id);
                current = self
                    .get(id)
                    .filter(|n| n.kind().is_hierarchy())
                    .and_then(|n| n.parent_id())
                    .map(NodeId::as_str);
            }
            done.extend(path);
        }
        cycles
    }
}
