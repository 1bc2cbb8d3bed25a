// registry.rs - Live and reserved node ids for one scene
//
// The registry is the single authority on which ids are taken:
// 1. Live ids belong to attached nodes and are never handed out twice
// 2. Reserved ids are claimed by an in-flight import batch; generated ids skip them
// 3. Generated ids use the smallest free index for their base, so freed numbers are reused
//
// A per-base hint remembers the lowest index that might still be free. Every index
// below the hint is taken, so generation usually succeeds on the first probe.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{IdError, NodeId, Result, is_valid_node_id};

#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    /// Ids of attached nodes
    live: FxHashSet<NodeId>,
    /// Ids claimed by an import batch that is still resolving
    reserved: FxHashSet<NodeId>,
    /// Lowest index per base that might be free
    next_index: FxHashMap<String, u64>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `<base><n>` for the smallest `n >= 1` that is neither live nor reserved.
    /// The id is not registered; call [`IdRegistry::register_id`] to claim it.
    pub fn reserve_next_id(&mut self, base: &str) -> NodeId {
        let mut index = self.next_index.get(base).copied().unwrap_or(1).max(1);
        loop {
            let candidate = NodeId::from_parts(base, index);
            if !self.is_taken(&candidate) {
                self.next_index.insert(base.to_string(), index);
                debug!("generated id {candidate}");
                return candidate;
            }
            index += 1;
        }
    }

    /// Claims `id` as live.
    pub fn register_id(&mut self, id: NodeId) -> Result<()> {
        if id.is_nil() {
            return Err(IdError::Empty);
        }
        if !is_valid_node_id(id.as_str()) {
            return Err(IdError::Malformed(id.into_string()));
        }
        if self.live.contains(&id) {
            return Err(IdError::Duplicate(id));
        }
        self.live.insert(id);
        Ok(())
    }

    /// Frees `id`. Releasing an id that is not live does nothing.
    pub fn release_id(&mut self, id: &NodeId) -> bool {
        if !self.live.remove(id) {
            return false;
        }
        self.lower_hint(id);
        true
    }

    /// Marks a batch of ids as unavailable for generation until [`IdRegistry::clear_reserved`].
    pub fn reserve_ids<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.reserved.extend(ids);
    }

    pub fn clear_reserved(&mut self) {
        let reserved = std::mem::take(&mut self.reserved);
        for id in &reserved {
            self.lower_hint(id);
        }
    }

    pub fn is_live(&self, id: &str) -> bool {
        self.live.contains(id)
    }

    pub fn is_reserved(&self, id: &str) -> bool {
        self.reserved.contains(id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.live.iter()
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.reserved.clear();
        self.next_index.clear();
    }

    fn is_taken(&self, id: &NodeId) -> bool {
        self.live.contains(id) || self.reserved.contains(id)
    }

    fn lower_hint(&mut self, id: &NodeId) {
        let (base, Some(index)) = id.split_index() else {
            return;
        };
        if let Some(hint) = self.next_index.get_mut(base) {
            if index < *hint {
                *hint = index;
            }
        }
    }
}
