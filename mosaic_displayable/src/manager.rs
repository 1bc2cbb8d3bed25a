use std::fmt;

use indexmap::IndexMap;
use mosaic_core::{NodeKind, SceneEvent};
use mosaic_ids::NodeId;

/// Render target a group of managers draws into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderSurface {
    name: String,
}

impl RenderSurface {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RenderSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Per-surface observer that turns scene nodes into something drawn.
pub trait DisplayableManager {
    /// Registered kind this manager was instantiated for.
    fn kind(&self) -> &str;

    /// Attaches the manager to a surface and hands it the current scene node set.
    fn bind(
        &mut self,
        surface: &RenderSurface,
        view_node: Option<&NodeId>,
        nodes: &IndexMap<NodeId, NodeKind>,
    );

    fn on_scene_event(&mut self, event: &SceneEvent);

    fn displayed_nodes(&self) -> Vec<NodeId>;

    fn set_view_node(&mut self, _view_node: Option<&NodeId>) {}
}

impl fmt::Debug for dyn DisplayableManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayableManager")
            .field("kind", &self.kind())
            .finish()
    }
}

/// Default manager: mirrors the live node set, optionally only displayable kinds.
#[derive(Debug, Clone, Default)]
pub struct NodeSetDisplayableManager {
    kind: String,
    displayable_only: bool,
    surface: Option<RenderSurface>,
    view_node: Option<NodeId>,
    nodes: IndexMap<NodeId, NodeKind>,
}

impl NodeSetDisplayableManager {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            displayable_only: true,
            ..Self::default()
        }
    }

    /// Mirrors every node, not only displayable ones.
    pub fn all_nodes(mut self) -> Self {
        self.displayable_only = false;
        self
    }

    pub fn surface(&self) -> Option<&RenderSurface> {
        self.surface.as_ref()
    }

    pub fn view_node(&self) -> Option<&NodeId> {
        self.view_node.as_ref()
    }

    fn accepts(&self, kind: NodeKind) -> bool {
        !self.displayable_only || kind.is_displayable()
    }
}

impl DisplayableManager for NodeSetDisplayableManager {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn bind(
        &mut self,
        surface: &RenderSurface,
        view_node: Option<&NodeId>,
        nodes: &IndexMap<NodeId, NodeKind>,
    ) {
        self.surface = Some(surface.clone());
        self.view_node = view_node.cloned();
        self.nodes = nodes
            .iter()
            .filter(|(_, kind)| self.accepts(**kind))
            .map(|(id, kind)| (id.clone(), *kind))
            .collect();
    }

    fn on_scene_event(&mut self, event: &SceneEvent) {
        match event {
            SceneEvent::NodeAdded { id, kind } if self.accepts(*kind) => {
                self.nodes.insert(id.clone(), *kind);
            }
            SceneEvent::NodeRemoved { id, .. } => {
                self.nodes.shift_remove(id.as_str());
            }
            SceneEvent::SceneCleared => self.nodes.clear(),
            _ => {}
        }
    }

    fn displayed_nodes(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    fn set_view_node(&mut self, view_node: Option<&NodeId>) {
        self.view_node = view_node.cloned();
    }
}
