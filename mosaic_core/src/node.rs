use indexmap::IndexMap;
use mosaic_ids::NodeId;
use mosaic_scene::Value;

use crate::references::{ASSOCIATED_ROLE, PARENT_ROLE, ReferenceTable};

/// What a node kind can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Has a `parentNodeRef` and appears in the hierarchy cache.
    Hierarchy,
    /// Can be shown by displayable managers.
    Displayable,
    /// Describes how a displayable node is drawn.
    Display,
    /// A render view.
    View,
    /// At most one instance per scene.
    Singleton,
}

/// Closed set of node kinds the engine knows how to store and merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    HierarchyNode,
    DisplayableHierarchyNode,
    ModelHierarchyNode,
    ModelNode,
    ModelDisplayNode,
    ModelStorageNode,
    ColorTableNode,
    ViewNode,
    CameraNode,
    SelectionNode,
    InteractionNode,
    LayoutNode,
}

const SINGLETON_TAG: &str = "Singleton";

/// Attribute carrying a node's sorting value in scene text.
pub const SORTING_ATTRIBUTE: &str = "sortingValue";

impl NodeKind {
    pub const ALL: [NodeKind; 12] = [
        NodeKind::HierarchyNode,
        NodeKind::DisplayableHierarchyNode,
        NodeKind::ModelHierarchyNode,
        NodeKind::ModelNode,
        NodeKind::ModelDisplayNode,
        NodeKind::ModelStorageNode,
        NodeKind::ColorTableNode,
        NodeKind::ViewNode,
        NodeKind::CameraNode,
        NodeKind::SelectionNode,
        NodeKind::InteractionNode,
        NodeKind::LayoutNode,
    ];

    pub const fn type_tag(self) -> &'static str {
        match self {
            NodeKind::HierarchyNode => "HierarchyNode",
            NodeKind::DisplayableHierarchyNode => "DisplayableHierarchyNode",
            NodeKind::ModelHierarchyNode => "ModelHierarchyNode",
            NodeKind::ModelNode => "ModelNode",
            NodeKind::ModelDisplayNode => "ModelDisplayNode",
            NodeKind::ModelStorageNode => "ModelStorageNode",
            NodeKind::ColorTableNode => "ColorTableNode",
            NodeKind::ViewNode => "ViewNode",
            NodeKind::CameraNode => "CameraNode",
            NodeKind::SelectionNode => "SelectionNode",
            NodeKind::InteractionNode => "InteractionNode",
            NodeKind::LayoutNode => "LayoutNode",
        }
    }

    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_tag() == tag)
    }

    pub const fn capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            NodeKind::HierarchyNode => &[Hierarchy],
            NodeKind::DisplayableHierarchyNode | NodeKind::ModelHierarchyNode => {
                &[Hierarchy, Displayable]
            }
            NodeKind::ModelNode => &[Displayable],
            NodeKind::ModelDisplayNode => &[Display],
            NodeKind::ModelStorageNode | NodeKind::ColorTableNode => &[],
            NodeKind::ViewNode => &[View],
            NodeKind::CameraNode => &[Displayable],
            NodeKind::SelectionNode | NodeKind::InteractionNode | NodeKind::LayoutNode => {
                &[Singleton]
            }
        }
    }

    pub fn has(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    #[inline]
    pub fn is_hierarchy(self) -> bool {
        self.has(Capability::Hierarchy)
    }

    #[inline]
    pub fn is_displayable(self) -> bool {
        self.has(Capability::Displayable)
    }

    /// Suffix of the fixed id used by singleton kinds.
    pub fn singleton_tag(self) -> Option<&'static str> {
        self.has(Capability::Singleton).then_some(SINGLETON_TAG)
    }

    /// `SelectionNodeSingleton` for singleton kinds.
    pub fn singleton_id(self) -> Option<NodeId> {
        self.singleton_tag()
            .map(|tag| NodeId::from_parts(self.type_tag(), tag))
    }

    /// The singleton kind whose fixed id is `id`, if any.
    pub fn singleton_owner(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.singleton_id().is_some_and(|fixed| fixed == id))
    }
}

/// A scene node. The id is assigned by the scene on attach and never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    pub name: String,
    pub references: ReferenceTable,
    pub attributes: IndexMap<String, Value>,
    sorting_value: Option<f64>,
    modified_time: u64,
}

impl Node {
    /// A detached node with no id; the scene generates one on attach.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::nil(),
            kind,
            name: String::new(),
            references: ReferenceTable::new(),
            attributes: IndexMap::new(),
            sorting_value: None,
            modified_time: 0,
        }
    }

    /// A detached node that asks to be attached under `id`.
    pub fn with_id(kind: NodeKind, id: impl Into<NodeId>) -> Self {
        let mut node = Self::new(kind);
        node.id = id.into();
        node
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.references.set_single(PARENT_ROLE, parent.into());
        self
    }

    pub fn with_reference(mut self, role: &str, target: impl Into<NodeId>) -> Self {
        self.references.add(role, target.into());
        self
    }

    pub fn with_sorting_value(mut self, value: f64) -> Self {
        self.sorting_value = Some(value);
        self
    }

    #[inline]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    #[inline]
    pub fn modified_time(&self) -> u64 {
        self.modified_time
    }

    pub fn sorting_value(&self) -> f64 {
        self.sorting_value.unwrap_or(0.0)
    }

    pub fn set_sorting_value(&mut self, value: f64) {
        self.sorting_value = Some(value);
    }

    pub fn parent_id(&self) -> Option<&NodeId> {
        self.references.first(PARENT_ROLE)
    }

    pub fn associated_node_id(&self) -> Option<&NodeId> {
        self.references.first(ASSOCIATED_ROLE)
    }

    pub(crate) fn explicit_sorting_value(&self) -> Option<f64> {
        self.sorting_value
    }

    pub(crate) fn assign_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub(crate) fn touch(&mut self, time: u64) {
        self.modified_time = time;
    }

    /// Replaces the user-visible content with `other`'s, keeping id, kind and ordering.
    pub(crate) fn copy_content_from(&mut self, other: Node) {
        if !other.name.is_empty() {
            self.name = other.name;
        }
        self.references = other.references;
        self.attributes = other.attributes;
    }
}
