use mosaic_ids::{IdError, NodeId};
use mosaic_scene::ParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors returned by scene operations. A failed call leaves the scene unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Id registration failed; `IdError::Duplicate` is the duplicate-id case.
    #[error(transparent)]
    Id(#[from] IdError),

    #[error("node `{0}` not found")]
    NodeNotFound(NodeId),

    #[error("id `{id}` is reserved for the {owner} singleton")]
    ReservedId { id: NodeId, owner: &'static str },

    #[error("node `{0}` cannot be its own parent")]
    SelfParent(NodeId),

    #[error("parenting `{child}` under `{parent}` would create a cycle")]
    CyclicHierarchy { child: NodeId, parent: NodeId },

    #[error("node `{0}` has no hierarchy parent")]
    NoParent(NodeId),

    #[error("index {index} outside the range 0..{len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Reasons an import batch is rejected. Nothing from a rejected batch is attached.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("scene text: {0}")]
    Parse(#[from] ParseError),

    #[error("record `{id}` has unknown node type `{tag}`")]
    UnknownNodeType { id: NodeId, tag: String },

    #[error("record `{id}` declares the id reserved for the {owner} singleton")]
    ReservedId { id: NodeId, owner: &'static str },

    #[error("record id `{0}` is not a valid node id")]
    InvalidId(String),

    #[error("record `{id}` references malformed id `{target}` in `{role}`")]
    InvalidReference {
        id: NodeId,
        role: String,
        target: String,
    },

    #[error("import rolled back: {0}")]
    Internal(String),
}

impl From<ParseError> for SceneError {
    fn from(value: ParseError) -> Self {
        Self::Import(ImportError::Parse(value))
    }
}
