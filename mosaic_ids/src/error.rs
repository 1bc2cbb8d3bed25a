use thiserror::Error;

use crate::NodeId;

pub type Result<T> = std::result::Result<T, IdError>;

/// Errors raised by the id registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("node id `{0}` is already in use")]
    Duplicate(NodeId),

    #[error("node id is empty")]
    Empty,

    #[error("node id `{0}` is malformed")]
    Malformed(String),
}
