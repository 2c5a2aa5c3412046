//! Document loading errors

use crate::id::NodeId;
use thiserror::Error;

/// Errors raised while building a [`Document`](crate::Document) from an
/// interchange source. Rendering itself never fails.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Malformed JSON source
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed MessagePack source
    #[error("MessagePack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// MessagePack encoding failed
    #[error("MessagePack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// The root element is not a group
    #[error("root element {0} must be a group")]
    RootNotGroup(NodeId),

    /// Only groups may contain children
    #[error("{kind} element {id} cannot contain children")]
    ChildrenOnShape { id: NodeId, kind: &'static str },

    /// Two elements declare the same id
    #[error("duplicate element id {0}")]
    DuplicateId(NodeId),

    /// A numeric attribute is outside its valid domain
    #[error("{id}: invalid {attribute} value {value}")]
    InvalidValue {
        id: NodeId,
        attribute: &'static str,
        value: f64,
    },
}
