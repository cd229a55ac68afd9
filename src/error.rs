//! Error taxonomy for editing and persistence operations.
//!
//! The layout pass never returns these: it absorbs failures locally and logs them.

use crate::model::{NodeId, PortId, ResourceKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no primary process to anchor the layout")]
    MissingAnchor,
    #[error("footprint of node {0} is not available yet")]
    MeasurementUnavailable(NodeId),
    #[error("node {node} has no port at field path '{field_path}'")]
    PortNotFound { node: NodeId, field_path: String },
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("unknown port {0}")]
    UnknownPort(PortId),
    #[error("cannot connect port {from} to port {to}: {reason}")]
    InvalidConnection {
        from: PortId,
        to: PortId,
        reason: &'static str,
    },
    #[error("node {0} is not a resource")]
    NotAResource(NodeId),
    #[error("{kind:?} resource is not valid for node {node} here")]
    UnexpectedKind { node: NodeId, kind: ResourceKind },
    #[error("node {0} is not a process")]
    NotAProcess(NodeId),
    #[error("no {0} ids left to allocate")]
    IdsExhausted(&'static str),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
