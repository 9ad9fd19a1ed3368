//! Error types for the communication layer.
//!
//! Errors at this level are about transports and runtimes: a backend that is
//! not running, a communicator that cannot be resolved, a payload the wire
//! cannot carry. Semantic errors (null views, bad indices) belong in higher
//! layers.

use thiserror::Error;

use crate::handle::CommHandle;
use crate::native::{NativeDatatype, NativeOp};

/// Errors raised by communicators and backends.
#[derive(Debug, Error)]
pub enum CommError {
    /// The runtime has not been started, or has already been stopped.
    #[error("runtime is not running")]
    NotRunning,

    /// The backend does not know this communicator.
    #[error("unknown communicator: {0}")]
    UnknownCommunicator(CommHandle),

    /// A rank (collective root or queried participant) is out of range.
    #[error("invalid rank {rank} for communicator of size {size}")]
    InvalidRank { rank: usize, size: usize },

    /// The calling process is not part of the communicator.
    #[error("calling process is not a member of the communicator")]
    NotAMember,

    /// The communicator cannot carry this datatype.
    #[error("unsupported datatype: {0}")]
    UnsupportedDatatype(NativeDatatype),

    /// The reduction is not defined for this datatype.
    #[error("unsupported operation {op} for datatype {datatype}")]
    UnsupportedOp {
        op: NativeOp,
        datatype: NativeDatatype,
    },

    /// A payload has the wrong length for its datatype.
    #[error("malformed {datatype} payload of {len} bytes")]
    MalformedPayload { datatype: NativeDatatype, len: usize },

    /// A resource limit was exceeded.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A participant group could not be formed.
    #[error("invalid group: {0}")]
    InvalidGroup(String),

    /// A configuration could not be loaded or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Generic transport failure.
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl From<std::io::Error> for CommError {
    fn from(e: std::io::Error) -> Self {
        CommError::Transport(Box::new(e))
    }
}

impl From<serde_json::Error> for CommError {
    fn from(e: serde_json::Error) -> Self {
        CommError::Config(e.to_string())
    }
}

/// Result type alias for communication operations.
pub type Result<T> = std::result::Result<T, CommError>;
