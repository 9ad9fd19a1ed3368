//! Error types for the runtime layer.

use thiserror::Error;
use zoneview_comm::CommError;

use crate::registry::{ReduceOp, TypeTag};

/// Errors raised by views, resource sets and RAM.
///
/// These include semantic errors (null views, bad indices, unregistered
/// element types) in addition to failures from the communication layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The view has no runtime behind it.
    #[error("{0} requires a non-null runtime view")]
    NullView(&'static str),

    /// A resource set index is past the end of the view.
    #[error("resource set index {index} out of range for view of size {size}")]
    OutOfRange { index: usize, size: usize },

    /// The current process has no resource set in this view.
    #[error("the current process is not part of this runtime view")]
    NotAMember,

    /// RAM that no resource set owns cannot run collectives.
    #[error("RAM is not attached to a resource set")]
    Unattached,

    /// The element type has no native datatype.
    #[error("no native datatype registered for {0}")]
    UnsupportedType(TypeTag),

    /// The reduction is not registered for the element type.
    #[error("operation {op} is not registered for {tag}")]
    UnsupportedOperation { tag: TypeTag, op: ReduceOp },

    /// A collective result could not be decoded.
    #[error("malformed {0} payload")]
    Payload(TypeTag),

    /// The operation cannot be carried out on this object.
    #[error("{0} is not supported")]
    NotSupported(&'static str),

    /// Error from the communication layer.
    #[error("comm error: {0}")]
    Comm(#[from] CommError),

    /// Serde encoding failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = Error::NullView("at");
        assert_eq!(e.to_string(), "at requires a non-null runtime view");

        let e = Error::OutOfRange { index: 3, size: 3 };
        assert!(e.to_string().contains("index 3"));

        let e = Error::UnsupportedOperation {
            tag: TypeTag::F64,
            op: ReduceOp::BitAnd,
        };
        assert_eq!(e.to_string(), "operation bit_and is not registered for f64");
    }

    #[test]
    fn comm_error_converts() {
        let e: Error = CommError::NotRunning.into();
        assert!(matches!(e, Error::Comm(CommError::NotRunning)));
        assert_eq!(e.to_string(), "comm error: runtime is not running");
    }
}
