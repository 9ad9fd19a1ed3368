//! zoneview-comm: communicators and runtime backends
//!
//! This is the narrow waist under zoneview. Everything at this level is
//! payload bytes tagged with a native datatype: no element types, no views,
//! no resource bookkeeping.
//!
//! A [`Backend`] owns the lifecycle of a distributed runtime. Starting it
//! yields a [`World`], whose [`Communicator`] runs blocking collectives over
//! every participant. Sub-communicators are resolved by [`CommHandle`].
//!
//! The [`local`] module provides an in-process cluster that implements both
//! traits, with one participant per thread.
//!
//! # Example
//!
//! ```rust
//! use zoneview_comm::{Backend, Bytes, LocalBackend, NativeDatatype, NativeOp};
//!
//! let backend = LocalBackend::single();
//! let startup = backend.start(&[]).unwrap();
//! assert!(startup.started());
//!
//! let world = startup.into_world();
//! let sum = world
//!     .comm()
//!     .reduce(Bytes::copy_from_slice(&7i32.to_le_bytes()), NativeDatatype::INT32, NativeOp::SUM, 0)
//!     .unwrap();
//! assert_eq!(sum.unwrap().as_ref(), &7i32.to_le_bytes());
//!
//! backend.stop().unwrap();
//! ```

pub use bytes::Bytes;

mod error;
mod handle;
mod native;
mod traits;

pub mod local;

pub use error::{CommError, Result};
pub use handle::{CommHandle, WorldId};
pub use local::{LocalBackend, LocalCluster, LocalComm, LocalConfig};
pub use native::{NativeDatatype, NativeOp};
pub use traits::{Backend, Communicator, Startup, World};
