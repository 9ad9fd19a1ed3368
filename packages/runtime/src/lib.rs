//! zoneview-runtime: reference-counted views over a distributed runtime
//!
//! A [`RuntimeView`] is one process's handle on the runtime it participates
//! in. It knows which participants exist, what resources each contributes,
//! and which one is the calling process. It also owns the runtime's
//! lifecycle: the first view starts the backend, and the runtime stops when
//! the last alias of that view goes away.
//!
//! ```text
//! RuntimeView ──Arc──▶ RuntimeViewState ──▶ Backend / World / Communicator
//!                            │
//!                            └── ResourceSet (per rank) ──▶ Ram
//! ```
//!
//! Collectives (`gather`, `reduce`) are generic over [`Element`] types and
//! dispatched to the communicator through the tables in [`registry`].
//!
//! # Example
//!
//! ```rust
//! use zoneview_runtime::{ReduceOp, RuntimeView};
//!
//! let view = RuntimeView::from_args(std::env::args()).unwrap();
//! let me = view.my_resource_set().unwrap();
//!
//! // Only the root receives the result.
//! let total = view.reduce(me.rank() as u64, ReduceOp::Sum).unwrap();
//! if me.rank() == 0 {
//!     assert_eq!(total, Some(0));
//! }
//! ```

mod backend;
mod collective;
mod error;
mod logger;
mod ram;
mod resource_set;
mod state;
mod view;

pub mod registry;

pub use backend::{default_backend, set_default_backend};
pub use error::{Error, Result};
pub use logger::Logger;
pub use ram::Ram;
pub use registry::{Element, ReduceOp, TypeTag};
pub use resource_set::ResourceSet;
pub use view::{ResourceRange, RuntimeView};

pub use zoneview_comm::{Backend, CommHandle, Communicator, World};
