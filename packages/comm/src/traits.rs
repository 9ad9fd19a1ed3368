//! Collaborator traits: the communicator and the runtime backend.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::handle::{CommHandle, WorldId};
use crate::native::{NativeDatatype, NativeOp};

/// A group of participants that can run collective operations.
///
/// Collectives are blocking: every member must call the same collective, in
/// the same order relative to other collectives, or the behavior is up to the
/// transport. Implementations are not required to detect mismatched call
/// sequences.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn Communicator>`.
pub trait Communicator: Send + Sync {
    /// The handle identifying this communicator.
    fn handle(&self) -> CommHandle;

    /// Rank of the calling process, or `None` if it is not a member.
    fn rank(&self) -> Option<usize>;

    /// Number of participants.
    fn size(&self) -> usize;

    /// Total memory, in bytes, directly accessible to `rank`.
    fn memory_of(&self, rank: usize) -> Result<u64>;

    /// Gather one element from every participant onto `root`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(parts))` - On `root`: one payload per rank, in rank order.
    /// * `Ok(None)` - On every other rank.
    fn gather(&self, send: Bytes, datatype: NativeDatatype, root: usize)
        -> Result<Option<Vec<Bytes>>>;

    /// Reduce one element from every participant onto `root`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(result))` - On `root`: the reduced element.
    /// * `Ok(None)` - On every other rank.
    fn reduce(
        &self,
        send: Bytes,
        datatype: NativeDatatype,
        op: NativeOp,
        root: usize,
    ) -> Result<Option<Bytes>>;
}

/// A handle to one running instance of a distributed runtime.
///
/// Cloning a `World` does not extend the lifetime of the runtime; it only
/// aliases it. Whoever started the runtime decides when it stops.
#[derive(Clone)]
pub struct World {
    id: WorldId,
    comm: Arc<dyn Communicator>,
    backend: Arc<dyn Backend>,
}

impl World {
    /// Create a world handle. Backends call this when they start.
    pub fn new(id: WorldId, comm: Arc<dyn Communicator>, backend: Arc<dyn Backend>) -> Self {
        Self { id, comm, backend }
    }

    /// Identity of this runtime instance.
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// The communicator spanning every participant.
    pub fn comm(&self) -> &Arc<dyn Communicator> {
        &self.comm
    }

    /// Handle of the world communicator.
    pub fn handle(&self) -> CommHandle {
        self.comm.handle()
    }

    /// Rank of the calling process in the world.
    pub fn rank(&self) -> Option<usize> {
        self.comm.rank()
    }

    /// Number of participants in the world.
    pub fn size(&self) -> usize {
        self.comm.size()
    }

    /// The backend this world belongs to.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}

impl PartialEq for World {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for World {}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("handle", &self.handle())
            .field("rank", &self.rank())
            .field("size", &self.size())
            .finish()
    }
}

/// Outcome of asking a backend to start.
#[derive(Debug, Clone)]
pub enum Startup {
    /// This call started the runtime. The caller owns teardown.
    Started(World),
    /// The runtime was already running. The caller only aliases it.
    Attached(World),
}

impl Startup {
    /// Did this call start the runtime?
    pub fn started(&self) -> bool {
        matches!(self, Startup::Started(_))
    }

    /// The world handle.
    pub fn world(&self) -> &World {
        match self {
            Startup::Started(world) | Startup::Attached(world) => world,
        }
    }

    /// Consume into the world handle.
    pub fn into_world(self) -> World {
        match self {
            Startup::Started(world) | Startup::Attached(world) => world,
        }
    }
}

/// A process-wide distributed runtime engine.
///
/// A backend is started at most once at a time. `start` is idempotent: if the
/// runtime is already running it is attached to, never started twice. The
/// check and the start happen atomically with respect to other `start` calls.
pub trait Backend: Send + Sync {
    /// Is the runtime currently running?
    fn is_running(&self) -> bool;

    /// Start the runtime with the program's arguments, or attach to it.
    fn start(&self, args: &[String]) -> Result<Startup>;

    /// The running world.
    fn world(&self) -> Result<World>;

    /// Resolve a communicator handle.
    fn communicator(&self, handle: CommHandle) -> Result<Arc<dyn Communicator>>;

    /// Stop the runtime.
    ///
    /// Returns [`CommError::NotRunning`](crate::CommError::NotRunning) if it
    /// is not running.
    fn stop(&self) -> Result<()>;
}
