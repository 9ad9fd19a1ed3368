//! An in-process reference cluster.
//!
//! `LocalCluster` simulates a distributed runtime inside one process: each
//! participant is a [`LocalBackend`] meant to be driven from its own thread,
//! and collectives meet at a shared rendezvous point.
//! It implements the same [`Backend`] and [`Communicator`] traits a real
//! MPI-style engine would, so everything above this layer is unaware of the
//! difference.
//!
//! # Example
//!
//! ```rust
//! use std::thread;
//! use zoneview_comm::{Backend, LocalCluster, LocalConfig};
//!
//! let cluster = LocalCluster::new(LocalConfig::with_participants(3)).unwrap();
//! let handles: Vec<_> = cluster
//!     .into_backends()
//!     .into_iter()
//!     .map(|backend| {
//!         thread::spawn(move || {
//!             let world = backend.start(&[]).unwrap().into_world();
//!             let size = world.size();
//!             backend.stop().unwrap();
//!             size
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     assert_eq!(handle.join().unwrap(), 3);
//! }
//! ```

mod config;
mod fold;
mod rendezvous;

pub use config::LocalConfig;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;

use crate::error::{CommError, Result};
use crate::handle::{CommHandle, WorldId};
use crate::native::{NativeDatatype, NativeOp};
use crate::traits::{Backend, Communicator, Startup, World};
use rendezvous::Rendezvous;

/// A set of world ranks that communicate together.
struct Group {
    handle: CommHandle,
    /// World ranks, ascending. Position in this list is the group rank.
    members: Vec<usize>,
    rendezvous: Rendezvous,
}

impl Group {
    fn new(handle: CommHandle, members: Vec<usize>) -> Self {
        let rendezvous = Rendezvous::new(members.len());
        Self {
            handle,
            members,
            rendezvous,
        }
    }

    fn group_rank(&self, world_rank: usize) -> Option<usize> {
        self.members.iter().position(|m| *m == world_rank)
    }
}

/// State shared by every participant of a cluster.
struct ClusterShared {
    config: LocalConfig,
    groups: Mutex<BTreeMap<CommHandle, Arc<Group>>>,
}

impl ClusterShared {
    fn new(config: LocalConfig) -> Arc<Self> {
        let world = Group::new(CommHandle::WORLD, (0..config.participants).collect());
        let mut groups = BTreeMap::new();
        groups.insert(CommHandle::WORLD, Arc::new(world));
        Arc::new(Self {
            config,
            groups: Mutex::new(groups),
        })
    }

    fn groups(&self) -> MutexGuard<'_, BTreeMap<CommHandle, Arc<Group>>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn group(&self, handle: CommHandle) -> Result<Arc<Group>> {
        self.groups()
            .get(&handle)
            .cloned()
            .ok_or(CommError::UnknownCommunicator(handle))
    }
}

/// A simulated cluster of participants living in one process.
pub struct LocalCluster {
    shared: Arc<ClusterShared>,
    backends: Vec<Arc<LocalBackend>>,
}

impl LocalCluster {
    /// Create a cluster from a validated configuration.
    pub fn new(config: LocalConfig) -> Result<Self> {
        config.validate()?;
        let shared = ClusterShared::new(config);
        let backends = (0..shared.config.participants)
            .map(|rank| LocalBackend::new(rank, Arc::clone(&shared)))
            .collect();
        Ok(Self { shared, backends })
    }

    /// Number of participants.
    pub fn size(&self) -> usize {
        self.backends.len()
    }

    /// The cluster's configuration.
    pub fn config(&self) -> &LocalConfig {
        &self.shared.config
    }

    /// The backend of one participant.
    pub fn backend(&self, rank: usize) -> Option<Arc<LocalBackend>> {
        self.backends.get(rank).cloned()
    }

    /// Every participant's backend, in rank order.
    pub fn backends(&self) -> &[Arc<LocalBackend>] {
        &self.backends
    }

    /// Consume the cluster into its backends, in rank order.
    pub fn into_backends(self) -> Vec<Arc<LocalBackend>> {
        self.backends
    }

    /// Register a sub-communicator over `members` (world ranks).
    ///
    /// Every participant can resolve the returned handle; participants not in
    /// `members` see a communicator they are not part of.
    pub fn add_group(&self, members: impl IntoIterator<Item = usize>) -> Result<CommHandle> {
        let requested: Vec<usize> = members.into_iter().collect();
        let unique: BTreeSet<usize> = requested.iter().copied().collect();
        if unique.is_empty() {
            return Err(CommError::InvalidGroup("a group needs members".to_string()));
        }
        if unique.len() != requested.len() {
            return Err(CommError::InvalidGroup("duplicate members".to_string()));
        }
        if let Some(rank) = unique.iter().find(|r| **r >= self.size()) {
            return Err(CommError::InvalidGroup(format!(
                "rank {} is not part of a cluster of {}",
                rank,
                self.size()
            )));
        }

        let mut groups = self.shared.groups();
        let next = groups
            .keys()
            .map(|h| h.as_raw())
            .max()
            .unwrap_or(CommHandle::WORLD.as_raw())
            + 1;
        let handle = CommHandle::from_raw(next);
        groups.insert(
            handle,
            Arc::new(Group::new(handle, unique.into_iter().collect())),
        );
        tracing::debug!(%handle, "registered local group");
        Ok(handle)
    }
}

struct Running {
    id: WorldId,
    alive: Arc<AtomicBool>,
    world_comm: Arc<LocalComm>,
}

#[derive(Default)]
struct LocalState {
    running: Option<Running>,
    starts: usize,
    stops: usize,
    last_args: Vec<String>,
}

/// One participant's view of a [`LocalCluster`].
pub struct LocalBackend {
    rank: usize,
    cluster: Arc<ClusterShared>,
    me: Weak<LocalBackend>,
    state: Mutex<LocalState>,
}

impl LocalBackend {
    fn new(rank: usize, cluster: Arc<ClusterShared>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            rank,
            cluster,
            me: me.clone(),
            state: Mutex::new(LocalState::default()),
        })
    }

    /// A single-participant backend with default configuration.
    pub fn single() -> Arc<Self> {
        Self::new(0, ClusterShared::new(LocalConfig::default()))
    }

    /// This participant's world rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// How many times this backend has been started.
    pub fn starts(&self) -> usize {
        self.lock().starts
    }

    /// How many times this backend has been stopped.
    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    /// Arguments passed to the most recent successful start.
    pub fn last_args(&self) -> Vec<String> {
        self.lock().last_args.clone()
    }

    fn lock(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn comm(&self, group: Arc<Group>, alive: Arc<AtomicBool>) -> Arc<LocalComm> {
        Arc::new(LocalComm {
            group,
            world_rank: self.rank,
            cluster: Arc::clone(&self.cluster),
            alive,
        })
    }

    fn world_of(&self, running: &Running) -> Result<World> {
        let backend: Arc<dyn Backend> = self.me.upgrade().ok_or(CommError::NotRunning)?;
        let comm: Arc<dyn Communicator> = running.world_comm.clone();
        Ok(World::new(running.id, comm, backend))
    }
}

impl Backend for LocalBackend {
    fn is_running(&self) -> bool {
        self.lock().running.is_some()
    }

    fn start(&self, args: &[String]) -> Result<Startup> {
        let mut state = self.lock();
        if let Some(running) = &state.running {
            return Ok(Startup::Attached(self.world_of(running)?));
        }

        let alive = Arc::new(AtomicBool::new(true));
        let world_group = self.cluster.group(CommHandle::WORLD)?;
        let running = Running {
            id: WorldId::new(),
            world_comm: self.comm(world_group, Arc::clone(&alive)),
            alive,
        };
        let world = self.world_of(&running)?;

        state.running = Some(running);
        state.starts += 1;
        state.last_args = args.to_vec();
        tracing::debug!(rank = self.rank, world = %world.id(), "local runtime started");
        Ok(Startup::Started(world))
    }

    fn world(&self) -> Result<World> {
        let state = self.lock();
        let running = state.running.as_ref().ok_or(CommError::NotRunning)?;
        self.world_of(running)
    }

    fn communicator(&self, handle: CommHandle) -> Result<Arc<dyn Communicator>> {
        if handle.is_null() {
            return Err(CommError::UnknownCommunicator(handle));
        }
        let state = self.lock();
        let running = state.running.as_ref().ok_or(CommError::NotRunning)?;
        if handle.is_world() {
            return Ok(running.world_comm.clone());
        }
        let group = self.cluster.group(handle)?;
        Ok(self.comm(group, Arc::clone(&running.alive)))
    }

    fn stop(&self) -> Result<()> {
        let mut state = self.lock();
        let running = state.running.take().ok_or(CommError::NotRunning)?;
        running.alive.store(false, Ordering::SeqCst);
        state.stops += 1;
        tracing::debug!(rank = self.rank, world = %running.id, "local runtime stopped");
        Ok(())
    }
}

/// A communicator over one group of a [`LocalCluster`].
pub struct LocalComm {
    group: Arc<Group>,
    world_rank: usize,
    cluster: Arc<ClusterShared>,
    alive: Arc<AtomicBool>,
}

impl LocalComm {
    fn ensure_alive(&self) -> Result<()> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CommError::NotRunning)
        }
    }

    fn check_rank(&self, rank: usize) -> Result<()> {
        if rank < self.size() {
            Ok(())
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.size(),
            })
        }
    }

    /// Validate a collective call and return the caller's group rank.
    fn enter(&self, send: &Bytes, datatype: NativeDatatype, root: usize) -> Result<usize> {
        self.ensure_alive()?;
        let me = self.rank().ok_or(CommError::NotAMember)?;
        self.check_rank(root)?;
        if let Some(width) = datatype.width() {
            if send.len() != width {
                return Err(CommError::MalformedPayload {
                    datatype,
                    len: send.len(),
                });
            }
        }
        Ok(me)
    }
}

impl Communicator for LocalComm {
    fn handle(&self) -> CommHandle {
        self.group.handle
    }

    fn rank(&self) -> Option<usize> {
        self.group.group_rank(self.world_rank)
    }

    fn size(&self) -> usize {
        self.group.members.len()
    }

    fn memory_of(&self, rank: usize) -> Result<u64> {
        self.check_rank(rank)?;
        Ok(self.cluster.config.memory_of(self.group.members[rank]))
    }

    fn gather(
        &self,
        send: Bytes,
        datatype: NativeDatatype,
        root: usize,
    ) -> Result<Option<Vec<Bytes>>> {
        let me = self.enter(&send, datatype, root)?;
        let parts = self.group.rendezvous.exchange(me, send);
        Ok((me == root).then(|| parts.to_vec()))
    }

    fn reduce(
        &self,
        send: Bytes,
        datatype: NativeDatatype,
        op: NativeOp,
        root: usize,
    ) -> Result<Option<Bytes>> {
        let me = self.enter(&send, datatype, root)?;
        fold::check(datatype, op)?;
        let parts = self.group.rendezvous.exchange(me, send);
        if me == root {
            Ok(Some(fold::fold(datatype, op, &parts)?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn run_all<T, F>(cluster: LocalCluster, f: F) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(Arc<LocalBackend>) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handles: Vec<_> = cluster
            .into_backends()
            .into_iter()
            .map(|backend| {
                let f = Arc::clone(&f);
                thread::spawn(move || f(backend))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn single_start_is_idempotent() {
        let backend = LocalBackend::single();
        assert!(!backend.is_running());

        let first = backend.start(&["prog".to_string()]).unwrap();
        assert!(first.started());
        assert!(backend.is_running());

        let second = backend.start(&[]).unwrap();
        assert!(!second.started());
        assert_eq!(first.world(), second.world());
        assert_eq!(backend.starts(), 1);
        assert_eq!(backend.last_args(), vec!["prog".to_string()]);
    }

    #[test]
    fn stop_then_restart_yields_new_world() {
        let backend = LocalBackend::single();
        let first = backend.start(&[]).unwrap().into_world();
        backend.stop().unwrap();
        assert!(!backend.is_running());
        assert!(matches!(backend.stop(), Err(CommError::NotRunning)));
        assert!(matches!(backend.world(), Err(CommError::NotRunning)));

        let second = backend.start(&[]).unwrap();
        assert!(second.started());
        assert_ne!(&first, second.world());
        assert_eq!(backend.starts(), 2);
        assert_eq!(backend.stops(), 1);
    }

    #[test]
    fn stopped_communicator_refuses_collectives() {
        let backend = LocalBackend::single();
        let world = backend.start(&[]).unwrap().into_world();
        backend.stop().unwrap();
        let result = world
            .comm()
            .gather(Bytes::from_static(&[1]), NativeDatatype::UINT8, 0);
        assert!(matches!(result, Err(CommError::NotRunning)));
    }

    #[test]
    fn communicator_resolution() {
        let backend = LocalBackend::single();
        assert!(matches!(
            backend.communicator(CommHandle::WORLD),
            Err(CommError::NotRunning)
        ));
        backend.start(&[]).unwrap();
        assert!(matches!(
            backend.communicator(CommHandle::NULL),
            Err(CommError::UnknownCommunicator(_))
        ));
        assert!(matches!(
            backend.communicator(CommHandle::from_raw(99)),
            Err(CommError::UnknownCommunicator(_))
        ));
        let comm = backend.communicator(CommHandle::WORLD).unwrap();
        assert_eq!(comm.handle(), CommHandle::WORLD);
        assert_eq!(comm.rank(), Some(0));
        assert_eq!(comm.size(), 1);
        assert_eq!(comm.memory_of(0).unwrap(), 1 << 30);
        assert!(matches!(
            comm.memory_of(1),
            Err(CommError::InvalidRank { rank: 1, size: 1 })
        ));
    }

    #[test]
    fn cluster_rejects_bad_config() {
        assert!(LocalCluster::new(LocalConfig::with_participants(0)).is_err());
    }

    #[test]
    fn add_group_validation() {
        let cluster = LocalCluster::new(LocalConfig::with_participants(3)).unwrap();
        assert!(matches!(
            cluster.add_group(Vec::new()),
            Err(CommError::InvalidGroup(_))
        ));
        assert!(matches!(
            cluster.add_group([0, 0]),
            Err(CommError::InvalidGroup(_))
        ));
        assert!(matches!(
            cluster.add_group([1, 5]),
            Err(CommError::InvalidGroup(_))
        ));
        let a = cluster.add_group([2, 0]).unwrap();
        let b = cluster.add_group([1]).unwrap();
        assert_ne!(a, b);
        assert!(!a.is_world() && !a.is_null());
    }

    #[test]
    fn gather_only_root_receives() {
        let cluster = LocalCluster::new(LocalConfig::with_participants(4)).unwrap();
        let results = run_all(cluster, |backend| {
            let world = backend.start(&[]).unwrap().into_world();
            let rank = world.rank().unwrap() as u32;
            let out = world
                .comm()
                .gather(
                    Bytes::copy_from_slice(&rank.to_le_bytes()),
                    NativeDatatype::UINT32,
                    2,
                )
                .unwrap();
            (rank, out)
        });

        for (rank, out) in results {
            if rank == 2 {
                let parts = out.unwrap();
                let values: Vec<u32> = parts
                    .iter()
                    .map(|p| u32::from_le_bytes([p[0], p[1], p[2], p[3]]))
                    .collect();
                assert_eq!(values, vec![0, 1, 2, 3]);
            } else {
                assert!(out.is_none());
            }
        }
    }

    #[test]
    fn reduce_sums_across_ranks() {
        let cluster = LocalCluster::new(LocalConfig::with_participants(5)).unwrap();
        let results = run_all(cluster, |backend| {
            let world = backend.start(&[]).unwrap().into_world();
            let value = (world.rank().unwrap() as i64 + 1).to_le_bytes();
            world
                .comm()
                .reduce(
                    Bytes::copy_from_slice(&value),
                    NativeDatatype::INT64,
                    NativeOp::SUM,
                    0,
                )
                .unwrap()
        });

        let populated: Vec<_> = results.iter().filter(|r| r.is_some()).collect();
        assert_eq!(populated.len(), 1);
        let bytes = populated[0].as_ref().unwrap();
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        assert_eq!(i64::from_le_bytes(buf), 15);
    }

    #[test]
    fn collective_argument_errors() {
        let backend = LocalBackend::single();
        let world = backend.start(&[]).unwrap().into_world();
        let comm = world.comm();
        assert!(matches!(
            comm.gather(Bytes::from_static(&[1]), NativeDatatype::UINT8, 3),
            Err(CommError::InvalidRank { rank: 3, .. })
        ));
        assert!(matches!(
            comm.gather(Bytes::from_static(&[1, 2]), NativeDatatype::UINT8, 0),
            Err(CommError::MalformedPayload { len: 2, .. })
        ));
        assert!(matches!(
            comm.reduce(
                Bytes::copy_from_slice(&1.0f64.to_le_bytes()),
                NativeDatatype::DOUBLE,
                NativeOp::BXOR,
                0
            ),
            Err(CommError::UnsupportedOp { .. })
        ));
    }

    #[test]
    fn group_membership() {
        let cluster = LocalCluster::new(LocalConfig::with_participants(3)).unwrap();
        let group = cluster.add_group([0, 2]).unwrap();
        let results = run_all(cluster, move |backend| {
            backend.start(&[]).unwrap();
            let comm = backend.communicator(group).unwrap();
            let rank = comm.rank();
            let size = comm.size();
            let out = if rank.is_some() {
                comm.gather(Bytes::from(vec![backend.rank() as u8]), NativeDatatype::UINT8, 0)
                    .unwrap()
            } else {
                assert!(matches!(
                    comm.gather(Bytes::from_static(&[9]), NativeDatatype::UINT8, 0),
                    Err(CommError::NotAMember)
                ));
                None
            };
            (backend.rank(), rank, size, out)
        });

        for (world_rank, rank, size, out) in results {
            assert_eq!(size, 2);
            match world_rank {
                0 => {
                    assert_eq!(rank, Some(0));
                    let parts = out.unwrap();
                    assert_eq!(parts, vec![Bytes::from_static(&[0]), Bytes::from_static(&[2])]);
                }
                1 => assert_eq!(rank, None),
                _ => {
                    assert_eq!(rank, Some(1));
                    assert!(out.is_none());
                }
            }
        }
    }
}
