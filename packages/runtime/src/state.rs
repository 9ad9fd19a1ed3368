//! Shared state behind every alias of a runtime view.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use zoneview_comm::{Backend, CommHandle, Communicator, World};

use crate::error::Result;
use crate::logger::{self, Logger};
use crate::resource_set::ResourceSet;

/// One start-up of a runtime as seen by one process.
///
/// Whoever holds the last reference to this state tears it down. If this
/// state's construction started the runtime, teardown stops it again.
pub(crate) struct RuntimeViewState {
    started_runtime: bool,
    backend: Arc<dyn Backend>,
    world: World,
    comm: Arc<dyn Communicator>,
    resource_sets: BTreeMap<usize, ResourceSet>,
    progress_logger: Mutex<Logger>,
    debug_logger: Mutex<Logger>,
}

impl RuntimeViewState {
    /// Start (or attach to) the runtime and describe the participants of
    /// `handle`.
    pub(crate) fn start(
        backend: Arc<dyn Backend>,
        args: &[String],
        handle: CommHandle,
    ) -> Result<Self> {
        let startup = backend.start(args)?;
        let started_runtime = startup.started();
        let world = startup.into_world();
        debug!(
            world = %world.id(),
            started = started_runtime,
            comm = %handle,
            "runtime view attached"
        );

        // From here on, dropping `state` undoes the start-up.
        let mut state = Self {
            started_runtime,
            comm: Arc::clone(world.comm()),
            backend,
            world,
            resource_sets: BTreeMap::new(),
            progress_logger: Mutex::new(Logger::null()),
            debug_logger: Mutex::new(Logger::null()),
        };
        state.comm = state.backend.communicator(handle)?;
        state.populate()?;
        Ok(state)
    }

    fn populate(&mut self) -> Result<()> {
        let me = self.comm.rank();
        for rank in 0..self.comm.size() {
            let memory = self.comm.memory_of(rank)?;
            let set = ResourceSet::new(rank, memory, me == Some(rank), Arc::clone(&self.comm));
            self.resource_sets.insert(rank, set);
        }

        let (progress, debug) = logger::root_only(me);
        self.progress_logger = Mutex::new(progress);
        self.debug_logger = Mutex::new(debug);

        debug!(
            comm = %self.comm.handle(),
            size = self.resource_sets.len(),
            rank = ?me,
            "resource sets populated"
        );
        Ok(())
    }

    pub(crate) fn started_runtime(&self) -> bool {
        self.started_runtime
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn comm(&self) -> &Arc<dyn Communicator> {
        &self.comm
    }

    pub(crate) fn resource_sets(&self) -> &BTreeMap<usize, ResourceSet> {
        &self.resource_sets
    }

    pub(crate) fn progress_logger(&self) -> MutexGuard<'_, Logger> {
        self.progress_logger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn debug_logger(&self) -> MutexGuard<'_, Logger> {
        self.debug_logger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RuntimeViewState {
    fn drop(&mut self) {
        self.resource_sets.clear();

        for logger in [&mut self.progress_logger, &mut self.debug_logger] {
            let logger = logger.get_mut().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = logger.flush() {
                warn!(error = %e, kind = logger.kind(), "failed to flush logger");
            }
        }

        if !self.started_runtime {
            return;
        }
        match self.backend.stop() {
            Ok(()) => info!(world = %self.world.id(), "runtime stopped"),
            Err(e) => warn!(world = %self.world.id(), error = %e, "failed to stop runtime"),
        }
    }
}
