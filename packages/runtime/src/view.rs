//! The user-facing runtime view.

use std::fmt;
use std::sync::{Arc, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use zoneview_comm::{Backend, CommHandle, Communicator, World};

use crate::backend::default_backend;
use crate::collective;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::ram::Ram;
use crate::registry::{Element, ReduceOp};
use crate::resource_set::ResourceSet;
use crate::state::RuntimeViewState;

/// Rank of the participant collectives on a view are rooted at.
const ROOT: usize = 0;

/// A reference-counted view of the runtime this process belongs to.
///
/// Cloning a view aliases the same underlying state. The first view built
/// against a stopped backend starts the runtime; when the last alias of that
/// view is dropped, the runtime is stopped again. Views built while the
/// runtime is already running only attach to it.
///
/// A default-constructed view is *null*: it has no runtime behind it, its
/// size is zero, and every query that needs the runtime fails with
/// [`Error::NullView`].
///
/// ```rust
/// use zoneview_runtime::RuntimeView;
///
/// let view = RuntimeView::from_args(["demo"]).unwrap();
/// assert!(view.did_i_start_runtime());
/// assert_eq!(view.size(), 1);
/// assert!(view.has_me().unwrap());
///
/// let alias = view.clone();
/// assert!(alias.did_i_start_runtime());
///
/// assert!(RuntimeView::new().is_null());
/// ```
#[derive(Clone, Default)]
pub struct RuntimeView {
    state: Option<Arc<RuntimeViewState>>,
}

impl RuntimeView {
    /// A null view.
    pub fn new() -> Self {
        Self::default()
    }

    /// View of the whole world, passing `args` to the default backend.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_args_and_comm(args, CommHandle::WORLD)
    }

    /// View of the communicator `handle` on the default backend.
    pub fn from_comm(handle: CommHandle) -> Result<Self> {
        Self::with_args_and_comm(Vec::<String>::new(), handle)
    }

    /// View of an existing world, through that world's own backend.
    pub fn from_world(world: &World) -> Result<Self> {
        Self::with_backend(Arc::clone(world.backend()), &[], world.handle())
    }

    /// View of the communicator `handle`, passing `args` to the default backend.
    pub fn with_args_and_comm<I, S>(args: I, handle: CommHandle) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        Self::with_backend(default_backend(), &args, handle)
    }

    /// View of the communicator `handle` on an explicit backend.
    ///
    /// Starts the backend if it is not running. If anything fails after the
    /// backend was started here, it is stopped again before the error is
    /// returned.
    pub fn with_backend(
        backend: Arc<dyn Backend>,
        args: &[String],
        handle: CommHandle,
    ) -> Result<Self> {
        let state = RuntimeViewState::start(backend, args, handle)?;
        Ok(Self {
            state: Some(Arc::new(state)),
        })
    }

    fn state(&self, op: &'static str) -> Result<&RuntimeViewState> {
        self.state.as_deref().ok_or(Error::NullView(op))
    }

    /// Handle of the communicator this view spans. `NULL` for a null view.
    pub fn comm(&self) -> CommHandle {
        self.state
            .as_ref()
            .map_or(CommHandle::NULL, |s| s.comm().handle())
    }

    /// The communicator this view spans.
    pub fn communicator(&self) -> Result<&Arc<dyn Communicator>> {
        Ok(self.state("communicator")?.comm())
    }

    /// The runtime instance behind this view.
    pub fn world(&self) -> Result<&World> {
        Ok(self.state("world")?.world())
    }

    /// Number of resource sets. Zero for a null view.
    pub fn size(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.resource_sets().len())
    }

    pub fn is_null(&self) -> bool {
        self.state.is_none()
    }

    /// Did constructing this view's state start the runtime?
    pub fn did_i_start_runtime(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.started_runtime())
    }

    /// The resource set of rank `index`.
    ///
    /// Resource sets are fixed once the view is populated and every alias
    /// shares them, so there is no `at_mut`. The loggers are the only
    /// per-view data that can change; replace them with
    /// [`set_progress_logger`](Self::set_progress_logger) and
    /// [`set_debug_logger`](Self::set_debug_logger).
    pub fn at(&self, index: usize) -> Result<&ResourceSet> {
        let state = self.state("at")?;
        state.resource_sets().get(&index).ok_or(Error::OutOfRange {
            index,
            size: state.resource_sets().len(),
        })
    }

    /// Is the calling process one of this view's participants?
    pub fn has_me(&self) -> Result<bool> {
        Ok(self
            .state("has_me")?
            .resource_sets()
            .values()
            .any(ResourceSet::is_mine))
    }

    /// The resource set describing the calling process.
    pub fn my_resource_set(&self) -> Result<&ResourceSet> {
        self.state("my_resource_set")?
            .resource_sets()
            .values()
            .find(|set| set.is_mine())
            .ok_or(Error::NotAMember)
    }

    /// Number of resource sets whose RAM equals `ram`.
    pub fn count(&self, ram: &Ram) -> Result<usize> {
        Ok(self.equal_range(ram)?.len())
    }

    /// The resource sets whose RAM equals `ram`, in rank order.
    pub fn equal_range(&self, ram: &Ram) -> Result<ResourceRange<'_>> {
        let sets = self
            .state("equal_range")?
            .resource_sets()
            .values()
            .filter(|set| set.ram() == ram)
            .collect();
        Ok(ResourceRange { sets })
    }

    /// Every resource set in rank order. Empty for a null view.
    pub fn resource_sets(&self) -> impl Iterator<Item = &ResourceSet> + '_ {
        self.state
            .iter()
            .flat_map(|s| s.resource_sets().values())
    }

    /// Logger for progress messages. Shared by every alias of this view.
    pub fn progress_logger(&self) -> Result<MutexGuard<'_, Logger>> {
        Ok(self.state("progress_logger")?.progress_logger())
    }

    /// Logger for debug output. Shared by every alias of this view.
    pub fn debug_logger(&self) -> Result<MutexGuard<'_, Logger>> {
        Ok(self.state("debug_logger")?.debug_logger())
    }

    pub fn set_progress_logger(&self, logger: Logger) -> Result<()> {
        *self.state("set_progress_logger")?.progress_logger() = logger;
        Ok(())
    }

    pub fn set_debug_logger(&self, logger: Logger) -> Result<()> {
        *self.state("set_debug_logger")?.debug_logger() = logger;
        Ok(())
    }

    /// Gather `value` from every participant onto rank 0.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(values))` - On rank 0, one value per rank in rank order.
    /// * `Ok(None)` - On every other rank.
    pub fn gather<T: Element>(&self, value: T) -> Result<Option<Vec<T>>> {
        collective::gather(self.state("gather")?.comm().as_ref(), value, ROOT)
    }

    /// Gather any serde value from every participant onto rank 0.
    pub fn gather_serialized<T>(&self, value: &T) -> Result<Option<Vec<T>>>
    where
        T: Serialize + DeserializeOwned,
    {
        let state = self.state("gather_serialized")?;
        collective::gather_serialized(state.comm().as_ref(), value, ROOT)
    }

    /// Reduce `value` across participants onto rank 0.
    pub fn reduce<T: Element>(&self, value: T, op: ReduceOp) -> Result<Option<T>> {
        collective::reduce(self.state("reduce")?.comm().as_ref(), value, op, ROOT)
    }

    pub fn swap(&mut self, other: &mut RuntimeView) {
        std::mem::swap(&mut self.state, &mut other.state);
    }

    /// Move the state out, leaving this view null.
    pub fn take(&mut self) -> RuntimeView {
        RuntimeView {
            state: self.state.take(),
        }
    }

    /// Do both views describe the same communicator of the same runtime,
    /// with the same resource sets?
    pub fn try_eq(&self, other: &RuntimeView) -> Result<bool> {
        let lhs = self.state("eq")?;
        let rhs = other.state("eq")?;
        if std::ptr::eq(lhs, rhs) {
            return Ok(true);
        }
        Ok(lhs.comm().handle() == rhs.comm().handle()
            && lhs.world() == rhs.world()
            && lhs.resource_sets() == rhs.resource_sets())
    }

    pub fn try_ne(&self, other: &RuntimeView) -> Result<bool> {
        self.try_eq(other).map(|eq| !eq)
    }
}

impl fmt::Debug for RuntimeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            None => f.write_str("RuntimeView(null)"),
            Some(state) => f
                .debug_struct("RuntimeView")
                .field("comm", &state.comm().handle())
                .field("world", &state.world().id())
                .field("size", &state.resource_sets().len())
                .field("started_runtime", &state.started_runtime())
                .finish(),
        }
    }
}

/// Resource sets matching a query, in rank order.
#[derive(Debug, Clone)]
pub struct ResourceRange<'a> {
    sets: Vec<&'a ResourceSet>,
}

impl<'a> ResourceRange<'a> {
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn first(&self) -> Option<&'a ResourceSet> {
        self.sets.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ResourceSet> + '_ {
        self.sets.iter().copied()
    }
}

impl<'a> IntoIterator for ResourceRange<'a> {
    type Item = &'a ResourceSet;
    type IntoIter = std::vec::IntoIter<&'a ResourceSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.into_iter()
    }
}
