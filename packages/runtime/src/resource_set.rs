//! Per-participant resource descriptors.

use std::sync::Arc;

use zoneview_comm::Communicator;

use crate::error::Result;
use crate::ram::Ram;
use crate::registry::{Element, ReduceOp};

/// The resources one participant contributes to a runtime view.
///
/// Resource sets are created when a view is populated and never change
/// afterwards. Two sets are equal when they have the same rank and
/// value-equal RAM.
#[derive(Debug, Clone)]
pub struct ResourceSet {
    rank: usize,
    ram: Ram,
    is_mine: bool,
}

impl ResourceSet {
    pub(crate) fn new(
        rank: usize,
        total_memory: u64,
        is_mine: bool,
        comm: Arc<dyn Communicator>,
    ) -> Self {
        Self {
            rank,
            ram: Ram::owned(total_memory, rank, comm),
            is_mine,
        }
    }

    /// Rank of the participant these resources belong to.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    /// Does this participant have any memory?
    pub fn has_ram(&self) -> bool {
        !self.ram.is_empty()
    }

    /// Does this set describe the calling process?
    pub fn is_mine(&self) -> bool {
        self.is_mine
    }

    /// Gather `value` from every participant onto this set's rank.
    pub fn gather<T: Element>(&self, value: T) -> Result<Option<Vec<T>>> {
        self.ram.gather(value)
    }

    /// Reduce `value` across participants onto this set's rank.
    pub fn reduce<T: Element>(&self, value: T, op: ReduceOp) -> Result<Option<T>> {
        self.ram.reduce(value, op)
    }
}

impl PartialEq for ResourceSet {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.ram == other.ram
    }
}

impl Eq for ResourceSet {}

#[cfg(test)]
mod tests {
    use super::*;
    use zoneview_comm::{Backend, LocalBackend};

    fn comm() -> (Arc<LocalBackend>, Arc<dyn Communicator>) {
        let backend = LocalBackend::single();
        let world = backend.start(&[]).unwrap().into_world();
        let comm = Arc::clone(world.comm());
        (backend, comm)
    }

    #[test]
    fn accessors() {
        let (_backend, comm) = comm();
        let set = ResourceSet::new(0, 128, true, comm);
        assert_eq!(set.rank(), 0);
        assert_eq!(set.ram().total_space(), 128);
        assert_eq!(set.ram().owner_rank(), Some(0));
        assert!(set.has_ram());
        assert!(set.is_mine());
    }

    #[test]
    fn no_memory_means_no_ram() {
        let (_backend, comm) = comm();
        let set = ResourceSet::new(0, 0, false, comm);
        assert!(!set.has_ram());
        assert!(!set.is_mine());
    }

    #[test]
    fn equality_ignores_membership() {
        let (_backend, comm) = comm();
        let a = ResourceSet::new(0, 64, true, Arc::clone(&comm));
        let b = ResourceSet::new(0, 64, false, Arc::clone(&comm));
        let c = ResourceSet::new(1, 64, false, Arc::clone(&comm));
        let d = ResourceSet::new(0, 32, true, comm);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn collectives_forward_to_ram() {
        let (_backend, comm) = comm();
        let set = ResourceSet::new(0, 64, true, comm);
        assert_eq!(set.gather(5i64).unwrap(), Some(vec![5]));
        assert_eq!(set.reduce(5i64, ReduceOp::Product).unwrap(), Some(5));
    }
}
