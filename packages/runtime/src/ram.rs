//! Memory regions visible to one participant.

use std::fmt;
use std::sync::Arc;

use zoneview_comm::Communicator;

use crate::collective;
use crate::error::{Error, Result};
use crate::registry::{Element, ReduceOp};

#[derive(Clone)]
struct RamOwner {
    rank: usize,
    comm: Arc<dyn Communicator>,
}

#[derive(Clone)]
struct RamState {
    total_size: u64,
    owner: Option<RamOwner>,
}

/// A handle to a region of memory belonging to one resource set.
///
/// `Ram` is a value type: cloning copies the description, and comparing two
/// values compares capacity only, not which participant holds the memory.
/// All empty values are equal, so `Ram::with_size(0) == Ram::new()`.
///
/// RAM obtained from a [`ResourceSet`](crate::ResourceSet) is attached to
/// that set's rank and can run collectives rooted there. RAM built directly
/// with [`Ram::with_size`] is unattached.
///
/// ```rust
/// use zoneview_runtime::Ram;
///
/// let a = Ram::with_size(1024);
/// let b = a.clone();
/// assert_eq!(a, b);
/// assert!(!a.is_empty());
/// assert!(Ram::new().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct Ram {
    inner: Option<Box<RamState>>,
}

impl Ram {
    /// An empty RAM handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A RAM handle describing `total_size` bytes.
    pub fn with_size(total_size: u64) -> Self {
        Self {
            inner: Some(Box::new(RamState {
                total_size,
                owner: None,
            })),
        }
    }

    /// RAM of `rank`, as seen through `comm`.
    pub(crate) fn owned(total_size: u64, rank: usize, comm: Arc<dyn Communicator>) -> Self {
        Self {
            inner: Some(Box::new(RamState {
                total_size,
                owner: Some(RamOwner { rank, comm }),
            })),
        }
    }

    /// Total capacity in bytes. Zero for empty RAM.
    pub fn total_space(&self) -> u64 {
        self.inner.as_ref().map_or(0, |s| s.total_size)
    }

    /// True when there is no state or the capacity is zero.
    pub fn is_empty(&self) -> bool {
        self.total_space() == 0
    }

    /// Rank of the resource set this RAM belongs to, if any.
    pub fn owner_rank(&self) -> Option<usize> {
        self.owner().map(|o| o.rank)
    }

    pub fn swap(&mut self, other: &mut Ram) {
        std::mem::swap(&mut self.inner, &mut other.inner);
    }

    /// Move the state out, leaving this handle empty.
    pub fn take(&mut self) -> Ram {
        Ram {
            inner: self.inner.take(),
        }
    }

    /// Gather `value` from every participant onto the rank owning this RAM.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(values))` - On the owning rank, one value per rank in rank order.
    /// * `Ok(None)` - On every other rank.
    pub fn gather<T: Element>(&self, value: T) -> Result<Option<Vec<T>>> {
        let owner = self.owner().ok_or(Error::Unattached)?;
        collective::gather(owner.comm.as_ref(), value, owner.rank)
    }

    /// Reduce `value` across participants onto the rank owning this RAM.
    pub fn reduce<T: Element>(&self, value: T, op: ReduceOp) -> Result<Option<T>> {
        let owner = self.owner().ok_or(Error::Unattached)?;
        collective::reduce(owner.comm.as_ref(), value, op, owner.rank)
    }

    fn owner(&self) -> Option<&RamOwner> {
        self.inner.as_ref().and_then(|s| s.owner.as_ref())
    }
}

impl PartialEq for Ram {
    fn eq(&self, other: &Self) -> bool {
        if self.is_empty() != other.is_empty() {
            return false;
        }
        self.is_empty() || self.total_space() == other.total_space()
    }
}

impl Eq for Ram {}

impl fmt::Debug for Ram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            None => f.write_str("Ram(empty)"),
            Some(state) => f
                .debug_struct("Ram")
                .field("total_size", &state.total_size)
                .field("owner", &self.owner_rank())
                .finish(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn equal_iff_same_capacity(a: u64, b: u64) {
            prop_assert_eq!(Ram::with_size(a) == Ram::with_size(b), a == b);
        }

        #[test]
        fn copy_survives_source_take(size: u64) {
            let mut source = Ram::with_size(size);
            let copy = source.clone();
            let moved = source.take();
            prop_assert_eq!(copy.total_space(), size);
            prop_assert_eq!(moved, copy);
            prop_assert_eq!(source, Ram::new());
        }

        #[test]
        fn empty_iff_zero_capacity(size: u64) {
            prop_assert_eq!(Ram::with_size(size).is_empty(), size == 0);
        }

        #[test]
        fn equals_default_iff_empty(size: u64) {
            let ram = Ram::with_size(size);
            prop_assert_eq!(ram == Ram::new(), ram.is_empty());
            prop_assert_eq!(Ram::new() == ram, size == 0);
        }

        #[test]
        fn equality_follows_emptiness_then_capacity(a: u64, b: u64) {
            let (x, y) = (Ram::with_size(a), Ram::with_size(b));
            let expected = x.is_empty() == y.is_empty()
                && (x.is_empty() || x.total_space() == y.total_space());
            prop_assert_eq!(x == y, expected);
            prop_assert_eq!(y == x, expected);
        }
    }
}
