//! Opaque identifiers for communicators and runtime instances.

use std::fmt;

use uuid::Uuid;

/// An opaque communicator descriptor.
///
/// Handles are cheap to copy and compare. They identify a communicator within
/// a backend; resolving a handle to something that can actually communicate
/// is the backend's job (see [`Backend::communicator`](crate::Backend::communicator)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommHandle(i64);

impl CommHandle {
    /// The null communicator. Views of the null runtime report this handle.
    pub const NULL: CommHandle = CommHandle(0);

    /// The communicator spanning every participant of a runtime.
    pub const WORLD: CommHandle = CommHandle(1);

    /// Wrap a raw backend-specific descriptor.
    pub const fn from_raw(raw: i64) -> Self {
        CommHandle(raw)
    }

    /// The raw backend-specific descriptor.
    pub const fn as_raw(&self) -> i64 {
        self.0
    }

    /// Check if this is the null communicator.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Check if this is the world communicator.
    pub fn is_world(&self) -> bool {
        *self == Self::WORLD
    }
}

impl Default for CommHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for CommHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NULL => write!(f, "comm:null"),
            Self::WORLD => write!(f, "comm:world"),
            CommHandle(raw) => write!(f, "comm:{}", raw),
        }
    }
}

/// Identity of one running runtime instance.
///
/// Every successful start of a backend produces a fresh `WorldId`, so views
/// created before and after a restart can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(Uuid);

impl WorldId {
    /// Create a new random WorldId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a WorldId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_world_are_distinct() {
        assert!(CommHandle::NULL.is_null());
        assert!(!CommHandle::NULL.is_world());
        assert!(CommHandle::WORLD.is_world());
        assert_ne!(CommHandle::NULL, CommHandle::WORLD);
    }

    #[test]
    fn default_handle_is_null() {
        assert_eq!(CommHandle::default(), CommHandle::NULL);
    }

    #[test]
    fn raw_roundtrip() {
        let handle = CommHandle::from_raw(42);
        assert_eq!(handle.as_raw(), 42);
        assert_eq!(CommHandle::from_raw(1), CommHandle::WORLD);
    }

    #[test]
    fn handle_display() {
        assert_eq!(CommHandle::NULL.to_string(), "comm:null");
        assert_eq!(CommHandle::WORLD.to_string(), "comm:world");
        assert_eq!(CommHandle::from_raw(7).to_string(), "comm:7");
    }

    #[test]
    fn world_ids_are_unique() {
        assert_ne!(WorldId::new(), WorldId::default());
        let uuid = Uuid::new_v4();
        assert_eq!(WorldId::from_uuid(uuid).as_uuid(), uuid);
        assert_eq!(WorldId::from_uuid(uuid).to_string().len(), 36);
    }
}
