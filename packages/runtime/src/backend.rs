//! The process-wide default backend.
//!
//! Views constructed without an explicit backend ([`RuntimeView::from_args`],
//! [`RuntimeView::from_comm`]) use the backend in this slot. It starts out as
//! a single-participant [`LocalBackend`].
//!
//! [`RuntimeView::from_args`]: crate::RuntimeView::from_args
//! [`RuntimeView::from_comm`]: crate::RuntimeView::from_comm

use std::sync::{Arc, PoisonError, RwLock};

use zoneview_comm::{Backend, LocalBackend};

lazy_static::lazy_static! {
    static ref DEFAULT_BACKEND: RwLock<Arc<dyn Backend>> = {
        let backend: Arc<dyn Backend> = LocalBackend::single();
        RwLock::new(backend)
    };
}

/// The backend used by views that do not name one.
pub fn default_backend() -> Arc<dyn Backend> {
    let slot = DEFAULT_BACKEND.read().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(&slot)
}

/// Replace the default backend, returning the previous one.
///
/// Views that already exist keep the backend they were built with.
pub fn set_default_backend(backend: Arc<dyn Backend>) -> Arc<dyn Backend> {
    let mut slot = DEFAULT_BACKEND
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *slot, backend)
}
