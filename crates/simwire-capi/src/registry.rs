//! Live-handle registry
//!
//! Process-wide set of handle addresses the bridge has published and
//! not yet destroyed. Entry points validate incoming pointers against
//! it before dereferencing, which is what turns NULL, stale, foreign
//! and double-destroyed pointers into `NullHandle` errors instead of
//! undefined behavior. Connections and data references keep separate
//! sets so a pointer of one kind never validates as the other.

use log::trace;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

pub struct HandleRegistry {
    live: OnceLock<Mutex<HashSet<usize>>>,
    kind: &'static str,
}

pub static CONNECTIONS: HandleRegistry = HandleRegistry::new("connection");
pub static DATAREFS: HandleRegistry = HandleRegistry::new("dataref");

impl HandleRegistry {
    pub const fn new(kind: &'static str) -> Self {
        HandleRegistry {
            live: OnceLock::new(),
            kind,
        }
    }

    fn set(&self) -> &Mutex<HashSet<usize>> {
        self.live.get_or_init(|| Mutex::new(HashSet::new()))
    }

    /// Publish a freshly allocated handle.
    pub fn insert<T>(&self, handle: *mut T) {
        self.set()
            .lock()
            .expect("handle registry poisoned")
            .insert(handle as usize);
        trace!("{} handle {handle:p} registered", self.kind);
    }

    /// Whether `handle` is a live handle of this kind.
    pub fn contains<T>(&self, handle: *const T) -> bool {
        !handle.is_null()
            && self
                .set()
                .lock()
                .expect("handle registry poisoned")
                .contains(&(handle as usize))
    }

    /// Retire a handle. Returns false when it was never live (or was
    /// already retired), in which case the caller must not free it.
    pub fn remove<T>(&self, handle: *mut T) -> bool {
        let removed = self
            .set()
            .lock()
            .expect("handle registry poisoned")
            .remove(&(handle as usize));
        if removed {
            trace!("{} handle {handle:p} retired", self.kind);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_SET: HandleRegistry = HandleRegistry::new("test");

    #[test]
    fn test_lifecycle_insert_contains_remove() {
        let boxed = Box::into_raw(Box::new(7u64));
        assert!(!TEST_SET.contains(boxed));

        TEST_SET.insert(boxed);
        assert!(TEST_SET.contains(boxed));

        assert!(TEST_SET.remove(boxed));
        assert!(!TEST_SET.contains(boxed));
        // second remove reports already-retired
        assert!(!TEST_SET.remove(boxed));

        drop(unsafe { Box::from_raw(boxed) });
    }

    #[test]
    fn test_null_is_never_live() {
        assert!(!TEST_SET.contains(std::ptr::null::<u64>()));
    }

    #[test]
    fn test_foreign_pointer_is_rejected() {
        let local = 3u64;
        assert!(!TEST_SET.contains(&local as *const u64));
    }

    #[test]
    fn test_kinds_do_not_cross_validate() {
        let boxed = Box::into_raw(Box::new(1u8));
        CONNECTIONS.insert(boxed);
        assert!(CONNECTIONS.contains(boxed));
        assert!(!DATAREFS.contains(boxed));
        assert!(CONNECTIONS.remove(boxed));
        drop(unsafe { Box::from_raw(boxed) });
    }
}
