//! Lock Helpers
//!
//! Guards for the std `RwLock`s shared between request tasks. Poisoning is
//! logged and the guard is taken anyway.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recover<G>(result: LockResult<G>, op: &'static str, mode: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(op, mode, "Lock poisoned by a panicked holder, continuing");
        poisoned.into_inner()
    })
}

/// Shared access; `op` names the caller in the poisoning warning.
pub(crate) fn rw_read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), op, "read")
}

/// Exclusive access; `op` names the caller in the poisoning warning.
pub(crate) fn rw_write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), op, "write")
}
