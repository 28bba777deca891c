//! Poison-recovering lock acquisition.
//!
//! The cache store and the decorator's buffer pool hold process-wide locks;
//! a panic in one request must not wedge every later one. A poisoned lock is
//! recovered and logged, accepting whatever state the panicking thread left
//! behind.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recovered(scope: &'static str, op: &'static str, kind: &'static str) {
    warn!(
        target = "varco::lock",
        scope,
        op,
        kind,
        "recovered poisoned lock, state may be stale"
    );
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    scope: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        recovered(scope, op, "rwlock.read");
        poisoned.into_inner()
    })
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    scope: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        recovered(scope, op, "rwlock.write");
        poisoned.into_inner()
    })
}

pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    scope: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        recovered(scope, op, "mutex");
        poisoned.into_inner()
    })
}
