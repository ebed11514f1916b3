//! A blocking [mutual exclusion] lock.
//!
//! [mutual exclusion]: https://en.wikipedia.org/wiki/Mutual_exclusion
use crate::loom::sync;
use core::{
    fmt,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicUsize, Ordering},
};
use std::sync::{PoisonError, TryLockError};

/// A blocking mutual exclusion lock for protecting shared data.
///
/// Each lock has a type parameter which represents the data that it is
/// protecting. The data can only be accessed through the RAII guards returned
/// from [`lock`] and [`try_lock`], which guarantees that the data is only ever
/// accessed when the lock is held.
///
/// A `Lock` is the anchor that [`Condvar`]s are bound to: a condition variable
/// created with [`Lock::condvar`] (or [`Condvar::new`]) may only ever be waited
/// on with a guard of the lock it was created from.
///
/// # Reentrancy
///
/// This lock is *not* reentrant. Locking it again from the thread that
/// already holds it will deadlock.
///
/// # Poisoning
///
/// If a thread panics while holding the lock, the lock is *not* considered
/// poisoned: every panic in this workspace is already fatal for the
/// simulation it happens in, and [`JoinHandle::join`] re-raises it.
///
/// # Loom-specific behavior
///
/// When `cfg(loom)` is enabled, this lock is backed by
/// `loom::sync::Mutex`.
///
/// [`lock`]: Lock::lock
/// [`try_lock`]: Lock::try_lock
/// [`Condvar`]: crate::Condvar
/// [`Condvar::new`]: crate::Condvar::new
/// [`JoinHandle::join`]: crate::thread::JoinHandle::join
pub struct Lock<T> {
    id: LockId,
    inner: sync::Mutex<T>,
}

/// An RAII implementation of a "scoped lock" of a [`Lock`]. When this
/// structure is dropped (falls out of scope), the lock will be released.
///
/// The data protected by the lock can be accessed through this guard via its
/// [`Deref`] and [`DerefMut`] implementations.
#[must_use = "if unused, the `Lock` will immediately unlock"]
pub struct LockGuard<'a, T> {
    pub(crate) guard: sync::MutexGuard<'a, T>,
    pub(crate) id: LockId,
}

/// Identifies a [`Lock`] so that condition variables can check which lock
/// they are being waited on with.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct LockId(usize);

// === impl Lock ===

impl<T> Lock<T> {
    /// Returns a new `Lock` protecting the provided `data`.
    ///
    /// The returned `Lock` is in an unlocked state, ready for use.
    ///
    /// # Examples
    ///
    /// ```
    /// use morel_sync::Lock;
    ///
    /// let lock = Lock::new(0);
    /// ```
    #[must_use]
    pub fn new(data: T) -> Self {
        Self {
            id: LockId::next(),
            inner: sync::Mutex::new(data),
        }
    }

    /// Acquires the lock, blocking the current thread until it is able to do
    /// so.
    ///
    /// Upon returning, the thread is the only thread with the lock held. An
    /// RAII guard is returned to allow scoped unlock of the lock. When the
    /// guard goes out of scope, the lock will be released.
    #[cfg_attr(test, track_caller)]
    pub fn lock(&self) -> LockGuard<'_, T> {
        test_trace!(lock = ?self.id, "Lock::lock");
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        test_trace!(lock = ?self.id, "Lock::lock -> locked");
        LockGuard { guard, id: self.id }
    }

    /// Attempts to acquire this lock without blocking.
    ///
    /// If the lock could not be acquired at this time, then [`None`] is
    /// returned. Otherwise, an RAII guard is returned. The lock will be
    /// released when the guard is dropped.
    #[must_use]
    pub fn try_lock(&self) -> Option<LockGuard<'_, T>> {
        let guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                test_trace!(lock = ?self.id, "Lock::try_lock -> already locked");
                return None;
            }
        };
        Some(LockGuard { guard, id: self.id })
    }

    /// Acquires the lock and runs `f` with exclusive access to the protected
    /// data, releasing the lock when `f` returns.
    pub fn with_lock<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Returns a new [`Condvar`](crate::Condvar) bound to this lock.
    #[must_use]
    pub fn condvar(&self) -> crate::Condvar {
        crate::Condvar::new(self)
    }

    pub(crate) fn id(&self) -> LockId {
        self.id
    }

    /// Consumes this `Lock`, returning the protected data.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Default> Default for Lock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Lock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Lock");
        s.field("id", &self.id.0);
        match self.try_lock() {
            Some(guard) => s.field("data", &&*guard),
            None => s.field("data", &format_args!("<locked>")),
        };
        s.finish()
    }
}

// === impl LockGuard ===

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T: fmt::Debug> fmt::Debug for LockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deref().fmt(f)
    }
}

// === impl LockId ===

impl LockId {
    fn next() -> Self {
        // Not a loom atomic: ids only need to be unique, and a loom atomic
        // would add a branch to every model that creates a lock.
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}
