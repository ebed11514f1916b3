//! A [condition variable] bound to a single [`Lock`].
//!
//! [condition variable]: https://en.wikipedia.org/wiki/Monitor_(synchronization)#Condition_variables
use crate::{
    lock::{Lock, LockGuard, LockId},
    loom::sync,
};
use core::fmt;
use std::sync::PoisonError;

/// A condition variable, bound to exactly one [`Lock`] at creation.
///
/// Condition variables represent the ability to block a thread such that it
/// consumes no CPU time while waiting for an event to occur. A condition
/// variable is always used together with a predicate over the data protected
/// by its lock: the predicate is checked while holding the lock, and the
/// thread only blocks if the predicate says it must.
///
/// Unlike [`std::sync::Condvar`], the lock a `Condvar` is used with is fixed
/// when the `Condvar` is constructed. Waiting with a guard from any other
/// lock is a bug in the caller's protocol and panics.
///
/// # Wakeups
///
/// [`wait`] may return spuriously, and a woken thread competes with every
/// other thread for the lock before it returns. Callers must always re-check
/// their predicate in a loop (or use [`wait_while`], which does so).
///
/// Calls to [`signal`] and [`broadcast`] are not buffered: signaling a
/// condition variable with no waiters does nothing.
///
/// [`wait`]: Condvar::wait
/// [`wait_while`]: Condvar::wait_while
/// [`signal`]: Condvar::signal
/// [`broadcast`]: Condvar::broadcast
pub struct Condvar {
    inner: sync::Condvar,
    lock: LockId,
}

impl Condvar {
    /// Returns a new condition variable bound to `lock`.
    ///
    /// # Examples
    ///
    /// ```
    /// use morel_sync::{Condvar, Lock};
    ///
    /// let lock = Lock::new(false);
    /// let ready = Condvar::new(&lock);
    /// ```
    #[must_use]
    pub fn new<T>(lock: &Lock<T>) -> Self {
        Self {
            inner: sync::Condvar::new(),
            lock: lock.id(),
        }
    }

    /// Atomically releases the lock held by `guard` and blocks the current
    /// thread until this condition variable is signaled, then reacquires the
    /// lock before returning.
    ///
    /// # Panics
    ///
    /// If `guard` belongs to a lock other than the one this condition variable
    /// was created with.
    #[track_caller]
    pub fn wait<'a, T>(&self, guard: LockGuard<'a, T>) -> LockGuard<'a, T> {
        assert_eq!(
            guard.id, self.lock,
            "a condition variable may only be waited on with the lock it was created from",
        );
        let LockGuard { guard, id } = guard;
        test_trace!(lock = ?id, "Condvar::wait");
        let guard = self
            .inner
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner);
        test_trace!(lock = ?id, "Condvar::wait -> woken");
        LockGuard { guard, id }
    }

    /// Blocks the current thread while `condition` returns `true`.
    ///
    /// The condition is checked with the lock held before the first wait and
    /// after every wakeup, so there is no need to check it before calling
    /// this method.
    ///
    /// # Examples
    ///
    /// ```
    /// use morel_sync::{thread, Lock};
    /// use std::sync::Arc;
    ///
    /// let lock = Arc::new(Lock::new(false));
    /// let ready = Arc::new(lock.condvar());
    ///
    /// let t = thread::spawn("setter", {
    ///     let lock = lock.clone();
    ///     let ready = ready.clone();
    ///     move || {
    ///         *lock.lock() = true;
    ///         ready.signal();
    ///     }
    /// });
    ///
    /// let guard = ready.wait_while(lock.lock(), |ready| !*ready);
    /// assert!(*guard);
    /// drop(guard);
    /// t.join();
    /// ```
    #[track_caller]
    pub fn wait_while<'a, T>(
        &self,
        mut guard: LockGuard<'a, T>,
        mut condition: impl FnMut(&mut T) -> bool,
    ) -> LockGuard<'a, T> {
        while condition(&mut guard) {
            guard = self.wait(guard);
        }
        guard
    }

    /// Wakes up at most one thread blocked on this condition variable.
    pub fn signal(&self) {
        test_trace!(lock = ?self.lock, "Condvar::signal");
        self.inner.notify_one();
    }

    /// Wakes up every thread blocked on this condition variable.
    pub fn broadcast(&self) {
        test_trace!(lock = ?self.lock, "Condvar::broadcast");
        self.inner.notify_all();
    }
}

impl fmt::Debug for Condvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condvar")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loom::{self, sync::Arc, thread};

    #[test]
    fn condvar_is_send_and_sync() {
        crate::util::test::assert_send_sync::<Condvar>();
    }

    #[test]
    fn signal_wakes_waiter() {
        loom::model(|| {
            let lock = Arc::new(Lock::new(false));
            let ready = Arc::new(lock.condvar());

            let t = thread::spawn({
                let lock = lock.clone();
                let ready = ready.clone();
                move || {
                    let guard = ready.wait_while(lock.lock(), |ready| !*ready);
                    assert!(*guard);
                }
            });

            *lock.lock() = true;
            ready.signal();
            t.join().unwrap();
        });
    }

    #[test]
    fn broadcast_wakes_all() {
        loom::model(|| {
            let lock = Arc::new(Lock::new((false, 0usize)));
            let go = Arc::new(lock.condvar());

            let threads = (0..2)
                .map(|_| {
                    let lock = lock.clone();
                    let go = go.clone();
                    thread::spawn(move || {
                        let mut guard = go.wait_while(lock.lock(), |(go, _)| !*go);
                        guard.1 += 1;
                    })
                })
                .collect::<Vec<_>>();

            lock.lock().0 = true;
            go.broadcast();

            for t in threads {
                t.join().unwrap();
            }
            assert_eq!(lock.lock().1, 2);
        });
    }

    #[test]
    fn signal_without_waiters_is_noop() {
        loom::model(|| {
            let lock = Lock::new(());
            let cv = lock.condvar();
            cv.signal();
            cv.broadcast();
            drop(lock.lock());
        });
    }

    #[test]
    #[should_panic]
    fn wait_with_wrong_lock_panics() {
        loom::model(|| {
            let bound = Lock::new(());
            let other = Lock::new(());
            let cv = bound.condvar();
            let _guard = cv.wait(other.lock());
        });
    }
}
