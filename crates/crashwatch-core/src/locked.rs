//! Generic lock wrapper for state shared between threads.
//!
//! The watchdog and the primary thread share their two flags through
//! [`Locked`]; no other shared mutable state is permitted between them.
//! Only scoped access is exposed, never a raw lock or unlock.

use std::cell::RefCell;
use std::fmt;

use parking_lot::{Mutex, ReentrantMutex};

/// Which mutual-exclusion discipline a [`Locked`] value uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockKind {
    /// Non-reentrant mutex. Re-acquiring from the owning thread deadlocks;
    /// that is a programming error, not a recoverable condition.
    #[default]
    Exclusive,
    /// Reentrant mutex. The owning thread may re-acquire the lock.
    /// Overlapping access to the content from a nested acquisition is
    /// still rejected at runtime.
    Reentrant,
}

enum Inner<T> {
    Exclusive(Mutex<T>),
    Reentrant(ReentrantMutex<RefCell<T>>),
}

/// A value behind a lock.
///
/// Closures passed to [`Locked::perform`] may return `Result`; the lock
/// is held only for the duration of the call either way.
pub struct Locked<T> {
    inner: Inner<T>,
}

impl<T> Locked<T> {
    /// Wraps `content` behind an exclusive lock.
    pub fn new(content: T) -> Self {
        Self::with_kind(content, LockKind::Exclusive)
    }

    /// Wraps `content` behind a lock of the chosen discipline.
    pub fn with_kind(content: T, kind: LockKind) -> Self {
        let inner = match kind {
            LockKind::Exclusive => Inner::Exclusive(Mutex::new(content)),
            LockKind::Reentrant => Inner::Reentrant(ReentrantMutex::new(RefCell::new(content))),
        };
        Self { inner }
    }

    /// Snapshot of the current content: acquire, copy, release.
    pub fn content(&self) -> T
    where
        T: Clone,
    {
        self.perform(|content| content.clone())
    }

    /// Acquires the lock, runs `op` with mutable access to the content,
    /// releases, and returns whatever `op` returned.
    pub fn perform<R>(&self, op: impl FnOnce(&mut T) -> R) -> R {
        match &self.inner {
            Inner::Exclusive(mutex) => op(&mut mutex.lock()),
            Inner::Reentrant(mutex) => {
                let guard = mutex.lock();
                let mut content = guard.borrow_mut();
                op(&mut content)
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Locked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.perform(|content| write!(f, "Locked({:?})", content))
    }
}
