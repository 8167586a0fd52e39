//! # Ownership Flag
//!
//! A reentrant mutual-exclusion flag keyed on the calling thread. The thread
//! that holds the flag may acquire it again without blocking; every acquire
//! must be matched by a release from the same thread before anyone else can
//! take it.
//!
//! The flag guards nothing by itself. Callers associate it with whatever
//! resource they agree on by convention.
//!
//! ## Invariants
//! - `count() > 0` exactly when `owner()` is `Some`
//! - only the owner changes the count
//! - a release by a non-owner changes nothing and returns `false`

use std::marker::PhantomData;
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use tracing::{debug, trace};

use super::{lock, wait, wait_timeout};

lazy_static! {
    static ref GLOBAL_FLAG: OwnershipFlag = OwnershipFlag::new();
}

#[derive(Debug, Default)]
struct FlagState {
    owner: Option<ThreadId>,
    count: usize,
}

impl FlagState {
    /// Claim for `caller` if free or already owned by `caller`.
    fn claim(&mut self, caller: ThreadId) -> bool {
        match self.owner {
            None => {
                self.owner = Some(caller);
                self.count = 1;
                true
            }
            Some(owner) if owner == caller => {
                self.count += 1;
                true
            }
            Some(_) => false,
        }
    }
}

/// Reentrant exclusive flag owned by at most one thread at a time.
///
/// # Examples
///
/// ```rust
/// use reclaim::OwnershipFlag;
///
/// let flag = OwnershipFlag::new();
/// assert!(flag.try_acquire());
/// assert!(flag.try_acquire());
/// assert_eq!(flag.count(), 2);
///
/// assert!(flag.release());
/// assert!(flag.release());
/// assert_eq!(flag.owner(), None);
/// ```
#[derive(Debug, Default)]
pub struct OwnershipFlag {
    state: Mutex<FlagState>,
    released: Condvar,
}

impl OwnershipFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide shared flag, created on first use.
    ///
    /// Prefer passing an explicit instance; the shared flag exists for code
    /// that wants one global exclusion domain.
    pub fn global() -> &'static OwnershipFlag {
        &GLOBAL_FLAG
    }

    /// Claim the flag without blocking.
    ///
    /// Succeeds when the flag is free or already held by the calling thread.
    pub fn try_acquire(&self) -> bool {
        lock(&self.state).claim(thread::current().id())
    }

    /// Claim the flag, waiting as long as another thread holds it.
    pub fn acquire(&self) {
        let caller = thread::current().id();
        let mut state = lock(&self.state);
        while !state.claim(caller) {
            state = wait(&self.released, state);
        }
    }

    /// Claim the flag, waiting at most `timeout` for another owner to let go.
    pub fn try_acquire_for(&self, timeout: Duration) -> bool {
        let caller = thread::current().id();
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.state);
        loop {
            if state.claim(caller) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = wait_timeout(&self.released, state, deadline - now);
        }
    }

    /// Drop one level of ownership.
    ///
    /// Returns `false` without touching the flag when the calling thread is
    /// not the owner. When the count reaches zero the flag becomes free and
    /// every waiter is woken to race for it.
    pub fn release(&self) -> bool {
        let caller = thread::current().id();
        let mut state = lock(&self.state);
        if state.owner != Some(caller) {
            debug!(?caller, owner = ?state.owner, "release by non-owner ignored");
            return false;
        }

        state.count -= 1;
        if state.count == 0 {
            state.owner = None;
            drop(state);
            trace!(?caller, "ownership flag freed");
            self.released.notify_all();
        }
        true
    }

    /// Acquire the flag and release it when the returned guard drops.
    pub fn lock(&self) -> OwnershipGuard<'_> {
        self.acquire();
        OwnershipGuard {
            flag: self,
            _not_send: PhantomData,
        }
    }

    pub fn owner(&self) -> Option<ThreadId> {
        lock(&self.state).owner
    }

    pub fn count(&self) -> usize {
        lock(&self.state).count
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.owner() == Some(thread::current().id())
    }
}

/// One level of ownership of an [`OwnershipFlag`], released on drop.
///
/// The guard is tied to the thread that acquired it.
#[must_use = "the flag is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct OwnershipGuard<'a> {
    flag: &'a OwnershipFlag,
    _not_send: PhantomData<*const ()>,
}

impl Drop for OwnershipGuard<'_> {
    fn drop(&mut self) {
        self.flag.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_tracks_owner_and_count() {
        let me = thread::current().id();
        let mut state = FlagState::default();
        assert!(state.claim(me));
        assert!(state.claim(me));
        assert_eq!(state.owner, Some(me));
        assert_eq!(state.count, 2);
    }

    #[test]
    fn claim_refuses_other_thread() {
        let other = thread::spawn(|| thread::current().id()).join().unwrap();
        let mut state = FlagState::default();
        assert!(state.claim(other));
        assert!(!state.claim(thread::current().id()));
        assert_eq!(state.count, 1);
    }

    #[test]
    fn guards_nest() {
        let flag = OwnershipFlag::new();
        {
            let _outer = flag.lock();
            let _inner = flag.lock();
            assert_eq!(flag.count(), 2);
        }
        assert_eq!(flag.count(), 0);
        assert_eq!(flag.owner(), None);
    }
}
