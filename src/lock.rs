use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::Ordering::*;
use std::sync::atomic::{AtomicU32, AtomicUsize};

use atomic_wait::{wait, wake_one};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
const CONTENDED: u32 = 2;

pub struct Mutex<T> {
    /// 0: unlocked
    /// 1: locked, no other thread waiting
    /// 2: locked, other threads may be waiting
    state: AtomicU32,
    value: UnsafeCell<T>,
}

unsafe impl<T> Sync for Mutex<T> where T: Send {}

pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
}

unsafe impl<T> Sync for MutexGuard<'_, T> where T: Sync {}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.value.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.value.get() }
    }
}

impl<T> Mutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        if self
            .state
            .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            .is_err()
        {
            lock_contended(&self.state);
        }
        MutexGuard { mutex: self }
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            .ok()
            .map(|_| MutexGuard { mutex: self })
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        unlock(&self.mutex.state);
    }
}

fn lock_contended(state: &AtomicU32) {
    let mut spin_count = 0;

    while state.load(Relaxed) == LOCKED && spin_count < 100 {
        spin_count += 1;
        std::hint::spin_loop();
    }

    if state
        .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
        .is_ok()
    {
        return;
    }

    while state.swap(CONTENDED, Acquire) != UNLOCKED {
        wait(state, CONTENDED);
    }
}

fn unlock(state: &AtomicU32) {
    // Only wake when someone may be parked on the state word.
    if state.swap(UNLOCKED, Release) == CONTENDED {
        wake_one(state);
    }
}

/// Per-thread token, never 0 and never reused for the life of the process.
fn current_thread_token() -> usize {
    static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);
    thread_local! {
        static TOKEN: usize = NEXT_TOKEN.fetch_add(1, Relaxed);
    }
    TOKEN.with(|token| *token)
}

/// A lock the owning thread may acquire again while already holding it.
///
/// Nested acquisitions only bump a depth counter; the underlying futex word
/// is released when the outermost guard drops. Guards hand out `&T` only,
/// since two live guards on the same thread would otherwise alias.
pub struct ReentrantMutex<T> {
    state: AtomicU32,
    /// Token of the owning thread, 0 when unowned.
    owner: AtomicUsize,
    /// Only touched by the owning thread.
    depth: UnsafeCell<u32>,
    value: T,
}

unsafe impl<T> Sync for ReentrantMutex<T> where T: Send {}

pub struct ReentrantMutexGuard<'a, T> {
    mutex: &'a ReentrantMutex<T>,
    // Release must happen on the thread that acquired.
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T> Sync for ReentrantMutexGuard<'_, T> where T: Sync {}

impl<T> Deref for ReentrantMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.mutex.value
    }
}

impl<T> ReentrantMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
            owner: AtomicUsize::new(0),
            depth: UnsafeCell::new(0),
            value,
        }
    }

    pub fn lock(&self) -> ReentrantMutexGuard<'_, T> {
        let this_thread = current_thread_token();
        if self.owner.load(Relaxed) == this_thread {
            // Safety: only the owner can observe its own token here.
            unsafe { self.enter_again() };
        } else {
            if self
                .state
                .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
                .is_err()
            {
                lock_contended(&self.state);
            }
            self.take_ownership(this_thread);
        }
        self.guard()
    }

    pub fn try_lock(&self) -> Option<ReentrantMutexGuard<'_, T>> {
        let this_thread = current_thread_token();
        if self.owner.load(Relaxed) == this_thread {
            unsafe { self.enter_again() };
        } else if self
            .state
            .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            .is_ok()
        {
            self.take_ownership(this_thread);
        } else {
            return None;
        }
        Some(self.guard())
    }

    /// Runs `f` while holding the lock, monitor style.
    pub fn synchronized<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }

    /// Whether the calling thread currently holds the lock.
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.owner.load(Relaxed) == current_thread_token()
    }

    /// Safety: the caller must be the owning thread.
    unsafe fn enter_again(&self) {
        let depth = &mut *self.depth.get();
        assert!(*depth < u32::MAX, "reentrant lock depth overflow");
        *depth += 1;
    }

    fn take_ownership(&self, this_thread: usize) {
        self.owner.store(this_thread, Relaxed);
        // Safety: the futex word is held, no other thread reads depth.
        unsafe { *self.depth.get() = 1 };
    }

    fn guard(&self) -> ReentrantMutexGuard<'_, T> {
        ReentrantMutexGuard {
            mutex: self,
            _not_send: PhantomData,
        }
    }
}

impl<T> Drop for ReentrantMutexGuard<'_, T> {
    fn drop(&mut self) {
        // Safety: a guard only exists on the owning thread.
        let depth = unsafe { &mut *self.mutex.depth.get() };
        *depth -= 1;
        if *depth == 0 {
            self.mutex.owner.store(0, Relaxed);
            unlock(&self.mutex.state);
        }
    }
}

#[test]
fn test_mutex_counts_under_contention() {
    let mutex = Mutex::new(0u64);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..10_000 {
                    *mutex.lock() += 1;
                }
            });
        }
    });

    assert_eq!(mutex.into_inner(), 40_000);
}

#[test]
fn test_mutex_try_lock() {
    let mutex = Mutex::new(());
    let guard = mutex.lock();
    assert!(mutex.try_lock().is_none());
    drop(guard);
    assert!(mutex.try_lock().is_some());
}

#[test]
fn test_mutex_guard_released_on_panic() {
    let mutex = Mutex::new(0);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut guard = mutex.lock();
        *guard += 1;
        panic!("increment failed");
    }));

    assert!(result.is_err());
    // The guard dropped during unwinding, so the lock is free again.
    assert_eq!(*mutex.try_lock().unwrap(), 1);
}

#[test]
fn test_reentrant_nesting() {
    let mutex = ReentrantMutex::new(7);

    let outer = mutex.lock();
    let inner = mutex.lock();
    let innermost = mutex.synchronized(|v| *v);
    assert_eq!((*outer, *inner, innermost), (7, 7, 7));
    assert!(mutex.is_owned_by_current_thread());

    drop(inner);
    assert!(mutex.is_owned_by_current_thread());
    drop(outer);
    assert!(!mutex.is_owned_by_current_thread());
}

#[test]
fn test_reentrant_excludes_other_threads() {
    let mutex = ReentrantMutex::new(());

    let outer = mutex.lock();
    let inner = mutex.lock();
    drop(inner);

    std::thread::scope(|s| {
        // Still held once by this thread.
        s.spawn(|| assert!(mutex.try_lock().is_none()));
    });

    drop(outer);

    std::thread::scope(|s| {
        s.spawn(|| assert!(mutex.try_lock().is_some()));
    });
}

#[test]
fn test_reentrant_counts_under_contention() {
    let mutex = ReentrantMutex::new(std::cell::Cell::new(0u64));

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..10_000 {
                    mutex.synchronized(|cell| {
                        let nested = mutex.lock();
                        nested.set(cell.get() + 1);
                    });
                }
            });
        }
    });

    assert_eq!(mutex.lock().get(), 40_000);
}

#[test]
fn test_reentrant_released_on_panic() {
    let mutex = ReentrantMutex::new(());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        mutex.synchronized(|_| {
            let _nested = mutex.lock();
            panic!("increment failed");
        })
    }));

    assert!(result.is_err());
    assert!(!mutex.is_owned_by_current_thread());
    std::thread::scope(|s| {
        s.spawn(|| assert!(mutex.try_lock().is_some()));
    });
}

#[test]
fn test_reentrant_ownership_not_inherited_by_later_threads() {
    let mutex = ReentrantMutex::new(());

    std::thread::scope(|s| {
        s.spawn(|| std::mem::forget(mutex.lock()));
    });

    // The leaking thread is gone; fresh threads must not see themselves as owner.
    for _ in 0..8 {
        std::thread::scope(|s| {
            s.spawn(|| {
                assert!(!mutex.is_owned_by_current_thread());
                assert!(mutex.try_lock().is_none());
            });
        });
    }
}
