//! Shim module to abstract over std and loom primitives.
//!
//! This module provides a unified interface for synchronization primitives that transparently
//! switches between the `std` implementation (for production) and the `loom` implementation
//! (for model checking).
//!
//! 在 `std`（生产环境）与 `loom`（模型检查）之间透明切换的同步原语抽象层。

#[cfg(not(feature = "loom"))]
pub mod atomic {
    pub use std::sync::atomic::*;
}

#[cfg(feature = "loom")]
pub mod atomic {
    pub use loom::sync::atomic::*;
}

#[cfg(not(feature = "loom"))]
pub mod sync {
    pub use std::sync::{Mutex, MutexGuard};
}

#[cfg(feature = "loom")]
pub mod sync {
    pub use loom::sync::{Mutex, MutexGuard};
}

#[cfg(not(feature = "loom"))]
pub mod thread {
    pub use std::thread::{Thread, current, park};
}

#[cfg(feature = "loom")]
pub mod thread {
    pub use loom::thread::{Thread, current, park};
}

/// Acquire a mutex, recovering the guard if a previous holder panicked.
///
/// Every critical section in this crate leaves its data consistent before
/// any user code can run, so a poisoned lock carries no torn state.
///
/// 获取互斥锁；若先前持有者 panic，则直接恢复 guard。
#[inline]
pub(crate) fn lock<T>(mutex: &sync::Mutex<T>) -> sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
