//! Cyclic data-wait signal activated on first use
//!
//! 首次使用时激活的循环数据等待信号

use crate::awaitable::AwaitableCh;
use crate::awaitable::cyclic::CyclicAwaitable;
use crate::shim::atomic::{AtomicBool, Ordering};
use crate::shim::lock;
use crate::shim::sync::Mutex;

/// A [`CyclicAwaitable`] that is kept in sync with an emptiness predicate
///
/// Producers and consumers change the emptiness state outside of this lock.
/// [`LazyCyclic::update`] re-reads the state under the lock before toggling, so
/// after the last state change anywhere, the signal eventually reflects it:
/// closed while data is present, open while the queue is empty.
///
/// 与非空谓词保持同步的循环信号。
#[derive(Debug)]
pub(crate) struct LazyCyclic {
    cyclic: CyclicAwaitable,
    is_active: AtomicBool,
    lock: Mutex<()>,
}

impl LazyCyclic {
    pub(crate) fn new() -> Self {
        Self {
            cyclic: CyclicAwaitable::new(),
            is_active: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }

    /// Returns `true` for the single caller that activated the signal
    ///
    /// 仅对激活信号的那一个调用者返回 `true`
    #[inline]
    pub(crate) fn activate(&self) -> bool {
        !self.is_active()
            && self
                .is_active
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    #[inline]
    pub(crate) fn ch(&self) -> AwaitableCh {
        self.cyclic.ch()
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.cyclic.is_closed()
    }

    /// Bring the signal in line with `has_data`
    ///
    /// 使信号与 `has_data` 保持一致
    pub(crate) fn update(&self, has_data: impl Fn() -> bool) {
        if !self.is_active() {
            return;
        }

        // Fast path: already consistent
        if has_data() == self.cyclic.is_closed() {
            return;
        }

        let _guard = lock(&self.lock);
        let has_data = has_data();
        if has_data == self.cyclic.is_closed() {
            return;
        }
        if has_data {
            self.cyclic.close();
        } else {
            self.cyclic.open();
        }
    }
}
