//! Closeable signal that can be re-opened
//!
//! 可重新打开的可关闭信号

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{Awaitable, AwaitableCh, Signal};

/// Cyclic closeable signal
///
/// Holds an atomic pointer to the current one-shot signal. [`CyclicAwaitable::close`]
/// closes the current signal in place; [`CyclicAwaitable::open`] replaces a closed
/// signal with a fresh open one by compare-and-swap, so at most one thread performs
/// each open→closed or closed→open transition of a given underlying signal.
///
/// Waiters holding a handle from before a re-open keep observing the old, closed
/// signal. Fetch a new handle with [`CyclicAwaitable::ch`] to wait for the next close.
///
/// 可循环的可关闭信号
///
/// 持有指向当前一次性信号的原子指针。`close` 就地关闭当前信号；`open` 通过 CAS
/// 以新的打开信号替换已关闭的信号。
pub struct CyclicAwaitable {
    current: ArcSwap<Signal>,
}

impl CyclicAwaitable {
    /// Create a new cyclic signal in the open state
    ///
    /// 创建一个处于打开状态的循环信号
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Signal::new()),
        }
    }

    /// Handle to the current underlying signal
    ///
    /// 当前底层信号的句柄
    #[inline]
    pub fn ch(&self) -> AwaitableCh {
        AwaitableCh::from_signal(self.current.load_full())
    }

    /// Close the current signal in place
    ///
    /// Returns `true` if this call performed the transition.
    ///
    /// 就地关闭当前信号，若由本次调用完成转换则返回 `true`
    #[inline]
    pub fn close(&self) -> bool {
        self.current.load().close()
    }

    /// Re-open the signal if it is closed
    ///
    /// Returns whether this call performed the transition, and a handle to the
    /// signal that is current afterwards.
    ///
    /// 若信号已关闭则重新打开。返回本次调用是否完成了转换，以及转换后当前信号的句柄。
    pub fn open(&self) -> (bool, AwaitableCh) {
        let current = self.current.load_full();
        if !current.is_closed() {
            return (false, AwaitableCh::from_signal(current));
        }

        let fresh = Arc::new(Signal::new());
        let previous = self.current.compare_and_swap(&current, fresh.clone());
        if Arc::ptr_eq(&previous, &current) {
            (true, AwaitableCh::from_signal(fresh))
        } else {
            // Another thread re-opened first
            (false, AwaitableCh::from_signal(Arc::clone(&previous)))
        }
    }

    /// Whether the current signal is closed
    ///
    /// 当前信号是否已关闭
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.current.load().is_closed()
    }

    /// Owning handle to the current underlying signal
    ///
    /// 当前底层信号的所有者句柄
    #[inline]
    pub fn awaitable(&self) -> Awaitable {
        Awaitable::from_signal(self.current.load_full())
    }
}

impl Default for CyclicAwaitable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CyclicAwaitable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CyclicAwaitable")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_open() {
        let cyclic = CyclicAwaitable::new();
        assert!(!cyclic.is_closed());
        assert!(!cyclic.ch().is_closed());

        // Open on an open signal is a no-op
        let ch = cyclic.ch();
        let (did_open, ch2) = cyclic.open();
        assert!(!did_open);
        assert!(ch.same_channel(&ch2));
    }

    #[test]
    fn test_close_open_cycle() {
        let cyclic = CyclicAwaitable::new();
        let first = cyclic.ch();

        assert!(cyclic.close());
        assert!(!cyclic.close());
        assert!(first.is_closed());
        assert!(cyclic.is_closed());

        let (did_open, second) = cyclic.open();
        assert!(did_open);
        assert!(!second.is_closed());
        assert!(!cyclic.is_closed());
        assert!(!first.same_channel(&second));

        // The old handle stays closed
        assert!(first.is_closed());

        cyclic.close();
        assert!(second.is_closed());
    }

    #[test]
    fn test_concurrent_open_single_winner() {
        for _ in 0..50 {
            let cyclic = Arc::new(CyclicAwaitable::new());
            cyclic.close();

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let cyclic = cyclic.clone();
                    std::thread::spawn(move || cyclic.open().0)
                })
                .collect();

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|&won| won)
                .count();
            assert_eq!(winners, 1);
            assert!(!cyclic.is_closed());
        }
    }

    #[tokio::test]
    async fn test_wait_on_current() {
        let cyclic = Arc::new(CyclicAwaitable::new());
        let ch = cyclic.ch();

        let closer = cyclic.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            closer.close();
        });

        ch.wait().await;
        assert!(cyclic.awaitable().is_closed());
    }
}
