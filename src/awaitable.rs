//! One-shot and cyclic closeable signals
//!
//! An [`Awaitable`] transitions from open to closed exactly once. Any number of
//! waiters, async or blocking, observe the transition through an [`AwaitableCh`]
//! handle, the Rust counterpart of a receive-only channel that gets closed.
//!
//! [`cyclic::CyclicAwaitable`] is a signal that can be re-opened: it swaps in a
//! fresh [`Awaitable`] once the current one has been closed.
//!
//! 一次性与可循环的可关闭信号
//!
//! [`Awaitable`] 只会从打开状态转换到关闭状态一次。任意数量的等待者（异步或阻塞）
//! 通过 [`AwaitableCh`] 句柄观察该转换。
//!
//! # Example
//!
//! ```
//! use parl::awaitable::Awaitable;
//!
//! # tokio_test::block_on(async {
//! let awaitable = Awaitable::new();
//! let ch = awaitable.ch();
//!
//! tokio::spawn(async move {
//!     awaitable.close();
//! });
//!
//! ch.wait().await;
//! assert!(ch.is_closed());
//! # });
//! ```

pub mod cyclic;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
// Shared with `ArcSwap`, whose `RefCnt` is only implemented for std pointers
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use crate::shim::atomic::{AtomicBool, Ordering};
use crate::shim::lock;
use crate::shim::sync::Mutex;

/// Registered wakers, indexed by slot key
///
/// 已注册的 waker，按槽位索引
#[derive(Default)]
struct Waiters {
    slots: Vec<Option<Waker>>,
    free: Vec<usize>,
}

impl Waiters {
    fn insert(&mut self, waker: Waker) -> usize {
        match self.free.pop() {
            Some(key) => {
                self.slots[key] = Some(waker);
                key
            }
            None => {
                self.slots.push(Some(waker));
                self.slots.len() - 1
            }
        }
    }

    fn update(&mut self, key: usize, waker: &Waker) {
        if let Some(Some(current)) = self.slots.get_mut(key) {
            if !current.will_wake(waker) {
                current.clone_from(waker);
            }
        }
    }

    fn remove(&mut self, key: usize) {
        if let Some(slot) = self.slots.get_mut(key) {
            if slot.take().is_some() {
                self.free.push(key);
            }
        }
    }

    fn take_all(&mut self) -> Vec<Waker> {
        self.free.clear();
        self.slots.drain(..).flatten().collect()
    }
}

/// Shared state of a one-shot signal
///
/// Close stores the flag before draining the waiter list under the lock, and
/// waiters re-check the flag under the same lock before registering, so no
/// waiter can register after the drain without seeing the flag.
///
/// 一次性信号的共享状态
pub(crate) struct Signal {
    closed: AtomicBool,
    waiters: Mutex<Waiters>,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            waiters: Mutex::new(Waiters::default()),
        }
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let wakers = lock(&self.waiters).take_all();
        for waker in wakers {
            waker.wake();
        }
        true
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One-shot closeable signal
///
/// Transitions from open to closed exactly once. [`Awaitable::close`] strongly
/// happens-before any observation of the closed state through any handle.
/// Cloning an `Awaitable` yields another owner of the same signal.
///
/// 一次性可关闭信号
///
/// 只会从打开转换到关闭一次。[`Awaitable::close`] 严格先行发生于
/// 任何句柄对关闭状态的观察。克隆 `Awaitable` 得到同一信号的另一个所有者。
#[derive(Clone)]
pub struct Awaitable {
    signal: Arc<Signal>,
}

impl Awaitable {
    /// Create a new open signal
    ///
    /// 创建一个新的处于打开状态的信号
    pub fn new() -> Self {
        Self {
            signal: Arc::new(Signal::new()),
        }
    }

    /// Returns a handle that observes the transition
    ///
    /// Repeated calls return handles to the same signal, see [`AwaitableCh::same_channel`].
    ///
    /// 返回观察状态转换的句柄
    #[inline]
    pub fn ch(&self) -> AwaitableCh {
        AwaitableCh {
            signal: self.signal.clone(),
        }
    }

    /// Close the signal, waking every waiter
    ///
    /// Returns `true` for the single call that performed the transition.
    ///
    /// 关闭信号并唤醒所有等待者。仅执行了转换的那一次调用返回 `true`。
    #[inline]
    pub fn close(&self) -> bool {
        self.signal.close()
    }

    /// Non-blocking read of the state
    ///
    /// 非阻塞地读取状态
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }

    pub(crate) fn from_signal(signal: Arc<Signal>) -> Self {
        Self { signal }
    }
}

impl Default for Awaitable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Awaitable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Awaitable")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Receive-side handle of a signal
///
/// Cheap to clone. Closed iff the underlying signal has transitioned.
///
/// 信号的接收端句柄，克隆开销很小。当且仅当底层信号已转换时为关闭状态。
#[derive(Clone)]
pub struct AwaitableCh {
    signal: Arc<Signal>,
}

impl AwaitableCh {
    pub(crate) fn from_signal(signal: Arc<Signal>) -> Self {
        Self { signal }
    }

    /// Whether the signal has been closed
    ///
    /// 信号是否已关闭
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }

    /// Returns a future that completes once the signal is closed
    ///
    /// 返回一个在信号关闭时完成的 future
    #[inline]
    pub fn wait(&self) -> Wait<'_> {
        Wait {
            signal: &self.signal,
            key: None,
        }
    }

    /// Block the current thread until the signal is closed
    ///
    /// # Panics
    ///
    /// Must not be called within an asynchronous execution context.
    ///
    /// 阻塞当前线程直到信号关闭。不应在异步执行上下文中调用。
    pub fn blocking_wait(&self) {
        if self.is_closed() {
            return;
        }
        crate::park::block_on(self.wait());
    }

    /// Whether two handles observe the same underlying signal
    ///
    /// 两个句柄是否观察同一个底层信号
    #[inline]
    pub fn same_channel(&self, other: &AwaitableCh) -> bool {
        Arc::ptr_eq(&self.signal, &other.signal)
    }
}

impl fmt::Debug for AwaitableCh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaitableCh")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Future returned by [`AwaitableCh::wait`]
///
/// [`AwaitableCh::wait`] 返回的 Future
pub struct Wait<'a> {
    signal: &'a Signal,
    key: Option<usize>,
}

impl Future for Wait<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let signal = self.signal;

        // Fast path
        if signal.is_closed() {
            return Poll::Ready(());
        }

        let mut waiters = lock(&signal.waiters);
        if signal.is_closed() {
            return Poll::Ready(());
        }
        match self.key {
            Some(key) => waiters.update(key, cx.waker()),
            None => {
                let key = waiters.insert(cx.waker().clone());
                drop(waiters);
                self.key = Some(key);
            }
        }
        Poll::Pending
    }
}

impl Drop for Wait<'_> {
    fn drop(&mut self) {
        // After close the slots were drained and the key is stale
        if let Some(key) = self.key.take()
            && !self.signal.is_closed()
        {
            lock(&self.signal.waiters).remove(key);
        }
    }
}

impl fmt::Debug for Wait<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait")
            .field("closed", &self.signal.is_closed())
            .field("registered", &self.key.is_some())
            .finish()
    }
}

/// Future completing when either of two signals closes
///
/// Resolves to `true` when the first signal closed, `false` for the second.
///
/// 任一信号关闭时完成的 future。第一个信号关闭时返回 `true`，第二个返回 `false`。
pub(crate) struct WaitEither<'a> {
    first: Wait<'a>,
    second: Wait<'a>,
}

impl<'a> WaitEither<'a> {
    pub(crate) fn new(first: &'a AwaitableCh, second: &'a AwaitableCh) -> Self {
        Self {
            first: first.wait(),
            second: second.wait(),
        }
    }
}

impl Future for WaitEither<'_> {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        if Pin::new(&mut self.first).poll(cx).is_ready() {
            return Poll::Ready(true);
        }
        if Pin::new(&mut self.second).poll(cx).is_ready() {
            return Poll::Ready(false);
        }
        Poll::Pending
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    #[test]
    fn test_close_once() {
        let awaitable = Awaitable::new();
        assert!(!awaitable.is_closed());

        assert!(awaitable.close());
        assert!(awaitable.is_closed());

        // Second close is a no-op
        assert!(!awaitable.close());
        assert!(awaitable.is_closed());
    }

    #[test]
    fn test_ch_is_same_channel() {
        let awaitable = Awaitable::new();
        let ch1 = awaitable.ch();
        let ch2 = awaitable.ch();
        assert!(ch1.same_channel(&ch2));

        let other = Awaitable::new();
        assert!(!ch1.same_channel(&other.ch()));
    }

    #[tokio::test]
    async fn test_wait_after_close() {
        let awaitable = Awaitable::new();
        awaitable.close();

        // Should complete immediately
        awaitable.ch().wait().await;
    }

    #[tokio::test]
    async fn test_wait_before_close() {
        let awaitable = Awaitable::new();
        let ch = awaitable.ch();

        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            awaitable.close();
        });

        ch.wait().await;
        assert!(ch.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_waiters() {
        let awaitable = Awaitable::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ch = awaitable.ch();
            handles.push(tokio::spawn(async move {
                ch.wait().await;
            }));
        }

        sleep(Duration::from_millis(10)).await;
        awaitable.close();

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("Should not timeout")
                .expect("Task should complete");
        }
    }

    #[tokio::test]
    async fn test_dropped_wait_unregisters() {
        let awaitable = Awaitable::new();
        let ch = awaitable.ch();

        // Poll once to register, then drop
        let result = tokio::time::timeout(Duration::from_millis(5), ch.wait()).await;
        assert!(result.is_err());
        assert!(lock(&awaitable.signal.waiters).slots.iter().all(Option::is_none));

        awaitable.close();
        ch.wait().await;
    }

    #[test]
    fn test_blocking_wait() {
        let awaitable = Awaitable::new();
        let ch = awaitable.ch();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            awaitable.close()
        });

        ch.blocking_wait();
        assert!(ch.is_closed());
        assert!(handle.join().unwrap());
    }

    #[tokio::test]
    async fn test_wait_either() {
        let a = Awaitable::new();
        let b = Awaitable::new();
        let (ch_a, ch_b) = (a.ch(), b.ch());

        b.close();
        assert!(!WaitEither::new(&ch_a, &ch_b).await);

        a.close();
        assert!(WaitEither::new(&ch_a, &ch_b).await);
    }
}
