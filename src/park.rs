//! Thread-parking waker used to drive this crate's futures from synchronous code.
//!
//! 用于在同步代码中驱动本 crate 的 future 的线程挂起 waker。

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use crate::shim::atomic::{AtomicBool, Ordering};
use crate::shim::thread::{self, Thread};

/// Waker that unparks the thread that created it
///
/// 唤醒创建它的线程的 waker
struct ThreadParker {
    thread: Thread,
    notified: AtomicBool,
}

impl Wake for ThreadParker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.notified.store(true, Ordering::Release);
        self.thread.unpark();
    }
}

/// Run a future to completion on the current thread, parking between polls.
///
/// # Panics
///
/// Only if the future itself panics. Must not be called from within an
/// asynchronous execution context, as it blocks the worker thread.
///
/// 在当前线程上运行 future 直到完成，两次 poll 之间挂起线程。
/// 不应在异步执行上下文中调用，因为它会阻塞工作线程。
pub fn block_on<F: Future>(future: F) -> F::Output {
    let parker = Arc::new(ThreadParker {
        thread: thread::current(),
        notified: AtomicBool::new(false),
    });
    let waker = Waker::from(parker.clone());
    let mut cx = Context::from_waker(&waker);
    let mut future = pin!(future);

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }

        // Park if not notified; spurious wakeups just poll again
        if !parker.notified.swap(false, Ordering::Acquire) {
            thread::park();
        }
    }
}
