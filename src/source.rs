//! Capability traits for queue producers and consumers
//!
//! Each trait names one narrow capability so that code can accept only what it
//! uses: a producer takes `&impl Sink<T>`, a draining consumer takes
//! `&impl ClosableAllSource<T>`. [`AwaitableSlice`] implements all of them.
//!
//! 队列生产者与消费者的能力 trait。每个 trait 只描述一项能力，调用方只需接受其所用的能力。
//!
//! # Example
//!
//! ```
//! use parl::AwaitableSlice;
//! use parl::source::{ClosableSink, IterableSource};
//!
//! fn produce(sink: &impl ClosableSink<u32>) {
//!     sink.send(1);
//!     sink.send(2);
//!     sink.close();
//! }
//!
//! fn consume(source: &impl IterableSource<u32>) -> u32 {
//!     source.seq().sum()
//! }
//!
//! let queue = AwaitableSlice::new();
//! produce(&queue);
//! assert_eq!(consume(&queue), 3);
//! ```

use crate::awaitable::AwaitableCh;
use crate::awaitable_slice::AwaitableSlice;

/// Accepts values; never blocks
///
/// 接收值，从不阻塞
pub trait Sink<T> {
    /// Append one value
    fn send(&self, value: T);

    /// Append a slice of values, taking ownership of it
    fn send_slice(&self, values: Vec<T>);
}

/// Can be closed, and reports when it is closed and drained
///
/// 可关闭，并报告何时关闭且取空
pub trait Closable {
    /// Close; idempotent
    fn close(&self);

    /// Whether closed and observed empty
    fn is_closed(&self) -> bool;

    /// Handle closed once closed and observed empty
    fn close_ch(&self) -> AwaitableCh;
}

/// A [`Sink`] that can be closed
///
/// 可关闭的 [`Sink`]
pub trait ClosableSink<T>: Sink<T> + Closable {}

impl<T, S: Sink<T> + Closable + ?Sized> ClosableSink<T> for S {}

/// Yields values one at a time
///
/// 逐个产出值
pub trait Source1<T> {
    /// The oldest value, `None` if empty
    fn get(&self) -> Option<T>;

    /// Handle closed while values are available
    fn data_wait_ch(&self) -> AwaitableCh;
}

/// Yields values a slice at a time
///
/// 逐个切片产出值
pub trait Source<T> {
    /// The oldest slice, empty if there is none
    fn get_slice(&self) -> Vec<T>;

    /// Handle closed while values are available
    fn data_wait_ch(&self) -> AwaitableCh;
}

/// A closable source that can hand over everything at once
///
/// 可关闭、可一次性交出全部内容的数据源
pub trait ClosableAllSource<T>: Source<T> + Closable {
    /// Every present value as one slice
    fn get_all(&self) -> Vec<T>;
}

/// A source that can be iterated until it is closed and drained
///
/// 可迭代直到关闭且取空的数据源
pub trait IterableSource<T> {
    /// Blocking iterator over received values
    fn seq(&self) -> impl Iterator<Item = T> + '_;
}

impl<T> Sink<T> for AwaitableSlice<T> {
    fn send(&self, value: T) {
        AwaitableSlice::send(self, value);
    }

    fn send_slice(&self, values: Vec<T>) {
        AwaitableSlice::send_slice(self, values);
    }
}

impl<T> Closable for AwaitableSlice<T> {
    fn close(&self) {
        AwaitableSlice::close(self);
    }

    fn is_closed(&self) -> bool {
        AwaitableSlice::is_closed(self)
    }

    fn close_ch(&self) -> AwaitableCh {
        AwaitableSlice::close_ch(self)
    }
}

impl<T> Source1<T> for AwaitableSlice<T> {
    fn get(&self) -> Option<T> {
        AwaitableSlice::get(self)
    }

    fn data_wait_ch(&self) -> AwaitableCh {
        AwaitableSlice::data_wait_ch(self)
    }
}

impl<T> Source<T> for AwaitableSlice<T> {
    fn get_slice(&self) -> Vec<T> {
        AwaitableSlice::get_slice(self)
    }

    fn data_wait_ch(&self) -> AwaitableCh {
        AwaitableSlice::data_wait_ch(self)
    }
}

impl<T> ClosableAllSource<T> for AwaitableSlice<T> {
    fn get_all(&self) -> Vec<T> {
        AwaitableSlice::get_all(self)
    }
}

impl<T> IterableSource<T> for AwaitableSlice<T> {
    fn seq(&self) -> impl Iterator<Item = T> + '_ {
        self.iter()
    }
}
