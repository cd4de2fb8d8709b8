//! Unbounded, awaitable, closable multi-producer/multi-consumer queue
//!
//! [`AwaitableSlice`] splits its state across two locks. Producers only take the
//! input lock; consumers take the output lock and visit the input lock briefly
//! when the output side runs dry, moving everything the producers queued in one
//! step. A two-bit atomic word tells both sides whether the queue holds data
//! without taking either lock.
//!
//! Consumers wait through two signals:
//! - [`AwaitableSlice::data_wait_ch`]: closed while the queue holds data, re-armed
//!   once it is drained
//! - [`AwaitableSlice::close_ch`]: closed once [`AwaitableSlice::close`] was invoked
//!   and the queue was observed empty
//!
//! 无界、可等待、可关闭的多生产者/多消费者队列
//!
//! [`AwaitableSlice`] 将状态分布在两把锁上。生产者只获取输入锁；消费者获取输出锁，
//! 仅在输出侧耗尽时短暂获取输入锁，并一次性转移生产者排队的全部数据。
//! 一个两位的原子字让双方无需加锁即可得知队列是否有数据。
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parl::AwaitableSlice;
//!
//! # tokio_test::block_on(async {
//! let queue = Arc::new(AwaitableSlice::new());
//!
//! let producer = queue.clone();
//! tokio::spawn(async move {
//!     for i in 0..3 {
//!         producer.send(i);
//!     }
//!     producer.close();
//! });
//!
//! let mut received = Vec::new();
//! while let Some(value) = queue.await_value().await {
//!     received.push(value);
//! }
//! assert_eq!(received, vec![0, 1, 2]);
//! assert!(queue.is_closed());
//! # });
//! ```

mod has_data_bits;
mod input_queue;
mod io;
mod lazy_cyclic;
mod output_queue;
mod size_config;
mod slice_list;
mod state;

use std::any::type_name;
use std::fmt;

use tracing::debug;

use self::has_data_bits::HasDataBits;
use self::input_queue::InputQueue;
use self::lazy_cyclic::LazyCyclic;
use self::output_queue::OutputQueue;
use self::size_config::SizeConfig;
use self::state::Phase;
use crate::atomic_min_max::AtomicMax;
use crate::awaitable::{Awaitable, AwaitableCh, WaitEither};
use crate::park;
use crate::shim::atomic::{AtomicBool, AtomicUsize, Ordering};
use crate::shim::lock;
use crate::shim::sync::{Mutex, MutexGuard};

pub use self::state::QueueState;

// ============================================================================
// Error Types
// ============================================================================

pub mod error {
    //! Errors of the I/O-style queue operations.

    use std::fmt;

    /// Error returned by `write` once the queue was closed
    ///
    /// 队列关闭后 `write` 返回的错误
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum WriteError {
        /// `close` has been invoked
        ///
        /// 已调用 `close`
        Closed,
    }

    impl fmt::Display for WriteError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                WriteError::Closed => write!(f, "queue closed"),
            }
        }
    }

    impl std::error::Error for WriteError {}

    /// Error returned by `read` once the queue is closed and drained
    ///
    /// 队列关闭且已取空后 `read` 返回的错误
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ReadError {
        /// End of stream
        ///
        /// 流结束
        Eof,
    }

    impl fmt::Display for ReadError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                ReadError::Eof => write!(f, "end of stream"),
            }
        }
    }

    impl std::error::Error for ReadError {}
}

pub use self::error::{ReadError, WriteError};

// ============================================================================
// Queue
// ============================================================================

/// Unbounded, awaitable, closable multi-producer/multi-consumer queue
///
/// Producers never block and never fail. Values from one producer are received
/// in the order they were sent. A zero-value queue from [`AwaitableSlice::new`]
/// or [`Default`] is fully operational; slab sizing is materialized by the first
/// operation.
///
/// Lock order is output lock, then input lock, then the data-wait lock.
///
/// 无界、可等待、可关闭的多生产者/多消费者队列
///
/// 生产者从不阻塞、从不失败。同一生产者的值按发送顺序被接收。
/// 锁顺序为：输出锁、输入锁、数据等待锁。
pub struct AwaitableSlice<T> {
    output: Mutex<OutputQueue<T>>,
    input: Mutex<InputQueue<T>>,
    has_data: HasDataBits,
    data_wait: LazyCyclic,
    /// Closed once close was invoked and the queue observed empty
    is_empty: Awaitable,
    is_close_invoked: AtomicBool,
    is_length: AtomicBool,
    length: AtomicUsize,
    max_length: AtomicMax<usize>,
    is_initialized: AtomicBool,
}

impl<T> AwaitableSlice<T> {
    /// Create an empty open queue
    ///
    /// 创建一个空的、处于打开状态的队列
    pub fn new() -> Self {
        Self {
            output: Mutex::new(OutputQueue::new()),
            input: Mutex::new(InputQueue::new()),
            has_data: HasDataBits::new(),
            data_wait: LazyCyclic::new(),
            is_empty: Awaitable::new(),
            is_close_invoked: AtomicBool::new(false),
            is_length: AtomicBool::new(false),
            length: AtomicUsize::new(0),
            max_length: AtomicMax::new(),
            is_initialized: AtomicBool::new(false),
        }
    }

    /// Create an empty queue allocating value slices of `size` elements
    ///
    /// 创建一个以 `size` 个元素为 slab 大小的空队列
    pub fn with_size(size: usize) -> Self {
        let queue = Self::new();
        queue.set_size(size);
        queue
    }

    // ---------------------------------------------------------------- producers

    /// Append one value
    ///
    /// 追加一个值
    pub fn send(&self, value: T) {
        let mut input = self.lock_input();
        input.send(value);
        self.post_input(input, 1);
    }

    /// Append a slice of values, taking ownership of it
    ///
    /// An empty slice is a no-op.
    ///
    /// 追加一个值切片并接管其所有权；空切片不产生任何效果。
    pub fn send_slice(&self, values: Vec<T>) {
        if values.is_empty() {
            return;
        }
        let mut input = self.lock_input();
        let added = input.send_slice(values);
        self.post_input(input, added);
    }

    /// Append several slices, taking ownership of each; empty slices are skipped
    ///
    /// 追加多个切片并接管所有权，跳过空切片
    pub fn send_slices(&self, slices: impl IntoIterator<Item = Vec<T>>) {
        let mut input = self.lock_input();
        let added = input.send_slices(slices);
        self.post_input(input, added);
    }

    // ---------------------------------------------------------------- consumers

    /// Take the oldest value, `None` if the queue is empty
    ///
    /// 取出最早的值；队列为空时返回 `None`
    pub fn get(&self) -> Option<T> {
        if !self.has_data.has_data() {
            return None;
        }
        let mut output = self.lock_output();
        if !self.has_data.has_data() {
            return None;
        }
        let value = output.get(&self.input, &self.has_data);
        self.post_output(output, usize::from(value.is_some()));
        value
    }

    /// Take the oldest slice of values, empty if the queue is empty
    ///
    /// 取出最早的值切片；队列为空时返回空切片
    pub fn get_slice(&self) -> Vec<T> {
        if !self.has_data.has_data() {
            return Vec::new();
        }
        let mut output = self.lock_output();
        if !self.has_data.has_data() {
            return Vec::new();
        }
        let slice = output.get_slice(&self.input, &self.has_data);
        self.post_output(output, slice.len());
        slice
    }

    /// Take every present slice, oldest first
    ///
    /// The slices are appended to `buffer` when one is provided. Values within a
    /// slice keep their order.
    ///
    /// 取出所有现存切片（最早的优先）。提供 `buffer` 时切片追加到其后。
    pub fn get_slices(&self, buffer: Option<Vec<Vec<T>>>) -> Vec<Vec<T>> {
        let mut slices = buffer.unwrap_or_default();
        if !self.has_data.has_data() {
            return slices;
        }
        let mut output = self.lock_output();
        if !self.has_data.has_data() {
            return slices;
        }
        let removed = output.get_slices(&mut slices, &self.input, &self.has_data);
        self.post_output(output, removed);
        slices
    }

    /// Take every present value as one slice
    ///
    /// 以单个切片取出所有现存值
    pub fn get_all(&self) -> Vec<T> {
        if !self.has_data.has_data() {
            return Vec::new();
        }
        let mut output = self.lock_output();
        if !self.has_data.has_data() {
            return Vec::new();
        }
        let all = output.get_all(&self.input, &self.has_data);
        self.post_output(output, all.len());
        all
    }

    /// Move up to `dest.len()` values into `dest`
    ///
    /// Returns the number of values moved, which is 0 if the queue is empty.
    ///
    /// # Errors
    ///
    /// [`ReadError::Eof`] once the queue is closed and drained. A call that moved
    /// any value never reports end of stream.
    ///
    /// 将至多 `dest.len()` 个值移入 `dest`，返回移动的数量。
    /// 队列关闭且取空后返回 [`ReadError::Eof`]。
    pub fn read(&self, dest: &mut [T]) -> Result<usize, ReadError> {
        if dest.is_empty() {
            return Ok(0);
        }
        let n = self.read_values(dest);
        if n > 0 {
            return Ok(n);
        }
        if self.is_closed() {
            Err(ReadError::Eof)
        } else {
            Ok(0)
        }
    }

    fn read_values(&self, dest: &mut [T]) -> usize {
        if !self.has_data.has_data() {
            return 0;
        }
        let mut output = self.lock_output();
        if !self.has_data.has_data() {
            return 0;
        }
        let n = output.read(dest, &self.input, &self.has_data);
        self.post_output(output, n);
        n
    }

    /// Wait for a value
    ///
    /// Returns `None` only once the queue is closed and drained.
    ///
    /// 等待一个值。仅当队列关闭且取空后返回 `None`。
    pub async fn await_value(&self) -> Option<T> {
        loop {
            if let Some(value) = self.get() {
                return Some(value);
            }
            if self.is_closed() {
                return None;
            }
            self.await_data().await;
        }
    }

    /// Block the current thread until a value is available
    ///
    /// Returns `None` only once the queue is closed and drained.
    ///
    /// # Panics
    ///
    /// Must not be called within an asynchronous execution context.
    ///
    /// 阻塞当前线程直到有值可取。仅当队列关闭且取空后返回 `None`。
    pub fn blocking_await_value(&self) -> Option<T> {
        park::block_on(self.await_value())
    }

    /// Blocking iterator over received values
    ///
    /// Ends once the queue is closed and drained.
    ///
    /// 接收值的阻塞迭代器，队列关闭且取空后结束
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { queue: self }
    }

    /// Completes once data may be present or the queue is closed and drained
    pub(crate) async fn await_data(&self) {
        let end = self.close_ch();
        if self.is_closed() {
            return;
        }
        let data = self.data_wait_ch();
        WaitEither::new(&data, &end).await;
    }

    // ---------------------------------------------------------------- signals

    /// Handle closed while the queue holds data
    ///
    /// Once a handle has been closed, a later call may return a different, open
    /// handle after the queue was drained.
    ///
    /// 队列有数据时关闭的句柄。队列取空后，后续调用可能返回另一个打开的句柄。
    pub fn data_wait_ch(&self) -> AwaitableCh {
        if self.data_wait.activate() {
            self.update_wait();
        }
        self.data_wait.ch()
    }

    /// Handle closed once the queue is closed and observed empty
    ///
    /// Every call returns the same handle.
    ///
    /// 队列关闭且观察到为空时关闭的句柄，每次调用返回同一句柄。
    pub fn close_ch(&self) -> AwaitableCh {
        self.is_empty.ch()
    }

    /// Close the queue; idempotent
    ///
    /// Values already queued are still delivered. [`AwaitableSlice::close_ch`]
    /// closes once the queue has been drained.
    ///
    /// 关闭队列（幂等）。已排队的值仍会被交付。
    pub fn close(&self) {
        if self.is_close_invoked.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(element = type_name::<T>(), "close invoked");
        if !self.has_data.has_data() {
            self.close_empty();
        }
    }

    /// Whether the queue was closed and observed empty
    ///
    /// 队列是否已关闭且被观察到为空
    pub fn is_closed(&self) -> bool {
        if !self.is_close_invoked.load(Ordering::SeqCst) {
            return false;
        }
        if self.is_empty.is_closed() {
            return true;
        }
        if self.has_data.has_data() {
            return false;
        }
        self.close_empty();
        true
    }

    // ---------------------------------------------------------------- configuration

    /// Configure the capacity of newly allocated value slices
    ///
    /// 0 selects the default of 4 KiB worth of elements, at least 10.
    ///
    /// 配置新分配值切片的容量；0 表示默认值（4 KiB 对应的元素数，至少 10）。
    pub fn set_size(&self, size: usize) {
        let config = SizeConfig::for_type::<T>(size);
        let mut output = self.lock_output();
        let mut input = lock(&self.input);
        output.set_config(config);
        input.set_config(config);
        debug!(
            element = type_name::<T>(),
            size = config.size,
            max_retain_size = config.max_retain_size,
            "slab size configured"
        );
    }

    /// Present and maximum number of values
    ///
    /// The first call enables length tracking, which is never disabled.
    ///
    /// 当前与最大的值数量。首次调用启用长度跟踪，此后不会关闭。
    pub fn length(&self) -> (usize, usize) {
        if !self.is_length.load(Ordering::Acquire) {
            let output = lock(&self.output);
            let input = lock(&self.input);
            if !self.is_length.load(Ordering::Acquire) {
                let count = output.element_count() + input.element_count();
                self.length.store(count, Ordering::Release);
                self.max_length.value(count);
                self.is_length.store(true, Ordering::Release);
            }
        }
        self.length_pair()
    }

    /// Present length with a maximum never below it
    ///
    /// A producer raises `length` before `max_length`, so the maximum is
    /// loaded second and clamped.
    fn length_pair(&self) -> (usize, usize) {
        let length = self.length.load(Ordering::Acquire);
        let max = self.max_length.max().unwrap_or(0);
        (length, max.max(length))
    }

    /// Snapshot of the queue's internal state
    ///
    /// 队列内部状态的快照
    pub fn state(&self) -> QueueState {
        let mut output = lock(&self.output);
        let input = lock(&self.input);
        self.snapshot(&mut output, &input)
    }

    fn snapshot(&self, output: &mut OutputQueue<T>, input: &InputQueue<T>) -> QueueState {
        let mut state = QueueState {
            is_initialized: self.is_initialized.load(Ordering::Relaxed),
            has_data: self.has_data.has_data(),
            input_has_data: !self.has_data.is_in_q_empty(),
            is_data_wait_active: self.data_wait.is_active(),
            is_data_wait_closed: self.data_wait.is_closed(),
            is_close_invoked: self.is_close_invoked.load(Ordering::SeqCst),
            is_closed: self.is_empty.is_closed(),
            length: self
                .is_length
                .load(Ordering::Acquire)
                .then(|| self.length_pair()),
            ..QueueState::default()
        };
        state.record_output(output);
        state.record_input(input);
        state
    }

    // ---------------------------------------------------------------- internals

    fn lock_input(&self) -> MutexGuard<'_, InputQueue<T>> {
        self.mark_initialized();
        lock(&self.input)
    }

    fn lock_output(&self) -> MutexGuard<'_, OutputQueue<T>> {
        self.mark_initialized();
        lock(&self.output)
    }

    #[inline]
    fn mark_initialized(&self) {
        if !self.is_initialized.load(Ordering::Relaxed) {
            self.is_initialized.store(true, Ordering::Relaxed);
        }
    }

    /// Publish values added under the input lock, then release it
    fn post_input(&self, input: MutexGuard<'_, InputQueue<T>>, added: usize) {
        if added == 0 {
            return;
        }
        if self.is_length.load(Ordering::Relaxed) {
            let length = self.length.fetch_add(added, Ordering::AcqRel) + added;
            self.max_length.value(length);
        }
        self.has_data.set_all_bits();
        drop(input);
        self.update_wait();
    }

    /// Account for values removed under the output lock, then release it
    fn post_output(&self, output: MutexGuard<'_, OutputQueue<T>>, removed: usize) {
        if removed > 0 && self.is_length.load(Ordering::Relaxed) {
            self.length.fetch_sub(removed, Ordering::AcqRel);
        }
        drop(output);
        self.update_wait();
    }

    /// Bring both signals in line with the data bits
    ///
    /// Runs after every state change with no queue lock held. The data-wait
    /// lock re-reads the bits before toggling, so once the last operation has
    /// returned the signals match the queue.
    fn update_wait(&self) {
        if self.is_close_invoked.load(Ordering::SeqCst)
            && !self.is_empty.is_closed()
            && !self.has_data.has_data()
        {
            self.close_empty();
        }
        self.data_wait.update(|| self.has_data.has_data());
    }

    fn close_empty(&self) {
        if self.is_empty.close() {
            debug!(element = type_name::<T>(), "queue closed and drained");
        }
    }

    fn phase(&self) -> Phase {
        if self.is_empty.is_closed() {
            Phase::Closed
        } else if !self.is_initialized.load(Ordering::Relaxed) {
            Phase::Uninit
        } else if !self.has_data.has_data() {
            Phase::Empty
        } else if self.is_close_invoked.load(Ordering::SeqCst) {
            Phase::Drain
        } else {
            Phase::Data
        }
    }
}

impl<T: Clone> AwaitableSlice<T> {
    /// Append copies of `values`
    ///
    /// 追加 `values` 的副本
    pub fn send_clone(&self, values: &[T]) {
        if values.is_empty() {
            return;
        }
        let mut input = self.lock_input();
        let added = input.send_clone(values);
        self.post_input(input, added);
    }

    /// Append copies of `values`, refusing once the queue was closed
    ///
    /// # Errors
    ///
    /// [`WriteError::Closed`] if [`AwaitableSlice::close`] was invoked.
    ///
    /// 追加 `values` 的副本；队列关闭后拒绝写入并返回 [`WriteError::Closed`]。
    pub fn write(&self, values: &[T]) -> Result<usize, WriteError> {
        if self.is_close_invoked.load(Ordering::SeqCst) {
            return Err(WriteError::Closed);
        }
        self.send_clone(values);
        Ok(values.len())
    }

    /// Snapshot of the internal state together with copies of every present value
    ///
    /// Values are listed oldest first.
    ///
    /// 内部状态快照以及所有现存值的副本（最早的优先）
    pub fn state_values(&self) -> (QueueState, Vec<T>) {
        let mut output = lock(&self.output);
        let input = lock(&self.input);
        let values = output.values().chain(input.values()).cloned().collect();
        (self.snapshot(&mut output, &input), values)
    }
}

impl<T> Default for AwaitableSlice<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for AwaitableSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "awaitableSlice:{}_state:{}_{:x}",
            type_name::<T>(),
            self.phase(),
            std::ptr::from_ref(self).addr()
        )
    }
}

impl<T> fmt::Debug for AwaitableSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaitableSlice")
            .field("has_data", &self.has_data)
            .field("data_wait", &self.data_wait)
            .field("is_close_invoked", &self.is_close_invoked.load(Ordering::SeqCst))
            .field("is_closed", &self.is_empty.is_closed())
            .finish()
    }
}

// ============================================================================
// Iterator
// ============================================================================

/// Blocking iterator returned by [`AwaitableSlice::iter`]
///
/// [`AwaitableSlice::iter`] 返回的阻塞迭代器
pub struct Iter<'a, T> {
    queue: &'a AwaitableSlice<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.blocking_await_value()
    }
}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("queue", &self.queue).finish()
    }
}

impl<'a, T> IntoIterator for &'a AwaitableSlice<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
