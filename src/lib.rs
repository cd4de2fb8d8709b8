//! # parl
//!
//! An unbounded, awaitable, closable multi-producer/multi-consumer queue and the
//! wait primitives it is built on.
//!
//! 无界、可等待、可关闭的多生产者/多消费者队列，以及其所依赖的等待原语。
//!
//! ## Overview / 概述
//!
//! [`AwaitableSlice`] behaves like an unbounded channel that can be shared by any
//! number of producers and consumers. Producers never block. Consumers poll, wait
//! asynchronously, block a thread, or iterate until the queue is closed and drained.
//!
//! [`AwaitableSlice`] 的行为类似可被任意数量生产者和消费者共享的无界通道。
//! 生产者从不阻塞；消费者可以轮询、异步等待、阻塞线程，或迭代直到队列关闭且取空。
//!
//! ## Key Features / 主要特性
//!
//! - **Dual-lock design**: producers and consumers contend on different locks
//! - **Slab reuse**: value slices are recycled between the consumer and producer sides
//! - **Slice transfer**: whole slices move in and out of the queue without copying
//! - **Wait signals**: a cyclic data-wait signal and a one-shot closed-and-drained signal
//!
//! - **双锁设计**：生产者与消费者竞争不同的锁
//! - **slab 复用**：值切片在消费者侧与生产者侧之间循环使用
//! - **切片转移**：整个切片无需复制即可进出队列
//! - **等待信号**：可循环的数据等待信号与一次性的关闭且取空信号
//!
//! ## Modules / 模块
//!
//! ### [`awaitable_slice`]
//!
//! The queue, its error types and its debug snapshot.
//!
//! 队列本身、其错误类型与调试快照。
//!
//! ### [`awaitable`]
//!
//! One-shot [`awaitable::Awaitable`] and re-openable [`awaitable::cyclic::CyclicAwaitable`]
//! signals, observed through [`awaitable::AwaitableCh`] handles.
//!
//! 一次性信号 [`awaitable::Awaitable`] 与可重新打开的 [`awaitable::cyclic::CyclicAwaitable`]，
//! 通过 [`awaitable::AwaitableCh`] 句柄观察。
//!
//! ### [`source`]
//!
//! Narrow capability traits implemented by the queue.
//!
//! 由队列实现的细粒度能力 trait。
//!
//! ### [`atomic_min_max`]
//!
//! Atomic minimum and maximum trackers for integer types.
//!
//! 整数类型的原子最小值/最大值跟踪器。
//!
//! ## Examples / 示例
//!
//! ### Producers and an async consumer
//!
//! ```
//! use parl::AwaitableSlice;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let queue = Arc::new(AwaitableSlice::new());
//!
//! let producer = queue.clone();
//! tokio::spawn(async move {
//!     producer.send_slice(vec![1, 2, 3]);
//!     producer.send(4);
//!     producer.close();
//! });
//!
//! let mut sum = 0;
//! while let Some(value) = queue.await_value().await {
//!     sum += value;
//! }
//! assert_eq!(sum, 10);
//! # });
//! ```
//!
//! ### Blocking iteration
//!
//! ```
//! use parl::AwaitableSlice;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(AwaitableSlice::new());
//!
//! let producer = queue.clone();
//! let handle = thread::spawn(move || {
//!     for i in 0..10 {
//!         producer.send(i);
//!     }
//!     producer.close();
//! });
//!
//! let sum: i32 = queue.iter().sum();
//! handle.join().unwrap();
//! assert_eq!(sum, 45);
//! ```
//!
//! ### Waiting for data
//!
//! ```
//! use parl::AwaitableSlice;
//!
//! # tokio_test::block_on(async {
//! let queue = AwaitableSlice::new();
//! let data = queue.data_wait_ch();
//! assert!(!data.is_closed());
//!
//! queue.send("ready");
//! data.wait().await;
//! assert_eq!(queue.get(), Some("ready"));
//! # });
//! ```

pub mod atomic_min_max;
pub mod awaitable;
pub mod awaitable_slice;
pub mod park;
mod shim;
pub mod source;

pub use awaitable_slice::AwaitableSlice;
