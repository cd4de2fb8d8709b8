//! Debug snapshot of an [`AwaitableSlice`](super::AwaitableSlice)
//!
//! [`AwaitableSlice`](super::AwaitableSlice) 的调试快照

use std::fmt;

use super::input_queue::InputQueue;
use super::output_queue::OutputQueue;

/// Field-wise snapshot of a queue, taken under both locks
///
/// Holds counts, capacities and flags only, never values.
///
/// 在两把锁下获取的队列字段快照，只包含数量、容量与标志，不包含值。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueState {
    /// An operation has materialized the configuration
    pub is_initialized: bool,
    /// Capacity of newly allocated value slices
    pub size: usize,
    /// Slices beyond this capacity are not reused
    pub max_retain_size: usize,

    /// Values in the output head
    pub head_len: usize,
    /// Capacity of the output head
    pub head_capacity: usize,
    /// Slices queued behind the output head
    pub output_slices: usize,
    /// Values in the output slice list
    pub output_list_len: usize,
    /// Capacity of the cached output slice, 0 when none
    pub cached_output_capacity: usize,

    /// Values in the input primary
    pub primary_len: usize,
    /// Capacity of the input primary
    pub primary_capacity: usize,
    /// Slices queued behind the input primary
    pub input_slices: usize,
    /// Values in the input slice list
    pub input_list_len: usize,
    /// Capacity of the cached input slice, 0 when none
    pub cached_input_capacity: usize,

    /// The queue holds data
    pub has_data: bool,
    /// The input side holds data
    pub input_has_data: bool,
    /// The data-wait signal has been requested
    pub is_data_wait_active: bool,
    /// The data-wait signal is closed
    pub is_data_wait_closed: bool,
    /// `close` was invoked
    pub is_close_invoked: bool,
    /// The queue is closed and was observed empty
    pub is_closed: bool,
    /// `(length, max_length)` once length tracking is enabled
    pub length: Option<(usize, usize)>,
}

impl QueueState {
    pub(super) fn record_output<T>(&mut self, output: &mut OutputQueue<T>) {
        let config = output.config();
        self.size = config.size;
        self.max_retain_size = config.max_retain_size;
        self.head_len = output.head.len();
        self.head_capacity = output.head.capacity();
        self.output_slices = output.slice_list.len();
        self.output_list_len = output.slice_list.element_count();
        self.cached_output_capacity = output.cached_output.as_ref().map_or(0, Vec::capacity);
    }

    pub(super) fn record_input<T>(&mut self, input: &InputQueue<T>) {
        self.primary_len = input.primary.len();
        self.primary_capacity = input.primary.capacity();
        self.input_slices = input.slice_list.len();
        self.input_list_len = input.slice_list.element_count();
        self.cached_input_capacity = input.cached_input.as_ref().map_or(0, Vec::capacity);
    }

    /// Number of values present in the queue
    ///
    /// 队列中现存值的数量
    pub fn element_count(&self) -> usize {
        self.head_len + self.output_list_len + self.primary_len + self.input_list_len
    }
}

/// Coarse life-cycle state used by the `Display` form of a queue
///
/// 队列 `Display` 形式所用的粗粒度生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    /// No operation has run yet
    Uninit,
    /// Open and holding data
    Data,
    /// Open and empty
    Empty,
    /// Close invoked, data remains
    Drain,
    /// Closed and observed empty
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Uninit => "uninit",
            Phase::Data => "data",
            Phase::Empty => "empty",
            Phase::Drain => "drain",
            Phase::Closed => "closed",
        })
    }
}
