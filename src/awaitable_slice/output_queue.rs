//! Consumer side of the queue and the transfer from the input side
//!
//! 队列的消费者侧，以及从输入侧的数据转移

use std::collections::VecDeque;
use std::mem;

use tracing::trace;

use super::has_data_bits::HasDataBits;
use super::input_queue::InputQueue;
use super::size_config::SizeConfig;
use super::slice_list::{LIST_CAPACITY, SliceList};
use crate::shim::lock;
use crate::shim::sync::Mutex;

/// What the consumer will take once data has been transferred
///
/// 数据转移后消费者将取走的内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// One value; the input primary is handed to the caller
    GetValue,
    /// One slice; the input primary is handed to the caller
    GetSlice,
    /// Everything on the output side
    GetNothing,
    /// Up to this many values
    GetMax(usize),
}

/// Consumer-side state
///
/// `head` holds the oldest values and `slice_list` the newer ones. Popped values
/// are moved out of `head`, and an empty `head` implies an empty `slice_list`.
/// `cached_output` is a zero-length slice handed to the input side on the next
/// transfer.
///
/// 消费者侧状态。`head` 保存最早的值，`slice_list` 保存较新的值；
/// `head` 为空时 `slice_list` 也为空。
pub(crate) struct OutputQueue<T> {
    pub(super) head: VecDeque<T>,
    pub(super) slice_list: SliceList<T>,
    pub(super) cached_output: Option<Vec<T>>,
    last_primary_large: bool,
    config: Option<SizeConfig>,
}

impl<T> OutputQueue<T> {
    pub(crate) const fn new() -> Self {
        Self {
            head: VecDeque::new(),
            slice_list: SliceList::new(),
            cached_output: None,
            last_primary_large: false,
            config: None,
        }
    }

    #[inline]
    pub(crate) fn config(&mut self) -> SizeConfig {
        *self.config.get_or_insert_with(|| SizeConfig::for_type::<T>(0))
    }

    pub(crate) fn set_config(&mut self, config: SizeConfig) {
        self.config = Some(config);
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_empty() && self.slice_list.is_empty()
    }

    /// Number of values on the output side
    #[inline]
    pub(crate) fn element_count(&self) -> usize {
        self.head.len() + self.slice_list.element_count()
    }

    /// Move the input side's data to the output side
    ///
    /// For [`Action::GetValue`] and [`Action::GetSlice`] the output side must be
    /// empty, and the input primary is returned to the caller instead of being
    /// placed on the output side. On return `bits` already reflects what is left
    /// once the caller has completed `action`.
    ///
    /// 将输入侧数据转移到输出侧。对于 `GetValue` 与 `GetSlice`，输出侧必须为空，
    /// 输入侧 primary 直接返回给调用者。返回时 `bits` 已反映调用者完成 `action` 后的状态。
    pub(crate) fn transfer(
        &mut self,
        action: Action,
        input: &Mutex<InputQueue<T>>,
        bits: &HasDataBits,
    ) -> Option<Vec<T>> {
        if bits.is_in_q_empty() {
            if action == Action::GetNothing {
                bits.set_output_lock_empty();
            }
            return None;
        }

        // Allocate outside the input lock
        let config = self.config();
        let future_primary = if config.is_low_alloc || self.last_primary_large {
            Vec::new()
        } else {
            Vec::with_capacity(config.size)
        };
        if self.cached_output.is_none() && config.size_max_4kib && !config.is_low_alloc {
            self.cached_output = Some(Vec::with_capacity(config.size));
        }
        if self.slice_list.capacity() == 0 {
            self.slice_list.set_list(VecDeque::with_capacity(LIST_CAPACITY));
        }

        let primary = {
            let mut input = lock(input);
            bits.reset_to_has_data_bit();

            if input.cached_input.is_none() {
                input.cached_input = self.cached_output.take();
            }
            let primary = mem::replace(&mut input.primary, future_primary);
            self.last_primary_large = primary.capacity() > config.size;

            let primary = match action {
                Action::GetValue | Action::GetSlice => Some(primary),
                Action::GetNothing | Action::GetMax(_) => {
                    self.place_primary(primary);
                    None
                }
            };
            self.slice_list.append(&mut input.slice_list);
            primary
        };
        if primary.is_none() && self.head.is_empty() {
            self.advance_head();
        }

        let leaves_data = match action {
            Action::GetValue => {
                primary.as_ref().is_some_and(|primary| primary.len() > 1)
                    || !self.slice_list.is_empty()
            }
            Action::GetSlice => !self.slice_list.is_empty(),
            Action::GetMax(max) => self.element_count() > max,
            Action::GetNothing => false,
        };
        if !leaves_data {
            bits.set_output_lock_empty();
        }
        primary
    }

    /// One value, oldest first
    ///
    /// 取出一个值（最早的优先）
    pub(crate) fn get(&mut self, input: &Mutex<InputQueue<T>>, bits: &HasDataBits) -> Option<T> {
        if let Some(value) = self.head.pop_front() {
            if self.head.is_empty() {
                self.advance_head();
            }
            self.settle(bits);
            return Some(value);
        }

        let Some(primary) = self.transfer(Action::GetValue, input, bits) else {
            self.settle(bits);
            return None;
        };
        let mut head = VecDeque::from(primary);
        let value = head.pop_front();
        self.install_head(head);
        value
    }

    /// The oldest slice, empty if there is none
    ///
    /// 取出最早的切片；没有时返回空切片
    pub(crate) fn get_slice(&mut self, input: &Mutex<InputQueue<T>>, bits: &HasDataBits) -> Vec<T> {
        if !self.head.is_empty() {
            let slice = Vec::from(mem::take(&mut self.head));
            self.advance_head();
            self.settle(bits);
            return slice;
        }

        match self.transfer(Action::GetSlice, input, bits) {
            Some(slice) => {
                self.advance_head();
                slice
            }
            None => {
                self.settle(bits);
                Vec::new()
            }
        }
    }

    /// Every present slice, oldest first, appended to `slices`
    ///
    /// 将所有现存切片按从旧到新的顺序追加到 `slices`
    pub(crate) fn get_slices(
        &mut self,
        slices: &mut Vec<Vec<T>>,
        input: &Mutex<InputQueue<T>>,
        bits: &HasDataBits,
    ) -> usize {
        self.transfer(Action::GetNothing, input, bits);
        let n = self.element_count();
        if !self.head.is_empty() {
            slices.push(Vec::from(mem::take(&mut self.head)));
        }
        self.slice_list.dequeue_all(slices);
        self.settle(bits);
        n
    }

    /// Every present value in a single slice
    ///
    /// A single resident slice is returned as is, otherwise the values are
    /// gathered into a new slice.
    ///
    /// 将所有现存值放入单个切片。若只有一个切片则原样返回，否则汇集到新切片。
    pub(crate) fn get_all(&mut self, input: &Mutex<InputQueue<T>>, bits: &HasDataBits) -> Vec<T> {
        self.transfer(Action::GetNothing, input, bits);
        let all = if self.slice_list.is_empty() {
            Vec::from(mem::take(&mut self.head))
        } else {
            let mut all = Vec::with_capacity(self.element_count());
            all.extend(self.head.drain(..));
            while let Some(mut slice) = self.slice_list.dequeue() {
                all.append(&mut slice);
                self.retain(slice);
            }
            all
        };
        self.settle(bits);
        all
    }

    /// Move up to `dest.len()` values into `dest`
    ///
    /// 将至多 `dest.len()` 个值移入 `dest`
    pub(crate) fn read(
        &mut self,
        dest: &mut [T],
        input: &Mutex<InputQueue<T>>,
        bits: &HasDataBits,
    ) -> usize {
        if dest.is_empty() {
            return 0;
        }
        if self.head.is_empty() {
            self.transfer(Action::GetMax(dest.len()), input, bits);
        }

        let mut n = 0;
        for slot in dest.iter_mut() {
            match self.head.pop_front() {
                Some(value) => {
                    *slot = value;
                    n += 1;
                }
                None => break,
            }
        }
        if n < dest.len() && !self.slice_list.is_empty() {
            let (m, rest) = self.slice_list.dequeue_n(&mut dest[n..]);
            n += m;
            if let Some(rest) = rest {
                self.install_head(rest);
            }
        }
        if self.head.is_empty() {
            self.advance_head();
        }
        self.settle(bits);
        n
    }

    /// Present values, oldest first
    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.head.iter().chain(self.slice_list.iter().flatten())
    }

    /// Clear `HAS_DATA` if the output side was emptied
    ///
    /// The exchange fails if a producer has set `INPUT_HAS_DATA` since, so this
    /// is sound at any point the output lock is held.
    fn settle(&self, bits: &HasDataBits) {
        if self.is_empty() {
            bits.set_output_lock_empty();
        }
    }

    /// Place a transferred primary after the values present on the output side
    fn place_primary(&mut self, primary: Vec<T>) {
        if primary.is_empty() {
            self.retain(primary);
        } else if self.is_empty() {
            self.install_head(VecDeque::from(primary));
        } else {
            self.slice_list.enqueue(primary);
        }
    }

    /// Replace the empty head, keeping its buffer for reuse
    fn install_head(&mut self, head: VecDeque<T>) {
        if head.is_empty() {
            self.retain(Vec::from(head));
            self.advance_head();
        } else {
            let previous = mem::replace(&mut self.head, head);
            self.retain(Vec::from(previous));
        }
    }

    /// Refill the empty head from the slice list
    ///
    /// The emptied buffer is released even when the list is empty, so an
    /// oversized head is never kept around.
    fn advance_head(&mut self) {
        let next = self
            .slice_list
            .dequeue()
            .map(VecDeque::from)
            .unwrap_or_default();
        let previous = mem::replace(&mut self.head, next);
        self.retain(Vec::from(previous));
    }

    /// Keep an emptied slice as `cached_output` when eligible
    fn retain(&mut self, mut slice: Vec<T>) {
        let capacity = slice.capacity();
        if capacity == 0 {
            return;
        }
        let config = self.config();
        if !config.is_retainable(capacity) {
            trace!(
                capacity,
                max_retain_size = config.max_retain_size,
                "discarding oversized slice"
            );
            return;
        }
        if self.cached_output.is_none() {
            slice.clear();
            self.cached_output = Some(slice);
        }
    }
}

impl<T> std::fmt::Debug for OutputQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputQueue")
            .field("head_len", &self.head.len())
            .field("slice_list", &self.slice_list)
            .field("cached_output", &self.cached_output.as_ref().map(Vec::capacity))
            .field("last_primary_large", &self.last_primary_large)
            .finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    struct Fixture {
        output: OutputQueue<u32>,
        input: Mutex<InputQueue<u32>>,
        bits: HasDataBits,
    }

    impl Fixture {
        fn new(size: usize) -> Self {
            let config = SizeConfig::for_type::<u32>(size);
            let mut output = OutputQueue::new();
            output.set_config(config);
            let mut input = InputQueue::new();
            input.set_config(config);
            Self {
                output,
                input: Mutex::new(input),
                bits: HasDataBits::new(),
            }
        }

        fn send(&self, values: impl IntoIterator<Item = u32>) {
            let mut input = lock(&self.input);
            for value in values {
                input.send(value);
            }
            self.bits.set_all_bits();
        }

        fn send_slice(&self, slice: Vec<u32>) {
            lock(&self.input).send_slice(slice);
            self.bits.set_all_bits();
        }

        fn get(&mut self) -> Option<u32> {
            self.output.get(&self.input, &self.bits)
        }
    }

    #[test]
    fn test_get_in_order() {
        let mut fx = Fixture::new(4);
        fx.send(0..10);

        for i in 0..10 {
            assert!(fx.bits.has_data());
            assert_eq!(fx.get(), Some(i));
        }
        assert!(!fx.bits.has_data());
        assert_eq!(fx.get(), None);
    }

    #[test]
    fn test_get_single_value_clears_bits() {
        let mut fx = Fixture::new(0);
        fx.send([42]);

        assert_eq!(fx.get(), Some(42));
        assert!(!fx.bits.has_data());
        assert!(fx.bits.is_in_q_empty());
    }

    #[test]
    fn test_transfer_hands_cached_output_to_input() {
        let mut fx = Fixture::new(0);
        fx.send([1, 2]);
        assert_eq!(fx.get(), Some(1));

        // Speculative cached slice went to the input side
        assert!(lock(&fx.input).cached_input.is_some());
        assert_eq!(fx.get(), Some(2));
    }

    #[test]
    fn test_interleaved_send_get() {
        let mut fx = Fixture::new(4);
        fx.send([1, 2]);
        assert_eq!(fx.get(), Some(1));
        fx.send([3]);
        assert_eq!(fx.get(), Some(2));
        assert_eq!(fx.get(), Some(3));
        assert_eq!(fx.get(), None);
        assert!(!fx.bits.has_data());
    }

    #[test]
    fn test_get_slice() {
        let mut fx = Fixture::new(0);
        fx.send_slice(vec![1, 2, 3]);
        fx.send_slice(vec![4]);

        let first = fx.output.get_slice(&fx.input, &fx.bits);
        assert_eq!(first, vec![1, 2, 3]);
        assert!(fx.bits.has_data());

        let second = fx.output.get_slice(&fx.input, &fx.bits);
        assert_eq!(second, vec![4]);
        assert!(!fx.bits.has_data());
        assert!(fx.output.get_slice(&fx.input, &fx.bits).is_empty());
    }

    #[test]
    fn test_get_slice_after_partial_get() {
        let mut fx = Fixture::new(0);
        fx.send_slice(vec![1, 2, 3]);
        assert_eq!(fx.get(), Some(1));

        let rest = fx.output.get_slice(&fx.input, &fx.bits);
        assert_eq!(rest, vec![2, 3]);
        assert!(!fx.bits.has_data());
    }

    #[test]
    fn test_get_slices_keeps_order() {
        let mut fx = Fixture::new(0);
        fx.send_slice(vec![1, 2]);
        fx.send_slice(vec![3]);
        assert_eq!(fx.get(), Some(1));
        fx.send_slice(vec![4, 5]);

        let mut slices = Vec::new();
        let n = fx.output.get_slices(&mut slices, &fx.input, &fx.bits);
        assert_eq!(n, 4);
        assert_eq!(slices, vec![vec![2], vec![3], vec![4, 5]]);
        assert!(!fx.bits.has_data());
        assert!(fx.output.is_empty());
    }

    #[test]
    fn test_get_all() {
        let mut fx = Fixture::new(0);
        fx.send_slice(vec![1, 2]);
        fx.send_slice(vec![3]);
        fx.send([4]);

        assert_eq!(fx.output.get_all(&fx.input, &fx.bits), vec![1, 2, 3, 4]);
        assert!(!fx.bits.has_data());
        assert!(fx.output.get_all(&fx.input, &fx.bits).is_empty());
    }

    #[test]
    fn test_get_all_single_slice_as_is() {
        let mut fx = Fixture::new(0);
        let mut slice = Vec::with_capacity(64);
        slice.extend([7, 8]);
        fx.send_slice(slice);

        let all = fx.output.get_all(&fx.input, &fx.bits);
        assert_eq!(all, vec![7, 8]);
        assert_eq!(all.capacity(), 64);
    }

    #[test]
    fn test_read_partial() {
        let mut fx = Fixture::new(0);
        fx.send_slice(vec![1, 2, 3]);
        fx.send_slice(vec![4, 5]);

        let mut dest = [0; 4];
        assert_eq!(fx.output.read(&mut dest, &fx.input, &fx.bits), 4);
        assert_eq!(dest, [1, 2, 3, 4]);
        assert!(fx.bits.has_data());

        assert_eq!(fx.output.read(&mut dest, &fx.input, &fx.bits), 1);
        assert_eq!(dest[0], 5);
        assert!(!fx.bits.has_data());
        assert_eq!(fx.output.read(&mut dest, &fx.input, &fx.bits), 0);
    }

    #[test]
    fn test_read_exact_fit_clears_bits() {
        let mut fx = Fixture::new(0);
        fx.send([1, 2]);

        let mut dest = [0; 2];
        assert_eq!(fx.output.read(&mut dest, &fx.input, &fx.bits), 2);
        assert!(!fx.bits.has_data());
    }

    #[test]
    fn test_oversized_slice_not_retained() {
        let mut fx = Fixture::new(4);
        let mut large = Vec::with_capacity(1000);
        large.push(1);
        fx.send_slice(large);

        assert_eq!(fx.get(), Some(1));
        assert!(
            fx.output
                .cached_output
                .as_ref()
                .is_none_or(|cached| cached.capacity() <= 100)
        );
    }

    #[test]
    fn test_values_snapshot() {
        let mut fx = Fixture::new(0);
        fx.send_slice(vec![1, 2]);
        fx.send_slice(vec![3]);
        let mut dest = [0; 1];
        fx.output.read(&mut dest, &fx.input, &fx.bits);

        let values: Vec<u32> = fx.output.values().copied().collect();
        assert_eq!(values, vec![2, 3]);
    }
}
