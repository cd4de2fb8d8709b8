//! Producer side of the queue, protected by the input lock
//!
//! 队列的生产者侧，由输入锁保护

use std::mem;

use super::size_config::SizeConfig;
use super::slice_list::SliceList;

/// Producer-side state
///
/// `primary` holds the oldest values of the input side; `slice_list` holds the
/// newer ones. If `slice_list` is non-empty then `primary` is non-empty, so an
/// empty `primary` means the whole input side is empty. `cached_input` is a
/// zero-length slice with spare capacity used before allocating.
///
/// 生产者侧状态。若 `slice_list` 非空则 `primary` 非空；`cached_input` 为长度为 0、
/// 带有空闲容量的切片，分配前优先使用。
pub(crate) struct InputQueue<T> {
    pub(super) primary: Vec<T>,
    pub(super) slice_list: SliceList<T>,
    pub(super) cached_input: Option<Vec<T>>,
    config: Option<SizeConfig>,
}

impl<T> InputQueue<T> {
    pub(crate) const fn new() -> Self {
        Self {
            primary: Vec::new(),
            slice_list: SliceList::new(),
            cached_input: None,
            config: None,
        }
    }

    /// Slab sizing, materialized on first use
    ///
    /// slab 尺寸配置，首次使用时确定
    #[inline]
    pub(crate) fn config(&mut self) -> SizeConfig {
        *self.config.get_or_insert_with(|| SizeConfig::for_type::<T>(0))
    }

    pub(crate) fn set_config(&mut self, config: SizeConfig) {
        self.config = Some(config);
    }

    /// Number of values on the input side
    #[inline]
    pub(crate) fn element_count(&self) -> usize {
        self.primary.len() + self.slice_list.element_count()
    }

    /// Whether the input side holds no values
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Append one value
    ///
    /// The newest slice is filled up to its capacity, grown by doubling while
    /// below the slab size, and otherwise followed by a new slab.
    ///
    /// 追加一个值。最新的切片先被填满；低于 slab 大小时按倍数增长，否则开启新的 slab。
    pub(crate) fn send(&mut self, value: T) {
        let config = self.config();
        let (len, capacity) = self.tail_metrics();

        if capacity == 0 {
            // Nothing allocated yet, primary is empty
            let mut slice = self.slab(1, config.size);
            slice.push(value);
            self.install_slice(slice);
            return;
        }

        if len == capacity {
            match config.grow_target(capacity) {
                Some(target) => self.reserve_tail(target),
                None => {
                    let mut slice = Vec::with_capacity(config.size);
                    slice.push(value);
                    self.install_slice(slice);
                    return;
                }
            }
        }
        self.push_tail(value);
    }

    /// Take ownership of a slice of values
    ///
    /// Returns the number of values added.
    ///
    /// 接管一个值切片的所有权，返回新增值的数量。
    pub(crate) fn send_slice(&mut self, slice: Vec<T>) -> usize {
        let n = slice.len();
        if n > 0 {
            self.install_slice(slice);
        }
        n
    }

    /// Take ownership of several slices, skipping empty ones
    ///
    /// 接管多个切片的所有权，跳过空切片
    pub(crate) fn send_slices(&mut self, slices: impl IntoIterator<Item = Vec<T>>) -> usize {
        slices
            .into_iter()
            .map(|slice| self.send_slice(slice))
            .sum()
    }

    /// Present values, oldest first
    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.primary.iter().chain(self.slice_list.iter().flatten())
    }

    /// Newest slice: `primary` while the list is empty, else the list's last slice
    fn tail_metrics(&self) -> (usize, usize) {
        if self.slice_list.is_empty() {
            (self.primary.len(), self.primary.capacity())
        } else {
            (self.slice_list.last_len(), self.slice_list.last_capacity())
        }
    }

    fn push_tail(&mut self, value: T) {
        if self.slice_list.is_empty() {
            self.primary.push(value);
        } else if let Err(value) = self.slice_list.push_last(value) {
            self.primary.push(value);
        }
    }

    fn reserve_tail(&mut self, capacity: usize) {
        if self.slice_list.is_empty() {
            let additional = capacity.saturating_sub(self.primary.len());
            self.primary.reserve_exact(additional);
        } else {
            self.slice_list.reserve_last(capacity);
        }
    }

    /// Add a non-empty slice after all present values
    fn install_slice(&mut self, slice: Vec<T>) {
        if self.is_empty() {
            let previous = mem::replace(&mut self.primary, slice);
            self.retain(previous);
        } else {
            self.slice_list.enqueue(slice);
        }
    }

    /// A zero-length slice holding at least `needed` values
    ///
    /// The cached slice is preferred; otherwise `capacity` is allocated.
    fn slab(&mut self, needed: usize, capacity: usize) -> Vec<T> {
        match self.cached_input.take_if(|cached| cached.capacity() >= needed) {
            Some(cached) => cached,
            None => Vec::with_capacity(capacity.max(needed)),
        }
    }

    /// Keep an emptied slice as `cached_input` when eligible
    fn retain(&mut self, mut slice: Vec<T>) {
        slice.clear();
        if self.cached_input.is_none() && self.config().is_retainable(slice.capacity()) {
            self.cached_input = Some(slice);
        }
    }
}

impl<T: Clone> InputQueue<T> {
    /// Append copies of `values`
    ///
    /// Free capacity of the newest slice is used first, then new slices of at
    /// least the slab size are started. Returns the number of values added.
    ///
    /// 追加 `values` 的副本。先使用最新切片的空闲容量，再开启至少为 slab 大小的新切片。
    pub(crate) fn send_clone(&mut self, values: &[T]) -> usize {
        if values.is_empty() {
            return 0;
        }
        let config = self.config();

        let mut rest = &values[self.copy_into_tail(values)..];
        while !rest.is_empty() {
            let capacity = rest.len().min(config.max_slice_cap).max(config.size);
            let mut slice = if self.is_empty() {
                self.slab(rest.len().min(capacity), capacity)
            } else {
                Vec::with_capacity(capacity)
            };
            let n = rest.len().min(slice.capacity());
            slice.extend_from_slice(&rest[..n]);
            rest = &rest[n..];
            self.install_slice(slice);
        }
        values.len()
    }

    fn copy_into_tail(&mut self, values: &[T]) -> usize {
        if self.slice_list.is_empty() {
            let n = values
                .len()
                .min(self.primary.capacity() - self.primary.len());
            self.primary.extend_from_slice(&values[..n]);
            n
        } else {
            self.slice_list.extend_last_from_slice(values)
        }
    }
}

impl<T> std::fmt::Debug for InputQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputQueue")
            .field("primary_len", &self.primary.len())
            .field("slice_list", &self.slice_list)
            .field("cached_input", &self.cached_input.as_ref().map(Vec::capacity))
            .finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    fn drain<T>(queue: &mut InputQueue<T>) -> Vec<T> {
        let mut all = mem::take(&mut queue.primary);
        let mut slices = Vec::new();
        queue.slice_list.dequeue_all(&mut slices);
        for slice in slices {
            all.extend(slice);
        }
        all
    }

    #[test]
    fn test_send_fills_primary() {
        let mut queue = InputQueue::new();
        queue.set_config(SizeConfig::for_type::<u32>(8));

        for i in 0..8u32 {
            queue.send(i);
        }
        // First slab is allocated at the slab size
        assert_eq!(queue.primary.len(), 8);
        assert_eq!(queue.primary.capacity(), 8);
        assert!(queue.slice_list.is_empty());

        queue.send(8);
        assert_eq!(queue.slice_list.len(), 1);
        assert_eq!(queue.element_count(), 9);
        assert_eq!(drain(&mut queue), (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_send_uses_cached_input() {
        let mut queue = InputQueue::new();
        queue.cached_input = Some(Vec::with_capacity(32));

        queue.send(1u64);
        assert!(queue.cached_input.is_none());
        assert_eq!(queue.primary.capacity(), 32);
    }

    #[test]
    fn test_send_slice_installs_primary() {
        let mut queue = InputQueue::new();
        queue.primary = Vec::with_capacity(16);

        assert_eq!(queue.send_slice(vec![1, 2, 3]), 3);
        assert_eq!(queue.primary, vec![1, 2, 3]);
        // The empty former primary was kept for reuse
        assert_eq!(queue.cached_input.as_ref().map(Vec::capacity), Some(16));

        assert_eq!(queue.send_slice(Vec::new()), 0);
        assert_eq!(queue.send_slice(vec![4]), 1);
        assert_eq!(queue.slice_list.len(), 1);
        assert_eq!(drain(&mut queue), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_send_slices_skips_empty() {
        let mut queue = InputQueue::new();
        let n = queue.send_slices(vec![Vec::new(), vec![1], Vec::new(), vec![2, 3]]);
        assert_eq!(n, 3);
        assert_eq!(queue.primary, vec![1]);
        assert_eq!(queue.slice_list.len(), 1);
    }

    #[test]
    fn test_send_clone_uses_slack_then_new_slices() {
        let mut queue = InputQueue::new();
        queue.set_config(SizeConfig::for_type::<u8>(4));
        queue.send(0u8);
        queue.reserve_tail(4);

        let values: Vec<u8> = (1..=10).collect();
        assert_eq!(queue.send_clone(&values), 10);

        // Slack of the primary first, then one slice for the remainder
        assert_eq!(queue.primary.len(), queue.primary.capacity());
        assert_eq!(queue.slice_list.len(), 1);
        assert_eq!(queue.element_count(), 11);
        assert_eq!(drain(&mut queue), (0..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_send_clone_into_empty() {
        let mut queue = InputQueue::<u16>::new();
        assert_eq!(queue.send_clone(&[]), 0);
        assert!(queue.is_empty());

        assert_eq!(queue.send_clone(&[7, 8]), 2);
        assert_eq!(queue.primary, vec![7, 8]);
        let size = queue.config().size;
        assert!(queue.primary.capacity() >= size);
    }

    #[test]
    fn test_oversized_slice_not_cached() {
        let mut queue = InputQueue::<u64>::new();
        queue.set_config(SizeConfig::for_type::<u64>(16));
        queue.primary = Vec::with_capacity(1000);

        queue.send_slice(vec![1]);
        assert!(queue.cached_input.is_none());
    }
}
