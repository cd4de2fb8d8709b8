//! FIFO of value slices shared by the input and output queues
//!
//! 输入队列与输出队列共用的值切片 FIFO

use std::collections::VecDeque;
use std::mem;

/// Backing capacity of a freshly allocated slice list
pub(crate) const LIST_CAPACITY: usize = 10;

/// Ordered sequence of non-empty value slices
///
/// Dequeued slices are moved out of the backing deque, so the backing storage
/// never retains a slice that has left the list. The number of values across
/// all resident slices is tracked alongside.
///
/// 非空值切片的有序序列。出队的切片会被移出底层存储，底层存储从不保留已离开的切片。
pub(crate) struct SliceList<T> {
    slices: VecDeque<Vec<T>>,
    element_count: usize,
}

impl<T> SliceList<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slices: VecDeque::new(),
            element_count: 0,
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Number of slices
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slices.len()
    }

    /// Number of values across all slices
    #[inline]
    pub(crate) fn element_count(&self) -> usize {
        self.element_count
    }

    /// Capacity of the backing storage, in slices
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slices.capacity()
    }

    /// Install pre-allocated backing storage into an empty list
    ///
    /// 将预先分配的底层存储装入空列表
    pub(crate) fn set_list(&mut self, backing: VecDeque<Vec<T>>) {
        debug_assert!(self.slices.is_empty() && backing.is_empty());
        self.slices = backing;
    }

    /// Append a slice; empty slices are not enqueued
    ///
    /// 追加一个切片；空切片不会入队
    pub(crate) fn enqueue(&mut self, slice: Vec<T>) {
        if slice.is_empty() {
            return;
        }
        if self.slices.capacity() == 0 {
            self.slices.reserve_exact(LIST_CAPACITY);
        }
        self.element_count += slice.len();
        self.slices.push_back(slice);
    }

    /// Remove the oldest slice
    ///
    /// 移除最早的切片
    pub(crate) fn dequeue(&mut self) -> Option<Vec<T>> {
        let slice = self.slices.pop_front()?;
        self.element_count -= slice.len();
        Some(slice)
    }

    /// Move every slice, oldest first, into `dest`
    ///
    /// 将所有切片按从旧到新的顺序移入 `dest`
    pub(crate) fn dequeue_all(&mut self, dest: &mut Vec<Vec<T>>) {
        dest.extend(self.slices.drain(..));
        self.element_count = 0;
    }

    /// Move up to `dest.len()` values, oldest first, into `dest`
    ///
    /// Returns the number of values moved and, when a slice was only partly
    /// consumed, the remainder of that slice. The remainder has left the list.
    ///
    /// 将至多 `dest.len()` 个值按从旧到新的顺序移入 `dest`。返回移动的值数量；
    /// 若某切片只被部分消费，同时返回其剩余部分（已离开列表）。
    pub(crate) fn dequeue_n(&mut self, dest: &mut [T]) -> (usize, Option<VecDeque<T>>) {
        let mut n = 0;
        while n < dest.len() {
            let Some(slice) = self.dequeue() else {
                break;
            };
            let mut values = VecDeque::from(slice);
            for slot in &mut dest[n..] {
                match values.pop_front() {
                    Some(value) => {
                        *slot = value;
                        n += 1;
                    }
                    None => break,
                }
            }
            if !values.is_empty() {
                return (n, Some(values));
            }
        }
        (n, None)
    }

    /// Move every slice of `other` to the back of this list
    ///
    /// When this list is empty the backing storages are swapped, so `other`
    /// receives this list's backing for its next use.
    ///
    /// 将 `other` 的所有切片移到本列表尾部。若本列表为空则交换底层存储。
    pub(crate) fn append(&mut self, other: &mut SliceList<T>) {
        if self.slices.is_empty() {
            mem::swap(&mut self.slices, &mut other.slices);
        } else {
            self.slices.append(&mut other.slices);
        }
        self.element_count += other.element_count;
        other.element_count = 0;
    }

    /// Length of the newest slice
    #[inline]
    pub(crate) fn last_len(&self) -> usize {
        self.slices.back().map_or(0, Vec::len)
    }

    /// Capacity of the newest slice
    #[inline]
    pub(crate) fn last_capacity(&self) -> usize {
        self.slices.back().map_or(0, Vec::capacity)
    }

    /// Push a value onto the newest slice
    ///
    /// Returns the value back if the list is empty.
    ///
    /// 将值追加到最新的切片；若列表为空则原样返回该值。
    pub(crate) fn push_last(&mut self, value: T) -> Result<(), T> {
        match self.slices.back_mut() {
            Some(last) => {
                last.push(value);
                self.element_count += 1;
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Reserve room so the newest slice reaches `capacity`
    pub(crate) fn reserve_last(&mut self, capacity: usize) {
        if let Some(last) = self.slices.back_mut() {
            last.reserve_exact(capacity.saturating_sub(last.len()));
        }
    }

    /// Iterate over resident slices, oldest first
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Vec<T>> {
        self.slices.iter()
    }
}

impl<T: Clone> SliceList<T> {
    /// Copy values into the free capacity of the newest slice
    ///
    /// Returns the number of values copied.
    ///
    /// 将值复制到最新切片的空闲容量中，返回复制的数量。
    pub(crate) fn extend_last_from_slice(&mut self, values: &[T]) -> usize {
        let Some(last) = self.slices.back_mut() else {
            return 0;
        };
        let n = values.len().min(last.capacity() - last.len());
        last.extend_from_slice(&values[..n]);
        self.element_count += n;
        n
    }
}

impl<T> Default for SliceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SliceList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceList")
            .field("len", &self.len())
            .field("element_count", &self.element_count)
            .field("capacity", &self.capacity())
            .finish()
    }
}
