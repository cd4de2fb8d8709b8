//! Slab sizing derived from the element type and the configured size
//!
//! 由元素类型与配置大小推导出的 slab 尺寸

use std::mem::size_of;

/// Byte budget of a default slab
const SIZE_4KIB: usize = 4096;

/// Smallest slab size, in elements
const MIN_SIZE: usize = 10;

/// Smallest retain threshold, in elements
const MIN_MAX_RETAIN_SIZE: usize = 100;

/// Byte cap beyond which a value slice is never grown
const MAX_SLICE_BYTES: usize = 16 << 20;

/// Derived sizing of value slices for an element type
///
/// 针对某元素类型推导出的值切片尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SizeConfig {
    /// Capacity of newly allocated value slices
    pub(crate) size: usize,
    /// Slices with larger capacity are dropped rather than reused
    pub(crate) max_retain_size: usize,
    /// Capacity at which a value slice is no longer grown
    pub(crate) max_slice_cap: usize,
    /// A full slab fits in 4 KiB, so speculative caching is cheap
    pub(crate) size_max_4kib: bool,
    /// Suppresses speculative pre-allocation
    pub(crate) is_low_alloc: bool,
}

impl SizeConfig {
    /// Sizing for `T`, `requested` of zero selects the default size
    ///
    /// The size never exceeds the per-slice cap, so a slab is at most 16 MiB
    /// unless a single element is larger.
    ///
    /// `T` 的尺寸配置；`requested` 为 0 时使用默认大小。大小不超过单切片上限。
    pub(crate) fn for_type<T>(requested: usize) -> Self {
        // Zero-sized types are accounted as one byte
        let element_bytes = size_of::<T>().max(1);
        let max_slice_cap = (MAX_SLICE_BYTES / element_bytes).max(1);

        let size = if requested == 0 {
            (SIZE_4KIB / element_bytes).max(MIN_SIZE)
        } else {
            requested
        }
        .min(max_slice_cap);

        Self {
            size,
            max_retain_size: size.max(MIN_MAX_RETAIN_SIZE.min(max_slice_cap)),
            max_slice_cap,
            size_max_4kib: size.saturating_mul(element_bytes) <= SIZE_4KIB,
            is_low_alloc: size <= MIN_SIZE,
        }
    }

    /// Capacity a full slice of capacity `capacity` may grow to, if any
    ///
    /// Slices grow by doubling until they reach `size`; beyond that, or across
    /// the per-slice cap, a new slice is started instead.
    ///
    /// 容量为 `capacity` 的满切片可增长到的容量
    pub(crate) fn grow_target(&self, capacity: usize) -> Option<usize> {
        if capacity >= self.size {
            return None;
        }
        let target = capacity.saturating_mul(2).max(4).min(self.size);
        (target <= self.max_slice_cap).then_some(target)
    }

    /// Whether a slice of this capacity may be kept for reuse
    #[inline]
    pub(crate) fn is_retainable(&self, capacity: usize) -> bool {
        capacity > 0 && capacity <= self.max_retain_size
    }
}
