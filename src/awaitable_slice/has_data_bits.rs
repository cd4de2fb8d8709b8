//! Two-bit summary of queue emptiness shared across the input and output locks
//!
//! 跨输入锁与输出锁共享的两位队列非空摘要

use crate::shim::atomic::{AtomicU8, Ordering};

/// Set: the queue holds at least one value somewhere
///
/// 置位：队列中至少有一个值
const HAS_DATA: u8 = 0b01;

/// Set: the input side holds at least one value
///
/// 置位：输入侧至少有一个值
const INPUT_HAS_DATA: u8 = 0b10;

/// Atomic word encoding two facts about the queue
///
/// Transitions:
/// - producer, input lock held: `0b00|0b01 -> 0b11` via [`set_all_bits`](Self::set_all_bits)
/// - consumer, both locks held: `-> 0b01` via [`reset_to_has_data_bit`](Self::reset_to_has_data_bit)
/// - consumer, output lock held: `0b01 -> 0b00` via [`set_output_lock_empty`](Self::set_output_lock_empty),
///   and only if no producer set `INPUT_HAS_DATA` in the meantime
///
/// All operations are sequentially consistent so that the close path, which
/// stores its flag and then reads these bits, cannot miss a consumer that
/// cleared the bits and then reads the flag.
///
/// 编码队列两项事实的原子字。
pub(crate) struct HasDataBits {
    bits: AtomicU8,
}

impl HasDataBits {
    pub(crate) fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Producer: the input side just received values
    ///
    /// 生产者：输入侧刚收到值
    #[inline]
    pub(crate) fn set_all_bits(&self) {
        self.bits.fetch_or(HAS_DATA | INPUT_HAS_DATA, Ordering::SeqCst);
    }

    /// Consumer holding both locks: the input side was drained to the output side
    ///
    /// A plain store is sound because no producer can run while the input lock is held.
    ///
    /// 同时持有两把锁的消费者：输入侧已被转移到输出侧
    #[inline]
    pub(crate) fn reset_to_has_data_bit(&self) {
        self.bits.store(HAS_DATA, Ordering::SeqCst);
    }

    /// Consumer holding the output lock: the output side is empty
    ///
    /// Clears `HAS_DATA` only when the state is exactly `HAS_DATA`. If a producer
    /// has since set `INPUT_HAS_DATA`, the queue is non-empty and the state is kept.
    /// Returns whether `HAS_DATA` was cleared.
    ///
    /// 持有输出锁的消费者：输出侧为空。仅当状态恰为 `HAS_DATA` 时清除。
    #[inline]
    pub(crate) fn set_output_lock_empty(&self) -> bool {
        self.bits
            .compare_exchange(HAS_DATA, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Whether the queue holds any value
    ///
    /// 队列中是否有值
    #[inline]
    pub(crate) fn has_data(&self) -> bool {
        self.bits.load(Ordering::SeqCst) & HAS_DATA != 0
    }

    /// Whether the input side is empty
    ///
    /// 输入侧是否为空
    #[inline]
    pub(crate) fn is_in_q_empty(&self) -> bool {
        self.bits.load(Ordering::SeqCst) & INPUT_HAS_DATA == 0
    }
}

impl std::fmt::Debug for HasDataBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = self.bits.load(Ordering::Acquire);
        f.debug_struct("HasDataBits")
            .field("has_data", &(bits & HAS_DATA != 0))
            .field("input_has_data", &(bits & INPUT_HAS_DATA != 0))
            .finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    #[test]
    fn test_initially_empty() {
        let bits = HasDataBits::new();
        assert!(!bits.has_data());
        assert!(bits.is_in_q_empty());
    }

    #[test]
    fn test_producer_consumer_cycle() {
        let bits = HasDataBits::new();

        bits.set_all_bits();
        assert!(bits.has_data());
        assert!(!bits.is_in_q_empty());

        // Transfer under both locks
        bits.reset_to_has_data_bit();
        assert!(bits.has_data());
        assert!(bits.is_in_q_empty());

        // Output drained
        assert!(bits.set_output_lock_empty());
        assert!(!bits.has_data());
    }

    #[test]
    fn test_output_empty_does_not_clear_new_input() {
        let bits = HasDataBits::new();
        bits.set_all_bits();
        bits.reset_to_has_data_bit();

        // A producer sends before the consumer observes its output empty
        bits.set_all_bits();
        assert!(!bits.set_output_lock_empty());
        assert!(bits.has_data());
        assert!(!bits.is_in_q_empty());
    }

    #[test]
    fn test_output_empty_on_empty_is_noop() {
        let bits = HasDataBits::new();
        assert!(!bits.set_output_lock_empty());
        assert!(!bits.has_data());
    }
}
