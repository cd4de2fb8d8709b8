//! Generic atomic minimum and maximum trackers
//!
//! Each tracker starts without a value. The first observation is installed under a
//! one-shot initialization lock, which resolves the race between concurrent first
//! observations without spinning. Later observations use a compare-and-swap loop.
//!
//! 通用原子最小值/最大值跟踪器
//!
//! 跟踪器初始时没有值。第一次观察在一次性初始化锁下写入，从而在不自旋的情况下
//! 解决并发首次观察之间的竞争。之后的观察使用 CAS 循环。

use std::fmt;
use std::marker::PhantomData;

use crate::shim::atomic::{self, AtomicBool, Ordering};
use crate::shim::lock;
use crate::shim::sync::Mutex;

/// Integer types with an atomic counterpart
///
/// 具有对应原子类型的整数类型
pub trait AtomicInteger: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// The atomic storage for this integer
    type Atomic: Send + Sync;

    fn new_atomic(value: Self) -> Self::Atomic;
    fn load(atomic: &Self::Atomic, order: Ordering) -> Self;
    fn store(atomic: &Self::Atomic, value: Self, order: Ordering);
    fn compare_exchange_weak(
        atomic: &Self::Atomic,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
}

macro_rules! impl_atomic_integer {
    ($($int:ty => $atomic:ident),* $(,)?) => {
        $(
            impl AtomicInteger for $int {
                type Atomic = atomic::$atomic;

                #[inline]
                fn new_atomic(value: Self) -> Self::Atomic {
                    atomic::$atomic::new(value)
                }

                #[inline]
                fn load(atomic: &Self::Atomic, order: Ordering) -> Self {
                    atomic.load(order)
                }

                #[inline]
                fn store(atomic: &Self::Atomic, value: Self, order: Ordering) {
                    atomic.store(value, order)
                }

                #[inline]
                fn compare_exchange_weak(
                    atomic: &Self::Atomic,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    atomic.compare_exchange_weak(current, new, success, failure)
                }
            }
        )*
    };
}

impl_atomic_integer!(
    u8 => AtomicU8,
    u16 => AtomicU16,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
    i8 => AtomicI8,
    i16 => AtomicI16,
    i32 => AtomicI32,
    i64 => AtomicI64,
    isize => AtomicIsize,
);

/// Which end of the order a tracker keeps
trait Direction {
    fn replaces<T: Ord>(candidate: T, current: T) -> bool;
}

struct Greatest;
struct Least;

impl Direction for Greatest {
    #[inline]
    fn replaces<T: Ord>(candidate: T, current: T) -> bool {
        candidate > current
    }
}

impl Direction for Least {
    #[inline]
    fn replaces<T: Ord>(candidate: T, current: T) -> bool {
        candidate < current
    }
}

/// Shared machinery of [`AtomicMin`] and [`AtomicMax`]
struct Extremum<T: AtomicInteger, D> {
    value: T::Atomic,
    has_value: AtomicBool,
    init_lock: Mutex<()>,
    _direction: PhantomData<D>,
}

impl<T: AtomicInteger, D: Direction> Extremum<T, D> {
    fn new(zero: T) -> Self {
        Self {
            value: T::new_atomic(zero),
            has_value: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            _direction: PhantomData,
        }
    }

    fn offer(&self, candidate: T) -> bool {
        if !self.has_value.load(Ordering::Acquire) {
            let _guard = lock(&self.init_lock);
            if !self.has_value.load(Ordering::Acquire) {
                T::store(&self.value, candidate, Ordering::Release);
                self.has_value.store(true, Ordering::Release);
                return true;
            }
        }

        let mut current = T::load(&self.value, Ordering::Acquire);
        loop {
            if !D::replaces(candidate, current) {
                return false;
            }
            match T::compare_exchange_weak(
                &self.value,
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn get(&self) -> Option<T> {
        if self.has_value.load(Ordering::Acquire) {
            Some(T::load(&self.value, Ordering::Acquire))
        } else {
            None
        }
    }
}

/// Atomic maximum of observed values
///
/// 观察值的原子最大值
pub struct AtomicMax<T: AtomicInteger> {
    inner: Extremum<T, Greatest>,
}

impl<T: AtomicInteger + Default> AtomicMax<T> {
    /// Create a tracker that has not observed any value
    ///
    /// 创建一个尚未观察到任何值的跟踪器
    pub fn new() -> Self {
        Self {
            inner: Extremum::new(T::default()),
        }
    }
}

impl<T: AtomicInteger> AtomicMax<T> {
    /// Observe a value, returns `true` if it became the new maximum
    ///
    /// 观察一个值，若其成为新的最大值则返回 `true`
    #[inline]
    pub fn value(&self, value: T) -> bool {
        self.inner.offer(value)
    }

    /// The maximum observed so far, `None` if nothing was observed
    ///
    /// 迄今观察到的最大值，若尚无观察则为 `None`
    #[inline]
    pub fn max(&self) -> Option<T> {
        self.inner.get()
    }
}

impl<T: AtomicInteger + Default> Default for AtomicMax<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: AtomicInteger> fmt::Debug for AtomicMax<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicMax").field("max", &self.max()).finish()
    }
}

/// Atomic minimum of observed values
///
/// 观察值的原子最小值
pub struct AtomicMin<T: AtomicInteger> {
    inner: Extremum<T, Least>,
}

impl<T: AtomicInteger + Default> AtomicMin<T> {
    /// Create a tracker that has not observed any value
    ///
    /// 创建一个尚未观察到任何值的跟踪器
    pub fn new() -> Self {
        Self {
            inner: Extremum::new(T::default()),
        }
    }
}

impl<T: AtomicInteger> AtomicMin<T> {
    /// Observe a value, returns `true` if it became the new minimum
    ///
    /// 观察一个值，若其成为新的最小值则返回 `true`
    #[inline]
    pub fn value(&self, value: T) -> bool {
        self.inner.offer(value)
    }

    /// The minimum observed so far, `None` if nothing was observed
    ///
    /// 迄今观察到的最小值，若尚无观察则为 `None`
    #[inline]
    pub fn min(&self) -> Option<T> {
        self.inner.get()
    }
}

impl<T: AtomicInteger + Default> Default for AtomicMin<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: AtomicInteger> fmt::Debug for AtomicMin<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicMin").field("min", &self.min()).finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_max_starts_empty() {
        let max = AtomicMax::<u64>::new();
        assert_eq!(max.max(), None);

        // First value is always a new maximum, even zero
        assert!(max.value(0));
        assert_eq!(max.max(), Some(0));
    }

    #[test]
    fn test_max_tracks_greatest() {
        let max = AtomicMax::<usize>::new();
        assert!(max.value(5));
        assert!(!max.value(3));
        assert!(!max.value(5));
        assert!(max.value(9));
        assert_eq!(max.max(), Some(9));
    }

    #[test]
    fn test_min_tracks_least() {
        let min = AtomicMin::<i32>::new();
        assert_eq!(min.min(), None);
        assert!(min.value(10));
        assert!(min.value(-3));
        assert!(!min.value(0));
        assert_eq!(min.min(), Some(-3));
    }

    #[test]
    fn test_concurrent_first_values() {
        for _ in 0..20 {
            let max = Arc::new(AtomicMax::<u32>::new());
            let min = Arc::new(AtomicMin::<u32>::new());

            let handles: Vec<_> = (1..=8u32)
                .map(|i| {
                    let max = max.clone();
                    let min = min.clone();
                    thread::spawn(move || {
                        for j in 0..100 {
                            max.value(i * 1000 + j);
                            min.value(i * 1000 + j);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(max.max(), Some(8099));
            assert_eq!(min.min(), Some(1000));
        }
    }
}
