//! Wraparound-safe interval arithmetic
//!
//! Tick values come from a counter which, in practice, never wraps during the lifetime of a
//! device. The interval computation must still be correct if it does, so it computes the forward
//! distance across the wraparound boundary. It is generic over the counter width what allows
//! testing the wraparound on narrow types.

/// Unsigned integer usable as a tick value
pub trait TickValue: Copy + Ord {
    /// The largest representable tick value
    const MAX: Self;

    /// Forward distance from `start` to `end`
    fn forward_distance(start: Self, end: Self) -> Self;
}

macro_rules! impl_tick_value {
    ($($t:ty),*) => {
        $(
            impl TickValue for $t {
                const MAX: Self = <$t>::MAX;

                fn forward_distance(start: Self, end: Self) -> Self {
                    if end >= start {
                        end - start
                    } else {
                        // end < start, so neither addition can overflow
                        end + (Self::MAX - start) + 1
                    }
                }
            }
        )*
    };
}

impl_tick_value!(u8, u16, u32, u64, usize);

/// Number of ticks between `start` and `end`
///
/// If `end` is lower than `start` the counter is assumed to have wrapped around once.
///
/// # Examples
///
/// ```
/// # #[macro_use] extern crate nrf_timebase;
/// # missing_test_fns!();
/// # fn main() {
/// use nrf_timebase::time_base::elapsed;
///
/// assert_eq!(elapsed(10u64, 25u64), 15);
/// assert_eq!(elapsed(u64::MAX, 0u64), 1);
/// assert_eq!(elapsed(253u8, 3u8), 6);
/// # }
/// ```
pub fn elapsed<T: TickValue>(start: T, end: T) -> T {
    T::forward_distance(start, end)
}
