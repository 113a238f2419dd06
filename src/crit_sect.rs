//! Critical sections protecting the data shared with the time base IRQ handler
//!
//! Entering a critical section produces a [`CriticalSection`] token. The token proves that the
//! compare match IRQ cannot preempt the current context, so data wrapped in a
//! [`Mutex`](crate::mutex::Mutex) can be accessed.

// TODO: Implement own mutex abstraction instead of relying on cortex_m blocking IRQs
//       It should block only the IRQ of the counter owned by the time base

/// Token proving that the counter IRQ is blocked
pub struct CriticalSection<'a> {
    _internal_cs: &'a cortex_m::interrupt::CriticalSection,
}

impl<'a> CriticalSection<'a> {
    fn new(internal_cs: &'a cortex_m::interrupt::CriticalSection) -> Self {
        Self {
            _internal_cs: internal_cs,
        }
    }
}

/// Runs `f` with IRQs blocked
///
/// Critical sections may be nested. The IRQ state from before the outermost call is restored when
/// `f` returns.
///
/// # Example
///
/// ```
/// # #[macro_use] extern crate nrf_timebase;
/// # missing_test_fns!();
/// # fn main() {
/// use nrf_timebase::crit_sect;
/// use nrf_timebase::mutex::Mutex;
///
/// static EVENTS: Mutex<u32> = Mutex::new(0);
///
/// let events = crit_sect::locked(|cs| {
///     *EVENTS.borrow_mut(cs) += 1;
///     *EVENTS.borrow(cs)
/// });
/// assert_eq!(events, 1);
/// # }
/// ```
pub fn locked<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    #[cfg(target_arch = "arm")]
    {
        cortex_m::interrupt::free(|cs| f(&CriticalSection::new(cs)))
    }

    #[cfg(not(target_arch = "arm"))]
    {
        // Safety: host builds have no IRQs which could preempt the caller
        let cs = unsafe { cortex_m::interrupt::CriticalSection::new() };
        f(&CriticalSection::new(&cs))
    }
}

/// Macro used to build doctests on a host
///
/// It provides the symbols older `cortex-m` releases expect from the target, so that doctest
/// binaries using target peripherals link on a host.
#[doc(hidden)]
#[macro_export]
macro_rules! missing_test_fns {
    () => {
        #[doc(hidden)]
        #[no_mangle]
        pub extern "C" fn __primask_r() -> u32 {
            0
        }

        #[doc(hidden)]
        #[no_mangle]
        pub extern "C" fn __cpsie() {}

        #[doc(hidden)]
        #[no_mangle]
        pub extern "C" fn __cpsid() {}

        #[doc(hidden)]
        #[no_mangle]
        pub extern "C" fn __wfi() {}
    };
}
