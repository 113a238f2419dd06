//! Mutex ensuring that access to variables shared with the counter IRQ is mutually exclusive.
//!
//! This mutex requires proof of disabled IRQs provided by the `CriticalSection`'s lock

use crate::crit_sect::CriticalSection;
use core::cell::{Ref, RefCell, RefMut};

/// Wraps variable which is accessible from an IRQ
pub struct Mutex<T>(RefCell<T>);

impl<T> Mutex<T> {
    /// Creates new wrapper for a variable accessible from an IRQ
    ///
    /// The constructor is `const`, so the wrapped variable can be a `static` initialized before
    /// the time base is configured.
    pub const fn new(value: T) -> Mutex<T> {
        Self(RefCell::new(value))
    }

    /// Borrows Mutex's internal variable with mutually exclusive access
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
    /// static LAST_TICK: Mutex<u64> = Mutex::new(0);
    ///
    /// let last_tick = crit_sect::locked(|cs| *LAST_TICK.borrow(cs));
    /// assert_eq!(last_tick, 0);
    /// # }
    /// ```
    pub fn borrow<'cs>(&'cs self, _cs: &'cs CriticalSection) -> Ref<'cs, T> {
        self.0.borrow()
    }

    /// Mutably borrows Mutex's internal variable with mutually exclusive access
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
    /// static MISSED_MATCHES: Mutex<u32> = Mutex::new(u32::MAX);
    ///
    /// let missed = crit_sect::locked(|cs| {
    ///     let mut missed = MISSED_MATCHES.borrow_mut(cs);
    ///     *missed = missed.wrapping_add(1);
    ///     *missed
    /// });
    /// assert_eq!(missed, 0);
    /// # }
    /// ```
    pub fn borrow_mut<'cs>(&'cs self, _cs: &'cs CriticalSection) -> RefMut<'cs, T> {
        self.0.borrow_mut()
    }

    /// Replaces Mutex's internal variable returning the previous value
    ///
    /// It is used to hand over ownership of a peripheral shared with an IRQ handler.
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
    /// static OWNED_TIMER: Mutex<Option<u8>> = Mutex::new(None);
    ///
    /// let previous = crit_sect::locked(|cs| {
    ///     OWNED_TIMER.replace(Some(1), cs);
    ///     OWNED_TIMER.replace(Some(2), cs)
    /// });
    /// assert_eq!(previous, Some(1));
    /// # }
    /// ```
    pub fn replace(&self, value: T, _cs: &CriticalSection) -> T {
        self.0.replace(value)
    }
}

// Safety: Mutex is Sync assumming contained type is Send and the CriticalSection module prevents
// concurrent access to Mutex from multiple contexts. This assumption is verified run-time by
// RefCell used inside the mutex
unsafe impl<T> Sync for Mutex<T> where T: Send {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crit_sect;

    #[test]
    fn test_replace_hands_over_ownership() {
        let owner = Mutex::new(None);

        crit_sect::locked(|cs| {
            assert_eq!(owner.replace(Some(1u8), cs), None);
            assert_eq!(owner.replace(None, cs), Some(1));
            assert!(owner.borrow(cs).is_none());
        });
    }

    #[test]
    #[should_panic]
    fn test_conflicting_borrows_are_detected() {
        let tick = Mutex::new(0u64);

        crit_sect::locked(|cs| {
            let _reader = tick.borrow(cs);
            *tick.borrow_mut(cs) += 1;
        });
    }
}
