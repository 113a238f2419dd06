//! Timeouts measured in ticks of the time base

use super::{elapsed, TimeBase};

/// Deadline expressed as a number of ticks elapsed since a start tick
///
/// A timeout holds no resources. It can be copied, reset and polled freely.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout {
    start: u64,
    duration: u64,
}

impl Timeout {
    /// Create a timeout of `duration` ticks counted from the `start` tick
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate nrf_timebase;
    /// # missing_test_fns!();
    /// # fn main() {
    /// use nrf_timebase::time_base::Timeout;
    ///
    /// let timeout = Timeout::new(100, 5);
    /// assert!(!timeout.is_reached_at(104));
    /// assert!(timeout.is_reached_at(105));
    /// # }
    /// ```
    pub const fn new(start: u64, duration: u64) -> Self {
        Self { start, duration }
    }

    /// Tick at which the timeout was started or reset
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Number of ticks which must elapse before the timeout is reached
    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Check if the timeout is reached at tick `now`
    pub fn is_reached_at(&self, now: u64) -> bool {
        elapsed(self.start, now) >= self.duration
    }

    /// Number of ticks left until the timeout is reached at tick `now`
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate nrf_timebase;
    /// # missing_test_fns!();
    /// # fn main() {
    /// use nrf_timebase::time_base::Timeout;
    ///
    /// let timeout = Timeout::new(u64::MAX, 10);
    /// assert_eq!(timeout.remaining_at(3), 6);
    /// assert_eq!(timeout.remaining_at(20), 0);
    /// # }
    /// ```
    pub fn remaining_at(&self, now: u64) -> u64 {
        self.duration.saturating_sub(elapsed(self.start, now))
    }
}

impl TimeBase {
    /// Start a timeout of `duration` ticks from the current tick
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[macro_use] extern crate nrf_timebase;
    /// # missing_test_fns!();
    /// # fn main() {
    /// use nrf52840_hal::pac::{Interrupt, Peripherals};
    /// use nrf_timebase::hw::counter::timer_counter::TimerCounter;
    /// use nrf_timebase::time_base::{TickMode, TimeBase, TimerDescriptor};
    ///
    /// let peripherals = Peripherals::take().unwrap();
    /// let time_base = TimeBase::configure(TimerDescriptor {
    ///     counter: TimerCounter::new(&peripherals.TIMER1, Interrupt::TIMER1),
    ///     frequency: 1000,
    ///     resolution: 1_000_000,
    ///     mode: TickMode::Interrupt,
    /// })
    /// .unwrap();
    ///
    /// let mut timeout = time_base.start_timeout(500);
    /// loop {
    ///     # let data_received = false;
    ///     if data_received {
    ///         time_base.reset_timeout(&mut timeout);
    ///     } else if time_base.is_reached(&timeout) {
    ///         break;
    ///     }
    /// }
    /// # }
    /// ```
    pub fn start_timeout(&self, duration: u64) -> Timeout {
        Timeout::new(self.read_tick(), duration)
    }

    /// Restart `timeout` from the current tick, keeping its duration
    pub fn reset_timeout(&self, timeout: &mut Timeout) {
        timeout.start = self.read_tick();
    }

    /// Check if `timeout` is reached
    pub fn is_reached(&self, timeout: &Timeout) -> bool {
        timeout.is_reached_at(self.read_tick())
    }

    /// Number of ticks left until `timeout` is reached
    pub fn remaining(&self, timeout: &Timeout) -> u64 {
        timeout.remaining_at(self.read_tick())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::super::{irq_handler, TickMode, TimeBase};
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_zero_duration_is_reached_immediately() {
        let timeout = Timeout::new(7, 0);
        assert!(timeout.is_reached_at(7));
    }

    #[test]
    fn test_is_reached_across_wraparound() {
        let timeout = Timeout::new(u64::MAX - 1, 3);
        assert!(!timeout.is_reached_at(u64::MAX));
        assert!(!timeout.is_reached_at(0));
        assert!(timeout.is_reached_at(1));
    }

    #[test]
    #[serial]
    fn test_timeout_is_reached_after_exactly_duration_ticks() {
        TimeBase::reset();
        let mut counter = configurable_counter(TickMode::Polling);
        counter.expect_status().returning(latched_status);
        let time_base = configure_1ms(counter, TickMode::Polling);

        let timeout = time_base.start_timeout(5);
        assert_eq!(timeout.duration(), 5);
        assert_eq!(timeout.start(), 0);

        for _ in 0..4 {
            compare_match();
            assert!(!time_base.is_reached(&timeout));
        }
        assert_eq!(time_base.remaining(&timeout), 1);

        compare_match();
        assert!(time_base.is_reached(&timeout));
        assert!(time_base.is_reached(&timeout));
        assert_eq!(time_base.remaining(&timeout), 0);
    }

    #[test]
    #[serial]
    fn test_reset_timeout_rebases_start() {
        TimeBase::reset();
        let mut counter = configurable_counter(TickMode::Interrupt);
        counter.expect_status().returning(latched_status);
        let time_base = configure_1ms(counter, TickMode::Interrupt);

        let mut timeout = time_base.start_timeout(3);
        for _ in 0..3 {
            compare_match();
            irq_handler();
        }
        assert!(time_base.is_reached(&timeout));

        time_base.reset_timeout(&mut timeout);
        assert_eq!(timeout.start(), 3);
        assert_eq!(timeout.duration(), 3);
        assert!(!time_base.is_reached(&timeout));
    }

    #[test]
    #[serial]
    fn test_timeout_started_before_tick_wraparound() {
        TimeBase::reset();
        let mut counter = configurable_counter(TickMode::Interrupt);
        counter.expect_status().returning(latched_status);
        let time_base = configure_1ms(counter, TickMode::Interrupt);
        set_tick(u64::MAX - 1);

        let timeout = time_base.start_timeout(3);
        for _ in 0..2 {
            compare_match();
            irq_handler();
            assert!(!time_base.is_reached(&timeout));
        }

        compare_match();
        irq_handler();
        assert_eq!(time_base.read_tick(), 1);
        assert!(time_base.is_reached(&timeout));
    }
}
