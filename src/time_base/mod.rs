//! Single system-wide time base
//!
//! One hardware counter is programmed to produce a compare match each tick period. Each compare
//! match advances a 64-bit tick counter by exactly one. The tick counter starts at 0 and is never
//! reset while the program runs.
//!
//! Depending on [`TickMode`] compare matches are counted from the counter's IRQ, or lazily each
//! time the tick counter is read.
//!
//! # Examples
//!
//! ```no_run
//! # #[macro_use] extern crate nrf_timebase;
//! # missing_test_fns!();
//! # fn main() {
//! use nrf52840_hal::pac::{Interrupt, Peripherals};
//! use nrf_timebase::hw::counter::timer_counter::TimerCounter;
//! use nrf_timebase::time_base::{TickMode, TimeBase, TimerDescriptor};
//!
//! let peripherals = Peripherals::take().unwrap();
//!
//! // 1 ms ticks: the tick period is frequency / resolution seconds
//! let time_base = TimeBase::configure(TimerDescriptor {
//!     counter: TimerCounter::new(&peripherals.TIMER1, Interrupt::TIMER1),
//!     frequency: 1000,
//!     resolution: 1_000_000,
//!     mode: TickMode::Interrupt,
//! })
//! .unwrap();
//!
//! let timeout = time_base.start_timeout(100);
//! while !time_base.is_reached(&timeout) {
//!     // Poll something
//! }
//!
//! time_base.sleep_ms(10);
//! time_base.sleep_us(150);
//! # }
//! ```

pub mod interval;
mod sleep;
mod timeout;

pub use interval::{elapsed, TickValue};
pub use timeout::Timeout;

use crate::crit_sect::{self, CriticalSection};
use crate::error::Error;
use crate::hw::counter::traits::{Counter as _, Status};
use crate::hw::counter::Counter;
use crate::mutex::Mutex;

/// Strategy used to count compare matches
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickMode {
    /// The compare match IRQ is disabled. The match flag is checked on each tick read
    Polling,
    /// The compare match IRQ advances the tick counter
    ///
    /// Blocking sleeps put the CPU in a low power state between IRQs.
    Interrupt,
}

impl TickMode {
    /// Function bringing the tick counter up to date before it is read
    fn tick_refresh(self) -> fn(&CriticalSection) {
        match self {
            TickMode::Polling => poll_compare_match,
            TickMode::Interrupt => keep_tick,
        }
    }
}

/// Description of the time base requested by the caller
///
/// The tick period is `frequency / resolution` seconds. With the usual `resolution` of
/// `1_000_000` the `frequency` is the tick period in microseconds.
pub struct TimerDescriptor {
    /// Counter to be exclusively owned by the time base
    pub counter: Counter,
    /// Numerator of the tick period
    pub frequency: u32,
    /// Denominator of the tick period, also the minimal count rate of the counter
    pub resolution: u32,
    /// Strategy used to count compare matches
    pub mode: TickMode,
}

// There is only one COUNTER instance, because there is only one time base in the system. Both
// variables are accessed from the IRQ handler.
static COUNTER: Mutex<Option<Counter>> = Mutex::new(None);
static TICK: Mutex<u64> = Mutex::new(0);

/// Handle to the configured system time base
///
/// Handles are cheap to copy and are intended to be passed to every module requiring delays or
/// elapsed time measurements. Handles of a previous configuration must not be used after the
/// time base is configured again.
#[derive(Clone, Copy)]
pub struct TimeBase {
    frequency: u32,
    resolution: u32,
    reload: u32,
    tick_period_us: u64,
    mode: TickMode,
    refresh: fn(&CriticalSection),
}

impl TimeBase {
    /// Reset module
    ///
    /// This function is intended to be used between unit tests
    #[doc(hidden)]
    pub fn reset() {
        crit_sect::locked(|cs| {
            COUNTER.replace(None, cs);
            *TICK.borrow_mut(cs) = 0;
        });
    }

    /// Configure the system time base
    ///
    /// The counter passed in `descriptor` is programmed to restart each tick period, using the
    /// slowest clock source able to count `resolution` times per second. In
    /// [`TickMode::Interrupt`] the compare match IRQ is enabled, otherwise it is disabled.
    ///
    /// Configuring again stops and replaces the previous counter and tick period. The tick
    /// counter keeps its value.
    ///
    /// Returns:
    /// * [`Ok(TimeBase)`](TimeBase) handle to the running time base
    /// * [`Err(Error::InvalidTickPeriod)`](Error::InvalidTickPeriod) if `frequency` or
    ///   `resolution` is zero, or the tick period is shorter than 1 us
    /// * [`Err(Error::UnsupportedResolution)`](Error::UnsupportedResolution) if the counter has
    ///   no clock source fast enough for `resolution`
    /// * [`Err(Error::ReloadOutOfRange)`](Error::ReloadOutOfRange) if the tick period does not
    ///   fit the counter's compare register
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
    ///
    /// let time_base = TimeBase::configure(TimerDescriptor {
    ///     counter: TimerCounter::new(&peripherals.TIMER1, Interrupt::TIMER1),
    ///     frequency: 1000,
    ///     resolution: 1_000_000,
    ///     mode: TickMode::Polling,
    /// });
    /// assert!(time_base.is_ok());
    /// # }
    /// ```
    pub fn configure(descriptor: TimerDescriptor) -> Result<Self, Error> {
        let TimerDescriptor {
            counter,
            frequency,
            resolution,
            mode,
        } = descriptor;

        let tick_period_us = tick_period_us(frequency, resolution)?;
        let source = counter.select_clock_source(resolution)?;
        let reload = reload_value(
            counter.clock_source_frequency(source),
            frequency,
            resolution,
        )?;

        counter.configure(source, true);
        counter.set_reload_value(reload);

        match mode {
            TickMode::Polling => counter.disable_interrupt(),
            TickMode::Interrupt => {
                counter.unmask_irq();
                counter.enable_interrupt();
            }
        }

        crit_sect::locked(|cs| {
            if let Some(previous) = COUNTER.replace(Some(counter), cs) {
                warn!("time base configured again");
                previous.stop();
            }
            if let Some(counter) = COUNTER.borrow(cs).as_ref() {
                counter.start();
            }
        });

        info!(
            "time base: mode {}, tick {} us, reload {}",
            mode, tick_period_us, reload
        );

        Ok(Self {
            frequency,
            resolution,
            reload,
            tick_period_us,
            mode,
            refresh: mode.tick_refresh(),
        })
    }

    /// Get the current tick
    ///
    /// The returned value never decreases.
    pub fn read_tick(&self) -> u64 {
        crit_sect::locked(|cs| {
            (self.refresh)(cs);
            *TICK.borrow(cs)
        })
    }

    /// Strategy used to count compare matches
    pub fn mode(&self) -> TickMode {
        self.mode
    }

    /// Numerator of the tick period as passed to [`configure`](TimeBase::configure)
    pub fn tick_frequency(&self) -> u32 {
        self.frequency
    }

    /// Denominator of the tick period as passed to [`configure`](TimeBase::configure)
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Number of counter cycles in one tick period
    pub fn reload(&self) -> u32 {
        self.reload
    }

    /// Tick period in microseconds
    pub fn tick_period_us(&self) -> u64 {
        self.tick_period_us
    }
}

fn tick_period_us(frequency: u32, resolution: u32) -> Result<u64, Error> {
    if frequency == 0 || resolution == 0 {
        return Err(Error::InvalidTickPeriod);
    }
    match u64::from(frequency) * 1_000_000 / u64::from(resolution) {
        0 => Err(Error::InvalidTickPeriod),
        period => Ok(period),
    }
}

fn reload_value(source_frequency: u32, frequency: u32, resolution: u32) -> Result<u32, Error> {
    let reload = u64::from(source_frequency) * u64::from(frequency) / u64::from(resolution);
    match u32::try_from(reload) {
        Ok(0) | Err(_) => Err(Error::ReloadOutOfRange),
        Ok(reload) => Ok(reload),
    }
}

/// Runs `func` with the counter owned by the time base, if any
fn with_counter<F, R>(func: F) -> Option<R>
where
    F: FnOnce(&Counter) -> R,
{
    crit_sect::locked(|cs| COUNTER.borrow(cs).as_ref().map(func))
}

/// Advances the tick if the counter reports a compare match
fn advance_on_match(counter: &Counter, cs: &CriticalSection) {
    if counter.status().contains(Status::COMPARE_MATCH) {
        let mut tick = TICK.borrow_mut(cs);
        *tick = tick.wrapping_add(1);
    }
}

// The IRQ handler keeps the tick up to date
fn keep_tick(_cs: &CriticalSection) {}

fn poll_compare_match(cs: &CriticalSection) {
    if let Some(counter) = COUNTER.borrow(cs).as_ref() {
        advance_on_match(counter, cs);
    }
}

#[cfg(feature = "nrf52840")]
use nrf52840_hal::pac::interrupt;
#[cfg(feature = "nrf52840")]
#[interrupt]
fn TIMER1() {
    irq_handler();
}

/// Handles the compare match IRQ of the counter owned by the time base
///
/// On nRF52840 this handler is bound to the `TIMER1` vector. A time base configured with other
/// TIMER instance in [`TickMode::Interrupt`] requires calling this function from the vector of
/// that instance. IRQs received before the time base is configured are ignored.
pub fn irq_handler() {
    crit_sect::locked(poll_compare_match);
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use crate::hw::counter::traits::{ClockSource, MockCounter};
    use mockall::predicate::eq;
    use mockall::Sequence;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_configure_programs_counter_in_polling_mode() {
        TimeBase::reset();
        let mut counter = MockCounter::new();
        counter
            .expect_select_clock_source()
            .with(eq(1_000_000))
            .times(1)
            .returning(|_| Ok(ClockSource(4)));
        counter
            .expect_clock_source_frequency()
            .with(eq(ClockSource(4)))
            .times(1)
            .return_const(1_000_000u32);
        counter
            .expect_configure()
            .with(eq(ClockSource(4)), eq(true))
            .times(1)
            .return_const(());
        counter
            .expect_set_reload_value()
            .with(eq(1000))
            .times(1)
            .return_const(());
        counter.expect_disable_interrupt().times(1).return_const(());
        counter.expect_enable_interrupt().never();
        counter.expect_unmask_irq().never();
        counter.expect_start().times(1).return_const(());

        let time_base = configure_1ms(counter, TickMode::Polling);

        assert_eq!(time_base.mode(), TickMode::Polling);
        assert_eq!(time_base.tick_frequency(), 1000);
        assert_eq!(time_base.resolution(), 1_000_000);
        assert_eq!(time_base.reload(), 1000);
        assert_eq!(time_base.tick_period_us(), 1000);
        TimeBase::reset();
    }

    #[test]
    #[serial]
    fn test_configure_enables_irq_in_interrupt_mode() {
        TimeBase::reset();
        let mut counter = MockCounter::new();
        counter
            .expect_select_clock_source()
            .returning(|_| Ok(ClockSource(4)));
        counter
            .expect_clock_source_frequency()
            .return_const(1_000_000u32);
        counter.expect_configure().return_const(());
        counter.expect_set_reload_value().return_const(());
        counter.expect_disable_interrupt().never();
        counter.expect_unmask_irq().times(1).return_const(());
        counter.expect_enable_interrupt().times(1).return_const(());
        counter.expect_start().times(1).return_const(());

        let time_base = configure_1ms(counter, TickMode::Interrupt);

        assert_eq!(time_base.mode(), TickMode::Interrupt);
        TimeBase::reset();
    }

    #[test]
    #[serial]
    fn test_reload_is_computed_from_clock_source_frequency() {
        TimeBase::reset();
        let mut counter = MockCounter::new();
        counter
            .expect_select_clock_source()
            .with(eq(32_000))
            .returning(|_| Ok(ClockSource(9)));
        counter
            .expect_clock_source_frequency()
            .return_const(31_250u32);
        counter.expect_configure().return_const(());
        // 31250 Hz * 10 / 32000 = 9.765...
        counter
            .expect_set_reload_value()
            .with(eq(9))
            .times(1)
            .return_const(());
        counter.expect_disable_interrupt().return_const(());
        counter.expect_start().return_const(());

        let time_base = TimeBase::configure(TimerDescriptor {
            counter,
            frequency: 10,
            resolution: 32_000,
            mode: TickMode::Polling,
        })
        .unwrap();

        assert_eq!(time_base.reload(), 9);
        assert_eq!(time_base.tick_period_us(), 312);
        TimeBase::reset();
    }

    #[test]
    #[serial]
    fn test_configure_reports_unsupported_resolution() {
        TimeBase::reset();
        let mut counter = MockCounter::new();
        counter
            .expect_select_clock_source()
            .with(eq(100_000_000))
            .times(1)
            .returning(|_| Err(Error::UnsupportedResolution));
        counter.expect_configure().never();
        counter.expect_start().never();

        // 10 us tick period
        let result = TimeBase::configure(TimerDescriptor {
            counter,
            frequency: 1000,
            resolution: 100_000_000,
            mode: TickMode::Polling,
        });

        assert_eq!(result.err(), Some(Error::UnsupportedResolution));
    }

    #[test]
    #[serial]
    fn test_configure_rejects_unrepresentable_tick_period() {
        TimeBase::reset();
        for (frequency, resolution) in [(0, 1_000_000), (1000, 0), (1, 2_000_000)] {
            let mut counter = MockCounter::new();
            counter.expect_select_clock_source().never();
            counter.expect_start().never();

            let result = TimeBase::configure(TimerDescriptor {
                counter,
                frequency,
                resolution,
                mode: TickMode::Polling,
            });

            assert_eq!(result.err(), Some(Error::InvalidTickPeriod));
        }
    }

    #[test]
    #[serial]
    fn test_configure_rejects_reload_out_of_range() {
        TimeBase::reset();
        for (source_frequency, frequency) in [(1_000_000u32, 10_000_000u32), (1, 1)] {
            let mut counter = MockCounter::new();
            counter
                .expect_select_clock_source()
                .returning(|_| Ok(ClockSource(0)));
            counter
                .expect_clock_source_frequency()
                .return_const(source_frequency);
            counter.expect_configure().never();
            counter.expect_start().never();

            // 10_000_000 * 1_000_000 / 1000 exceeds 32 bits, 1 * 1 / 1000 is zero
            let result = TimeBase::configure(TimerDescriptor {
                counter,
                frequency,
                resolution: 1000,
                mode: TickMode::Polling,
            });

            assert_eq!(result.err(), Some(Error::ReloadOutOfRange));
        }
    }

    #[test]
    #[serial]
    fn test_polling_read_advances_only_on_compare_match() {
        TimeBase::reset();
        let mut counter = configurable_counter(TickMode::Polling);
        counter.expect_status().returning(latched_status);
        let time_base = configure_1ms(counter, TickMode::Polling);

        assert_eq!(time_base.read_tick(), 0);
        assert_eq!(time_base.read_tick(), 0);

        compare_match();
        assert_eq!(time_base.read_tick(), 1);
        assert_eq!(time_base.read_tick(), 1);

        compare_match();
        assert_eq!(time_base.read_tick(), 2);
    }

    #[test]
    #[serial]
    fn test_interrupt_read_does_not_touch_status() {
        TimeBase::reset();
        let mut counter = configurable_counter(TickMode::Interrupt);
        counter.expect_status().never();
        let time_base = configure_1ms(counter, TickMode::Interrupt);

        assert_eq!(time_base.read_tick(), 0);
        set_tick(41);
        assert_eq!(time_base.read_tick(), 41);
    }

    #[test]
    #[serial]
    fn test_irq_handler_advances_tick_on_compare_match() {
        TimeBase::reset();
        let mut counter = configurable_counter(TickMode::Interrupt);
        counter.expect_status().returning(latched_status);
        let time_base = configure_1ms(counter, TickMode::Interrupt);

        compare_match();
        irq_handler();
        assert_eq!(time_base.read_tick(), 1);

        // Spurious IRQ
        irq_handler();
        assert_eq!(time_base.read_tick(), 1);

        compare_match();
        irq_handler();
        assert_eq!(time_base.read_tick(), 2);
    }

    #[test]
    #[serial]
    fn test_irq_before_configuration_is_ignored() {
        TimeBase::reset();
        irq_handler();
        assert_eq!(current_tick(), 0);
    }

    #[test]
    #[serial]
    fn test_tick_never_decreases() {
        TimeBase::reset();
        let mut counter = configurable_counter(TickMode::Polling);
        let mut calls = 0u32;
        counter.expect_status().returning(move || {
            calls += 1;
            if calls % 3 == 0 {
                Status::COMPARE_MATCH
            } else {
                Status::empty()
            }
        });
        let time_base = configure_1ms(counter, TickMode::Polling);

        let mut previous = time_base.read_tick();
        for _ in 0..300 {
            let tick = time_base.read_tick();
            assert!(tick >= previous);
            previous = tick;
        }
        assert_eq!(previous, 100);
    }

    #[test]
    #[serial]
    fn test_reconfiguration_keeps_tick_and_switches_mode() {
        TimeBase::reset();
        let mut counter = configurable_counter(TickMode::Polling);
        counter.expect_status().returning(latched_status);
        counter.expect_stop().times(1).return_const(());
        let time_base = configure_1ms(counter, TickMode::Polling);
        compare_match();
        assert_eq!(time_base.read_tick(), 1);

        let mut counter = configurable_counter(TickMode::Interrupt);
        counter.expect_status().never();
        let time_base = configure_1ms(counter, TickMode::Interrupt);

        compare_match();
        assert_eq!(time_base.read_tick(), 1);
        assert_eq!(time_base.mode(), TickMode::Interrupt);
    }

    #[test]
    #[serial]
    fn test_reconfiguration_stops_previous_counter_before_starting_new_one() {
        TimeBase::reset();
        let mut seq = Sequence::new();

        let mut first = configurable_counter(TickMode::Interrupt);
        first
            .expect_stop()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        configure_1ms(first, TickMode::Interrupt);

        let mut second = MockCounter::new();
        second
            .expect_select_clock_source()
            .returning(|_| Ok(ClockSource(4)));
        second
            .expect_clock_source_frequency()
            .return_const(1_000_000u32);
        second.expect_configure().return_const(());
        second.expect_set_reload_value().return_const(());
        second.expect_disable_interrupt().return_const(());
        second.expect_stop().never();
        second
            .expect_start()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        configure_1ms(second, TickMode::Polling);

        TimeBase::reset();
    }

    #[test]
    #[serial]
    fn test_tick_wraps_around() {
        TimeBase::reset();
        let mut counter = configurable_counter(TickMode::Interrupt);
        counter.expect_status().returning(latched_status);
        let time_base = configure_1ms(counter, TickMode::Interrupt);
        set_tick(u64::MAX);

        compare_match();
        irq_handler();

        assert_eq!(time_base.read_tick(), 0);
    }
}
