//! Counter implementation based on the TIMER peripheral available in nRF MCUs
//!
//! The TIMER runs in timer mode with 32-bit width. Its clock sources are the prescaler settings of
//! the 16 MHz base clock. `CC[0]` holds the reload value and the `COMPARE0_CLEAR` short restarts
//! the counter on each compare match. `CC[1]` is used to capture the instantaneous counter value,
//! because TIMER has no register exposing it directly.

use super::traits::{ClockSource, Counter, Status};
use crate::error::Error;
use core::ops::Deref;

use cortex_m::peripheral::NVIC;
use nrf52840_hal::pac::{timer0, Interrupt};
type TimerRegisterBlock = timer0::RegisterBlock;

struct TimerPeriphWrapper {
    ptr: *const TimerRegisterBlock,
}
impl TimerPeriphWrapper {
    pub fn new(timer: &TimerRegisterBlock) -> Self {
        TimerPeriphWrapper { ptr: timer }
    }
}
impl Deref for TimerPeriphWrapper {
    type Target = TimerRegisterBlock;
    fn deref(&self) -> &Self::Target {
        unsafe { &*self.ptr }
    }
}
// Safety: the wrapper points to memory mapped registers, which exist for the whole program run.
//         Accesses from thread and IRQ contexts are serialized by the time base critical sections.
unsafe impl Send for TimerPeriphWrapper {}

const BASE_CLOCK_HZ: u32 = 16_000_000;
const MAX_PRESCALER: u8 = 9;
const RELOAD_CH: usize = 0;
const CAPTURE_COUNT_CH: usize = 1;

/// Counter based on `TIMER` peripheral
pub struct TimerCounter {
    timer: TimerPeriphWrapper,
    irq: Interrupt,
}

impl TimerCounter {
    /// Create a new [`TimerCounter`] instance using passed hardware TIMER instance
    ///
    /// `irq` is the interrupt line of the passed TIMER instance.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # #[macro_use] extern crate nrf_timebase;
    /// # missing_test_fns!();
    /// # fn main() {
    /// use nrf_timebase::hw::counter::timer_counter::TimerCounter;
    /// use nrf52840_hal::pac::{Interrupt, Peripherals};
    ///
    /// let peripherals = Peripherals::take().unwrap();
    ///
    /// let counter = TimerCounter::new(&peripherals.TIMER1, Interrupt::TIMER1);
    /// # }
    /// ```
    pub fn new(timer: &TimerRegisterBlock, irq: Interrupt) -> Self {
        Self {
            timer: TimerPeriphWrapper::new(timer),
            irq,
        }
    }
}

impl Counter for TimerCounter {
    fn select_clock_source(&self, resolution: u32) -> Result<ClockSource, Error> {
        (0..=MAX_PRESCALER)
            .rev()
            .find(|&prescaler| (BASE_CLOCK_HZ >> prescaler) >= resolution)
            .map(ClockSource)
            .ok_or(Error::UnsupportedResolution)
    }

    fn clock_source_frequency(&self, source: ClockSource) -> u32 {
        BASE_CLOCK_HZ >> source.0.min(MAX_PRESCALER)
    }

    fn configure(&self, source: ClockSource, reset_on_compare: bool) {
        self.timer.tasks_stop.write(|w| w.tasks_stop().set_bit());
        self.timer.tasks_clear.write(|w| w.tasks_clear().set_bit());
        self.timer
            .mode
            .write(|w| w.mode().variant(timer0::mode::MODE_A::TIMER));
        self.timer
            .bitmode
            .write(|w| w.bitmode().variant(timer0::bitmode::BITMODE_A::_32BIT));
        self.timer
            .prescaler
            .write(|w| w.prescaler().variant(source.0.min(MAX_PRESCALER)));
        self.timer
            .shorts
            .write(|w| w.compare0_clear().bit(reset_on_compare));
        self.timer.events_compare[RELOAD_CH].write(|w| w.events_compare().clear_bit());
    }

    fn set_reload_value(&self, value: u32) {
        self.timer.cc[RELOAD_CH].write(|w| w.cc().variant(value));
    }

    fn reload_value(&self) -> u32 {
        self.timer.cc[RELOAD_CH].read().bits()
    }

    fn start(&self) {
        self.timer.tasks_start.write(|w| w.tasks_start().set_bit());
    }

    fn stop(&self) {
        self.timer.tasks_stop.write(|w| w.tasks_stop().set_bit());
    }

    fn raw_count(&self) -> u32 {
        self.timer.tasks_capture[CAPTURE_COUNT_CH].write(|w| w.tasks_capture().set_bit());
        self.timer.cc[CAPTURE_COUNT_CH].read().bits()
    }

    fn status(&self) -> Status {
        let event = &self.timer.events_compare[RELOAD_CH];
        if event.read().events_compare().bit_is_set() {
            event.write(|w| w.events_compare().clear_bit());
            Status::COMPARE_MATCH
        } else {
            Status::empty()
        }
    }

    fn enable_interrupt(&self) {
        self.timer.intenset.write(|w| w.compare0().set_bit());
    }

    fn disable_interrupt(&self) {
        self.timer.intenclr.write(|w| w.compare0().set_bit());
    }

    fn unmask_irq(&self) {
        // Safety: the time base IRQ handler only accesses data protected by critical sections
        unsafe { NVIC::unmask(self.irq) };
    }

    fn wait_for_interrupt(&self) {
        #[cfg(target_arch = "arm")]
        cortex_m::asm::wfi();
        #[cfg(not(target_arch = "arm"))]
        core::hint::spin_loop();
    }
}
