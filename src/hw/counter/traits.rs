//! Traits used for counter modules portability
//!
//! Each port of the counter module to other platform shall implement traits described in this
//! module. The one implementation of traits is selected in the [`counter`](super) module.

use crate::error::Error;

#[cfg(test)]
use mockall::*;

/// Platform specific identifier of a clock source feeding a counter
///
/// The meaning of the wrapped value is defined by the [`Counter`] implementation which produced
/// it (like a prescaler setting or a clock multiplexer input).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSource(pub u8);

/// Status flags of a counter
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status(u32);

impl Status {
    /// The counter reached its reload value since the last status read
    pub const COMPARE_MATCH: Status = Status(1 << 0);

    /// Status with no flags set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Check if all flags set in `other` are set in this status
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate nrf_timebase;
    /// # missing_test_fns!();
    /// # fn main() {
    /// use nrf_timebase::hw::counter::traits::Status;
    ///
    /// assert!(Status::COMPARE_MATCH.contains(Status::COMPARE_MATCH));
    /// assert!(!Status::empty().contains(Status::COMPARE_MATCH));
    /// # }
    /// ```
    pub const fn contains(&self, other: Status) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Free-running counter with a reload compare, owned by the time base
///
/// Register accesses are assumed to always succeed, so only clock source selection reports errors.
#[cfg_attr(test, automock)]
pub trait Counter {
    /// Select the slowest clock source capable of representing `resolution` counts per second
    fn select_clock_source(&self, resolution: u32) -> Result<ClockSource, Error>;

    /// Frequency in Hz of the passed clock source
    fn clock_source_frequency(&self, source: ClockSource) -> u32;

    /// Prepare the counter to count `source` clock cycles
    ///
    /// If `reset_on_compare` is set the counter restarts from zero each time it reaches the reload
    /// value.
    fn configure(&self, source: ClockSource, reset_on_compare: bool);

    /// Program the reload compare value
    fn set_reload_value(&self, value: u32);

    /// Get the programmed reload compare value
    fn reload_value(&self) -> u32;

    /// Start counting
    fn start(&self);

    /// Stop counting
    fn stop(&self);

    /// Get the instantaneous counter value
    fn raw_count(&self) -> u32;

    /// Read and clear the status flags
    ///
    /// A flag reported by one call is not reported again until the event happens again.
    fn status(&self) -> Status;

    /// Enable the compare match IRQ source in the counter
    fn enable_interrupt(&self);

    /// Disable the compare match IRQ source in the counter
    fn disable_interrupt(&self);

    /// Enable the counter's IRQ line in the interrupt controller
    fn unmask_irq(&self);

    /// Put the CPU in a low power state until any IRQ is pending
    fn wait_for_interrupt(&self);
}
