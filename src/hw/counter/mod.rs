//! Portable counter/compare abstraction
//!
//! The time base needs a single free-running counter which restarts from zero each time it
//! reaches a programmed compare value. Each restart is a compare match: a status flag which can
//! be polled or routed to an IRQ.
//!
//! This module is intended to be used only by the [`time_base`](crate::time_base) module, which
//! exclusively owns one counter once configured.

pub mod timer_counter;
pub mod traits;

// The whole software build supports only one type of counter. It avoids dynamic dispatch in the
// IRQ handler, which needs to reach the counter through a static variable.
/// Type of counter used in this build.
///
/// This type must implement [`Counter`](traits::Counter) trait.
#[cfg(any(all(feature = "mocked_platform", not(test)), feature = "nrf52840"))]
pub type Counter = timer_counter::TimerCounter;
/// Type of counter used in unit tests.
#[cfg(all(test, feature = "mocked_platform"))]
pub type Counter = traits::MockCounter;
