#![cfg_attr(not(any(test, doctest)), no_std)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::missing_doc_code_examples)]

//! Monotonic software time base for Nordic nRF SoCs.
//!
//! A single free-running hardware counter is programmed to raise one compare match per tick
//! period. The [`TimeBase`](time_base::TimeBase) converts these compare matches into a 64-bit tick
//! counter and builds timeouts and blocking sleeps on top of it.
//!
//! Currently only the TIMER peripheral of nRF52840 is supported, but the hardware access is hidden
//! behind the [`Counter`](hw::counter::traits::Counter) trait, so porting to other counters is
//! straightforward.

#[cfg(not(any(feature = "mocked_platform", feature = "nrf52840")))]
compile_error!("One platform must be enabled as a build feature");

#[cfg(all(feature = "mocked_platform", feature = "nrf52840"))]
compile_error!("Cannot enable multiple platforms simultaneously (mocked and nrf52840)");

#[cfg(all(test, not(feature = "mocked_platform")))]
compile_error!("For tests \"mocked_platform\" feature shall be selected");

#[macro_use]
mod fmt;

pub mod crit_sect;
pub mod hw;
pub mod mutex;

/// Defines errors reported by this crate
pub mod error;

/// The system-wide time base: tick accounting, timeouts and sleeps
///
/// To use this module configure a [`TimeBase`](time_base::TimeBase) once at boot and pass the
/// returned handle to every module needing delays or elapsed time measurement.
pub mod time_base;

#[cfg(test)]
crate::missing_test_fns!();
