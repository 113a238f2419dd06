/// Errors reported while configuring the time base
///
/// Once the time base is configured reading ticks, polling timeouts and sleeping never fail.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// None of the counter's clock sources can represent the requested resolution
    UnsupportedResolution,
    /// The computed reload value is zero or does not fit the counter's compare register
    ReloadOutOfRange,
    /// The requested tick frequency or resolution describes no tick period of at least 1 us
    InvalidTickPeriod,
}
