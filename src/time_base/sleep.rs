//! Blocking sleeps
//!
//! Two strategies complement each other:
//!
//! * coarse sleep waits for a number of ticks. In [`TickMode::Interrupt`] the CPU is put in a low
//!   power state between compare match IRQs, in [`TickMode::Polling`] it spins.
//! * fine sleep spins on the raw counter value for delays shorter than one tick period.
//!
//! Both occupy the calling context until the deadline and cannot be cancelled.

use super::{with_counter, TickMode, TimeBase, COUNTER, TICK};
use crate::crit_sect;
use crate::hw::counter::traits::Counter as _;

const US_IN_MS: u64 = 1000;
const US_IN_S: u64 = 1_000_000;

impl TimeBase {
    /// Block for `count` ticks
    pub fn sleep_ticks(&self, count: u64) {
        if count == 0 {
            return;
        }

        let timeout = self.start_timeout(count);

        match self.mode {
            TickMode::Polling => {
                while !self.is_reached(&timeout) {
                    core::hint::spin_loop();
                }
            }
            TickMode::Interrupt => loop {
                // WFI inside the critical section still wakes up on the compare match IRQ. The IRQ
                // handler runs as soon as the critical section ends, so no tick is missed between
                // the check and the wait.
                let reached = crit_sect::locked(|cs| {
                    let now = *TICK.borrow(cs);
                    if timeout.is_reached_at(now) {
                        return true;
                    }
                    if let Some(counter) = COUNTER.borrow(cs).as_ref() {
                        counter.wait_for_interrupt();
                    }
                    false
                });
                if reached {
                    break;
                }
            },
        }
    }

    /// Block for at least `count` milliseconds
    ///
    /// The delay is rounded up to whole ticks.
    pub fn sleep_ms(&self, count: u32) {
        self.sleep_ticks((u64::from(count) * US_IN_MS).div_ceil(self.tick_period_us));
    }

    /// Block for at least `count` seconds
    pub fn sleep_s(&self, count: u32) {
        self.sleep_ticks((u64::from(count) * US_IN_S).div_ceil(self.tick_period_us));
    }

    /// Block for `count` microseconds
    ///
    /// Whole tick periods are waited with [`sleep_ticks`](TimeBase::sleep_ticks) to avoid spinning
    /// for long delays. The remainder is waited with [`sleep_micro`](TimeBase::sleep_micro).
    pub fn sleep_us(&self, count: u32) {
        let count = u64::from(count);
        let ticks = count / self.tick_period_us;
        let remainder = count % self.tick_period_us;

        if ticks > 0 {
            self.sleep_ticks(ticks);
        }
        if remainder > 0 {
            // remainder < tick_period_us <= count
            self.sleep_micro(remainder as u32);
        }
    }

    /// Spin for `count` microseconds shorter than one tick period
    ///
    /// The delay is measured on the raw counter value, so its precision is one counter cycle.
    /// Longer delays are forwarded to [`sleep_us`](TimeBase::sleep_us).
    pub fn sleep_micro(&self, count: u32) {
        if count == 0 {
            return;
        }
        if u64::from(count) >= self.tick_period_us {
            debug!("sleep_micro: {} us is not below one tick", count);
            self.sleep_us(count);
            return;
        }

        let target = raw_target_offset(count, self.reload, self.tick_period_us);

        let Some(mut previous) = with_counter(|c| c.raw_count()) else {
            return;
        };
        let mut advanced = 0;
        while let Some(now) = with_counter(|c| c.raw_count()) {
            advanced += raw_forward(previous, now, self.reload);
            if advanced >= u64::from(target) {
                break;
            }
            previous = now;
            core::hint::spin_loop();
        }
    }
}

/// Number of counter cycles in `count` microseconds, rounded to the nearest cycle
///
/// The result is kept below `reload`, because the raw counter never reaches it.
fn raw_target_offset(count: u32, reload: u32, tick_period_us: u64) -> u32 {
    let cycles = (u64::from(count) * u64::from(reload) + tick_period_us / 2) / tick_period_us;
    // Lower than reload, so it fits u32
    cycles.min(u64::from(reload) - 1) as u32
}

/// Number of cycles the raw counter moved forward from `previous` to `now`
///
/// The raw counter restarts from zero at `reload`, so the distance is computed modulo `reload`.
/// Samples must be taken less than one tick period apart.
fn raw_forward(previous: u32, now: u32, reload: u32) -> u64 {
    let reload = u64::from(reload);
    (reload + u64::from(now) - u64::from(previous)) % reload
}
