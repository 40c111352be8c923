// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Busy-wait delays.

/// Something which can block the calling core for a period of time.
///
/// Delays are busy-waits: nothing else runs on the calling core while waiting.
pub trait Delay {
    /// Blocks for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Blocks for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1000);
        }
    }
}

/// A delay based on the Arm generic timer's physical counter.
#[cfg(all(target_arch = "aarch64", not(test)))]
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericTimerDelay;

#[cfg(all(target_arch = "aarch64", not(test)))]
impl Delay for GenericTimerDelay {
    fn delay_us(&mut self, us: u32) {
        use crate::aarch64::{read_cntfrq_el0, read_cntpct_el0};

        let ticks = (read_cntfrq_el0() * u64::from(us)).div_ceil(1_000_000);
        let start = read_cntpct_el0();
        while read_cntpct_el0().wrapping_sub(start) < ticks {
            core::hint::spin_loop();
        }
    }
}
