// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Resumption of interrupted calls and back-off on busy ones.

use crate::{
    delay::Delay,
    error::ScmStatus,
    smccc::SmcResult,
    transport::{Conduit, Invoker, QuirkState, SmcRegisters},
};
use log::{trace, warn};

/// How long to back off and how often to retry when the monitor reports busy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Milliseconds to wait between busy retries.
    pub busy_wait_ms: u32,
    /// Retries after the first attempt before giving up.
    pub busy_max_retry: u32,
}

impl RetryPolicy {
    /// The values used by the Linux and U-Boot SCM drivers.
    pub const DEFAULT: Self = Self {
        busy_wait_ms: 30,
        busy_max_retry: 20,
    };
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Traps until the monitor returns something other than interrupted.
///
/// An interrupted call is resumed straight away by passing the interrupted status back in x0. The
/// quirk state starts at zero and is carried across resumptions.
fn invoke_until_settled<C: Conduit>(invoker: &mut Invoker<C>, regs: &SmcRegisters) -> SmcResult {
    let mut quirk = QuirkState::default();
    let mut regs = *regs;
    loop {
        let result = invoker.invoke(&regs, &mut quirk);
        if result.0[0] != ScmStatus::Interrupted.raw() {
            return result;
        }
        trace!("SCM call interrupted, resuming");
        regs[0] = result.0[0];
    }
}

/// Drives one logical call to a terminal result.
///
/// Busy results are retried after a back-off, up to `policy.busy_max_retry` times; after that the
/// last busy result is returned as-is. Atomic calls are never retried on busy.
pub fn run<C: Conduit, D: Delay>(
    invoker: &mut Invoker<C>,
    delay: &mut D,
    policy: &RetryPolicy,
    regs: &SmcRegisters,
    atomic: bool,
) -> SmcResult {
    let mut retry_count = 0;
    loop {
        let result = invoke_until_settled(invoker, regs);
        if atomic || result.0[0] != ScmStatus::Busy.raw() {
            return result;
        }
        if retry_count == policy.busy_max_retry {
            warn!("SCM call still busy after {retry_count} retries, giving up");
            return result;
        }
        retry_count += 1;
        delay.delay_ms(policy.busy_wait_ms);
    }
}
