// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Issues secure monitor calls, applying the QCOM A6 erratum workaround where required.

use crate::smccc::SmcResult;
use core::marker::PhantomData;
use smccc::Call;

/// The number of registers passed to the monitor.
pub const SMC_REGISTER_COUNT: usize = 8;

/// The register slot which affected silicon passes through the quirk state.
pub const QUIRK_REGISTER: usize = 6;

/// The input registers x0-x7 of one secure monitor call.
pub type SmcRegisters = [u64; SMC_REGISTER_COUNT];

/// What a single trap into the monitor returns.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TrapOutput {
    /// x0-x3.
    pub result: SmcResult,
    /// The value of x6 when the monitor returned.
    pub a6: u64,
}

/// A way of trapping into the secure monitor.
pub trait Conduit {
    /// Executes exactly one secure monitor call with the given input registers.
    fn trap(&mut self, regs: &SmcRegisters) -> TrapOutput;
}

/// Traps through an [`smccc::Call`] implementation, such as `smccc::Smc`.
///
/// Every call uses the 64-bit register file, so SMC32 calls see their values zero-extended.
pub struct SmcccConduit<C: Call> {
    _call: PhantomData<C>,
}

impl<C: Call> SmcccConduit<C> {
    /// Creates a conduit which traps with `C`.
    pub const fn new() -> Self {
        Self { _call: PhantomData }
    }
}

impl<C: Call> Default for SmcccConduit<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Call> Conduit for SmcccConduit<C> {
    fn trap(&mut self, regs: &SmcRegisters) -> TrapOutput {
        let mut args = [0; 17];
        args[..SMC_REGISTER_COUNT - 1].copy_from_slice(&regs[1..]);
        let ret = C::call64(regs[0] as u32, args);
        TrapOutput {
            result: SmcResult([ret[0], ret[1], ret[2], ret[3]]),
            a6: ret[QUIRK_REGISTER],
        }
    }
}

/// Per-call state for the A6 quirk.
///
/// Must be zeroed at the start of each attempt of a logical call, so nothing leaks from an
/// unrelated earlier call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct QuirkState {
    /// The value to pass in x6.
    pub a6: u64,
}

/// Issues one trap per `invoke`, with no interpretation of the result.
#[derive(Debug)]
pub struct Invoker<C: Conduit> {
    conduit: C,
    quirk_a6: bool,
}

impl<C: Conduit> Invoker<C> {
    /// Creates an invoker which uses the given conduit.
    ///
    /// If `quirk_a6` is set, x6 is taken from and written back to the [`QuirkState`] rather than
    /// passed through directly.
    pub fn new(conduit: C, quirk_a6: bool) -> Self {
        Self { conduit, quirk_a6 }
    }

    /// Traps into the monitor once.
    pub fn invoke(&mut self, regs: &SmcRegisters, quirk: &mut QuirkState) -> SmcResult {
        if !self.quirk_a6 {
            return self.conduit.trap(regs).result;
        }
        let mut regs = *regs;
        regs[QUIRK_REGISTER] = quirk.a6;
        let output = self.conduit.trap(&regs);
        quirk.a6 = output.a6;
        output.result
    }

    /// Returns a reference to the underlying conduit.
    pub fn conduit(&self) -> &C {
        &self.conduit
    }
}
