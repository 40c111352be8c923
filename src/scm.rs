// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Client for the Qualcomm Secure Channel Manager (SCM) monitor interface.

pub mod call;
pub mod encode;
pub mod retry;

use crate::{
    delay::Delay,
    error::{Error, remap_error},
    smccc::{CallType, Convention, FunctionId, OwningEntityNumber, SmcResult},
    transport::{Conduit, Invoker},
};
use bitflags::bitflags;
use call::{ScmCall, function_number};
use log::{debug, info, warn};
use retry::RetryPolicy;

/// Boot service.
pub const SVC_BOOT: u32 = 0x01;
/// Sets the warm/cold boot address of CPUs in any affinity level.
pub const BOOT_SET_ADDR_MC: u32 = 0x11;
/// Information service.
pub const SVC_INFO: u32 = 0x06;
/// Asks whether a call is implemented.
pub const INFO_IS_CALL_AVAIL: u32 = 0x01;

/// The affinity mask meaning "every CPU at this level".
const ALL_AFFINITIES: u64 = !0;

bitflags! {
    /// Flags for [`Scm::set_boot_addr_mc`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct BootAddrFlags: u32 {
        /// Start the CPUs in AArch64 state.
        const AARCH64 = 1 << 0;
        /// Use the address on cold boot.
        const COLDBOOT = 1 << 1;
        /// Use the address on warm boot.
        const WARMBOOT = 1 << 2;
    }
}

/// Which convention to use for calls.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConventionSelect {
    /// Always use the given convention.
    Fixed(Convention),
    /// Probe the monitor when the client is created.
    Auto,
}

/// The per-silicon configuration of the SCM client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScmConfig {
    /// The convention of [`Scm::call_default`] and [`Scm::call_atomic_default`].
    pub convention: ConventionSelect,
    /// Whether x6 must be routed through the A6 quirk state.
    pub quirk_a6: bool,
    /// Busy back-off and retry bounds.
    pub retry: RetryPolicy,
}

/// Issues SCM calls through a conduit.
pub struct Scm<C: Conduit, D: Delay> {
    invoker: Invoker<C>,
    delay: D,
    retry: RetryPolicy,
    convention: Convention,
    cache_granule: usize,
}

impl<C: Conduit, D: Delay> Scm<C, D> {
    /// Creates a new SCM client, negotiating the convention if the configuration asks for it.
    pub fn new(conduit: C, delay: D, config: &ScmConfig, cache_granule: usize) -> Self {
        let mut scm = Self {
            invoker: Invoker::new(conduit, config.quirk_a6),
            delay,
            retry: config.retry,
            convention: Convention::Smc32,
            cache_granule,
        };
        scm.convention = match config.convention {
            ConventionSelect::Fixed(convention) => convention,
            ConventionSelect::Auto => scm.negotiate_convention(),
        };
        debug!("SCM convention {:?}", scm.convention);
        scm
    }

    /// Returns the convention used by [`Scm::call_default`] and [`Scm::call_atomic_default`].
    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// Returns a reference to the underlying conduit.
    pub fn conduit(&self) -> &C {
        self.invoker.conduit()
    }

    /// Issues a call and returns the raw result registers.
    ///
    /// Only encoding failures are errors here; the monitor's status is left in the result.
    pub fn call_raw(
        &mut self,
        call: &ScmCall,
        convention: Convention,
        atomic: bool,
    ) -> Result<SmcResult, Error> {
        let call_type = if atomic {
            CallType::Fast
        } else {
            CallType::Standard
        };
        let encoded = encode::encode(call, call_type, convention, self.cache_granule)?;
        let result = retry::run(
            &mut self.invoker,
            &mut self.delay,
            &self.retry,
            &encoded.regs,
            atomic,
        );
        // The spill buffer, if any, is freed here once the monitor is done with it.
        drop(encoded);
        Ok(result)
    }

    /// Issues a standard call and returns the payload words on success.
    pub fn call(&mut self, call: &ScmCall, convention: Convention) -> Result<[u64; 3], Error> {
        check_status(self.call_raw(call, convention, false)?)
    }

    /// Issues a fast call, which is never retried when busy.
    pub fn call_atomic(
        &mut self,
        call: &ScmCall,
        convention: Convention,
    ) -> Result<[u64; 3], Error> {
        check_status(self.call_raw(call, convention, true)?)
    }

    /// Issues a standard call in the configured or negotiated convention.
    pub fn call_default(&mut self, call: &ScmCall) -> Result<[u64; 3], Error> {
        self.call(call, self.convention)
    }

    /// Issues a fast call in the configured or negotiated convention.
    pub fn call_atomic_default(&mut self, call: &ScmCall) -> Result<[u64; 3], Error> {
        self.call_atomic(call, self.convention)
    }

    /// Returns whether the monitor implements the given service and command in the given
    /// convention.
    ///
    /// Any failure is reported as unavailable.
    pub fn is_call_available(
        &mut self,
        service: u32,
        command: u32,
        convention: Convention,
    ) -> bool {
        let probed = FunctionId::new(
            CallType::Standard,
            convention,
            OwningEntityNumber::SIP,
            function_number(service, command),
        );
        let query = ScmCall::new(SVC_INFO, INFO_IS_CALL_AVAIL).arg(probed.0.into());
        match self.call(&query, convention) {
            Ok(payload) => payload[0] != 0,
            Err(e) => {
                debug!("Availability query for {probed:?} failed: {e}");
                false
            }
        }
    }

    /// Picks the 64-bit convention if the monitor answers a 64-bit availability query, otherwise
    /// the 32-bit one.
    pub fn negotiate_convention(&mut self) -> Convention {
        if self.is_call_available(SVC_INFO, INFO_IS_CALL_AVAIL, Convention::Smc64) {
            Convention::Smc64
        } else {
            info!("SCM does not answer SMC64 calls, using SMC32");
            Convention::Smc32
        }
    }

    /// Sets the boot address for all CPUs in all affinity levels.
    pub fn set_boot_addr_mc(&mut self, entry: u64, flags: BootAddrFlags) -> Result<(), Error> {
        let call = ScmCall::new(SVC_BOOT, BOOT_SET_ADDR_MC)
            .arg(entry)
            .arg(ALL_AFFINITIES)
            .arg(ALL_AFFINITIES)
            .arg(ALL_AFFINITIES)
            .arg(ALL_AFFINITIES)
            .arg(flags.bits().into());
        self.call(&call, Convention::Smc32).map(|_| ())
    }
}

fn check_status(result: SmcResult) -> Result<[u64; 3], Error> {
    match result.status() {
        0 => Ok(result.payload()),
        status => {
            warn!("SCM call failed: {result:?}");
            Err(remap_error(status))
        }
    }
}
