// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Qualcomm MSM8916 and APQ8016, whose TrustZone firmware has no PSCI.

use super::Platform;
use crate::{
    delay::GenericTimerDelay,
    logger::LogSink,
    scm::{ConventionSelect, ScmConfig, retry::RetryPolicy},
    smccc::Convention,
    smp::acc::IdentityAccMapper,
    transport::SmcccConduit,
};
use smccc::Smc;

unsafe extern "C" {
    /// Start of the spin-table code, where secondary cores begin executing.
    static spin_table_reserve_begin: u8;
    /// End of the spin-table code and data.
    static spin_table_reserve_end: u8;
    /// The word secondary cores poll for their jump address.
    static spin_table_cpu_release_addr: u64;
}

/// The MSM8916 family.
pub struct Msm8916;

impl Platform for Msm8916 {
    const CACHE_WRITEBACK_GRANULE: usize = 64;

    const SCM_CONFIG: ScmConfig = ScmConfig {
        convention: ConventionSelect::Fixed(Convention::Smc32),
        quirk_a6: true,
        retry: RetryPolicy::DEFAULT,
    };

    type LogSinkImpl = &'static dyn LogSink;
    type ConduitImpl = SmcccConduit<Smc>;
    type DelayImpl = GenericTimerDelay;
    type AccMapperImpl = IdentityAccMapper;

    unsafe fn create_conduit() -> SmcccConduit<Smc> {
        SmcccConduit::new()
    }

    fn create_delay() -> GenericTimerDelay {
        GenericTimerDelay
    }

    unsafe fn create_acc_mapper() -> IdentityAccMapper {
        IdentityAccMapper
    }

    fn spin_table_entry() -> u64 {
        (&raw const spin_table_reserve_begin) as u64
    }

    fn spin_table_reserve() -> (u64, u64) {
        let begin = (&raw const spin_table_reserve_begin) as u64;
        let end = (&raw const spin_table_reserve_end) as u64;
        (begin, end - begin)
    }

    fn spin_table_release_addr() -> u64 {
        (&raw const spin_table_cpu_release_addr) as u64
    }
}
