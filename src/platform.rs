// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Board selection and the hooks each supported board provides.

macro_rules! select_platform {
    (platform = $condition:literal, $mod:ident::$plat_impl:ident) => {
        #[cfg(all(platform = $condition, not(test)))]
        mod $mod;

        #[cfg(all(platform = $condition, not(test)))]
        pub use $mod::$plat_impl as PlatformImpl;
    };
    (test, $mod:ident::$plat_impl:ident) => {
        #[cfg(test)]
        pub mod $mod;

        #[cfg(test)]
        pub use $mod::$plat_impl as PlatformImpl;
    };
}

select_platform!(platform = "msm8916", msm8916::Msm8916);
select_platform!(test, test::TestPlatform);

#[cfg(not(any(test, platform = "msm8916")))]
compile_error!("No platform selected, build with `--cfg platform=\"msm8916\"`");

use crate::{
    delay::Delay, logger::LogSink, scm::ScmConfig, smp::acc::AccMapper, transport::Conduit,
};

/// Type alias for convenience, to avoid having to use the complicated type name everywhere.
pub type LogSinkImpl = <PlatformImpl as Platform>::LogSinkImpl;

/// The conduit used to reach the monitor on the selected platform.
pub type ConduitImpl = <PlatformImpl as Platform>::ConduitImpl;

/// The delay source of the selected platform.
pub type DelayImpl = <PlatformImpl as Platform>::DelayImpl;

/// The ACC mapper of the selected platform.
pub type AccMapperImpl = <PlatformImpl as Platform>::AccMapperImpl;

/// The hooks implemented by all platforms.
pub trait Platform {
    /// The size in bytes of the largest cache line across all the cache levels in the platform.
    const CACHE_WRITEBACK_GRANULE: usize;

    /// How to talk to the monitor on this silicon.
    const SCM_CONFIG: ScmConfig;

    /// The `compatible` string of the CPU nodes to bring up.
    const CPU_COMPATIBLE: &'static str = "arm,cortex-a53";

    /// Platform dependent LogSink implementation type for Logger.
    type LogSinkImpl: LogSink + 'static;

    /// How secure monitor calls are issued.
    type ConduitImpl: Conduit;

    /// Busy-wait source for back-off and power sequencing.
    type DelayImpl: Delay;

    /// Access to the per-core ACC register blocks.
    type AccMapperImpl: AccMapper;

    /// Creates the conduit used to reach the monitor.
    ///
    /// # Safety
    ///
    /// Only one conduit may be in use at a time, as the monitor is not reentrant.
    unsafe fn create_conduit() -> Self::ConduitImpl;

    /// Creates a delay source.
    fn create_delay() -> Self::DelayImpl;

    /// Creates the ACC mapper.
    ///
    /// # Safety
    ///
    /// The ACC register blocks described by the device tree must be mapped as device memory, and
    /// nothing else may access them while the returned mapper is alive.
    unsafe fn create_acc_mapper() -> Self::AccMapperImpl;

    /// Returns the address at which all secondary cores start executing.
    fn spin_table_entry() -> u64;

    /// Returns the base and size of the memory holding the spin-table code and release address,
    /// which the next stage must not reuse.
    fn spin_table_reserve() -> (u64, u64);

    /// Returns the address of the word that secondary cores poll for their jump address.
    fn spin_table_release_addr() -> u64;
}
