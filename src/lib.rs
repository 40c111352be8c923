// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Qualcomm Secure Channel Manager calls and spin-table secondary core bring-up for SoCs whose
//! TrustZone firmware has no PSCI.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod aarch64;
pub mod delay;
pub mod devicetree;
pub mod error;
pub mod logger;
pub mod platform;
pub mod scm;
pub mod smccc;
pub mod smp;
pub mod transport;

use crate::{
    devicetree::{DeviceTree, DeviceTreeMut},
    error::Error,
    platform::{ConduitImpl, DelayImpl, Platform, PlatformImpl},
    scm::{Scm, call::ScmCall},
    smccc::Convention,
    smp::{BootOutcome, SmpBoot, SmpState, spin_table},
};
use spin::{Lazy, mutex::SpinMutex};

/// The SCM client of the platform, created on first use.
static SCM: Lazy<SpinMutex<Scm<ConduitImpl, DelayImpl>>> = Lazy::new(|| {
    // SAFETY: This is the only place the conduit is created, and it is only used through the mutex.
    let conduit = unsafe { PlatformImpl::create_conduit() };
    SpinMutex::new(Scm::new(
        conduit,
        PlatformImpl::create_delay(),
        &PlatformImpl::SCM_CONFIG,
        PlatformImpl::CACHE_WRITEBACK_GRANULE,
    ))
});

static SMP_STATE: SpinMutex<SmpState> = SpinMutex::new(SmpState::new());

/// Starts every secondary core described in `dt` which uses the spin-table enable method and has
/// no release address yet.
///
/// Must be called on the boot core before any secondary core is running. Failures are logged and
/// leave the secondary cores off; they never stop the boot core.
pub fn boot_secondary_cores<T: DeviceTree>(dt: &T) -> BootOutcome {
    let mut state = SMP_STATE.lock();
    // SAFETY: ACC blocks are only accessed through mappers created while holding the state lock.
    let acc = unsafe { PlatformImpl::create_acc_mapper() };
    SmpBoot::new(
        dt,
        PlatformImpl::CPU_COMPATIBLE,
        acc,
        PlatformImpl::create_delay(),
        PlatformImpl::spin_table_entry(),
    )
    .run(&mut state, &mut *SCM.lock())
}

/// Boots the single CPU at `node`, for use as the per-CPU hook of a generic spin-table boot path.
pub fn boot_cpu<T: DeviceTree>(dt: &T, node: T::Node) -> Result<(), Error> {
    let mut state = SMP_STATE.lock();
    // SAFETY: ACC blocks are only accessed through mappers created while holding the state lock.
    let acc = unsafe { PlatformImpl::create_acc_mapper() };
    SmpBoot::new(
        dt,
        PlatformImpl::CPU_COMPATIBLE,
        acc,
        PlatformImpl::create_delay(),
        PlatformImpl::spin_table_entry(),
    )
    .boot_cpu(&mut state, &mut *SCM.lock(), node)
}

/// Records the spin-table release address of every core started so far, and the reserved region,
/// in `dt` for the next stage.
///
/// Returns the number of CPU nodes updated.
pub fn update_device_tree<T: DeviceTreeMut>(dt: &mut T) -> Result<usize, Error> {
    let state = SMP_STATE.lock();
    let (reserve_base, reserve_size) = PlatformImpl::spin_table_reserve();
    spin_table::fixup_device_tree(
        dt,
        PlatformImpl::CPU_COMPATIBLE,
        state.booted(),
        PlatformImpl::spin_table_release_addr(),
        reserve_base,
        reserve_size,
    )
}

/// Returns whether the monitor implements the given SCM service and command in the given
/// convention.
pub fn is_capability_available(service: u32, command: u32, convention: Convention) -> bool {
    SCM.lock().is_call_available(service, command, convention)
}

/// Issues a standard SCM call in the platform's convention, returning the payload words.
pub fn scm_call(call: &ScmCall) -> Result<[u64; 3], Error> {
    SCM.lock().call_default(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::test::{FakeCpu, FakeDeviceTree, StdOutSink},
        scm::{BOOT_SET_ADDR_MC, INFO_IS_CALL_AVAIL, SVC_BOOT, SVC_INFO},
    };

    #[test]
    fn capability_probe() {
        assert!(is_capability_available(
            SVC_BOOT,
            BOOT_SET_ADDR_MC,
            Convention::Smc32
        ));
        assert!(is_capability_available(
            SVC_INFO,
            INFO_IS_CALL_AVAIL,
            Convention::Smc32
        ));
        assert!(!is_capability_available(
            SVC_BOOT,
            BOOT_SET_ADDR_MC,
            Convention::Smc64
        ));
        assert!(!is_capability_available(SVC_BOOT, 0x0a, Convention::Smc32));
        assert_eq!(SCM.lock().convention(), Convention::Smc32);
    }

    #[test]
    fn platform_call_uses_negotiated_convention() {
        let query = ScmCall::new(SVC_INFO, INFO_IS_CALL_AVAIL).arg(0x0200_0112);

        assert_eq!(scm_call(&query), Ok([0, 0, 0]));
        assert!(
            SCM.lock()
                .conduit()
                .calls()
                .iter()
                .any(|regs| regs[..3] == [0x0200_0601, 1, 0x0200_0112])
        );
    }

    #[test]
    fn boot_then_update_device_tree() {
        let _ = logger::init(StdOutSink);
        let mut dt = FakeDeviceTree::new(vec![
            FakeCpu::spin_table(0x0).with_acc(0x0b08_8000),
            FakeCpu::spin_table(0x1).with_acc(0x0b09_8000),
            FakeCpu::spin_table(0x2).with_acc(0x0b0a_8000),
            FakeCpu::psci(0x3),
        ]);

        assert_eq!(boot_secondary_cores(&dt), BootOutcome::Done);
        assert!(SMP_STATE.lock().boot_addr_set());
        assert_eq!(boot_cpu(&dt, dt.cpu(1)), Ok(()));

        assert_eq!(update_device_tree(&mut dt), Ok(3));
        assert_eq!(dt.cpus[1].release_addr, Some(0x8f60_0ff8));
        assert_eq!(dt.cpus[3].release_addr, None);
        assert_eq!(
            dt.reserved,
            [(String::from("spin-table"), 0x8f60_0000, 0x1000)]
        );
        assert_eq!(
            boot_secondary_cores(&dt),
            BootOutcome::AbortedNoEligible
        );
    }
}
