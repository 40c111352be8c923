// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Secondary core bring-up on SoCs whose monitor has no PSCI.
//!
//! The monitor is told once where every core should start, then each core is powered up directly
//! through its ACC block and runs the spin-table code at that address.

pub mod acc;
pub mod spin_table;

use crate::{
    delay::Delay,
    devicetree::DeviceTree,
    error::Error,
    scm::{BOOT_SET_ADDR_MC, BootAddrFlags, SVC_BOOT, Scm},
    smccc::Convention,
    transport::Conduit,
};
use acc::{AccMapper, boot_cortex_a53};
use alloc::vec::Vec;
use arm_sysregs::read_mpidr_el1;
use log::{debug, error, info, warn};

/// The affinity fields of MPIDR_EL1 compared against a CPU node's `reg`.
const AFFINITY_MASK: u64 = 0xff_ffff;

/// Returns the affinity of the calling core, in the form used by CPU nodes' `reg` property.
pub fn current_affinity() -> u32 {
    (read_mpidr_el1().bits() & AFFINITY_MASK) as u32
}

/// What the device tree says about one CPU.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CoreDescriptor {
    /// The CPU's affinity, from its `reg` property.
    pub affinity_id: u32,
    /// Whether the `enable-method` is `spin-table`.
    pub is_spin_table_enabled: bool,
    /// Whether the node already has a `cpu-release-addr`, meaning something else boots it.
    pub has_release_addr: bool,
    /// The base address of the CPU's ACC block, or 0 if it can't be found.
    pub power_controller_base: u64,
}

impl CoreDescriptor {
    /// Reads the descriptor of the given CPU node.
    pub fn read<T: DeviceTree>(dt: &T, node: T::Node) -> Self {
        Self {
            affinity_id: dt.address(node).unwrap_or(0) as u32,
            is_spin_table_enabled: dt.read_string(node, "enable-method") == Some("spin-table"),
            has_release_addr: dt.has_property(node, "cpu-release-addr"),
            power_controller_base: dt
                .parse_phandle(node, "qcom,acc", 0)
                .and_then(|acc| dt.address(acc))
                .unwrap_or(0),
        }
    }

    /// Returns whether this core should be started by us.
    pub fn is_eligible(&self) -> bool {
        self.is_spin_table_enabled && !self.has_release_addr
    }
}

/// State kept between boot attempts.
#[derive(Debug, Default)]
pub struct SmpState {
    boot_addr_set: bool,
    /// Affinities of the cores which are running the spin-table code, or are the boot core.
    booted: Vec<u32>,
}

impl SmpState {
    /// Returns a state in which the boot address has not been programmed yet.
    pub const fn new() -> Self {
        Self {
            boot_addr_set: false,
            booted: Vec::new(),
        }
    }

    /// Returns whether the boot address has been programmed successfully.
    pub fn boot_addr_set(&self) -> bool {
        self.boot_addr_set
    }

    /// Returns the affinities of the cores started so far, including the boot core once it has
    /// been seen.
    pub fn booted(&self) -> &[u32] {
        &self.booted
    }

    /// Returns whether the core with the given affinity has been started.
    pub fn is_booted(&self, affinity_id: u32) -> bool {
        self.booted.contains(&affinity_id)
    }
}

/// How a run of [`SmpBoot::run`] ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BootOutcome {
    /// All eligible cores were handled. Some may have been skipped because of missing ACC blocks.
    Done,
    /// No core needed booting, so nothing was touched.
    AbortedNoEligible,
    /// The boot address couldn't be programmed, so no core was powered.
    AbortedProgramFailed(Error),
}

/// Brings up the CPUs described in a device tree.
pub struct SmpBoot<'a, T: DeviceTree, M: AccMapper, D: Delay> {
    dt: &'a T,
    compatible: &'a str,
    acc: M,
    delay: D,
    entry: u64,
    self_affinity: u32,
}

impl<'a, T: DeviceTree, M: AccMapper, D: Delay> SmpBoot<'a, T, M, D> {
    /// Creates a sequencer for the CPUs compatible with `compatible`, which will start executing
    /// at `entry`.
    pub fn new(dt: &'a T, compatible: &'a str, acc: M, delay: D, entry: u64) -> Self {
        Self {
            dt,
            compatible,
            acc,
            delay,
            entry,
            self_affinity: current_affinity(),
        }
    }

    /// Boots every eligible secondary core.
    pub fn run<C: Conduit, W: Delay>(
        &mut self,
        state: &mut SmpState,
        scm: &mut Scm<C, W>,
    ) -> BootOutcome {
        let mut eligible = 0;
        for core in cores(self.dt, self.compatible) {
            if core.is_eligible() {
                eligible += 1;
            } else {
                info!(
                    "CPU{} is not started by us (spin-table {}, release address {})",
                    core.affinity_id, core.is_spin_table_enabled, core.has_release_addr
                );
            }
        }
        if eligible == 0 {
            info!("No secondary CPUs to boot");
            return BootOutcome::AbortedNoEligible;
        }

        if let Err(e) = self.program_boot_address(state, scm) {
            return BootOutcome::AbortedProgramFailed(e);
        }

        for core in cores(self.dt, self.compatible).filter(CoreDescriptor::is_eligible) {
            // Failures only affect that core and have already been logged.
            let _ = self.power_up(state, &core);
        }
        BootOutcome::Done
    }

    /// Boots the CPU described by the given node, programming the boot address first if that
    /// hasn't been done yet.
    ///
    /// This is the per-CPU hook for a generic spin-table boot path, so it doesn't check
    /// eligibility.
    pub fn boot_cpu<C: Conduit, W: Delay>(
        &mut self,
        state: &mut SmpState,
        scm: &mut Scm<C, W>,
        node: T::Node,
    ) -> Result<(), Error> {
        let core = CoreDescriptor::read(self.dt, node);
        if !self.dt.is_compatible(node, self.compatible) {
            warn!("CPU{} is not {} compatible", core.affinity_id, self.compatible);
            return Err(Error::InvalidArgument);
        }
        self.program_boot_address(state, scm)?;
        self.power_up(state, &core)
    }

    /// Sets the boot address of all cores, unless that has already been done.
    pub fn program_boot_address<C: Conduit, W: Delay>(
        &self,
        state: &mut SmpState,
        scm: &mut Scm<C, W>,
    ) -> Result<(), Error> {
        if state.boot_addr_set {
            return Ok(());
        }
        if !scm.is_call_available(SVC_BOOT, BOOT_SET_ADDR_MC, Convention::Smc32) {
            warn!("BOOT_SET_ADDR_MC unavailable");
            return Err(Error::PermissionDenied);
        }

        debug!("Setting CPU boot address to {:#x}", self.entry);
        scm.set_boot_addr_mc(
            self.entry,
            BootAddrFlags::AARCH64 | BootAddrFlags::COLDBOOT,
        )
        .inspect_err(|e| error!("Failed to set CPU boot address: {e}"))?;

        state.boot_addr_set = true;
        Ok(())
    }

    fn power_up(&mut self, state: &mut SmpState, core: &CoreDescriptor) -> Result<(), Error> {
        if state.is_booted(core.affinity_id) {
            debug!("CPU{} is already running", core.affinity_id);
            return Ok(());
        }
        if core.affinity_id == self.self_affinity {
            debug!("Skipping boot of current CPU{}", core.affinity_id);
            state.booted.push(core.affinity_id);
            return Ok(());
        }
        if core.power_controller_base == 0 {
            error!("CPU{} is missing ACC node, cannot enable", core.affinity_id);
            return Err(Error::InvalidArgument);
        }
        let Some(mut acc) = self.acc.map(core.power_controller_base) else {
            error!(
                "CPU{} ACC block at {:#x} is not accessible",
                core.affinity_id, core.power_controller_base
            );
            return Err(Error::InvalidArgument);
        };

        info!(
            "Booting CPU{} @ {:#x}",
            core.affinity_id, core.power_controller_base
        );
        boot_cortex_a53(&mut acc, &mut self.delay);
        state.booted.push(core.affinity_id);
        Ok(())
    }
}

/// Returns the descriptors of the CPU nodes compatible with `compatible`, in tree order.
fn cores<T: DeviceTree>(dt: &T, compatible: &str) -> impl Iterator<Item = CoreDescriptor> {
    dt.cpus()
        .into_iter()
        .flat_map(move |cpus| dt.compatible_subnodes(cpus, compatible))
        .map(move |node| CoreDescriptor::read(dt, node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ScmStatus,
        platform::test::{
            ACC_BOOT_SEQUENCE, FakeCpu, FakeDeviceTree, FakeMonitor, RecordingAccMapper,
            RecordingDelay,
        },
        scm::{ConventionSelect, ScmConfig, retry::RetryPolicy},
    };

    const ENTRY: u64 = 0x8f60_0000;
    const A53: &str = "arm,cortex-a53";

    type TestBoot<'a> = SmpBoot<'a, FakeDeviceTree, RecordingAccMapper, RecordingDelay>;

    fn new_scm(monitor: FakeMonitor) -> Scm<FakeMonitor, RecordingDelay> {
        let config = ScmConfig {
            convention: ConventionSelect::Fixed(Convention::Smc32),
            quirk_a6: true,
            retry: RetryPolicy::DEFAULT,
        };
        Scm::new(monitor, RecordingDelay::default(), &config, 64)
    }

    fn new_boot(dt: &FakeDeviceTree) -> TestBoot<'_> {
        SmpBoot::new(
            dt,
            A53,
            RecordingAccMapper::default(),
            RecordingDelay::default(),
            ENTRY,
        )
    }

    fn scenario() -> FakeDeviceTree {
        FakeDeviceTree::new(vec![
            FakeCpu::spin_table(0x0).with_acc(0x2000),
            FakeCpu::spin_table(0x1).with_acc(0x1000),
            FakeCpu::spin_table(0x2)
                .with_acc(0x3000)
                .with_release_addr(0x8f60_0ff8),
        ])
    }

    #[test]
    fn descriptor_from_node() {
        let dt = FakeDeviceTree::new(vec![
            FakeCpu::spin_table(0x101).with_acc(0x0b08_8000),
            FakeCpu::psci(0x2),
            FakeCpu::spin_table(0x3).with_release_addr(0x1234),
        ]);

        assert_eq!(
            CoreDescriptor::read(&dt, dt.cpu(0)),
            CoreDescriptor {
                affinity_id: 0x101,
                is_spin_table_enabled: true,
                has_release_addr: false,
                power_controller_base: 0x0b08_8000,
            }
        );
        let psci = CoreDescriptor::read(&dt, dt.cpu(1));
        assert!(!psci.is_spin_table_enabled);
        assert!(!psci.is_eligible());
        let released = CoreDescriptor::read(&dt, dt.cpu(2));
        assert!(released.has_release_addr);
        assert_eq!(released.power_controller_base, 0);
        assert!(!released.is_eligible());
    }

    #[test]
    fn boots_other_eligible_cores() {
        let dt = scenario();
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));
        let mut state = SmpState::new();

        assert_eq!(boot.run(&mut state, &mut scm), BootOutcome::Done);

        assert!(state.boot_addr_set());
        let requests = scm.conduit().boot_addr_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].entry, ENTRY);
        assert_eq!(requests[0].affinities, [0xffff_ffff; 4]);
        assert_eq!(requests[0].flags, 0b011);
        assert_eq!(boot.acc.bases(), [0x1000]);
        assert_eq!(boot.acc.writes_to(0x1000), ACC_BOOT_SEQUENCE);
        assert_eq!(boot.delay.total_us(), 6);
    }

    #[test]
    fn released_cores_are_never_powered() {
        let dt = FakeDeviceTree::new(vec![
            FakeCpu::spin_table(0x0),
            FakeCpu::spin_table(0x1).with_acc(0x1000),
            FakeCpu::spin_table(0x2)
                .with_acc(0x2000)
                .with_release_addr(0x10),
            FakeCpu::spin_table(0x3).with_acc(0x3000),
        ]);
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));

        assert_eq!(
            boot.run(&mut SmpState::new(), &mut scm),
            BootOutcome::Done
        );
        assert_eq!(boot.acc.bases(), [0x1000, 0x3000]);
    }

    #[test]
    fn nothing_eligible_touches_nothing() {
        let dt = FakeDeviceTree::new(vec![
            FakeCpu::psci(0x0),
            FakeCpu::spin_table(0x1)
                .with_acc(0x1000)
                .with_release_addr(0x10),
        ]);
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));
        let mut state = SmpState::new();

        assert_eq!(
            boot.run(&mut state, &mut scm),
            BootOutcome::AbortedNoEligible
        );
        assert!(!state.boot_addr_set());
        assert!(scm.conduit().calls().is_empty());
        assert!(boot.acc.bases().is_empty());
    }

    #[test]
    fn missing_cpus_node() {
        let dt = FakeDeviceTree::without_cpus();
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));

        assert_eq!(
            boot.run(&mut SmpState::new(), &mut scm),
            BootOutcome::AbortedNoEligible
        );
        assert!(scm.conduit().calls().is_empty());
    }

    #[test]
    fn other_compatibles_are_ignored() {
        let dt = FakeDeviceTree::new(vec![
            FakeCpu::spin_table(0x1)
                .with_acc(0x1000)
                .with_compatible("arm,cortex-a57"),
        ]);
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));

        assert_eq!(
            boot.run(&mut SmpState::new(), &mut scm),
            BootOutcome::AbortedNoEligible
        );
    }

    #[test]
    fn unavailable_boot_address_call_aborts() {
        let dt = scenario();
        let mut boot = new_boot(&dt);
        let mut monitor = FakeMonitor::new(false);
        monitor.set_boot_addr_available(false);
        let mut scm = new_scm(monitor);
        let mut state = SmpState::new();

        assert_eq!(
            boot.run(&mut state, &mut scm),
            BootOutcome::AbortedProgramFailed(Error::PermissionDenied)
        );
        assert!(!state.boot_addr_set());
        assert!(scm.conduit().boot_addr_requests().is_empty());
        assert!(boot.acc.bases().is_empty());
    }

    #[test]
    fn failed_boot_address_call_aborts() {
        let dt = scenario();
        let mut boot = new_boot(&dt);
        let mut monitor = FakeMonitor::new(false);
        monitor.set_boot_addr_status(ScmStatus::InvalidAddress as i64);
        let mut scm = new_scm(monitor);
        let mut state = SmpState::new();

        assert_eq!(
            boot.run(&mut state, &mut scm),
            BootOutcome::AbortedProgramFailed(Error::InvalidArgument)
        );
        assert!(!state.boot_addr_set());
        assert_eq!(scm.conduit().boot_addr_requests().len(), 1);
        assert!(boot.acc.bases().is_empty());
    }

    #[test]
    fn boot_address_is_programmed_once() {
        let dt = scenario();
        let boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));
        let mut state = SmpState::new();

        assert_eq!(boot.program_boot_address(&mut state, &mut scm), Ok(()));
        assert_eq!(boot.program_boot_address(&mut state, &mut scm), Ok(()));

        assert_eq!(scm.conduit().boot_addr_requests().len(), 1);
    }

    #[test]
    fn latch_survives_across_runs() {
        let dt = scenario();
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));
        let mut state = SmpState::new();

        assert_eq!(boot.run(&mut state, &mut scm), BootOutcome::Done);
        assert_eq!(boot.run(&mut state, &mut scm), BootOutcome::Done);

        assert_eq!(scm.conduit().boot_addr_requests().len(), 1);
        assert_eq!(boot.acc.bases(), [0x1000]);
    }

    #[test]
    fn running_cores_are_not_reset() {
        let dt = scenario();
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));
        let mut state = SmpState::new();

        assert_eq!(boot.run(&mut state, &mut scm), BootOutcome::Done);
        assert_eq!(state.booted(), [0x0, 0x1]);

        assert_eq!(boot.boot_cpu(&mut state, &mut scm, dt.cpu(1)), Ok(()));
        assert_eq!(boot.run(&mut state, &mut scm), BootOutcome::Done);
        assert_eq!(boot.acc.writes_to(0x1000), ACC_BOOT_SEQUENCE);
        assert_eq!(boot.delay.total_us(), 6);
    }

    #[test]
    fn only_powered_cores_are_recorded() {
        let dt = FakeDeviceTree::new(vec![
            FakeCpu::spin_table(0x0),
            FakeCpu::spin_table(0x1),
            FakeCpu::spin_table(0x2).with_acc(0x2000),
        ]);
        let mut boot = new_boot(&dt);
        let mut state = SmpState::new();

        let mut monitor = FakeMonitor::new(false);
        monitor.set_boot_addr_available(false);
        assert_eq!(
            boot.run(&mut state, &mut new_scm(monitor)),
            BootOutcome::AbortedProgramFailed(Error::PermissionDenied)
        );
        assert!(state.booted().is_empty());

        let mut scm = new_scm(FakeMonitor::new(false));
        assert_eq!(boot.run(&mut state, &mut scm), BootOutcome::Done);
        assert_eq!(state.booted(), [0x0, 0x2]);
        assert!(!state.is_booted(0x1));
    }

    #[test]
    fn missing_acc_only_skips_that_core() {
        let dt = FakeDeviceTree::new(vec![
            FakeCpu::spin_table(0x1),
            FakeCpu::spin_table(0x2).with_acc(0),
            FakeCpu::spin_table(0x3).with_acc(0x3000),
        ]);
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));

        assert_eq!(
            boot.run(&mut SmpState::new(), &mut scm),
            BootOutcome::Done
        );
        assert_eq!(boot.acc.bases(), [0x3000]);
    }

    #[test]
    fn boot_cpu_programs_lazily() {
        let dt = scenario();
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));
        let mut state = SmpState::new();

        assert_eq!(boot.boot_cpu(&mut state, &mut scm, dt.cpu(0)), Ok(()));
        assert!(state.boot_addr_set());
        assert!(boot.acc.bases().is_empty());

        assert_eq!(boot.boot_cpu(&mut state, &mut scm, dt.cpu(1)), Ok(()));
        assert_eq!(scm.conduit().boot_addr_requests().len(), 1);
        assert_eq!(boot.acc.writes_to(0x1000), ACC_BOOT_SEQUENCE);
    }

    #[test]
    fn boot_cpu_rejects_other_compatibles() {
        let dt = FakeDeviceTree::new(vec![
            FakeCpu::spin_table(0x1)
                .with_acc(0x1000)
                .with_compatible("arm,cortex-a57"),
        ]);
        let mut boot = new_boot(&dt);
        let mut scm = new_scm(FakeMonitor::new(false));
        let mut state = SmpState::new();

        assert_eq!(
            boot.boot_cpu(&mut state, &mut scm, dt.cpu(0)),
            Err(Error::InvalidArgument)
        );
        assert!(!state.boot_addr_set());
        assert!(scm.conduit().calls().is_empty());
    }

    #[test]
    fn boot_cpu_errors() {
        let dt = FakeDeviceTree::new(vec![FakeCpu::spin_table(0x1)]);
        let mut boot = new_boot(&dt);

        let mut monitor = FakeMonitor::new(false);
        monitor.set_boot_addr_available(false);
        let mut scm = new_scm(monitor);
        assert_eq!(
            boot.boot_cpu(&mut SmpState::new(), &mut scm, dt.cpu(0)),
            Err(Error::PermissionDenied)
        );

        let mut scm = new_scm(FakeMonitor::new(false));
        assert_eq!(
            boot.boot_cpu(&mut SmpState::new(), &mut scm, dt.cpu(0)),
            Err(Error::InvalidArgument)
        );
    }
}
