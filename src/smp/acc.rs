// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Manual power-up of a Cortex-A53 core through its APCS ACC register block.

use crate::delay::Delay;
use bitflags::bitflags;
use core::ptr::NonNull;
use safe_mmio::{UniqueMmioPointer, field, fields::ReadPureWrite};

/// Microseconds to wait for each power stage to settle.
const SETTLE_DELAY_US: u32 = 2;

/// GDHS count, in XO clock cycles.
const GDHS_COUNT: u32 = 0x10;

bitflags! {
    /// APCS_CPU_PWR_CTL
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct CpuPwrCtl: u32 {
        /// Core memory clamp.
        const CLAMP = 1 << 0;
        /// Core memory array clamp.
        const CORE_MEM_CLAMP = 1 << 1;
        /// Core memory high speed enable.
        const CORE_MEM_HS = 1 << 3;
        /// Core reset.
        const CORE_RST = 1 << 4;
        /// Core power-on reset.
        const COREPOR_RST = 1 << 5;
        /// Core powered up.
        const CORE_PWRD_UP = 1 << 7;
    }
}

bitflags! {
    /// APC_PWR_GATE_CTL
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct PwrGateCtl: u32 {
        /// Gated deep hold sleep enable.
        const GDHS_EN = 1 << 0;
        /// GDHS count.
        const GDHS_CNT = 0xff << 24;
    }
}

impl PwrGateCtl {
    const GDHS_CNT_SHIFT: u32 = 24;

    /// Returns GDHS enabled with the given count.
    pub const fn gdhs(count: u32) -> Self {
        Self::from_bits_retain(Self::GDHS_EN.bits() | (count << Self::GDHS_CNT_SHIFT))
    }
}

/// Write access to one core's power control registers.
pub trait PowerController {
    /// Writes APCS_CPU_PWR_CTL.
    fn write_cpu_pwr_ctl(&mut self, value: CpuPwrCtl);

    /// Writes APC_PWR_GATE_CTL.
    fn write_pwr_gate_ctl(&mut self, value: PwrGateCtl);
}

/// Gives access to the ACC block at a physical address.
pub trait AccMapper {
    /// The controller type handed out.
    type Controller<'a>: PowerController
    where
        Self: 'a;

    /// Returns the controller for the ACC block at `base`, or `None` if `base` is not usable.
    fn map(&mut self, base: u64) -> Option<Self::Controller<'_>>;
}

/// The APCS ACC register block.
#[repr(C)]
pub struct AccRegisters {
    _reserved0: u32,
    /// APCS_CPU_PWR_CTL, at offset 0x04.
    cpu_pwr_ctl: ReadPureWrite<u32>,
    _reserved1: [u32; 3],
    /// APC_PWR_GATE_CTL, at offset 0x14.
    pwr_gate_ctl: ReadPureWrite<u32>,
}

/// An ACC block accessed through MMIO.
pub struct MmioAcc<'a> {
    regs: UniqueMmioPointer<'a, AccRegisters>,
}

impl PowerController for MmioAcc<'_> {
    fn write_cpu_pwr_ctl(&mut self, value: CpuPwrCtl) {
        field!(self.regs, cpu_pwr_ctl).write(value.bits());
    }

    fn write_pwr_gate_ctl(&mut self, value: PwrGateCtl) {
        field!(self.regs, pwr_gate_ctl).write(value.bits());
    }
}

/// Maps ACC blocks assuming physical addresses are identity mapped as device memory.
#[derive(Debug, Default)]
pub struct IdentityAccMapper;

impl AccMapper for IdentityAccMapper {
    type Controller<'a> = MmioAcc<'a>;

    fn map(&mut self, base: u64) -> Option<MmioAcc<'_>> {
        let regs = NonNull::new(usize::try_from(base).ok()? as *mut AccRegisters)?;
        // SAFETY: The ACC block for a core is only described once in the device tree, it is mapped
        // as device memory, and the returned pointer borrows the mapper mutably so no other
        // pointer to an ACC block exists while it is alive.
        let regs = unsafe { UniqueMmioPointer::new(regs) };
        Some(MmioAcc { regs })
    }
}

/// Powers up a Cortex-A53 core.
///
/// Nothing is read back: the core starts running at the boot address already programmed into
/// the monitor.
pub fn boot_cortex_a53(acc: &mut impl PowerController, delay: &mut impl Delay) {
    // Put the CPU into reset.
    let mut reg_val =
        CpuPwrCtl::CORE_RST | CpuPwrCtl::COREPOR_RST | CpuPwrCtl::CLAMP | CpuPwrCtl::CORE_MEM_CLAMP;
    acc.write_cpu_pwr_ctl(reg_val);

    acc.write_pwr_gate_ctl(PwrGateCtl::gdhs(GDHS_COUNT));
    delay.delay_us(SETTLE_DELAY_US);

    reg_val -= CpuPwrCtl::CORE_MEM_CLAMP;
    acc.write_cpu_pwr_ctl(reg_val);
    reg_val |= CpuPwrCtl::CORE_MEM_HS;
    acc.write_cpu_pwr_ctl(reg_val);
    delay.delay_us(SETTLE_DELAY_US);

    reg_val -= CpuPwrCtl::CLAMP;
    acc.write_cpu_pwr_ctl(reg_val);
    delay.delay_us(SETTLE_DELAY_US);

    // Release the CPU from reset and bring it to life.
    reg_val -= CpuPwrCtl::CORE_RST | CpuPwrCtl::COREPOR_RST;
    acc.write_cpu_pwr_ctl(reg_val);
    reg_val |= CpuPwrCtl::CORE_PWRD_UP;
    acc.write_cpu_pwr_ctl(reg_val);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test::{ACC_BOOT_SEQUENCE, RecordingAcc, RecordingDelay};

    #[test]
    fn power_up_sequence() {
        let mut acc = RecordingAcc::default();
        let mut delay = RecordingDelay::default();

        boot_cortex_a53(&mut acc, &mut delay);

        assert_eq!(acc.writes, ACC_BOOT_SEQUENCE);
        assert_eq!(delay.total_us(), 6);
    }

    #[test]
    fn power_up_through_mmio() {
        let mut regs = AccRegisters {
            _reserved0: 0,
            cpu_pwr_ctl: ReadPureWrite(0),
            _reserved1: [0; 3],
            pwr_gate_ctl: ReadPureWrite(0),
        };
        let mut acc = MmioAcc {
            regs: UniqueMmioPointer::from(&mut regs),
        };

        boot_cortex_a53(&mut acc, &mut RecordingDelay::default());
        drop(acc);

        assert_eq!(regs.cpu_pwr_ctl.0, 0x88);
        assert_eq!(regs.pwr_gate_ctl.0, 0x1000_0001);
        assert_eq!(regs._reserved0, 0);
        assert_eq!(regs._reserved1, [0; 3]);
    }

    #[test]
    fn register_offsets() {
        assert_eq!(core::mem::offset_of!(AccRegisters, cpu_pwr_ctl), 0x04);
        assert_eq!(core::mem::offset_of!(AccRegisters, pwr_gate_ctl), 0x14);
    }

    #[test]
    fn gdhs_encoding() {
        assert_eq!(PwrGateCtl::gdhs(0x10).bits(), 0x1000_0001);
        assert!(PwrGateCtl::gdhs(0x10).contains(PwrGateCtl::GDHS_EN));
    }
}
