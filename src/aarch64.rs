// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

#[cfg(all(target_arch = "aarch64", not(test)))]
use core::arch::asm;

/// Issues a full system data synchronization barrier (`dsb sy`) instruction.
pub fn dsb_sy() {
    // SAFETY: `dsb` does not violate safe Rust guarantees.
    #[cfg(all(target_arch = "aarch64", not(test)))]
    unsafe {
        asm!("dsb sy", options(nostack));
    }
}

/// Cleans and invalidates the data cache lines covering `len` bytes starting at `start`, to the
/// point of coherency, so that another observer reading physical memory sees the contents.
pub fn flush_dcache_range(start: usize, len: usize, granule: usize) {
    let end = start + len;
    let mut line = start & !(granule - 1);
    while line < end {
        // SAFETY: `dc civac` only affects the cache state of the line, which holds memory that we
        // own. It does not modify the contents seen by Rust code.
        #[cfg(all(target_arch = "aarch64", not(test)))]
        unsafe {
            asm!("dc civac, {line}", options(nostack), line = in(reg) line);
        }
        line += granule;
    }
    dsb_sy();
}

/// Returns the current value of the physical counter.
#[cfg(all(target_arch = "aarch64", not(test)))]
pub fn read_cntpct_el0() -> u64 {
    let value: u64;
    // SAFETY: Reading `CNTPCT_EL0` is always safe, it has no impact on memory.
    unsafe {
        asm!(
            "isb",
            "mrs {value}, cntpct_el0",
            options(nostack),
            value = out(reg) value,
        );
    }
    value
}

/// Returns the frequency of the system counter in Hz.
#[cfg(all(target_arch = "aarch64", not(test)))]
pub fn read_cntfrq_el0() -> u64 {
    let value: u64;
    // SAFETY: Reading `CNTFRQ_EL0` is always safe, it has no impact on memory.
    unsafe {
        asm!(
            "mrs {value}, cntfrq_el0",
            options(nomem, nostack),
            value = out(reg) value,
        );
    }
    value
}
