// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Device tree fixups telling the next stage how the secondary cores were started.

use super::CoreDescriptor;
use crate::{devicetree::DeviceTreeMut, error::Error};
use alloc::vec::Vec;
use log::{error, info};

/// Name of the reserved memory node covering the spin-table code.
const RESERVED_MEMORY_NAME: &str = "spin-table";

/// Points every spin-table CPU compatible with `compatible` which has no `cpu-release-addr` and
/// whose affinity is in `booted` at `release_addr`, and reserves the spin-table region so the next
/// stage leaves it alone.
///
/// Must be called after the cores have been booted, as booting skips cores which already have a
/// release address. Cores which were never started are left without one. Returns the number of
/// CPU nodes updated.
pub fn fixup_device_tree<T: DeviceTreeMut>(
    dt: &mut T,
    compatible: &str,
    booted: &[u32],
    release_addr: u64,
    reserve_base: u64,
    reserve_size: u64,
) -> Result<usize, Error> {
    let cpus = dt.cpus().ok_or(Error::NoDevice)?;
    let nodes: Vec<T::Node> = dt
        .compatible_subnodes(cpus, compatible)
        .filter(|&node| {
            let core = CoreDescriptor::read(&*dt, node);
            core.is_eligible() && booted.contains(&core.affinity_id)
        })
        .collect();
    if nodes.is_empty() {
        return Ok(0);
    }

    for &node in &nodes {
        dt.set_u64(node, "cpu-release-addr", release_addr)
            .inspect_err(|e| error!("Failed to set cpu-release-addr: {e}"))?;
    }
    dt.add_reserved_memory(RESERVED_MEMORY_NAME, reserve_base, reserve_size)
        .inspect_err(|e| error!("Failed to reserve spin-table memory: {e}"))?;
    info!(
        "Spin-table release address {release_addr:#x} set for {} CPUs",
        nodes.len()
    );
    Ok(nodes.len())
}
