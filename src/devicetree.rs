// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The device tree accessors needed for secondary core bring-up.

use crate::error::Error;

/// Read-only access to a device tree.
pub trait DeviceTree {
    /// A handle to a node.
    type Node: Copy;

    /// Returns the `/cpus` node, if present.
    fn cpus(&self) -> Option<Self::Node>;

    /// Returns the subnodes of `parent` which are compatible with `compatible`, in tree order.
    fn compatible_subnodes(
        &self,
        parent: Self::Node,
        compatible: &str,
    ) -> impl Iterator<Item = Self::Node>;

    /// Returns whether the node's `compatible` property contains `compatible`.
    fn is_compatible(&self, node: Self::Node, compatible: &str) -> bool;

    /// Reads a string property.
    fn read_string(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Returns whether the node has the given property.
    fn has_property(&self, node: Self::Node, name: &str) -> bool;

    /// Returns the first address of the node's `reg` property.
    fn address(&self, node: Self::Node) -> Option<u64>;

    /// Resolves the phandle at `index` of the given property.
    fn parse_phandle(&self, node: Self::Node, name: &str, index: usize) -> Option<Self::Node>;
}

/// Write access to a device tree, used to pass the spin-table details on to the next stage.
pub trait DeviceTreeMut: DeviceTree {
    /// Sets a 64-bit property, replacing any existing value.
    ///
    /// Fails with [`Error::NoMemory`] if the tree has no space left for it.
    fn set_u64(&mut self, node: Self::Node, name: &str, value: u64) -> Result<(), Error>;

    /// Adds a `no-map` reserved memory region.
    fn add_reserved_memory(&mut self, name: &str, base: u64, size: u64) -> Result<(), Error>;
}
