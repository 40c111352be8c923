// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Descriptors of individual SCM calls and their packed argument info.

use crate::smccc::OwningEntityNumber;
use arrayvec::ArrayVec;

/// The maximum number of arguments an SCM call can carry.
pub const MAX_ARGS: usize = 10;

const ARG_COUNT_MASK: u32 = 0xf;
const ARG_TYPE_SHIFT: u32 = 4;
const ARG_TYPE_BITS: u32 = 2;
const ARG_TYPE_MASK: u32 = 0x3;

/// How the monitor should treat an argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ArgType {
    /// A plain value.
    Val = 0,
    /// The address of a buffer the monitor only reads.
    Ro = 1,
    /// The address of a buffer the monitor may write.
    Rw = 2,
    /// A value describing the size of a buffer.
    BufVal = 3,
}

/// The packed argument descriptor passed in x1: the count in bits 3:0, then two type bits per
/// argument.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(transparent)]
pub struct ArgInfo(pub u32);

impl ArgInfo {
    /// Packs the given argument types.
    pub const fn new(types: &[ArgType]) -> Self {
        let mut value = types.len() as u32 & ARG_COUNT_MASK;
        let mut i = 0;
        while i < types.len() {
            value |=
                (types[i] as u32 & ARG_TYPE_MASK) << (ARG_TYPE_SHIFT + ARG_TYPE_BITS * i as u32);
            i += 1;
        }
        Self(value)
    }

    /// Returns `count` arguments all of type [`ArgType::Val`].
    pub const fn values(count: usize) -> Self {
        Self(count as u32 & ARG_COUNT_MASK)
    }

    /// Returns the number of arguments described.
    pub const fn count(self) -> usize {
        (self.0 & ARG_COUNT_MASK) as usize
    }

    /// Returns the type of the argument at `index`.
    pub const fn arg_type(self, index: usize) -> ArgType {
        match (self.0 >> (ARG_TYPE_SHIFT + ARG_TYPE_BITS * index as u32)) & ARG_TYPE_MASK {
            0 => ArgType::Val,
            1 => ArgType::Ro,
            2 => ArgType::Rw,
            _ => ArgType::BufVal,
        }
    }

    fn push(&mut self, arg_type: ArgType) {
        let index = self.count() as u32;
        self.0 = (self.0 & !ARG_COUNT_MASK)
            | ((index + 1) & ARG_COUNT_MASK)
            | ((arg_type as u32 & ARG_TYPE_MASK) << (ARG_TYPE_SHIFT + ARG_TYPE_BITS * index));
    }
}

/// A logical SCM request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScmCall {
    /// The service the command belongs to.
    pub service: u32,
    /// The command within the service.
    pub command: u32,
    /// The calling domain.
    pub owner: OwningEntityNumber,
    /// Sent verbatim in x1. Its count decides how many arguments are encoded.
    pub arginfo: ArgInfo,
    /// The arguments. Any slot beyond `args.len()` but within the count is sent as zero.
    pub args: ArrayVec<u64, MAX_ARGS>,
}

impl ScmCall {
    /// Creates a SiP call with no arguments.
    pub fn new(service: u32, command: u32) -> Self {
        Self {
            service,
            command,
            owner: OwningEntityNumber::SIP,
            arginfo: ArgInfo::default(),
            args: ArrayVec::new(),
        }
    }

    /// Appends a value argument.
    ///
    /// # Panics
    ///
    /// Panics if the call already has [`MAX_ARGS`] arguments.
    pub fn arg(self, value: u64) -> Self {
        self.typed_arg(ArgType::Val, value)
    }

    /// Appends an argument of the given type.
    ///
    /// # Panics
    ///
    /// Panics if the call already has [`MAX_ARGS`] arguments.
    pub fn typed_arg(mut self, arg_type: ArgType, value: u64) -> Self {
        self.args.push(value);
        self.arginfo.push(arg_type);
        self
    }

    /// Returns the 16-bit function number packing the service and command.
    pub fn function_number(&self) -> u16 {
        function_number(self.service, self.command)
    }

    /// Returns the argument at `index`, or 0 if it was not given.
    pub fn arg_at(&self, index: usize) -> u64 {
        self.args.get(index).copied().unwrap_or_default()
    }
}

/// Packs a service and command into a function number.
pub const fn function_number(service: u32, command: u32) -> u16 {
    (((service & 0xff) << 8) | (command & 0xff)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arginfo_packing() {
        assert_eq!(ArgInfo::values(6).0, 6);
        assert_eq!(
            ArgInfo::new(&[ArgType::Val, ArgType::Rw, ArgType::BufVal]).0,
            0x3 | (2 << 6) | (3 << 8)
        );
        let info = ArgInfo::new(&[ArgType::Ro, ArgType::Val]);
        assert_eq!(info.count(), 2);
        assert_eq!(info.arg_type(0), ArgType::Ro);
        assert_eq!(info.arg_type(1), ArgType::Val);
    }

    #[test]
    fn builder_tracks_arginfo() {
        let call = ScmCall::new(0x01, 0x11)
            .arg(0x8000_0000)
            .typed_arg(ArgType::Rw, 0x1234);
        assert_eq!(call.arginfo, ArgInfo::new(&[ArgType::Val, ArgType::Rw]));
        assert_eq!(call.function_number(), 0x0111);
        assert_eq!(call.arg_at(1), 0x1234);
        assert_eq!(call.arg_at(5), 0);
    }

    #[test]
    fn function_number_masks_fields() {
        assert_eq!(function_number(0x106, 0x201), 0x0601);
    }
}
