// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Register layout of an SCM call, including the spill buffer for arguments which don't fit.

use super::call::{MAX_ARGS, ScmCall};
use crate::{
    aarch64::flush_dcache_range,
    error::Error,
    smccc::{CallType, Convention, FunctionId},
    transport::SmcRegisters,
};
use alloc::boxed::Box;
use log::trace;
use zerocopy::{
    FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout,
    little_endian::{U32, U64},
};

/// The number of arguments which always travel in registers.
pub const N_REG_ARGS: usize = 4;
/// The index of the first argument that moves to the spill buffer when spilling.
pub const FIRST_EXT_IDX: usize = N_REG_ARGS - 1;
/// The number of arguments the spill buffer holds.
pub const N_EXT_ARGS: usize = MAX_ARGS - N_REG_ARGS + 1;
/// The register slot of the first argument.
pub const FIRST_REG_IDX: usize = 2;
/// The register slot of the last inline argument, which holds the spill buffer address instead
/// when spilling.
pub const LAST_REG_IDX: usize = FIRST_REG_IDX + N_REG_ARGS - 1;

const SPILL_BYTES: usize = N_EXT_ARGS * size_of::<u64>();
const SPILL_ALIGN: usize = 64;

/// Overflow arguments, in the monitor's byte order, read by the monitor from physical memory.
#[derive(FromBytes, Immutable, IntoBytes, KnownLayout)]
#[repr(C, align(64))]
pub struct SpillBuffer {
    bytes: [u8; SPILL_ALIGN],
}

const _: () = assert!(SPILL_BYTES <= SPILL_ALIGN);

impl SpillBuffer {
    /// Allocates a zeroed spill buffer, aligned to a cache line.
    fn try_new() -> Result<Box<Self>, Error> {
        Self::new_box_zeroed().map_err(|_| Error::NoMemory)
    }

    fn fill(&mut self, call: &ScmCall, convention: Convention) {
        for i in 0..N_EXT_ARGS {
            let value = call.arg_at(i + FIRST_EXT_IDX);
            match convention {
                Convention::Smc32 => {
                    let offset = i * size_of::<u32>();
                    self.bytes[offset..offset + size_of::<u32>()]
                        .copy_from_slice(U32::new(value as u32).as_bytes());
                }
                Convention::Smc64 => {
                    let offset = i * size_of::<u64>();
                    self.bytes[offset..offset + size_of::<u64>()]
                        .copy_from_slice(U64::new(value).as_bytes());
                }
            }
        }
    }

    /// Reads back the entry at `index` in the given convention's width.
    ///
    /// Returns `None` if `index` is not one of the [`N_EXT_ARGS`] entries.
    pub fn entry(&self, index: usize, convention: Convention) -> Option<u64> {
        if index >= N_EXT_ARGS {
            return None;
        }
        match convention {
            Convention::Smc32 => {
                let offset = index * size_of::<u32>();
                let bytes = self.bytes.get(offset..offset + size_of::<u32>())?;
                U32::read_from_bytes(bytes).ok().map(|value| value.get().into())
            }
            Convention::Smc64 => {
                let offset = index * size_of::<u64>();
                let bytes = self.bytes.get(offset..offset + size_of::<u64>())?;
                U64::read_from_bytes(bytes).ok().map(U64::get)
            }
        }
    }

    fn address(&self) -> u64 {
        self as *const Self as u64
    }
}

/// The registers for one logical call, plus the spill buffer they may point to.
///
/// The spill buffer lives exactly as long as this value, so it must be kept until the monitor has
/// returned.
pub struct EncodedCall {
    /// The registers to trap with.
    pub regs: SmcRegisters,
    spill: Option<Box<SpillBuffer>>,
}

impl EncodedCall {
    /// Returns the spill buffer, if one was needed.
    pub fn spill(&self) -> Option<&SpillBuffer> {
        self.spill.as_deref()
    }
}

/// Builds the registers for `call`.
///
/// Allocates, fills and cleans a spill buffer from the data cache if the call has more than
/// [`N_REG_ARGS`] arguments.
pub fn encode(
    call: &ScmCall,
    call_type: CallType,
    convention: Convention,
    cache_granule: usize,
) -> Result<EncodedCall, Error> {
    let arglen = call.arginfo.count();
    if arglen > MAX_ARGS {
        return Err(Error::InvalidArgument);
    }

    let function = FunctionId::new(call_type, convention, call.owner, call.function_number());
    let mut regs = [0; 8];
    regs[0] = function.0.into();
    regs[1] = call.arginfo.0.into();
    for i in 0..N_REG_ARGS {
        regs[i + FIRST_REG_IDX] = call.arg_at(i);
    }

    let spill = if arglen > N_REG_ARGS {
        let mut spill = SpillBuffer::try_new()?;
        spill.fill(call, convention);
        regs[LAST_REG_IDX] = spill.address();
        flush_dcache_range(spill.address() as usize, SPILL_BYTES, cache_granule);
        trace!("Spilled {} arguments of {function:?}", arglen - FIRST_EXT_IDX);
        Some(spill)
    } else {
        None
    };

    Ok(EncodedCall { regs, spill })
}
