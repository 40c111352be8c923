// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Types and helpers related to the SMC Calling Convention, from the caller's side.

use core::fmt::{self, Debug, Display, Formatter};

const FAST_CALL: u32 = 0x8000_0000;
const SMC64: u32 = 0x4000_0000;
const OEN_MASK: u32 = 0x3f00_0000;
const OEN_SHIFT: u8 = 24;
const NUMBER_MASK: u32 = 0xffff;

/// Whether a call is a fast (atomic) call or a standard (yielding) call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CallType {
    /// A standard call, which the monitor may interrupt or reject as busy.
    Standard,
    /// A fast call, executed atomically by the monitor.
    Fast,
}

/// The width used to marshal call arguments and addresses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Convention {
    /// SMC32: arguments are 32 bits wide.
    Smc32,
    /// SMC64: arguments are 64 bits wide.
    Smc64,
}

/// Owning Entity Number (OEN)
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OwningEntityNumber(pub u8);

impl OwningEntityNumber {
    /// Silicon Partner (SiP) service calls.
    pub const SIP: Self = Self(2);
}

impl Display for OwningEntityNumber {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An SMCCC function ID.
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct FunctionId(pub u32);

impl FunctionId {
    /// Creates a new `FunctionId` from its components.
    pub const fn new(
        call_type: CallType,
        convention: Convention,
        oen: OwningEntityNumber,
        number: u16,
    ) -> Self {
        let type_bits = match call_type {
            CallType::Fast => FAST_CALL,
            CallType::Standard => 0,
        };
        let convention_bits = match convention {
            Convention::Smc32 => 0,
            Convention::Smc64 => SMC64,
        };
        Self(
            type_bits
                | convention_bits
                | (((oen.0 as u32) << OEN_SHIFT) & OEN_MASK)
                | (number as u32 & NUMBER_MASK),
        )
    }

    /// Returns the Owning Entity Number of the function ID.
    pub fn oen(self) -> OwningEntityNumber {
        OwningEntityNumber(((self.0 & OEN_MASK) >> OEN_SHIFT) as u8)
    }

    /// Returns the lower 16 bits of the function ID.
    pub fn number(self) -> u16 {
        self.0 as u16
    }

    /// Returns whether this is a fast or a standard call.
    pub fn call_type(self) -> CallType {
        if self.0 & FAST_CALL != 0 {
            CallType::Fast
        } else {
            CallType::Standard
        }
    }

    /// Returns which calling convention the call uses.
    pub fn convention(self) -> Convention {
        if self.0 & SMC64 != 0 {
            Convention::Smc64
        } else {
            Convention::Smc32
        }
    }
}

impl Display for FunctionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Debug for FunctionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{:#010x} ({:?} {:?} OEN {} number {:#06x})",
            self.0,
            self.call_type(),
            self.convention(),
            self.oen(),
            self.number()
        )
    }
}

/// The registers returned by the monitor: x0 is the status, x1-x3 are the payload.
#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct SmcResult(pub [u64; SmcResult::MAX_VALUES]);

impl SmcResult {
    /// The number of result registers captured from a call.
    pub const MAX_VALUES: usize = 4;

    /// Returns the status word (x0) as a signed value.
    pub fn status(&self) -> i64 {
        self.0[0] as i64
    }

    /// Returns the payload words (x1-x3).
    pub fn payload(&self) -> [u64; 3] {
        [self.0[1], self.0[2], self.0[3]]
    }
}

impl Debug for SmcResult {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SmcResult([")?;
        let (first, rest) = self.0.split_at(1);
        write!(f, "{:#x}", first[0])?;
        for value in rest {
            write!(f, ", {value:#x}")?;
        }
        write!(f, "])")?;
        Ok(())
    }
}

impl From<[u64; 4]> for SmcResult {
    fn from(values: [u64; 4]) -> Self {
        Self(values)
    }
}

impl From<u64> for SmcResult {
    fn from(status: u64) -> Self {
        Self([status, 0, 0, 0])
    }
}

impl From<i64> for SmcResult {
    fn from(status: i64) -> Self {
        Self::from(status as u64)
    }
}
