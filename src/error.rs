// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Errors returned to callers, and the mapping from monitor status codes onto them.

use num_enum::TryFromPrimitive;
use thiserror::Error;

/// An error from an SCM call or from secondary core bring-up.
///
/// Each variant corresponds to a POSIX errno value, see [`Error::errno`].
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The spill buffer could not be allocated.
    #[error("out of memory")]
    NoMemory,
    /// The monitor or the caller rejected an argument.
    #[error("invalid argument")]
    InvalidArgument,
    /// A required monitor call is not available.
    #[error("operation not permitted")]
    PermissionDenied,
    /// The device tree does not describe the expected hardware.
    #[error("no such device")]
    NoDevice,
    /// The monitor does not implement the call.
    #[error("operation not supported")]
    NotSupported,
    /// The monitor reported it was busy.
    #[error("device or resource busy")]
    Busy,
}

impl Error {
    /// Returns the negative errno value for this error.
    pub const fn errno(self) -> i32 {
        match self {
            Self::PermissionDenied => -1,
            Self::NoMemory => -12,
            Self::Busy => -16,
            Self::NoDevice => -19,
            Self::InvalidArgument => -22,
            Self::NotSupported => -95,
        }
    }
}

/// Status codes the SCM monitor returns in x0.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(i64)]
pub enum ScmStatus {
    /// The call was suspended by the monitor and must be resumed.
    Interrupted = 1,
    /// Generic failure.
    Error = -1,
    /// An argument was invalid.
    InvalidArgument = -2,
    /// An address argument was invalid.
    InvalidAddress = -3,
    /// The call is not supported.
    NotSupported = -4,
    /// The monitor ran out of memory.
    NoMemory = -5,
    /// The monitor could not accept the call right now.
    Busy = -12,
}

impl ScmStatus {
    /// Returns the raw value as it appears in x0.
    pub const fn raw(self) -> u64 {
        self as i64 as u64
    }
}

/// Translates a non-zero monitor status into an [`Error`].
pub fn remap_error(status: i64) -> Error {
    match ScmStatus::try_from(status) {
        Ok(ScmStatus::InvalidAddress | ScmStatus::InvalidArgument) => Error::InvalidArgument,
        Ok(ScmStatus::NotSupported) => Error::NotSupported,
        Ok(ScmStatus::NoMemory) => Error::NoMemory,
        Ok(ScmStatus::Busy) => Error::Busy,
        _ => Error::InvalidArgument,
    }
}
