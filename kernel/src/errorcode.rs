// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Standard error enum for invoking operations

use core::fmt;

/// Standard errors returned by power-management operations.
///
/// The set mirrors the failure classes hardware sequencing code runs into:
/// bad arguments or missing collaborators, hardware that never reached the
/// expected state, and requests for a state that is already in effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ErrorCode {
    /// Generic failure condition
    FAIL = 0,
    /// Underlying hardware is busy or did not finish in time; retry
    BUSY = 1,
    /// The state requested is already set
    ALREADY = 2,
    /// The component is powered down
    OFF = 3,
    /// An invalid parameter was passed, or a required collaborator is missing
    INVAL = 5,
    /// Operation or command is unsupported
    NOSUPPORT = 9,
    /// Device does not exist
    NODEVICE = 10,
    /// Hardware did not reach the expected state within the polling budget
    TIMEDOUT = 13,
}

impl ErrorCode {
    /// The negative Linux errno value matching this error.
    ///
    /// Useful when the caller is a C power-management framework that expects
    /// `-EINVAL`-style return values.
    pub const fn to_errno(self) -> i32 {
        match self {
            ErrorCode::FAIL => -5,       // EIO
            ErrorCode::BUSY => -16,      // EBUSY
            ErrorCode::ALREADY => -17,   // EEXIST
            ErrorCode::OFF => -19,       // ENODEV
            ErrorCode::INVAL => -22,     // EINVAL
            ErrorCode::NOSUPPORT => -95, // EOPNOTSUPP
            ErrorCode::NODEVICE => -19,  // ENODEV
            ErrorCode::TIMEDOUT => -110, // ETIMEDOUT
        }
    }
}

impl From<ErrorCode> for usize {
    fn from(err: ErrorCode) -> usize {
        err as usize
    }
}

impl From<ErrorCode> for i32 {
    fn from(err: ErrorCode) -> i32 {
        err.to_errno()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ErrorCode::FAIL => "failure",
            ErrorCode::BUSY => "busy",
            ErrorCode::ALREADY => "already in requested state",
            ErrorCode::OFF => "powered down",
            ErrorCode::INVAL => "invalid argument",
            ErrorCode::NOSUPPORT => "not supported",
            ErrorCode::NODEVICE => "no such device",
            ErrorCode::TIMEDOUT => "timed out",
        };
        f.write_str(s)
    }
}
