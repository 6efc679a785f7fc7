// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interface for hardware reset lines of IP submodules.
//!
//! Some IP blocks contain processors or sub-blocks that need a dedicated reset
//! line asserted or deasserted, independently of the power state of the
//! domain around them.

use crate::ErrorCode;

pub trait HardReset {
    /// Identifies one reset line.
    type Line;

    /// Whether `line` currently holds its submodule in reset.
    fn is_asserted(&self, line: &Self::Line) -> Result<bool, ErrorCode>;

    /// Place the submodule behind `line` into reset.
    fn assert(&self, line: &Self::Line) -> Result<(), ErrorCode>;

    /// Release the submodule behind `line` from reset and wait until the
    /// hardware reports it out of reset.
    ///
    /// ## Errors
    ///
    /// + [Err]\([ErrorCode::ALREADY]\): the line was not asserted.
    /// + [Err]\([ErrorCode::BUSY]\): the submodule did not leave reset in time.
    fn deassert(&self, line: &Self::Line) -> Result<(), ErrorCode>;
}
