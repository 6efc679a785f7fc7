// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interfaces for voltage rails: register access to the SoC blocks that drive
//! a rail, and the PMIC that produces it.
//!
//! A voltage processor talks to the PMIC indirectly through selector codes
//! (`vsel`). The [`Pmic`] trait converts between microvolts and selectors and
//! carries the timing constants the SoC side needs to program its ramp.
//! [`VoltageRegisters`] is the register capability of the block that owns
//! the rail's control registers; offsets are relative to that block.

/// Register access for the block controlling a voltage rail.
///
/// Offsets are byte offsets into the block. Implementations hide how the
/// block is addressed (partition, instance, MMIO base).
///
/// Accesses cannot fail, so they may be lossy: an implementation that
/// refuses an offset (for example a misaligned one) logs the access, drops
/// writes and returns 0 from reads and read-modify-writes. Callers that
/// need to know whether a register exists must check the offset themselves.
pub trait VoltageRegisters {
    /// Read the register at `offset`.
    fn read(&self, offset: u8) -> u32;

    /// Write `val` to the register at `offset`.
    fn write(&self, val: u32, offset: u8);

    /// Clear the bits in `mask`, set `bits`, and return the written value.
    ///
    /// Not atomic against other writers; callers must serialize.
    fn rmw(&self, mask: u32, bits: u32, offset: u8) -> u32 {
        let v = (self.read(offset) & !mask) | bits;
        self.write(v, offset);
        v
    }
}

/// Timing and range constants of a PMIC output, as needed by the SoC's
/// voltage processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PmicParams {
    /// Voltage change per selector step, in microvolts.
    pub step_size: u32,
    /// Ramp rate, in microvolts per microsecond.
    pub slew_rate: u32,
    /// Error offset programmed into the voltage processor.
    pub vp_erroroffset: u8,
    /// Minimum selector step per voltage processor update.
    pub vp_vstepmin: u8,
    /// Maximum selector step per voltage processor update.
    pub vp_vstepmax: u8,
    /// Voltage processor timeout, in microseconds.
    pub vp_timeout_us: u32,
    /// Lowest voltage the PMIC output supports, in microvolts.
    pub vddmin: u32,
    /// Highest voltage the PMIC output supports, in microvolts.
    pub vddmax: u32,
}

/// A PMIC output addressed by selector codes.
pub trait Pmic {
    /// Selector code for `uv` microvolts.
    fn uv_to_vsel(&self, uv: u32) -> u8;

    /// Microvolts produced by selector code `vsel`.
    fn vsel_to_uv(&self, vsel: u8) -> u32;

    /// Timing and range constants.
    fn params(&self) -> &PmicParams;
}
