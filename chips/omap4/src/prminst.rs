// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! PRM instance register access.
//!
//! The OMAP4 PRCM is split into partitions (PRM, CM1, CM2, SCRM, PRCM_MPU),
//! each with its own base address. Inside a partition, registers are grouped
//! into instances; a register is addressed as partition + instance offset +
//! register offset. The bases are installed once at boot by [`PrmInst::base_init`].
//!
//! Accesses through an unmapped partition, or to an offset outside the
//! partition window, fail with [`ErrorCode::INVAL`] without touching
//! hardware.
//!
//! Boards describe each partition as a [`PartitionWindow`], normally a
//! `const` [`StaticRef`] to the memory-mapped registers:
//!
//! ```rust,ignore
//! const PRM_BASE: StaticRef<PartitionRegisters> =
//!     unsafe { StaticRef::new(0x4a30_6000 as *const PartitionRegisters) };
//!
//! prm_inst.base_init(&PrmGlobals {
//!     prm: &PRM_BASE,
//!     prcm_mpu: None,
//!     scrm: None,
//! });
//! ```
//!
//! This module also drives submodule hard-reset lines (`RM_RSTCTRL` /
//! `RM_RSTST` pairs) and the global warm and cold software resets.

use kernel::hil::reset::HardReset;
use kernel::hil::time::{self, BusyWait};
use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::cells::OptionalCell;
use kernel::utilities::registers::{register_bitfields, ReadWrite};
use kernel::utilities::StaticRef;
use kernel::ErrorCode;

use crate::soc::SocRevision;

/// Size of the register window mapped for each partition, in bytes.
pub const PARTITION_SIZE: usize = 0x2000;

/// Register window of one PRCM partition, as 32-bit words.
pub type PartitionRegisters = [ReadWrite<u32>; PARTITION_SIZE / 4];

/// Word-granular access to one partition's register window.
///
/// `word` is always below `PARTITION_SIZE / 4`.
pub trait PartitionWindow {
    fn read_word(&self, word: usize) -> u32;
    fn write_word(&self, word: usize, val: u32);
}

impl PartitionWindow for StaticRef<PartitionRegisters> {
    fn read_word(&self, word: usize) -> u32 {
        self[word].get()
    }

    fn write_word(&self, word: usize, val: u32) {
        self[word].set(val);
    }
}

/// Number of partition slots, including the invalid slot 0.
pub const MAX_PRCM_PARTITIONS: usize = 6;

/// PRCM partitions. Slot 0 is the invalid partition and is not representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Partition {
    Prm = 1,
    Cm1 = 2,
    Cm2 = 3,
    Scrm = 4,
    PrcmMpu = 5,
}

// PRM instances, relative to the PRM partition.
pub const OMAP4430_PRM_OCP_SOCKET_INST: i16 = 0x0000;
pub const OMAP4430_PRM_DEVICE_INST: i16 = 0x1b00;
pub const OMAP54XX_PRM_DEVICE_INST: i16 = 0x1c00;

// Registers of the PRM_DEVICE instance.
pub const OMAP4_PRM_RSTCTRL_OFFSET: u16 = 0x0000;
pub const OMAP4_PRM_RSTST_OFFSET: u16 = 0x0004;

/// Byte distance between a reset control register and its status register.
pub const OMAP4_RST_CTRL_ST_OFFSET: u16 = 4;

/// Polls allowed for a submodule to report it left hard reset.
pub const MAX_MODULE_HARDRESET_WAIT: u32 = 10000;

/// Cold reset takes 2-3 cycles of the 32 kHz clock (about 91.6 us); wait
/// twice that.
const GLOBAL_COLD_RST_DELAY_US: u32 = 184;

register_bitfields![u32,
    RstCtrl [
        RST_GLOBAL_COLD_SW OFFSET(1) NUMBITS(1) [],
        RST_GLOBAL_WARM_SW OFFSET(0) NUMBITS(1) []
    ],
    RstSt [
        GLOBAL_COLD_RST OFFSET(0) NUMBITS(1) []
    ]
];

/// Partition base addresses, as provided by the platform's global map.
pub struct PrmGlobals<'a> {
    pub prm: &'a dyn PartitionWindow,
    pub prcm_mpu: Option<&'a dyn PartitionWindow>,
    pub scrm: Option<&'a dyn PartitionWindow>,
}

/// One hard-reset line: bit `shift` of the `RM_RSTCTRL` register at
/// `rstctrl_offs` inside instance `inst` of partition `part`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResetLine {
    pub part: Partition,
    pub inst: i16,
    pub rstctrl_offs: u16,
    pub shift: u8,
}

pub struct PrmInst<'a> {
    bases: [OptionalCell<&'a dyn PartitionWindow>; MAX_PRCM_PARTITIONS],
    soc: SocRevision,
    delay: &'a dyn BusyWait,
}

impl<'a> PrmInst<'a> {
    pub const fn new(soc: SocRevision, delay: &'a dyn BusyWait) -> PrmInst<'a> {
        PrmInst {
            bases: [
                OptionalCell::empty(),
                OptionalCell::empty(),
                OptionalCell::empty(),
                OptionalCell::empty(),
                OptionalCell::empty(),
                OptionalCell::empty(),
            ],
            soc,
            delay,
        }
    }

    /// Install the partition bases. Only PRM, PRCM_MPU and SCRM are owned by
    /// the PRM code; CM1 and CM2 stay unmapped here.
    pub fn base_init(&self, globals: &PrmGlobals<'a>) {
        self.bases[Partition::Prm as usize].set(globals.prm);
        self.bases[Partition::PrcmMpu as usize].insert(globals.prcm_mpu);
        self.bases[Partition::Scrm as usize].insert(globals.scrm);
    }

    pub fn soc(&self) -> SocRevision {
        self.soc
    }

    pub(crate) fn delay(&self) -> &'a dyn BusyWait {
        self.delay
    }

    pub fn is_mapped(&self, part: Partition) -> bool {
        self.bases[part as usize].is_some()
    }

    /// Instance holding the device-level PRM registers on this SoC.
    pub fn device_inst(&self) -> i16 {
        if self.soc.is_omap44xx() {
            OMAP4430_PRM_DEVICE_INST
        } else {
            OMAP54XX_PRM_DEVICE_INST
        }
    }

    fn locate(
        &self,
        part: Partition,
        inst: i16,
        idx: u16,
    ) -> Result<(&'a dyn PartitionWindow, usize), ErrorCode> {
        let base = self.bases[part as usize]
            .and_then(Some)
            .ok_or(ErrorCode::INVAL)?;
        let offset = i32::from(inst) + i32::from(idx);
        if offset < 0 || offset as usize >= PARTITION_SIZE || offset % 4 != 0 {
            return Err(ErrorCode::INVAL);
        }
        Ok((base, offset as usize / 4))
    }

    /// Read a register in a PRM instance.
    pub fn read_inst_reg(&self, part: Partition, inst: i16, idx: u16) -> Result<u32, ErrorCode> {
        let (base, word) = self.locate(part, inst, idx)?;
        Ok(base.read_word(word))
    }

    /// Write into a register in a PRM instance.
    pub fn write_inst_reg(
        &self,
        val: u32,
        part: Partition,
        inst: i16,
        idx: u16,
    ) -> Result<(), ErrorCode> {
        let (base, word) = self.locate(part, inst, idx)?;
        base.write_word(word, val);
        Ok(())
    }

    /// Read-modify-write a register in a PRM instance. Caller must serialize.
    pub fn rmw_inst_reg_bits(
        &self,
        mask: u32,
        bits: u32,
        part: Partition,
        inst: i16,
        idx: u16,
    ) -> Result<u32, ErrorCode> {
        let (base, word) = self.locate(part, inst, idx)?;
        let v = (base.read_word(word) & !mask) | bits;
        base.write_word(word, v);
        Ok(v)
    }

    fn bit_is_set(&self, part: Partition, inst: i16, offs: u16, shift: u8) -> Result<bool, ErrorCode> {
        if shift >= 32 {
            return Err(ErrorCode::INVAL);
        }
        let v = self.read_inst_reg(part, inst, offs)?;
        Ok((v >> shift) & 1 == 1)
    }

    /// Trigger a global warm software reset of the device.
    pub fn global_warm_sw_reset(&self) -> Result<(), ErrorCode> {
        let dev_inst = self.device_inst();
        let v = self.read_inst_reg(Partition::Prm, dev_inst, OMAP4_PRM_RSTCTRL_OFFSET)?;
        self.write_inst_reg(
            v | RstCtrl::RST_GLOBAL_WARM_SW::SET.value,
            Partition::Prm,
            dev_inst,
            OMAP4_PRM_RSTCTRL_OFFSET,
        )?;

        // OCP barrier
        self.read_inst_reg(Partition::Prm, dev_inst, OMAP4_PRM_RSTCTRL_OFFSET)?;
        Ok(())
    }

    /// Trigger a global cold software reset of the device.
    pub fn global_cold_sw_reset(&self) -> Result<(), ErrorCode> {
        let dev_inst = self.device_inst();

        // The bootloader may have left the cold reset status set.
        self.write_inst_reg(
            RstSt::GLOBAL_COLD_RST::SET.value,
            Partition::Prm,
            dev_inst,
            OMAP4_PRM_RSTST_OFFSET,
        )?;

        let v = self.read_inst_reg(Partition::Prm, dev_inst, OMAP4_PRM_RSTCTRL_OFFSET)?;
        self.write_inst_reg(
            v | RstCtrl::RST_GLOBAL_COLD_SW::SET.value,
            Partition::Prm,
            dev_inst,
            OMAP4_PRM_RSTCTRL_OFFSET,
        )?;

        // OCP barrier
        self.read_inst_reg(Partition::Prm, dev_inst, OMAP4_PRM_RSTCTRL_OFFSET)?;

        self.delay.udelay(GLOBAL_COLD_RST_DELAY_US);
        Ok(())
    }
}

impl HardReset for PrmInst<'_> {
    type Line = ResetLine;

    fn is_asserted(&self, line: &ResetLine) -> Result<bool, ErrorCode> {
        self.bit_is_set(line.part, line.inst, line.rstctrl_offs, line.shift)
    }

    fn assert(&self, line: &ResetLine) -> Result<(), ErrorCode> {
        if line.shift >= 32 {
            return Err(ErrorCode::INVAL);
        }
        let mask = 1 << line.shift;
        self.rmw_inst_reg_bits(mask, mask, line.part, line.inst, line.rstctrl_offs)?;
        Ok(())
    }

    fn deassert(&self, line: &ResetLine) -> Result<(), ErrorCode> {
        // Avoid de-asserting the line twice.
        if !self.is_asserted(line)? {
            return Err(ErrorCode::ALREADY);
        }

        let mask = 1 << line.shift;
        let rstst_offs = line
            .rstctrl_offs
            .checked_add(OMAP4_RST_CTRL_ST_OFFSET)
            .ok_or(ErrorCode::INVAL)?;

        // Status bits are write-one-to-clear.
        self.rmw_inst_reg_bits(0xffff_ffff, mask, line.part, line.inst, rstst_offs)?;
        self.rmw_inst_reg_bits(mask, 0, line.part, line.inst, line.rstctrl_offs)?;

        let reset_done = time::poll_timeout(self.delay, MAX_MODULE_HARDRESET_WAIT, || {
            self.bit_is_set(line.part, line.inst, rstst_offs, line.shift) == Ok(true)
        });
        match reset_done {
            Some(_) => Ok(()),
            None => Err(ErrorCode::BUSY),
        }
    }
}
