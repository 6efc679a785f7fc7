// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! OMAP4/5 PRM module.
//!
//! Device-level PRM services built on top of [`crate::prminst`]:
//!
//! - VP and ABB transaction-done status bits, exposed to the voltage
//!   processor code through [`VpHardwareOps`],
//! - the VC/VP register accessor [`VcVp`],
//! - the PRCM MPU interrupt registers (pending events, save/restore of the
//!   enables, OCP barrier),
//! - the I/O wakeup daisy chain.

use kernel::hil::time;
use kernel::hil::voltage::VoltageRegisters;
use kernel::utilities::registers::{register_bitfields, Field, LocalRegisterCopy};
use kernel::ErrorCode;

use crate::prminst::{
    Partition, PrmInst, OMAP4430_PRM_DEVICE_INST, OMAP4430_PRM_OCP_SOCKET_INST,
    OMAP54XX_PRM_DEVICE_INST,
};
use crate::vp::{VpHardwareOps, VpId};

// Registers of the PRM_OCP_SOCKET instance.
pub const OMAP4_REVISION_PRM_OFFSET: u16 = 0x0000;
pub const OMAP4_PRM_IRQSTATUS_MPU_OFFSET: u16 = 0x0010;
pub const OMAP4_PRM_IRQSTATUS_MPU_2_OFFSET: u16 = 0x0014;
pub const OMAP4_PRM_IRQENABLE_MPU_OFFSET: u16 = 0x0018;
pub const OMAP4_PRM_IRQENABLE_MPU_2_OFFSET: u16 = 0x001c;

// Registers of the PRM_DEVICE instance.
pub const OMAP4_PRM_IO_PMCTRL_OFFSET: u16 = 0x0020;

/// Polls allowed for the I/O wakeup clock handshake.
pub const MAX_IOPAD_LATCH_TIME: u32 = 100;

/// PRCM interrupt line on the MPU GIC.
pub const OMAP44XX_IRQ_PRCM: u32 = 43;

register_bitfields![u32,
    IrqStatusMpu [
        ABB_IVA_DONE_ST OFFSET(31) NUMBITS(1) [],
        VP_IVA_TRANXDONE_ST OFFSET(29) NUMBITS(1) [],
        VP_CORE_TRANXDONE_ST OFFSET(21) NUMBITS(1) [],
        IO_ST OFFSET(9) NUMBITS(1) [],
        WKUP_ST OFFSET(0) NUMBITS(1) []
    ],
    IrqStatusMpu2 [
        ABB_MPU_DONE_ST OFFSET(7) NUMBITS(1) [],
        VP_MPU_TRANXDONE_ST OFFSET(5) NUMBITS(1) []
    ],
    IoPmctrl [
        GLOBAL_WUEN OFFSET(16) NUMBITS(1) [],
        WUCLK_STATUS OFFSET(9) NUMBITS(1) [],
        WUCLK_CTRL OFFSET(8) NUMBITS(1) []
    ]
];

/// Where a done flag lives: the IRQSTATUS register and its bit mask.
#[derive(Clone, Copy)]
struct StatusBit {
    irqstatus: u16,
    mask: u32,
}

const fn status_bit<R: kernel::utilities::registers::RegisterLongName>(
    irqstatus: u16,
    field: Field<u32, R>,
) -> StatusBit {
    StatusBit {
        irqstatus,
        mask: field.mask << field.shift,
    }
}

const VP_TRANXDONE: [StatusBit; 3] = [
    status_bit(
        OMAP4_PRM_IRQSTATUS_MPU_2_OFFSET,
        IrqStatusMpu2::VP_MPU_TRANXDONE_ST,
    ),
    status_bit(
        OMAP4_PRM_IRQSTATUS_MPU_OFFSET,
        IrqStatusMpu::VP_IVA_TRANXDONE_ST,
    ),
    status_bit(
        OMAP4_PRM_IRQSTATUS_MPU_OFFSET,
        IrqStatusMpu::VP_CORE_TRANXDONE_ST,
    ),
];

// VDD_CORE has no ABB LDO.
const ABB_DONE: [StatusBit; 2] = [
    status_bit(
        OMAP4_PRM_IRQSTATUS_MPU_2_OFFSET,
        IrqStatusMpu2::ABB_MPU_DONE_ST,
    ),
    status_bit(OMAP4_PRM_IRQSTATUS_MPU_OFFSET, IrqStatusMpu::ABB_IVA_DONE_ST),
];

/// A PRCM event demultiplexed from the PRCM interrupt line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrcmIrq {
    pub name: &'static str,
    /// Bit position in the concatenated IRQSTATUS_MPU / IRQSTATUS_MPU_2 pair.
    pub offset: u8,
    /// Handled before the other events of the same batch.
    pub priority: bool,
}

pub const OMAP4_PRCM_IRQS: [PrcmIrq; 2] = [
    PrcmIrq {
        name: "wkup",
        offset: 0,
        priority: false,
    },
    PrcmIrq {
        name: "io",
        offset: 9,
        priority: true,
    },
];

impl PrcmIrq {
    /// Whether this event is set in `events`, as returned by
    /// [`Prm::read_pending_irqs`].
    pub fn is_pending(&self, events: &[u32; 2]) -> bool {
        let word = usize::from(self.offset / 32);
        events[word] & (1 << (self.offset % 32)) != 0
    }
}

pub struct Prm<'a> {
    inst: &'a PrmInst<'a>,
}

impl<'a> Prm<'a> {
    /// # Errors
    ///
    /// + [Err]\([ErrorCode::INVAL]\): the PRM partition is not mapped.
    pub fn new(inst: &'a PrmInst<'a>) -> Result<Prm<'a>, ErrorCode> {
        if !inst.is_mapped(Partition::Prm) {
            return Err(ErrorCode::INVAL);
        }
        Ok(Prm { inst })
    }

    fn read(&self, inst: i16, offs: u16) -> Result<u32, ErrorCode> {
        self.inst.read_inst_reg(Partition::Prm, inst, offs)
    }

    fn write(&self, val: u32, inst: i16, offs: u16) -> Result<(), ErrorCode> {
        self.inst.write_inst_reg(val, Partition::Prm, inst, offs)
    }

    fn read_ocp(&self, offs: u16) -> Result<u32, ErrorCode> {
        self.read(OMAP4430_PRM_OCP_SOCKET_INST, offs)
    }

    fn write_ocp(&self, val: u32, offs: u16) -> Result<(), ErrorCode> {
        self.write(val, OMAP4430_PRM_OCP_SOCKET_INST, offs)
    }

    fn status_is_set(&self, bit: StatusBit) -> bool {
        self.read_ocp(bit.irqstatus)
            .is_ok_and(|st| st & bit.mask != 0)
    }

    fn clear_status(&self, bit: StatusBit) {
        // Write-one-to-clear.
        if self.write_ocp(bit.mask, bit.irqstatus).is_err() {
            log::error!("PRM: cannot clear status {:#x}", bit.mask);
        }
    }

    fn abb_bit(abb: VpId) -> Result<StatusBit, ErrorCode> {
        ABB_DONE.get(abb as usize).copied().ok_or(ErrorCode::INVAL)
    }

    /// Whether the ABB LDO of `abb` finished its transition.
    ///
    /// # Errors
    ///
    /// + [Err]\([ErrorCode::INVAL]\): `abb` has no ABB LDO.
    pub fn abb_check_txdone(&self, abb: VpId) -> Result<bool, ErrorCode> {
        Ok(self.status_is_set(Self::abb_bit(abb)?))
    }

    /// Acknowledge the ABB done flag of `abb`.
    pub fn abb_clear_txdone(&self, abb: VpId) -> Result<(), ErrorCode> {
        self.clear_status(Self::abb_bit(abb)?);
        Ok(())
    }

    fn pending_irq_reg(&self, irqen_offs: u16, irqst_offs: u16) -> Result<u32, ErrorCode> {
        let mask = self.read_ocp(irqen_offs)?;
        let st = self.read_ocp(irqst_offs)?;
        Ok(mask & st)
    }

    /// Pending PRM MPU events, masked by the enabled ones:
    /// `[IRQSTATUS_MPU, IRQSTATUS_MPU_2]`.
    pub fn read_pending_irqs(&self) -> Result<[u32; 2], ErrorCode> {
        Ok([
            self.pending_irq_reg(OMAP4_PRM_IRQENABLE_MPU_OFFSET, OMAP4_PRM_IRQSTATUS_MPU_OFFSET)?,
            self.pending_irq_reg(
                OMAP4_PRM_IRQENABLE_MPU_2_OFFSET,
                OMAP4_PRM_IRQSTATUS_MPU_2_OFFSET,
            )?,
        ])
    }

    /// Force buffered MPU writes to the PRM to complete.
    pub fn ocp_barrier(&self) -> Result<(), ErrorCode> {
        self.read_ocp(OMAP4_REVISION_PRM_OFFSET).map(|_| ())
    }

    /// Save and clear both IRQENABLE_MPU registers, for the suspend path.
    pub fn save_and_clear_irqen(&self) -> Result<[u32; 2], ErrorCode> {
        let saved = [
            self.read_ocp(OMAP4_PRM_IRQENABLE_MPU_OFFSET)?,
            self.read_ocp(OMAP4_PRM_IRQENABLE_MPU_2_OFFSET)?,
        ];
        self.write_ocp(0, OMAP4_PRM_IRQENABLE_MPU_OFFSET)?;
        self.write_ocp(0, OMAP4_PRM_IRQENABLE_MPU_2_OFFSET)?;
        // Make sure the PRM saw the disable before returning.
        self.ocp_barrier()?;
        Ok(saved)
    }

    /// Restore the IRQENABLE_MPU registers saved by
    /// [`Prm::save_and_clear_irqen`].
    pub fn restore_irqen(&self, saved: &[u32; 2]) -> Result<(), ErrorCode> {
        self.write_ocp(saved[0], OMAP4_PRM_IRQENABLE_MPU_OFFSET)?;
        self.write_ocp(saved[1], OMAP4_PRM_IRQENABLE_MPU_2_OFFSET)
    }

    fn io_pmctrl(&self) -> Result<LocalRegisterCopy<u32, IoPmctrl::Register>, ErrorCode> {
        let v = self.read(self.inst.device_inst(), OMAP4_PRM_IO_PMCTRL_OFFSET)?;
        Ok(LocalRegisterCopy::new(v))
    }

    fn wait_wuclk_status(&self, set: bool) -> Result<bool, ErrorCode> {
        let mut result = Ok(());
        let done = time::poll_timeout(self.inst.delay(), MAX_IOPAD_LATCH_TIME, || {
            match self.io_pmctrl() {
                Ok(reg) => reg.is_set(IoPmctrl::WUCLK_STATUS) == set,
                Err(e) => {
                    result = Err(e);
                    true
                }
            }
        });
        result.map(|()| done.is_some())
    }

    /// Clear latched I/O wakeup events and align the wakeup gates with the
    /// current pad mux settings, by pulsing the I/O wakeup clock.
    ///
    /// On OMAP44xx nothing is done while an I/O wakeup event is pending:
    /// the event handler reconfigures the chain itself once done, and doing
    /// it here would lose the event.
    pub fn reconfigure_io_chain(&self) -> Result<(), ErrorCode> {
        let soc = self.inst.soc();
        if soc.is_omap44xx() {
            let pending: LocalRegisterCopy<u32, IrqStatusMpu::Register> =
                LocalRegisterCopy::new(self.pending_irq_reg(
                    OMAP4_PRM_IRQENABLE_MPU_OFFSET,
                    OMAP4_PRM_IRQSTATUS_MPU_OFFSET,
                )?);
            if pending.is_set(IrqStatusMpu::IO_ST) {
                return Ok(());
            }
        }

        let dev_inst = self.inst.device_inst();
        let wuclk = IoPmctrl::WUCLK_CTRL::SET;

        self.inst.rmw_inst_reg_bits(
            wuclk.mask(),
            wuclk.value,
            Partition::Prm,
            dev_inst,
            OMAP4_PRM_IO_PMCTRL_OFFSET,
        )?;
        if !self.wait_wuclk_status(true)? {
            log::warn!("PRM: I/O chain clock line assertion timed out");
        }

        self.inst.rmw_inst_reg_bits(
            wuclk.mask(),
            0,
            Partition::Prm,
            dev_inst,
            OMAP4_PRM_IO_PMCTRL_OFFSET,
        )?;
        if !self.wait_wuclk_status(false)? {
            log::warn!("PRM: I/O chain clock line deassertion timed out");
        }

        Ok(())
    }

    /// Let the I/O wakeup latches signal wakeup events to the PRCM. Pads
    /// also need WAKEUPENABLE in their mux configuration and a
    /// [`Prm::reconfigure_io_chain`].
    pub fn enable_io_wakeup(&self) -> Result<(), ErrorCode> {
        let wuen = IoPmctrl::GLOBAL_WUEN::SET;
        self.inst
            .rmw_inst_reg_bits(
                wuen.mask(),
                wuen.value,
                Partition::Prm,
                self.inst.device_inst(),
                OMAP4_PRM_IO_PMCTRL_OFFSET,
            )
            .map(|_| ())
    }

    /// PRM initialization at boot.
    ///
    /// Errata i612: the I/O wakeup clock is not recycled on a global warm
    /// reset, so daisy chain wakeups disabled by the reset are never
    /// latched and spurious I/O wakeups may follow. Affected revisions get
    /// the chain reconfigured here.
    pub fn init(&self) -> Result<(), ErrorCode> {
        self.enable_io_wakeup()?;

        if self.inst.soc().has_errata_i612() {
            self.reconfigure_io_chain()?;
        }

        Ok(())
    }
}

impl VpHardwareOps for Prm<'_> {
    fn check_txdone(&self, vp: VpId) -> bool {
        self.status_is_set(VP_TRANXDONE[vp as usize])
    }

    fn clear_txdone(&self, vp: VpId) {
        self.clear_status(VP_TRANXDONE[vp as usize]);
    }
}

/// Register accessor for the VC and VP blocks in the PRM_DEVICE instance.
///
/// Offsets that fall outside the PRM window or are misaligned are logged at
/// error level and the access is dropped; reads of such offsets return 0.
pub struct VcVp<'a> {
    inst: &'a PrmInst<'a>,
    dev_inst: i16,
}

impl<'a> VcVp<'a> {
    fn with_inst(inst: &'a PrmInst<'a>, dev_inst: i16) -> Result<VcVp<'a>, ErrorCode> {
        if !inst.is_mapped(Partition::Prm) {
            return Err(ErrorCode::INVAL);
        }
        Ok(VcVp { inst, dev_inst })
    }

    /// # Errors
    ///
    /// + [Err]\([ErrorCode::INVAL]\): the PRM partition is not mapped.
    pub fn omap4(inst: &'a PrmInst<'a>) -> Result<VcVp<'a>, ErrorCode> {
        VcVp::with_inst(inst, OMAP4430_PRM_DEVICE_INST)
    }

    /// # Errors
    ///
    /// + [Err]\([ErrorCode::INVAL]\): the PRM partition is not mapped.
    pub fn omap5(inst: &'a PrmInst<'a>) -> Result<VcVp<'a>, ErrorCode> {
        VcVp::with_inst(inst, OMAP54XX_PRM_DEVICE_INST)
    }
}

impl VoltageRegisters for VcVp<'_> {
    fn read(&self, offset: u8) -> u32 {
        self.inst
            .read_inst_reg(Partition::Prm, self.dev_inst, u16::from(offset))
            .unwrap_or_else(|_| {
                log::error!("PRM: bad VC/VP register read at {:#04x}", offset);
                0
            })
    }

    fn write(&self, val: u32, offset: u8) {
        if self
            .inst
            .write_inst_reg(val, Partition::Prm, self.dev_inst, u16::from(offset))
            .is_err()
        {
            log::error!("PRM: bad VC/VP register write at {:#04x}", offset);
        }
    }

    fn rmw(&self, mask: u32, bits: u32, offset: u8) -> u32 {
        self.inst
            .rmw_inst_reg_bits(mask, bits, Partition::Prm, self.dev_inst, u16::from(offset))
            .unwrap_or_else(|_| {
                log::error!("PRM: bad VC/VP register rmw at {:#04x}", offset);
                0
            })
    }
}
