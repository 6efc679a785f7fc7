// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Voltage processor (VP).
//!
//! Each of the MPU, IVA and CORE rails has a voltage processor in the PRM
//! that ramps the rail toward a programmed selector and raises a
//! transaction-done (TRANXDONE) status bit once the PMIC acknowledged the
//! change. This module implements:
//!
//! - VP programming at boot ([`VoltageDomain::vp_init`]),
//! - the force-update scaling sequence
//!   ([`VoltageDomain::vp_forceupdate_scale`]),
//! - enabling and disabling the VP for closed-loop (SmartReflex) operation,
//! - the controlled-error policy shared by every VP of the chip.
//!
//! All waits are bounded busy-polls with 1 us between attempts.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let vp_mpu = VpInstance::new(VpId::Mpu, vp::OMAP4_VP_MPU_OFFSETS);
//!
//! let vdd_mpu = VoltageDomain::new(
//!     "mpu", &vcvp, &prm, &vc, &delay, &vp::VP_CONTROLLED_ERRORS, 38_400_000,
//! );
//! vdd_mpu.set_vp(&vp_mpu);
//! vdd_mpu.set_pmic(&twl6030_mpu);
//! vdd_mpu.set_params(vp_param, vc_param);
//! vdd_mpu.vp_init()?;
//! vdd_mpu.vp_forceupdate_scale(&OPP100)?;
//! ```

use core::cell::Cell;
use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use kernel::config::CONFIG;
use kernel::debug::{self, RateLimit};
use kernel::hil::time;
use kernel::utilities::registers::{register_bitfields, LocalRegisterCopy};
use kernel::ErrorCode;

use crate::voltage::{VoltData, VoltageDomain};

/// Polls allowed for the VP to report idle.
pub const VP_IDLE_TIMEOUT: u32 = 200;
/// Polls allowed for TRANXDONE to set or clear.
pub const VP_TRANXDONE_TIMEOUT: u32 = 300;
/// Controlled errors after which the recovery hook runs.
pub const MAX_RETRIES_BEFORE_RECOVER: u8 = 50;
/// Controlled errors reported in full before rate limiting kicks in.
pub const MAX_COUNT_ERR: u8 = 10;

register_bitfields![u32,
    VpConfig [
        ERROROFFSET OFFSET(24) NUMBITS(8) [],
        ERRORGAIN OFFSET(16) NUMBITS(8) [],
        INITVOLTAGE OFFSET(8) NUMBITS(8) [],
        TIMEOUTEN OFFSET(3) NUMBITS(1) [],
        INITVDD OFFSET(2) NUMBITS(1) [],
        FORCEUPDATE OFFSET(1) NUMBITS(1) [],
        VPENABLE OFFSET(0) NUMBITS(1) []
    ],
    VpStatus [
        VPINIDLE OFFSET(0) NUMBITS(1) []
    ],
    VpVstepMin [
        SMPSWAITTIMEMIN OFFSET(8) NUMBITS(16) [],
        VSTEPMIN OFFSET(0) NUMBITS(8) []
    ],
    VpVstepMax [
        SMPSWAITTIMEMAX OFFSET(8) NUMBITS(16) [],
        VSTEPMAX OFFSET(0) NUMBITS(8) []
    ],
    VpVlimitto [
        VDDMAX OFFSET(24) NUMBITS(8) [],
        VDDMIN OFFSET(16) NUMBITS(8) [],
        TIMEOUT OFFSET(0) NUMBITS(16) []
    ],
    VpVoltage [
        VPVOLTAGE OFFSET(0) NUMBITS(8) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VpId {
    Mpu = 0,
    Iva = 1,
    Core = 2,
}

/// Register offsets of one VP, relative to the block its voltage domain's
/// register accessor addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VpOffsets {
    pub config: u8,
    pub vstepmin: u8,
    pub vstepmax: u8,
    pub vlimitto: u8,
    pub status: u8,
    pub voltage: u8,
}

// OMAP4 VP registers, relative to the PRM_DEVICE instance.
pub const OMAP4_VP_CORE_OFFSETS: VpOffsets = VpOffsets {
    config: 0x40,
    vstepmin: 0x44,
    vstepmax: 0x48,
    vlimitto: 0x4c,
    status: 0x50,
    voltage: 0x54,
};

pub const OMAP4_VP_MPU_OFFSETS: VpOffsets = VpOffsets {
    config: 0x58,
    vstepmin: 0x5c,
    vstepmax: 0x60,
    vlimitto: 0x64,
    status: 0x68,
    voltage: 0x6c,
};

pub const OMAP4_VP_IVA_OFFSETS: VpOffsets = VpOffsets {
    config: 0x70,
    vstepmin: 0x74,
    vstepmax: 0x78,
    vlimitto: 0x7c,
    status: 0x80,
    voltage: 0x84,
};

pub struct VpInstance {
    id: VpId,
    offsets: VpOffsets,
    enabled: Cell<bool>,
}

impl VpInstance {
    pub const fn new(id: VpId, offsets: VpOffsets) -> VpInstance {
        VpInstance {
            id,
            offsets,
            enabled: Cell::new(false),
        }
    }

    pub fn id(&self) -> VpId {
        self.id
    }

    pub fn offsets(&self) -> &VpOffsets {
        &self.offsets
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

/// PRM-side operations on a VP: the TRANXDONE status bit and an optional
/// recovery hook.
pub trait VpHardwareOps {
    /// Whether TRANXDONE is set for `vp`.
    fn check_txdone(&self, vp: VpId) -> bool;

    /// Acknowledge TRANXDONE for `vp`.
    fn clear_txdone(&self, vp: VpId);

    /// Whether [`VpHardwareOps::recover`] does anything.
    fn can_recover(&self) -> bool {
        false
    }

    /// Try to bring a misbehaving VP back to a sane state.
    fn recover(&self, _vp: VpId) {}
}

/// Error reporting for the VP paths that time out.
///
/// The first [`MAX_COUNT_ERR`] errors are logged with a call trace, later
/// ones through a rate limiter. Independently, if the hardware can recover,
/// every [`MAX_RETRIES_BEFORE_RECOVER`] errors trigger a recovery.
///
/// The counters are not per domain: one instance is shared by all VPs of
/// the chip, see [`VP_CONTROLLED_ERRORS`].
pub struct ControlledErrors {
    messages_left: AtomicU8,
    recover_countdown: AtomicU8,
    ratelimit: RateLimit,
}

impl ControlledErrors {
    pub const fn new() -> ControlledErrors {
        ControlledErrors {
            messages_left: AtomicU8::new(MAX_COUNT_ERR),
            recover_countdown: AtomicU8::new(MAX_RETRIES_BEFORE_RECOVER),
            ratelimit: RateLimit::default_limits(),
        }
    }

    #[track_caller]
    pub fn report(&self, domain: &str, vp: VpId, ops: &dyn VpHardwareOps, args: fmt::Arguments) {
        let verbose = self
            .messages_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if verbose {
            log::error!("{}", args);
            debug::dump_stack();
        } else if self.ratelimit.allow() {
            log::error!("{}", args);
        }

        if ops.can_recover() && self.recover_countdown.fetch_sub(1, Ordering::Relaxed) == 1 {
            log::error!("domain {} recovery count triggered", domain);
            ops.recover(vp);
            self.recover_countdown
                .store(MAX_RETRIES_BEFORE_RECOVER, Ordering::Relaxed);
        }
    }

    /// Errors left before the next recovery.
    pub fn recover_countdown(&self) -> u8 {
        self.recover_countdown.load(Ordering::Relaxed)
    }

    /// Errors left that are still reported with a call trace.
    pub fn messages_left(&self) -> u8 {
        self.messages_left.load(Ordering::Relaxed)
    }
}

impl Default for ControlledErrors {
    fn default() -> ControlledErrors {
        ControlledErrors::new()
    }
}

/// The controlled-error state shared by all VPs of the chip.
pub static VP_CONTROLLED_ERRORS: ControlledErrors = ControlledErrors::new();

impl<'a> VoltageDomain<'a> {
    fn vp_or_inval(&self) -> Result<&'a VpInstance, ErrorCode> {
        self.vp().ok_or_else(|| {
            log::error!("no VP info for vdd_{}", self.name);
            ErrorCode::INVAL
        })
    }

    #[track_caller]
    fn vp_controlled_err(&self, vp: &VpInstance, args: fmt::Arguments) {
        self.errors.report(self.name, vp.id, self.ops, args);
    }

    /// Program the VP from the PMIC and SoC limits. Leaves the VP disabled.
    ///
    /// # Errors
    ///
    /// + [Err]\([ErrorCode::INVAL]\): the domain has no VP, no PMIC or no
    ///   VP/VC parameters, or the PMIC slew rate is zero.
    pub fn vp_init(&self) -> Result<(), ErrorCode> {
        let vp = self.vp_or_inval()?;
        let pmic = self.pmic().ok_or(ErrorCode::INVAL)?;
        let vp_param = self.vp_param().ok_or(ErrorCode::INVAL)?;
        let vc_param = self.vc_param().ok_or(ErrorCode::INVAL)?;
        let p = pmic.params();
        if p.slew_rate == 0 {
            return Err(ErrorCode::INVAL);
        }

        vp.enabled.set(false);

        let sys_khz = u64::from(self.sys_clk_hz / 1000);
        let timeout = sys_khz * u64::from(p.vp_timeout_us) / 1000;
        let vddmin = pmic.uv_to_vsel(vp_param.vddmin.max(p.vddmin).max(vc_param.ret));
        let vddmax = pmic.uv_to_vsel(vp_param.vddmax.min(p.vddmax));
        let waittime = (u64::from(p.step_size) * sys_khz).div_ceil(1000 * u64::from(p.slew_rate));
        // Both fields are 16 bits wide; saturate instead of wrapping.
        let timeout = timeout.min(0xffff) as u32;
        let waittime = waittime.min(0xffff) as u32;

        let offs = &vp.offsets;
        let config = VpConfig::ERROROFFSET.val(u32::from(p.vp_erroroffset)) + VpConfig::TIMEOUTEN::SET;
        self.regs.write(config.value, offs.config);

        let vstepmin = VpVstepMin::SMPSWAITTIMEMIN.val(waittime)
            + VpVstepMin::VSTEPMIN.val(u32::from(p.vp_vstepmin));
        self.regs.write(vstepmin.value, offs.vstepmin);

        let vstepmax = VpVstepMax::SMPSWAITTIMEMAX.val(waittime)
            + VpVstepMax::VSTEPMAX.val(u32::from(p.vp_vstepmax));
        self.regs.write(vstepmax.value, offs.vstepmax);

        let vlimitto = VpVlimitto::VDDMAX.val(u32::from(vddmax))
            + VpVlimitto::VDDMIN.val(u32::from(vddmin))
            + VpVlimitto::TIMEOUT.val(timeout);
        self.regs.write(vlimitto.value, offs.vlimitto);

        Ok(())
    }

    /// The voltage the VP currently drives, in microvolts.
    ///
    /// `None` if the domain has no VP or no PMIC.
    pub fn vp_get_curr_volt(&self) -> Option<u32> {
        let vp = self.vp()?;
        let pmic = self.pmic()?;
        let voltage: LocalRegisterCopy<u32, VpVoltage::Register> =
            LocalRegisterCopy::new(self.regs.read(vp.offsets.voltage));
        Some(pmic.vsel_to_uv(voltage.read(VpVoltage::VPVOLTAGE) as u8))
    }

    pub fn vp_is_transdone(&self) -> Result<bool, ErrorCode> {
        let vp = self.vp_or_inval()?;
        Ok(self.ops.check_txdone(vp.id))
    }

    pub fn vp_clear_transdone(&self) -> Result<(), ErrorCode> {
        let vp = self.vp_or_inval()?;
        self.ops.clear_txdone(vp.id);
        Ok(())
    }

    /// Set the VP error gain for the operating point `target`.
    pub fn vp_update_errorgain(&self, target: &VoltData) -> Result<(), ErrorCode> {
        let vp = self.vp_or_inval()?;
        let gain = VpConfig::ERRORGAIN.val(u32::from(target.vp_errgain));
        self.regs.rmw(gain.mask(), gain.value, vp.offsets.config);
        Ok(())
    }

    #[track_caller]
    fn vp_wait_for_idle(&self, vp: &VpInstance) -> Result<(), ErrorCode> {
        let idle = time::poll_timeout(self.delay, VP_IDLE_TIMEOUT, || {
            let status: LocalRegisterCopy<u32, VpStatus::Register> =
                LocalRegisterCopy::new(self.regs.read(vp.offsets.status));
            status.is_set(VpStatus::VPINIDLE)
        });
        match idle {
            Some(_) => Ok(()),
            None => {
                kernel::warn_ratelimited!("vdd_{} idle timedout", self.name);
                kernel::warn_once!("vdd_{} idle timedout", self.name);
                Err(ErrorCode::TIMEDOUT)
            }
        }
    }

    /// Program the initial voltage selector and pulse INITVDD so the VP
    /// takes it over. Returns the config value left in the register.
    fn vp_set_init_voltage(
        &self,
        vp: &VpInstance,
        volt: u32,
    ) -> Result<LocalRegisterCopy<u32, VpConfig::Register>, ErrorCode> {
        let pmic = self.pmic().ok_or(ErrorCode::INVAL)?;
        let vsel = pmic.uv_to_vsel(volt);

        let mut config: LocalRegisterCopy<u32, VpConfig::Register> =
            LocalRegisterCopy::new(self.regs.read(vp.offsets.config));
        config.modify(
            VpConfig::INITVOLTAGE.val(u32::from(vsel))
                + VpConfig::FORCEUPDATE::CLEAR
                + VpConfig::INITVDD::CLEAR,
        );
        self.regs.write(config.get(), vp.offsets.config);

        let mut trigger = config;
        trigger.modify(VpConfig::INITVDD::SET);
        self.regs.write(trigger.get(), vp.offsets.config);

        self.regs.write(config.get(), vp.offsets.config);

        Ok(config)
    }

    /// Clear TRANXDONE and check that it stays clear. Returns whether it
    /// did within the poll budget.
    fn vp_flush_txdone(&self, vp: &VpInstance) -> bool {
        time::poll_timeout(self.delay, VP_TRANXDONE_TIMEOUT, || {
            self.ops.clear_txdone(vp.id);
            !self.ops.check_txdone(vp.id)
        })
        .is_some()
    }

    /// Scale the rail to `target` with a VP force update.
    ///
    /// Once the new voltage has been written, TRANXDONE timeouts are
    /// reported as controlled errors but do not fail the call: the hardware
    /// has been told to move and the VC bookkeeping must follow.
    ///
    /// # Errors
    ///
    /// + [Err]\([ErrorCode::INVAL]\): the domain has no VP or no PMIC.
    /// + [Err]\([ErrorCode::TIMEDOUT]\): the VP never went idle, or a stale
    ///   TRANXDONE could not be cleared. No VP register was written.
    /// + Any error returned by the VC pre-scale hook.
    pub fn vp_forceupdate_scale(&self, target: &VoltData) -> Result<(), ErrorCode> {
        let vp = self.vp_or_inval()?;
        if self.pmic().is_none() {
            log::error!("no PMIC info for vdd_{}", self.name);
            return Err(ErrorCode::INVAL);
        }
        let target_volt = target.operation_voltage();

        if let Err(e) = self.vp_wait_for_idle(vp) {
            self.vp_controlled_err(
                vp,
                format_args!("vdd_{} idle timedout (v={})", self.name, target_volt),
            );
            return Err(e);
        }

        let (target_vsel, current_vsel) = self.vc.pre_scale(self, target_volt, target)?;

        if CONFIG.trace_voltage_scaling {
            log::debug!(
                "vdd_{}: force update to {} uV (vsel {:#04x} -> {:#04x})",
                self.name,
                target_volt,
                current_vsel,
                target_vsel
            );
        }

        // Typical latency is under 3 us.
        if !self.vp_flush_txdone(vp) {
            self.vp_controlled_err(
                vp,
                format_args!(
                    "vdd_{} TRANXDONE timeout exceeded. Voltage change aborted target volt={}, target vsel={:#04x}, current_vsel={:#04x}",
                    self.name, target_volt, target_vsel, current_vsel
                ),
            );
            return Err(ErrorCode::TIMEDOUT);
        }

        let config = self.vp_set_init_voltage(vp, target_volt)?;

        let mut force = config;
        force.modify(VpConfig::FORCEUPDATE::SET);
        self.regs.write(force.get(), vp.offsets.config);

        // Typical latency is under 200 us, depending on SMPSWAITTIMEMIN/MAX
        // and the size of the step.
        if time::poll_timeout(self.delay, VP_TRANXDONE_TIMEOUT, || {
            self.ops.check_txdone(vp.id)
        })
        .is_none()
        {
            self.vp_controlled_err(
                vp,
                format_args!(
                    "vdd_{} TRANXDONE timeout exceeded. TRANXDONE never got set after the voltage update. target volt={}, target vsel={:#04x}, current_vsel={:#04x}",
                    self.name, target_volt, target_vsel, current_vsel
                ),
            );
        }

        self.vc
            .post_scale(self, target_volt, target, target_vsel, current_vsel);

        if !self.vp_flush_txdone(vp) {
            self.vp_controlled_err(
                vp,
                format_args!(
                    "vdd_{} TRANXDONE timeout exceeded while trying to clear the TRANXDONE status. target volt={}, target vsel={:#04x}, current_vsel={:#04x}",
                    self.name, target_volt, target_vsel, current_vsel
                ),
            );
        }

        self.regs.write(config.get(), vp.offsets.config);

        Ok(())
    }

    /// Enable the VP at the domain's current operating point. Enabling an
    /// enabled VP does nothing.
    ///
    /// # Errors
    ///
    /// + [Err]\([ErrorCode::INVAL]\): the domain has no VP, no PMIC, or no
    ///   current operating point.
    pub fn vp_enable(&self) -> Result<(), ErrorCode> {
        let vp = self.vp_or_inval()?;
        if vp.enabled.get() {
            return Ok(());
        }

        let volt = match self.curr_vdata() {
            Some(volt) => volt,
            None => {
                log::warn!("unable to find current voltage for {}", self.name);
                return Err(ErrorCode::INVAL);
            }
        };

        let mut config = self.vp_set_init_voltage(vp, volt.operation_voltage())?;
        config.modify(VpConfig::VPENABLE::SET);
        self.regs.write(config.get(), vp.offsets.config);

        vp.enabled.set(true);
        Ok(())
    }

    /// Disable the VP. Idle waits around the change are best effort: a
    /// timeout is logged and the VP is disabled anyway.
    ///
    /// # Errors
    ///
    /// + [Err]\([ErrorCode::INVAL]\): the domain has no VP.
    pub fn vp_disable(&self) -> Result<(), ErrorCode> {
        let vp = self.vp_or_inval()?;
        if !vp.enabled.get() {
            log::warn!("trying to disable VP for vdd_{} when it is already disabled", self.name);
            return Ok(());
        }

        if self.vp_wait_for_idle(vp).is_err() {
            log::warn!("vdd_{} timedout waiting for VP idle before disable", self.name);
        }

        let mut config: LocalRegisterCopy<u32, VpConfig::Register> =
            LocalRegisterCopy::new(self.regs.read(vp.offsets.config));
        config.modify(VpConfig::VPENABLE::CLEAR);
        self.regs.write(config.get(), vp.offsets.config);

        if self.vp_wait_for_idle(vp).is_err() {
            log::warn!("vdd_{} timedout after VP disable", self.name);
        }

        vp.enabled.set(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::hil::voltage::Pmic;

    use crate::fakes::{CountingDelay, FakeVc, FakeVpHardware};
    use crate::pmic::{LinearPmic, TWL6030_MPU_PARAMS};
    use crate::voltage::{VcParam, VpParam};

    const CFG: u8 = OMAP4_VP_MPU_OFFSETS.config;
    const FORCE: u32 = 1 << 1;
    const INITVDD: u32 = 1 << 2;

    struct Rig {
        hw: FakeVpHardware,
        vc: FakeVc,
        delay: CountingDelay,
        errors: ControlledErrors,
        pmic: LinearPmic,
        vp: VpInstance,
    }

    impl Rig {
        fn new() -> Rig {
            Rig {
                hw: FakeVpHardware::new(CFG, OMAP4_VP_MPU_OFFSETS.status, FORCE),
                vc: FakeVc::new(0x20),
                delay: CountingDelay::new(),
                errors: ControlledErrors::new(),
                pmic: LinearPmic::twl6030(false, TWL6030_MPU_PARAMS),
                vp: VpInstance::new(VpId::Mpu, OMAP4_VP_MPU_OFFSETS),
            }
        }

        fn domain(&self) -> VoltageDomain<'_> {
            let d = VoltageDomain::new(
                "mpu",
                &self.hw,
                &self.hw,
                &self.vc,
                &self.delay,
                &self.errors,
                38_400_000,
            );
            d.set_vp(&self.vp);
            d.set_pmic(&self.pmic);
            d
        }
    }

    const OPP100: VoltData = VoltData::new(1_100_000, 0x16);

    #[test]
    fn forceupdate_write_pattern() {
        let rig = Rig::new();
        rig.hw.preset(CFG, 0x0000_0009);
        let d = rig.domain();

        assert_eq!(d.vp_forceupdate_scale(&OPP100), Ok(()));

        let vsel = u32::from(rig.pmic.uv_to_vsel(1_100_000));
        let cfg = 0x0000_0009 | (vsel << 8);
        assert_eq!(
            rig.hw.writes_to(CFG),
            [cfg, cfg | INITVDD, cfg, cfg | FORCE, cfg]
        );
        assert_eq!(rig.hw.writes().len(), 5);
        assert_eq!(rig.vc.pre.get(), 1);
        assert_eq!(*rig.vc.post.borrow(), [(1_100_000, vsel as u8, 0x20)]);
        assert_eq!(rig.errors.recover_countdown(), MAX_RETRIES_BEFORE_RECOVER);
    }

    #[test]
    fn forceupdate_uses_calibrated_voltage() {
        let rig = Rig::new();
        let d = rig.domain();
        let mut opp = OPP100;
        opp.volt_calibrated = 1_050_000;

        assert_eq!(d.vp_forceupdate_scale(&opp), Ok(()));
        assert_eq!(rig.vc.post.borrow()[0].0, 1_050_000);
    }

    #[test]
    fn forceupdate_stuck_idle_aborts_without_writes() {
        let rig = Rig::new();
        rig.hw.set_behaviour(|b| b.idle = false);
        let d = rig.domain();

        assert_eq!(d.vp_forceupdate_scale(&OPP100), Err(ErrorCode::TIMEDOUT));
        assert!(rig.hw.writes().is_empty());
        assert_eq!(rig.vc.pre.get(), 0);
        assert_eq!(rig.delay.total_us(), VP_IDLE_TIMEOUT);
        assert_eq!(rig.errors.recover_countdown(), MAX_RETRIES_BEFORE_RECOVER - 1);
    }

    #[test]
    fn forceupdate_stale_txdone_aborts_without_writes() {
        let rig = Rig::new();
        rig.hw.raise_txdone();
        rig.hw.set_behaviour(|b| b.stuck_txdone = true);
        let d = rig.domain();

        assert_eq!(d.vp_forceupdate_scale(&OPP100), Err(ErrorCode::TIMEDOUT));
        assert!(rig.hw.writes().is_empty());
        assert_eq!(rig.vc.pre.get(), 1);
        assert!(rig.vc.post.borrow().is_empty());
    }

    #[test]
    fn forceupdate_missing_txdone_is_not_fatal() {
        let rig = Rig::new();
        rig.hw.set_behaviour(|b| b.ack_force_update = false);
        let d = rig.domain();

        assert_eq!(d.vp_forceupdate_scale(&OPP100), Ok(()));
        assert_eq!(rig.vc.post.borrow().len(), 1);
        let writes = rig.hw.writes_to(CFG);
        assert_eq!(writes.len(), 5);
        assert_eq!(writes[3] & FORCE, FORCE);
        assert_eq!(writes[4] & FORCE, 0);
        assert_eq!(rig.errors.recover_countdown(), MAX_RETRIES_BEFORE_RECOVER - 1);
    }

    #[test]
    fn forceupdate_txdone_stuck_after_update_is_not_fatal() {
        let rig = Rig::new();
        rig.hw.set_behaviour(|b| b.stuck_txdone = true);
        let d = rig.domain();

        assert_eq!(d.vp_forceupdate_scale(&OPP100), Ok(()));
        assert_eq!(rig.vc.post.borrow().len(), 1);
        let writes = rig.hw.writes_to(CFG);
        assert_eq!(writes.len(), 5);
        assert_eq!(writes[3] & FORCE, FORCE);
        // FORCEUPDATE is dropped even though the flag never cleared.
        assert_eq!(writes[4] & FORCE, 0);
        assert_eq!(rig.delay.total_us(), VP_TRANXDONE_TIMEOUT);
        assert_eq!(rig.errors.recover_countdown(), MAX_RETRIES_BEFORE_RECOVER - 1);
    }

    #[test]
    fn forceupdate_pre_scale_error_propagates() {
        let rig = Rig::new();
        rig.vc.fail_pre.set(Some(ErrorCode::NOSUPPORT));
        let d = rig.domain();

        assert_eq!(d.vp_forceupdate_scale(&OPP100), Err(ErrorCode::NOSUPPORT));
        assert!(rig.hw.writes().is_empty());
    }

    #[test]
    fn missing_vp_or_pmic_is_inval() {
        let rig = Rig::new();
        let d = VoltageDomain::new(
            "iva",
            &rig.hw,
            &rig.hw,
            &rig.vc,
            &rig.delay,
            &rig.errors,
            38_400_000,
        );
        assert_eq!(d.vp_forceupdate_scale(&OPP100), Err(ErrorCode::INVAL));
        assert_eq!(d.vp_enable(), Err(ErrorCode::INVAL));
        assert_eq!(d.vp_disable(), Err(ErrorCode::INVAL));
        assert_eq!(d.vp_init(), Err(ErrorCode::INVAL));
        assert_eq!(d.vp_get_curr_volt(), None);

        d.set_vp(&rig.vp);
        assert_eq!(d.vp_forceupdate_scale(&OPP100), Err(ErrorCode::INVAL));
        assert_eq!(d.vp_get_curr_volt(), None);
        assert!(rig.hw.writes().is_empty());
    }

    #[test]
    fn recovery_after_repeated_errors() {
        let rig = Rig::new();
        rig.hw.set_behaviour(|b| b.idle = false);
        let d = rig.domain();

        for _ in 0..MAX_RETRIES_BEFORE_RECOVER - 1 {
            assert_eq!(d.vp_forceupdate_scale(&OPP100), Err(ErrorCode::TIMEDOUT));
        }
        assert_eq!(rig.hw.recoveries(), 0);
        assert_eq!(rig.errors.recover_countdown(), 1);
        assert_eq!(rig.errors.messages_left(), 0);

        assert_eq!(d.vp_forceupdate_scale(&OPP100), Err(ErrorCode::TIMEDOUT));
        assert_eq!(rig.hw.recoveries(), 1);
        assert_eq!(rig.errors.recover_countdown(), MAX_RETRIES_BEFORE_RECOVER);
    }

    #[test]
    fn no_recovery_without_hook() {
        let rig = Rig::new();
        rig.hw.set_behaviour(|b| {
            b.idle = false;
            b.can_recover = false;
        });
        let d = rig.domain();

        for _ in 0..MAX_RETRIES_BEFORE_RECOVER {
            let _ = d.vp_forceupdate_scale(&OPP100);
        }
        assert_eq!(rig.hw.recoveries(), 0);
        assert_eq!(rig.errors.recover_countdown(), MAX_RETRIES_BEFORE_RECOVER);
    }

    #[test]
    fn enable_is_idempotent() {
        let rig = Rig::new();
        let d = rig.domain();
        d.set_curr_vdata(&OPP100);

        assert_eq!(d.vp_enable(), Ok(()));
        assert!(rig.vp.is_enabled());
        let writes = rig.hw.writes_to(CFG);
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[3] & 1, 1);

        rig.hw.clear_log();
        assert_eq!(d.vp_enable(), Ok(()));
        assert!(rig.hw.writes().is_empty());
    }

    #[test]
    fn enable_without_current_voltage() {
        let rig = Rig::new();
        let d = rig.domain();

        assert_eq!(d.vp_enable(), Err(ErrorCode::INVAL));
        assert!(!rig.vp.is_enabled());
        assert!(rig.hw.writes().is_empty());
    }

    #[test]
    fn disable_when_disabled_does_nothing() {
        let rig = Rig::new();
        let d = rig.domain();

        assert_eq!(d.vp_disable(), Ok(()));
        assert!(rig.hw.writes().is_empty());
    }

    #[test]
    fn disable_clears_enable_even_if_busy() {
        let rig = Rig::new();
        let d = rig.domain();
        d.set_curr_vdata(&OPP100);
        d.vp_enable().unwrap();
        rig.hw.clear_log();
        rig.hw.set_behaviour(|b| b.idle = false);

        assert_eq!(d.vp_disable(), Ok(()));
        assert!(!rig.vp.is_enabled());
        let writes = rig.hw.writes_to(CFG);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0] & 1, 0);
        // Best-effort waits are not controlled errors.
        assert_eq!(rig.errors.recover_countdown(), MAX_RETRIES_BEFORE_RECOVER);
    }

    #[test]
    fn init_programs_limits() {
        let rig = Rig::new();
        let d = rig.domain();
        d.set_params(
            VpParam {
                vddmin: 750_000,
                vddmax: 1_375_000,
            },
            VcParam {
                on: 1_375_000,
                onlp: 1_375_000,
                ret: 837_500,
                off: 0,
            },
        );
        rig.vp.enabled.set(true);

        assert_eq!(d.vp_init(), Ok(()));
        assert!(!rig.vp.is_enabled());

        let offs = OMAP4_VP_MPU_OFFSETS;
        // 38400 kHz * 200 us / 1000
        let timeout = 7680;
        // ceil(12660 * 38400 / (1000 * 4000))
        let waittime = 122;
        let vddmin = u32::from(rig.pmic.uv_to_vsel(837_500));
        let vddmax = u32::from(rig.pmic.uv_to_vsel(1_375_000));

        assert_eq!(rig.hw.reg(offs.config), 1 << 3);
        assert_eq!(rig.hw.reg(offs.vstepmin), (waittime << 8) | 1);
        assert_eq!(rig.hw.reg(offs.vstepmax), (waittime << 8) | 4);
        assert_eq!(
            rig.hw.reg(offs.vlimitto),
            (vddmax << 24) | (vddmin << 16) | timeout
        );
    }

    #[test]
    fn init_requires_params() {
        let rig = Rig::new();
        let d = rig.domain();
        assert_eq!(d.vp_init(), Err(ErrorCode::INVAL));
        assert!(rig.hw.writes().is_empty());
    }

    #[test]
    fn errorgain_update_is_rmw() {
        let rig = Rig::new();
        rig.hw.preset(CFG, 0xff00_0f09);
        let d = rig.domain();

        assert_eq!(d.vp_update_errorgain(&VoltData::new(1_300_000, 0x27)), Ok(()));
        assert_eq!(rig.hw.reg(CFG), 0xff27_0f09);
    }

    #[test]
    fn current_voltage_from_register() {
        let rig = Rig::new();
        rig.hw.preset(OMAP4_VP_MPU_OFFSETS.voltage, 0xab00_0028);
        let d = rig.domain();

        assert_eq!(d.vp_get_curr_volt(), Some(rig.pmic.vsel_to_uv(0x28)));
    }

    #[test]
    fn transdone_accessors() {
        let rig = Rig::new();
        let d = rig.domain();
        rig.hw.raise_txdone();
        assert_eq!(d.vp_is_transdone(), Ok(true));
        assert_eq!(d.vp_clear_transdone(), Ok(()));
        assert_eq!(d.vp_is_transdone(), Ok(false));
    }
}
