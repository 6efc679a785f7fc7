// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Voltage domains and operating points.
//!
//! A [`VoltageDomain`] stands for one power rail (VDD_MPU, VDD_IVA,
//! VDD_CORE). It ties together everything the voltage processor code needs
//! for that rail: register access, the PMIC behind the rail, the PRM-side
//! transaction-done operations, the voltage-controller hooks, a delay
//! provider and the chip-wide controlled-error policy.
//!
//! Domains are created once by the board and live forever. Callers must not
//! run two operations on the same domain concurrently.

use kernel::hil::time::BusyWait;
use kernel::hil::voltage::{Pmic, VoltageRegisters};
use kernel::utilities::cells::OptionalCell;
use kernel::ErrorCode;

use crate::vp::{ControlledErrors, VpHardwareOps, VpInstance};

/// An operating point of a voltage domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoltData {
    /// Nominal voltage, in microvolts.
    pub volt_nominal: u32,
    /// Calibrated voltage in microvolts, zero until calibration ran.
    pub volt_calibrated: u32,
    /// Error gain the voltage processor uses at this operating point.
    pub vp_errgain: u8,
}

impl VoltData {
    pub const fn new(volt_nominal: u32, vp_errgain: u8) -> VoltData {
        VoltData {
            volt_nominal,
            volt_calibrated: 0,
            vp_errgain,
        }
    }

    /// The voltage to program: calibrated when available, nominal otherwise.
    pub fn operation_voltage(&self) -> u32 {
        if self.volt_calibrated != 0 {
            self.volt_calibrated
        } else {
            self.volt_nominal
        }
    }
}

/// SoC-side limits of the voltage processor, in microvolts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VpParam {
    pub vddmin: u32,
    pub vddmax: u32,
}

/// Voltage controller levels for the low-power states, in microvolts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VcParam {
    pub on: u32,
    pub onlp: u32,
    pub ret: u32,
    pub off: u32,
}

/// Hooks into the voltage controller (VC) around a force-update scale.
///
/// The VC is a companion IP block of the voltage processor; it owns the
/// channel to the PMIC. The VP code treats it as a black box.
pub trait VoltageController {
    /// Prepare a scale of `voltdm` to `target_uv`.
    ///
    /// Returns `(target_vsel, current_vsel)`. An error aborts the scale
    /// before any voltage processor register is touched.
    fn pre_scale(
        &self,
        voltdm: &VoltageDomain<'_>,
        target_uv: u32,
        target: &VoltData,
    ) -> Result<(u8, u8), ErrorCode>;

    /// Bookkeeping once the voltage processor applied (or gave up on) the
    /// change.
    fn post_scale(
        &self,
        voltdm: &VoltageDomain<'_>,
        target_uv: u32,
        target: &VoltData,
        target_vsel: u8,
        current_vsel: u8,
    );
}

pub struct VoltageDomain<'a> {
    pub(crate) name: &'static str,
    pub(crate) regs: &'a dyn VoltageRegisters,
    pub(crate) ops: &'a dyn VpHardwareOps,
    pub(crate) vc: &'a dyn VoltageController,
    pub(crate) delay: &'a dyn BusyWait,
    pub(crate) errors: &'a ControlledErrors,
    pub(crate) sys_clk_hz: u32,
    vp: OptionalCell<&'a VpInstance>,
    pmic: OptionalCell<&'a dyn Pmic>,
    vp_param: OptionalCell<VpParam>,
    vc_param: OptionalCell<VcParam>,
    curr_volt: OptionalCell<&'a VoltData>,
}

impl<'a> VoltageDomain<'a> {
    pub fn new(
        name: &'static str,
        regs: &'a dyn VoltageRegisters,
        ops: &'a dyn VpHardwareOps,
        vc: &'a dyn VoltageController,
        delay: &'a dyn BusyWait,
        errors: &'a ControlledErrors,
        sys_clk_hz: u32,
    ) -> VoltageDomain<'a> {
        VoltageDomain {
            name,
            regs,
            ops,
            vc,
            delay,
            errors,
            sys_clk_hz,
            vp: OptionalCell::empty(),
            pmic: OptionalCell::empty(),
            vp_param: OptionalCell::empty(),
            vc_param: OptionalCell::empty(),
            curr_volt: OptionalCell::empty(),
        }
    }

    pub fn set_vp(&self, vp: &'a VpInstance) {
        self.vp.set(vp);
    }

    pub fn set_pmic(&self, pmic: &'a dyn Pmic) {
        self.pmic.set(pmic);
    }

    pub fn set_params(&self, vp_param: VpParam, vc_param: VcParam) {
        self.vp_param.set(vp_param);
        self.vc_param.set(vc_param);
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn vp(&self) -> Option<&'a VpInstance> {
        self.vp.and_then(Some)
    }

    pub fn pmic(&self) -> Option<&'a dyn Pmic> {
        self.pmic.and_then(Some)
    }

    pub fn vp_param(&self) -> Option<VpParam> {
        self.vp_param.and_then(Some)
    }

    pub fn vc_param(&self) -> Option<VcParam> {
        self.vc_param.and_then(Some)
    }

    /// The operating point the rail currently runs at, if known.
    pub fn curr_vdata(&self) -> Option<&'a VoltData> {
        self.curr_volt.and_then(Some)
    }

    /// Record the operating point the rail now runs at. Called by the
    /// voltage scaling policy once a scale succeeded.
    pub fn set_curr_vdata(&self, volt: &'a VoltData) {
        self.curr_volt.set(volt);
    }
}

#[cfg(test)]
mod tests {
    use super::VoltData;

    #[test]
    fn operation_voltage_prefers_calibrated() {
        let mut opp = VoltData::new(1_200_000, 0x16);
        assert_eq!(opp.operation_voltage(), 1_200_000);
        opp.volt_calibrated = 1_165_000;
        assert_eq!(opp.operation_voltage(), 1_165_000);
    }
}
