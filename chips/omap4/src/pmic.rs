// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! PMIC outputs with a linear selector-to-voltage mapping.
//!
//! Most SMPS outputs paired with OMAP4/5 map selector codes linearly:
//! `uv = min_uv + (vsel - vsel_offset) * step_uv`. The TWL6030 used on OMAP4
//! boards is one of them, with selector 1 at 607.7 mV (or 709 mV when the
//! SMPS_OFFSET eFuse is programmed) and 12.66 mV steps.

use kernel::hil::voltage::{Pmic, PmicParams};

pub struct LinearPmic {
    min_uv: u32,
    step_uv: u32,
    vsel_offset: u8,
    max_vsel: u8,
    params: PmicParams,
}

impl LinearPmic {
    pub const fn new(
        min_uv: u32,
        step_uv: u32,
        vsel_offset: u8,
        max_vsel: u8,
        params: PmicParams,
    ) -> LinearPmic {
        LinearPmic {
            min_uv,
            step_uv,
            vsel_offset,
            max_vsel,
            params,
        }
    }

    /// TWL6030 SMPS in standard mode. `smps_offset` reflects bit 3 of the
    /// SMPS_OFFSET eFuse, set from TWL6030 ES1.1 onwards.
    pub const fn twl6030(smps_offset: bool, params: PmicParams) -> LinearPmic {
        let min_uv = if smps_offset { 709_000 } else { 607_700 };
        LinearPmic::new(min_uv, 12_660, 1, 0x39, params)
    }
}

/// TWL6030 VDD_MPU limits and ramp timing for OMAP4.
pub const TWL6030_MPU_PARAMS: PmicParams = PmicParams {
    step_size: 12_660,
    slew_rate: 4_000,
    vp_erroroffset: 0x00,
    vp_vstepmin: 0x01,
    vp_vstepmax: 0x04,
    vp_timeout_us: 200,
    vddmin: 830_000,
    vddmax: 1_410_000,
};

/// TWL6030 VDD_IVA limits and ramp timing for OMAP4.
pub const TWL6030_IVA_PARAMS: PmicParams = PmicParams {
    vddmin: 830_000,
    vddmax: 1_260_000,
    ..TWL6030_MPU_PARAMS
};

/// TWL6030 VDD_CORE limits and ramp timing for OMAP4.
pub const TWL6030_CORE_PARAMS: PmicParams = PmicParams {
    vddmin: 830_000,
    vddmax: 1_200_000,
    ..TWL6030_MPU_PARAMS
};

impl Pmic for LinearPmic {
    fn uv_to_vsel(&self, uv: u32) -> u8 {
        let steps = uv.saturating_sub(self.min_uv).div_ceil(self.step_uv);
        let vsel = steps.saturating_add(u32::from(self.vsel_offset));
        vsel.min(u32::from(self.max_vsel)) as u8
    }

    fn vsel_to_uv(&self, vsel: u8) -> u32 {
        let vsel = vsel.min(self.max_vsel);
        if vsel < self.vsel_offset {
            return 0;
        }
        self.min_uv + u32::from(vsel - self.vsel_offset) * self.step_uv
    }

    fn params(&self) -> &PmicParams {
        &self.params
    }
}
