// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Power and reset management for TI OMAP4 and OMAP5.
//!
//! - `prminst`: PRCM partition map and raw instance register access,
//!   hard-reset lines and global software resets.
//! - `prm`: PRM module services: VP/ABB transaction-done status, MPU
//!   interrupt helpers, I/O daisy chain, and the VC/VP register accessors.
//! - `vp`: the voltage processor driver, including force-update scaling.
//! - `voltage`: voltage domains and operating points.
//! - `pmic`: linear PMIC descriptions.

#![cfg_attr(not(test), no_std)]
#![crate_name = "omap4"]
#![crate_type = "rlib"]

pub mod pmic;
pub mod prm;
pub mod prminst;
pub mod soc;
pub mod voltage;
pub mod vp;

#[cfg(test)]
mod fakes;
