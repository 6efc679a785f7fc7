// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Core power-management kernel support.
//!
//! The kernel crate holds the code shared by every chip crate: the standard
//! error enum, compile-time configuration, rate-limited diagnostics, a few
//! utilities for memory-mapped registers, and the Hardware Interface Layer
//! (HIL) traits that chip drivers implement and consume.
//!
//! Chip crates (for example `omap4`) implement the HIL traits for concrete
//! register maps. Anything that only makes sense for one SoC family lives in
//! that chip crate instead.

#![cfg_attr(not(test), no_std)]

pub mod config;
#[macro_use]
pub mod debug;
pub mod errorcode;
pub mod hil;
pub mod utilities;

pub use crate::errorcode::ErrorCode;

// Re-exported so the diagnostic macros can name the facade from any crate.
#[doc(hidden)]
pub use log;
