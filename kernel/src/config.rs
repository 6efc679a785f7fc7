// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Data structure for storing compile-time configuration options.
//!
//! Configuration is a typed `const` object rather than scattered
//! `#[cfg(feature = ...)]` blocks. All code paths stay type-checked, even the
//! disabled ones, and after type-checking the compiler folds the constants so
//! a disabled branch costs nothing in the final binary.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, enable the matching Cargo feature on the
/// kernel crate; the values are collected in the `CONFIG` constant below.
pub struct Config {
    /// Whether controlled errors and one-time warnings also log the call site
    /// that raised them.
    ///
    /// Disabling this (feature `no_debug_stack_dumps`) keeps the messages but
    /// drops the trace lines, which is useful on consoles that are slow enough
    /// for the extra output to perturb timing.
    pub debug_stack_dumps: bool,

    /// Whether every force-update voltage scale is traced at debug level,
    /// including the selector codes handed back by the voltage controller.
    pub trace_voltage_scaling: bool,
}

/// The unique instance of `Config` where compile-time configuration options
/// are defined. This is the only place where `#[cfg(x)]`-style feature checks
/// are permitted.
pub const CONFIG: Config = Config {
    debug_stack_dumps: !cfg!(feature = "no_debug_stack_dumps"),
    trace_voltage_scaling: cfg!(feature = "trace_voltage_scaling"),
};
