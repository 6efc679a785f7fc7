// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Support for diagnostics from hardware sequencing code.
//!
//! Output goes through the `log` facade; the board decides where it ends up.
//! Polling loops that fail tend to fail over and over again, so this module
//! adds the throttling those paths need:
//!
//! - [`RateLimit`]: lets a burst of messages through per window of calls and
//!   reports how many were swallowed when the next window opens.
//! - [`warn_ratelimited!`] / [`error_ratelimited!`]: per-call-site limiters.
//! - [`warn_once!`]: a warning plus call-site trace, printed once per site.
//! - [`dump_stack`]: logs the call site that raised a problem.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! kernel::warn_ratelimited!("vdd_{} idle timedout", name);
//! kernel::warn_once!("vdd_{} idle timedout", name);
//! ```
//!
//! There is no wall clock at this layer. Windows are counted in calls, not in
//! time: a busy failure path reaches the next window sooner than a quiet one,
//! which is the behaviour wanted for log flooding anyway.

use core::panic::Location;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::CONFIG;

/// Messages allowed per window by the call-site macros.
pub const DEFAULT_RATELIMIT_BURST: u32 = 10;
/// Calls per window for the call-site macros.
pub const DEFAULT_RATELIMIT_INTERVAL: u32 = 100;

/// Count-windowed message limiter.
///
/// Atomics are used only so the limiter can sit in a `static`; callers are
/// still expected to be serialized.
pub struct RateLimit {
    burst: u32,
    interval: u32,
    calls: AtomicU32,
    missed: AtomicU32,
}

impl RateLimit {
    /// Creates a limiter letting `burst` messages through out of every
    /// `interval` calls. An `interval` of zero is treated as one.
    pub const fn new(burst: u32, interval: u32) -> RateLimit {
        RateLimit {
            burst,
            interval: if interval == 0 { 1 } else { interval },
            calls: AtomicU32::new(0),
            missed: AtomicU32::new(0),
        }
    }

    /// A limiter with the default burst and interval.
    pub const fn default_limits() -> RateLimit {
        RateLimit::new(DEFAULT_RATELIMIT_BURST, DEFAULT_RATELIMIT_INTERVAL)
    }

    /// Returns whether the caller may print now.
    ///
    /// When a new window starts and messages were suppressed in the previous
    /// one, a summary line is logged first.
    pub fn allow(&self) -> bool {
        let interval = self.interval;
        let position = match self
            .calls
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some((c + 1) % interval)
            }) {
            Ok(prev) | Err(prev) => prev,
        };

        if position == 0 {
            let missed = self.missed.swap(0, Ordering::Relaxed);
            if missed > 0 {
                log::warn!("{} messages suppressed", missed);
            }
        }

        if position < self.burst {
            true
        } else {
            self.missed.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Number of messages suppressed in the current window so far.
    pub fn missed(&self) -> u32 {
        self.missed.load(Ordering::Relaxed)
    }
}

/// Logs the location of the caller as a one-frame trace.
///
/// Without unwinding support the best available trace is the call site
/// itself; `#[track_caller]` on intermediate helpers carries it further up.
#[track_caller]
pub fn dump_stack() {
    if CONFIG.debug_stack_dumps {
        let caller = Location::caller();
        log::error!(
            "call trace: {}:{}:{}",
            caller.file(),
            caller.line(),
            caller.column()
        );
    }
}

/// Logs at warning level, limited per call site.
#[macro_export]
macro_rules! warn_ratelimited {
    ($($arg:tt)+) => {{
        static LIMIT: $crate::debug::RateLimit = $crate::debug::RateLimit::default_limits();
        if LIMIT.allow() {
            $crate::log::warn!($($arg)+);
        }
    }};
}

/// Logs at error level, limited per call site.
#[macro_export]
macro_rules! error_ratelimited {
    ($($arg:tt)+) => {{
        static LIMIT: $crate::debug::RateLimit = $crate::debug::RateLimit::default_limits();
        if LIMIT.allow() {
            $crate::log::error!($($arg)+);
        }
    }};
}

/// Logs a warning and the call site the first time this site is reached.
#[macro_export]
macro_rules! warn_once {
    ($($arg:tt)+) => {{
        static WARNED: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);
        if !WARNED.swap(true, core::sync::atomic::Ordering::Relaxed) {
            $crate::log::warn!($($arg)+);
            $crate::debug::dump_stack();
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::RateLimit;

    #[test]
    fn burst_then_suppress() {
        let limit = RateLimit::new(3, 10);
        let allowed = (0..10).filter(|_| limit.allow()).count();
        assert_eq!(allowed, 3);
        assert_eq!(limit.missed(), 7);
    }

    #[test]
    fn new_window_resets() {
        let limit = RateLimit::new(2, 4);
        let first: std::vec::Vec<bool> = (0..4).map(|_| limit.allow()).collect();
        assert_eq!(first, [true, true, false, false]);
        assert_eq!(limit.missed(), 2);

        // Opening the next window reports and clears the missed count.
        assert!(limit.allow());
        assert_eq!(limit.missed(), 0);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let limit = RateLimit::new(1, 0);
        assert!(limit.allow());
        assert!(limit.allow());
    }

    #[test]
    fn macros_expand() {
        for i in 0..20 {
            crate::warn_ratelimited!("ratelimited {}", i);
            crate::error_ratelimited!("ratelimited {}", i);
            crate::warn_once!("once {}", i);
        }
    }
}
