// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Hardware agnostic interfaces for short delays.

/// Busy-wait delays for code that may block but must not sleep.
///
/// Power-state transition paths poll hardware status bits with bounded
/// iteration counts. Between two polls they wait a few microseconds with
/// this trait. Implementations spin (on a cycle counter, a free-running
/// timer, or a calibrated loop); they never yield.
pub trait BusyWait {
    /// Spin for at least `us` microseconds.
    fn udelay(&self, us: u32);
}

/// Polls `cond` up to `max_polls` times, busy-waiting one microsecond after
/// each failed poll.
///
/// Returns the number of polls that failed before `cond` held, or `None` if
/// it never did. This is the iteration-count timeout used by hardware
/// sequencing code: the budget assumes a roughly known cost per poll.
pub fn poll_timeout(
    delay: &dyn BusyWait,
    max_polls: u32,
    mut cond: impl FnMut() -> bool,
) -> Option<u32> {
    for i in 0..max_polls {
        if cond() {
            return Some(i);
        }
        delay.udelay(1);
    }
    None
}
