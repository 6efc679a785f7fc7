// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! In-memory stand-ins for hardware used by the unit tests.

use std::boxed::Box;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::vec::Vec;

use kernel::hil::time::BusyWait;
use kernel::hil::voltage::VoltageRegisters;
use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::StaticRef;
use kernel::ErrorCode;

use crate::prminst::{PartitionRegisters, PartitionWindow, PARTITION_SIZE};
use crate::voltage::{VoltData, VoltageController, VoltageDomain};
use crate::vp::{VpHardwareOps, VpId};

/// A zeroed partition window that lives for the rest of the test binary.
pub(crate) fn leak_partition() -> &'static StaticRef<PartitionRegisters> {
    let mem: &'static mut [u32; PARTITION_SIZE / 4] = Box::leak(Box::new([0; PARTITION_SIZE / 4]));
    // SAFETY: `ReadWrite<u32>` is a transparent wrapper around a `u32` cell,
    // and the leaked buffer is never freed.
    let regs =
        unsafe { StaticRef::new(mem as *mut [u32; PARTITION_SIZE / 4] as *const PartitionRegisters) };
    Box::leak(Box::new(regs))
}

/// A partition window where some words are write-one-to-clear status
/// registers that hardware never sets again.
pub(crate) struct W1cPartition {
    pub regs: &'static StaticRef<PartitionRegisters>,
    w1c: Vec<usize>,
}

impl W1cPartition {
    pub(crate) fn leak(w1c_words: &[usize]) -> &'static W1cPartition {
        Box::leak(Box::new(W1cPartition {
            regs: leak_partition(),
            w1c: w1c_words.to_vec(),
        }))
    }
}

impl PartitionWindow for W1cPartition {
    fn read_word(&self, word: usize) -> u32 {
        self.regs[word].get()
    }

    fn write_word(&self, word: usize, val: u32) {
        if self.w1c.contains(&word) {
            self.regs[word].set(self.regs[word].get() & !val);
        } else {
            self.regs[word].set(val);
        }
    }
}

pub(crate) struct CountingDelay {
    us: Cell<u32>,
}

impl CountingDelay {
    pub(crate) fn new() -> CountingDelay {
        CountingDelay { us: Cell::new(0) }
    }

    pub(crate) fn total_us(&self) -> u32 {
        self.us.get()
    }
}

impl BusyWait for CountingDelay {
    fn udelay(&self, us: u32) {
        self.us.set(self.us.get() + us);
    }
}

/// Behaviour knobs for [`FakeVpHardware`].
#[derive(Clone, Copy)]
pub(crate) struct Behaviour {
    /// The VP status register reports idle.
    pub idle: bool,
    /// Writing FORCEUPDATE raises transaction-done.
    pub ack_force_update: bool,
    /// Clearing transaction-done has no effect once it is raised.
    pub stuck_txdone: bool,
    /// Recovery is supported by the hardware ops.
    pub can_recover: bool,
}

impl Default for Behaviour {
    fn default() -> Behaviour {
        Behaviour {
            idle: true,
            ack_force_update: true,
            stuck_txdone: false,
            can_recover: true,
        }
    }
}

/// A voltage processor register block plus its PRM-side status bit.
///
/// Records every register write so tests can check exact sequences.
pub(crate) struct FakeVpHardware {
    pub behaviour: Cell<Behaviour>,
    regs: RefCell<BTreeMap<u8, u32>>,
    writes: RefCell<Vec<(u8, u32)>>,
    txdone: Cell<bool>,
    recoveries: Cell<u32>,
    status_offset: u8,
    config_offset: u8,
    force_update_bit: u32,
}

impl FakeVpHardware {
    pub(crate) fn new(config_offset: u8, status_offset: u8, force_update_bit: u32) -> FakeVpHardware {
        FakeVpHardware {
            behaviour: Cell::new(Behaviour::default()),
            regs: RefCell::new(BTreeMap::new()),
            writes: RefCell::new(Vec::new()),
            txdone: Cell::new(false),
            recoveries: Cell::new(0),
            status_offset,
            config_offset,
            force_update_bit,
        }
    }

    pub(crate) fn set_behaviour(&self, f: impl FnOnce(&mut Behaviour)) {
        let mut b = self.behaviour.get();
        f(&mut b);
        self.behaviour.set(b);
    }

    pub(crate) fn preset(&self, offset: u8, val: u32) {
        self.regs.borrow_mut().insert(offset, val);
    }

    pub(crate) fn reg(&self, offset: u8) -> u32 {
        self.regs.borrow().get(&offset).copied().unwrap_or(0)
    }

    pub(crate) fn writes(&self) -> Vec<(u8, u32)> {
        self.writes.borrow().clone()
    }

    pub(crate) fn writes_to(&self, offset: u8) -> Vec<u32> {
        self.writes
            .borrow()
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    pub(crate) fn clear_log(&self) {
        self.writes.borrow_mut().clear();
    }

    pub(crate) fn raise_txdone(&self) {
        self.txdone.set(true);
    }

    pub(crate) fn recoveries(&self) -> u32 {
        self.recoveries.get()
    }
}

impl VoltageRegisters for FakeVpHardware {
    fn read(&self, offset: u8) -> u32 {
        if offset == self.status_offset {
            return u32::from(self.behaviour.get().idle);
        }
        self.reg(offset)
    }

    fn write(&self, val: u32, offset: u8) {
        self.writes.borrow_mut().push((offset, val));
        self.regs.borrow_mut().insert(offset, val);
        if offset == self.config_offset
            && val & self.force_update_bit != 0
            && self.behaviour.get().ack_force_update
        {
            self.txdone.set(true);
        }
    }
}

impl VpHardwareOps for FakeVpHardware {
    fn check_txdone(&self, _vp: VpId) -> bool {
        self.txdone.get()
    }

    fn clear_txdone(&self, _vp: VpId) {
        if !self.behaviour.get().stuck_txdone {
            self.txdone.set(false);
        }
    }

    fn can_recover(&self) -> bool {
        self.behaviour.get().can_recover
    }

    fn recover(&self, _vp: VpId) {
        self.recoveries.set(self.recoveries.get() + 1);
    }
}

/// Records voltage-controller hook calls.
pub(crate) struct FakeVc {
    pub pre: Cell<u32>,
    pub post: RefCell<Vec<(u32, u8, u8)>>,
    pub fail_pre: Cell<Option<ErrorCode>>,
    pub current_vsel: u8,
}

impl FakeVc {
    pub(crate) fn new(current_vsel: u8) -> FakeVc {
        FakeVc {
            pre: Cell::new(0),
            post: RefCell::new(Vec::new()),
            fail_pre: Cell::new(None),
            current_vsel,
        }
    }
}

impl VoltageController for FakeVc {
    fn pre_scale(
        &self,
        voltdm: &VoltageDomain<'_>,
        target_uv: u32,
        _target: &VoltData,
    ) -> Result<(u8, u8), ErrorCode> {
        self.pre.set(self.pre.get() + 1);
        if let Some(err) = self.fail_pre.get() {
            return Err(err);
        }
        let target_vsel = voltdm.pmic().map_or(0, |pmic| pmic.uv_to_vsel(target_uv));
        Ok((target_vsel, self.current_vsel))
    }

    fn post_scale(
        &self,
        _voltdm: &VoltageDomain<'_>,
        target_uv: u32,
        _target: &VoltData,
        target_vsel: u8,
        current_vsel: u8,
    ) {
        self.post
            .borrow_mut()
            .push((target_uv, target_vsel, current_vsel));
    }
}
