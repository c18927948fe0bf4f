//! Host simulation port
//!
//! Interrupt masking is a flag and context switches are recorded rather
//! than performed. A call to [`Port::ctx_sw`] therefore returns at once,
//! which lets tests step the scheduler and inspect each decision.

use core::cell::Cell;
use core::ptr;

use super::Port;
use crate::types::{OsStkElement, OsStkPtr, OsTaskFn};

/// How a recorded switch was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimSwitchKind {
    /// Voluntary switch from task level
    Task,
    /// Switch at outermost interrupt exit
    Interrupt,
    /// First dispatch at start-up
    Start,
}

/// One recorded context switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSwitch {
    pub kind: SimSwitchKind,
    /// Outgoing context slot (null for the first dispatch)
    pub from: *mut OsStkPtr,
    /// Incoming context slot
    pub to: *const OsStkPtr,
    /// Simulated interrupt-enable flag at the time of the switch
    pub irq_enabled: bool,
}

/// Simulated CPU
pub struct SimPort {
    irq_enabled: Cell<bool>,
    switch_ctr: Cell<u32>,
    last_switch: Cell<Option<SimSwitch>>,
}

impl SimPort {
    pub const fn new() -> Self {
        SimPort {
            irq_enabled: Cell::new(true),
            switch_ctr: Cell::new(0),
            last_switch: Cell::new(None),
        }
    }

    /// Simulated interrupt-enable flag
    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled.get()
    }

    /// Number of switches of any kind so far
    pub fn switch_count(&self) -> u32 {
        self.switch_ctr.get()
    }

    /// Most recent switch
    pub fn last_switch(&self) -> Option<SimSwitch> {
        self.last_switch.get()
    }

    fn record(&self, kind: SimSwitchKind, from: *mut OsStkPtr, to: *const OsStkPtr) {
        self.switch_ctr.set(self.switch_ctr.get() + 1);
        self.last_switch.set(Some(SimSwitch {
            kind,
            from,
            to,
            irq_enabled: self.irq_enabled.get(),
        }));
    }
}

impl Default for SimPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Port for SimPort {
    type Token = bool;

    fn irq_save(&self) -> bool {
        self.irq_enabled.replace(false)
    }

    unsafe fn irq_restore(&self, was_enabled: bool) {
        self.irq_enabled.set(was_enabled);
    }

    /// Stores `[entry, arg]` at the top of the stack and returns a pointer
    /// to the entry word.
    unsafe fn task_stk_init(
        &self,
        task_fn: OsTaskFn,
        arg: *mut (),
        stk_base: *mut OsStkElement,
        stk_size: usize,
    ) -> OsStkPtr {
        unsafe {
            let frame = stk_base.add(stk_size - 2);
            frame.write(task_fn as usize);
            frame.add(1).write(arg as usize);
            frame
        }
    }

    unsafe fn ctx_sw(&self, from: *mut OsStkPtr, to: *const OsStkPtr) {
        self.record(SimSwitchKind::Task, from, to);
    }

    unsafe fn int_ctx_sw(&self, from: *mut OsStkPtr, to: *const OsStkPtr) {
        self.record(SimSwitchKind::Interrupt, from, to);
    }

    unsafe fn start_high_rdy(&self, to: *const OsStkPtr) {
        self.record(SimSwitchKind::Start, ptr::null_mut(), to);
    }
}

/// Idle hook
pub fn cpu_idle() {
    core::hint::spin_loop();
}

/// Terminal handler for a task that returned
pub fn os_task_return() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
