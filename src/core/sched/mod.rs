//! Scheduler module
//!
//! Strict priority scheduling: the running task is always the highest
//! priority ready task, except while interrupts are nested or the scheduler
//! is locked. A switch that is warranted in those windows is remembered and
//! performed by the outermost interrupt exit or the final unlock.

use crate::critical::CriticalSection;
use crate::kernel::{kernel, Kernel, KernelFlags, SchedState, SwitchPath};
use crate::port::Port;

impl<P: Port> Kernel<P> {
    /// Main scheduling point
    ///
    /// Determines the highest priority ready task and switches to it if it
    /// is not the running task. Called after any operation that may change
    /// task readiness. Does nothing before the kernel is started.
    pub fn sched(&mut self) {
        let _cs = CriticalSection::enter(&self.port);
        Self::sched_in_cs(&self.port, &self.flags, &mut self.sched, SwitchPath::Task);
    }

    /// Scheduling pass for a caller that already holds a critical section.
    ///
    /// The switch is issued before the caller's critical section ends, so
    /// the saved context of the outgoing task still has interrupts masked
    /// and the section is released when that task is resumed.
    pub(crate) fn sched_in_cs(
        port: &P,
        flags: &KernelFlags,
        sched: &mut SchedState,
        path: SwitchPath,
    ) {
        if !flags.is_running() {
            return;
        }

        let prio = sched.sched_new();
        if prio == sched.cpu.prio_cur {
            sched.cpu.ctx_sw_pend = false;
            return;
        }

        if flags.int_nesting() > 0 || flags.sched_lock_nesting() > 0 {
            sched.cpu.ctx_sw_pend = true;
            return;
        }

        let from_prio = sched.cpu.prio_cur;
        sched.cpu.ctx_sw_pend = false;
        sched.cpu.prio_cur = prio;
        sched.cpu.tcb_cur = Some(prio as usize);
        flags.ctx_sw_increment();

        crate::os_trace!("switch {=u8} -> {=u8}", from_prio, prio);

        let from = &raw mut sched.tcb_tbl[from_prio as usize].stk_ptr;
        let to = &raw const sched.tcb_tbl[prio as usize].stk_ptr;

        // SAFETY: interrupts are masked by the caller's critical section and
        // both slots belong to live tasks in the table.
        unsafe {
            match path {
                SwitchPath::Task => port.ctx_sw(from, to),
                SwitchPath::IntExit => port.int_ctx_sw(from, to),
            }
        }
    }
}

// ============ Public API ============

/// Request a rescheduling pass
pub fn os_sched() {
    unsafe { kernel() }.sched()
}
