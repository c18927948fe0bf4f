//! Interrupt frame bookkeeping shared by the AArch64 and x86 ports
//!
//! Both ports save the complete register state of the interrupted context
//! as a frame on the current stack, then call [`irq_dispatch`] with the
//! frame address. The stack pointer it returns is the frame the entry stub
//! restores, so switching tasks at interrupt exit only means handing back
//! a different task's saved frame.

use core::ptr;

use crate::types::OsStkPtr;

/// Frame of the interrupt currently being dispatched
static mut IRQ_FRAME: OsStkPtr = ptr::null_mut();

/// Frame the entry stub will restore on the way out
static mut IRQ_RESUME: OsStkPtr = ptr::null_mut();

extern "Rust" {
    /// Board interrupt handler. Acknowledges the interrupt controller and
    /// brackets scheduler work with `os_int_enter` / `os_int_exit`.
    fn ucos_irq_handler();
}

/// Called by the entry stub with the saved frame; returns the frame to
/// resume.
pub(crate) unsafe extern "C" fn irq_dispatch(frame: OsStkPtr) -> OsStkPtr {
    unsafe {
        let outer = (IRQ_FRAME, IRQ_RESUME);
        IRQ_FRAME = frame;
        IRQ_RESUME = frame;

        ucos_irq_handler();

        let resume = IRQ_RESUME;
        IRQ_FRAME = outer.0;
        IRQ_RESUME = outer.1;
        resume
    }
}

/// Retarget the current interrupt return to `*to`, recording the
/// interrupted frame in `*from`. Returns `false` outside interrupt
/// dispatch, in which case nothing is changed.
pub(crate) unsafe fn irq_switch(from: *mut OsStkPtr, to: *const OsStkPtr) -> bool {
    unsafe {
        if IRQ_FRAME.is_null() {
            return false;
        }
        *from = IRQ_FRAME;
        IRQ_RESUME = *to;
        true
    }
}
