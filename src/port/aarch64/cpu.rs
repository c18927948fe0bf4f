use core::arch::{asm, global_asm, naked_asm};

use super::frame::{TrapFrame, ELR_OFFSET, FPCR_OFFSET, FRAME_SIZE, SPSR_EL1H};
use crate::port::irq::{irq_dispatch, irq_switch};
use crate::port::{os_task_body, Port};
use crate::types::{OsStkElement, OsStkPtr, OsTaskFn};

/// AArch64 CPU at EL1
pub struct Aarch64;

impl Aarch64 {
    pub const fn new() -> Self {
        Aarch64
    }
}

impl Port for Aarch64 {
    /// Saved DAIF
    type Token = u64;

    #[inline(always)]
    fn irq_save(&self) -> u64 {
        let daif: u64;
        unsafe {
            asm!("mrs {0}, daif", "msr daifset, #2", out(reg) daif, options(nostack));
        }
        daif
    }

    #[inline(always)]
    unsafe fn irq_restore(&self, daif: u64) {
        unsafe { asm!("msr daif, {0}", in(reg) daif, options(nostack)) }
    }

    unsafe fn task_stk_init(
        &self,
        task_fn: OsTaskFn,
        arg: *mut (),
        stk_base: *mut OsStkElement,
        stk_size: usize,
    ) -> OsStkPtr {
        unsafe {
            let stk_top = (stk_base.add(stk_size) as usize) & !15;
            let frame_ptr = (stk_top - FRAME_SIZE) as *mut TrapFrame;

            frame_ptr.write(TrapFrame::initial(
                task_trampoline as *const () as u64,
                task_fn as usize as u64,
                arg as u64,
                os_task_return as *const () as u64,
            ));

            frame_ptr as OsStkPtr
        }
    }

    #[inline(always)]
    unsafe fn ctx_sw(&self, from: *mut OsStkPtr, to: *const OsStkPtr) {
        unsafe { os_ctx_sw(from, to) }
    }

    unsafe fn int_ctx_sw(&self, from: *mut OsStkPtr, to: *const OsStkPtr) {
        unsafe {
            if !irq_switch(from, to) {
                os_ctx_sw(from, to);
            }
        }
    }

    unsafe fn start_high_rdy(&self, to: *const OsStkPtr) {
        unsafe { os_start_high_rdy(to) }
    }
}

/// Push a frame for the caller that resumes at its return address, save
/// the stack pointer into `*from`, then restore `*to`.
#[unsafe(naked)]
unsafe extern "C" fn os_ctx_sw(_from: *mut OsStkPtr, _to: *const OsStkPtr) {
    naked_asm!(
        "sub sp, sp, #{size}",
        "stp x0, x1, [sp, #0]",
        "stp x2, x3, [sp, #16]",
        "stp x4, x5, [sp, #32]",
        "stp x6, x7, [sp, #48]",
        "stp x8, x9, [sp, #64]",
        "stp x10, x11, [sp, #80]",
        "stp x12, x13, [sp, #96]",
        "stp x14, x15, [sp, #112]",
        "stp x16, x17, [sp, #128]",
        "stp x18, x19, [sp, #144]",
        "stp x20, x21, [sp, #160]",
        "stp x22, x23, [sp, #176]",
        "stp x24, x25, [sp, #192]",
        "stp x26, x27, [sp, #208]",
        "stp x28, x29, [sp, #224]",
        "str x30, [sp, #240]",
        "stp q0, q1, [sp, #272]",
        "stp q2, q3, [sp, #304]",
        "stp q4, q5, [sp, #336]",
        "stp q6, q7, [sp, #368]",
        "stp q8, q9, [sp, #400]",
        "stp q10, q11, [sp, #432]",
        "stp q12, q13, [sp, #464]",
        "stp q14, q15, [sp, #496]",
        "stp q16, q17, [sp, #528]",
        "stp q18, q19, [sp, #560]",
        "stp q20, q21, [sp, #592]",
        "stp q22, q23, [sp, #624]",
        "stp q24, q25, [sp, #656]",
        "stp q26, q27, [sp, #688]",
        "stp q28, q29, [sp, #720]",
        "stp q30, q31, [sp, #752]",
        "mrs x9, fpcr",
        "mrs x10, fpsr",
        "str x9, [sp, #{fpcr}]",
        "str x10, [sp, #{fpsr}]",

        // Resume at 2f, EL1h, with the caller's interrupt mask
        "adr x9, 2f",
        "mrs x10, daif",
        "mov x11, #{el1h}",
        "orr x10, x10, x11",
        "stp x9, x10, [sp, #{elr}]",

        "mov x9, sp",
        "str x9, [x0]",
        "ldr x9, [x1]",
        "mov sp, x9",
        "b {restore}",

        "2:",
        "ret",

        size = const FRAME_SIZE,
        elr = const ELR_OFFSET,
        fpcr = const FPCR_OFFSET,
        fpsr = const FPCR_OFFSET + 8,
        el1h = const SPSR_EL1H,
        restore = sym os_frame_restore,
    );
}

/// Restore the frame at `sp` and `eret` into it.
#[unsafe(naked)]
unsafe extern "C" fn os_frame_restore() -> ! {
    naked_asm!(
        "ldp x9, x10, [sp, #{elr}]",
        "msr elr_el1, x9",
        "msr spsr_el1, x10",
        "ldr x9, [sp, #{fpcr}]",
        "ldr x10, [sp, #{fpsr}]",
        "msr fpcr, x9",
        "msr fpsr, x10",
        "ldp q0, q1, [sp, #272]",
        "ldp q2, q3, [sp, #304]",
        "ldp q4, q5, [sp, #336]",
        "ldp q6, q7, [sp, #368]",
        "ldp q8, q9, [sp, #400]",
        "ldp q10, q11, [sp, #432]",
        "ldp q12, q13, [sp, #464]",
        "ldp q14, q15, [sp, #496]",
        "ldp q16, q17, [sp, #528]",
        "ldp q18, q19, [sp, #560]",
        "ldp q20, q21, [sp, #592]",
        "ldp q22, q23, [sp, #624]",
        "ldp q24, q25, [sp, #656]",
        "ldp q26, q27, [sp, #688]",
        "ldp q28, q29, [sp, #720]",
        "ldp q30, q31, [sp, #752]",

        "ldp x0, x1, [sp, #0]",
        "ldp x2, x3, [sp, #16]",
        "ldp x4, x5, [sp, #32]",
        "ldp x6, x7, [sp, #48]",
        "ldp x8, x9, [sp, #64]",
        "ldp x10, x11, [sp, #80]",
        "ldp x12, x13, [sp, #96]",
        "ldp x14, x15, [sp, #112]",
        "ldp x16, x17, [sp, #128]",
        "ldp x18, x19, [sp, #144]",
        "ldp x20, x21, [sp, #160]",
        "ldp x22, x23, [sp, #176]",
        "ldp x24, x25, [sp, #192]",
        "ldp x26, x27, [sp, #208]",
        "ldp x28, x29, [sp, #224]",
        "ldr x30, [sp, #240]",
        "add sp, sp, #{size}",
        "eret",

        size = const FRAME_SIZE,
        elr = const ELR_OFFSET,
        fpcr = const FPCR_OFFSET,
        fpsr = const FPCR_OFFSET + 8,
    );
}

#[unsafe(naked)]
unsafe extern "C" fn os_start_high_rdy(_to: *const OsStkPtr) -> ! {
    naked_asm!(
        "ldr x9, [x0]",
        "mov sp, x9",
        "b {restore}",
        restore = sym os_frame_restore,
    );
}

/// IRQ entry for "current EL with SPx". Saves the interrupted context as a
/// [`TrapFrame`] and restores whichever frame the dispatcher returns.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn ucos_a64_irq_entry() {
    naked_asm!(
        "sub sp, sp, #{size}",
        "stp x0, x1, [sp, #0]",
        "stp x2, x3, [sp, #16]",
        "stp x4, x5, [sp, #32]",
        "stp x6, x7, [sp, #48]",
        "stp x8, x9, [sp, #64]",
        "stp x10, x11, [sp, #80]",
        "stp x12, x13, [sp, #96]",
        "stp x14, x15, [sp, #112]",
        "stp x16, x17, [sp, #128]",
        "stp x18, x19, [sp, #144]",
        "stp x20, x21, [sp, #160]",
        "stp x22, x23, [sp, #176]",
        "stp x24, x25, [sp, #192]",
        "stp x26, x27, [sp, #208]",
        "stp x28, x29, [sp, #224]",
        "str x30, [sp, #240]",
        "mrs x9, elr_el1",
        "mrs x10, spsr_el1",
        "stp x9, x10, [sp, #{elr}]",
        "stp q0, q1, [sp, #272]",
        "stp q2, q3, [sp, #304]",
        "stp q4, q5, [sp, #336]",
        "stp q6, q7, [sp, #368]",
        "stp q8, q9, [sp, #400]",
        "stp q10, q11, [sp, #432]",
        "stp q12, q13, [sp, #464]",
        "stp q14, q15, [sp, #496]",
        "stp q16, q17, [sp, #528]",
        "stp q18, q19, [sp, #560]",
        "stp q20, q21, [sp, #592]",
        "stp q22, q23, [sp, #624]",
        "stp q24, q25, [sp, #656]",
        "stp q26, q27, [sp, #688]",
        "stp q28, q29, [sp, #720]",
        "stp q30, q31, [sp, #752]",
        "mrs x9, fpcr",
        "mrs x10, fpsr",
        "str x9, [sp, #{fpcr}]",
        "str x10, [sp, #{fpsr}]",

        "mov x0, sp",
        "bl {dispatch}",
        "mov sp, x0",
        "b {restore}",

        size = const FRAME_SIZE,
        elr = const ELR_OFFSET,
        fpcr = const FPCR_OFFSET,
        fpsr = const FPCR_OFFSET + 8,
        dispatch = sym irq_dispatch,
        restore = sym os_frame_restore,
    );
}

extern "C" fn os_unhandled_exception() -> ! {
    crate::os_error!("unhandled exception");
    os_task_return()
}

// Only the IRQ slot for the current EL with SPx is serviced.
global_asm!(
    ".section .text.ucos_vectors, \"ax\"",
    ".balign 2048",
    ".global ucos_a64_vectors",
    "ucos_a64_vectors:",
    // Current EL with SP0
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    // Current EL with SPx
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {irq}",
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    // Lower EL, AArch64
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    // Lower EL, AArch32
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    ".balign 0x80", "b {hang}",
    ".text",
    hang = sym os_unhandled_exception,
    irq = sym ucos_a64_irq_entry,
);

/// Point VBAR_EL1 at the kernel's vector table.
///
/// # Safety
/// Replaces any vector table the board installed.
pub unsafe fn install_vectors() {
    extern "C" {
        static ucos_a64_vectors: u8;
    }
    unsafe {
        asm!(
            "msr vbar_el1, {0}",
            "isb",
            in(reg) &raw const ucos_a64_vectors as u64,
            options(nostack),
        );
    }
}

extern "C" fn task_trampoline(entry: usize, arg: *mut ()) -> ! {
    unsafe { interrupts_enable() };
    os_task_body(entry, arg)
}

/// Task return handler
pub fn os_task_return() -> ! {
    loop {
        unsafe { asm!("wfi", options(nomem, nostack)) };
    }
}

/// Idle hook
#[inline]
pub fn cpu_idle() {
    unsafe { asm!("wfi", options(nomem, nostack)) };
}

#[inline]
pub fn interrupts_enabled() -> bool {
    let daif: u64;
    unsafe { asm!("mrs {0}, daif", out(reg) daif, options(nomem, nostack)) };
    daif & (1 << 7) == 0
}

#[inline]
pub fn interrupts_disable() {
    unsafe { asm!("msr daifset, #2", options(nostack)) };
}

#[inline]
pub unsafe fn interrupts_enable() {
    unsafe { asm!("msr daifclr, #2", options(nostack)) };
}
