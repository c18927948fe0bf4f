use core::arch::{asm, naked_asm};

use super::frame::{TaskFrame, EFLAGS_IF};
use crate::port::irq::{irq_dispatch, irq_switch};
use crate::port::{os_task_body, Port};
use crate::types::{OsStkElement, OsStkPtr, OsTaskFn};

/// 32-bit x86 CPU in ring 0
pub struct X86;

impl X86 {
    pub const fn new() -> Self {
        X86
    }
}

impl Port for X86 {
    /// Saved EFLAGS
    type Token = u32;

    #[inline(always)]
    fn irq_save(&self) -> u32 {
        let flags: u32;
        unsafe {
            asm!("pushfl", "popl {0}", "cli", out(reg) flags, options(att_syntax));
        }
        flags
    }

    #[inline(always)]
    unsafe fn irq_restore(&self, flags: u32) {
        unsafe { asm!("pushl {0}", "popfl", in(reg) flags, options(att_syntax)) }
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
            let frame_ptr = (stk_top - core::mem::size_of::<TaskFrame>()) as *mut TaskFrame;

            frame_ptr.write(TaskFrame::initial(
                task_trampoline as *const () as u32,
                code_segment(),
                task_fn as usize as u32,
                arg as u32,
                os_task_return as *const () as u32,
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

/// Push an `iret` frame that returns to the caller plus a `pushal` block,
/// save the stack pointer into `*from`, then resume `*to`.
#[unsafe(naked)]
unsafe extern "C" fn os_ctx_sw(_from: *mut OsStkPtr, _to: *const OsStkPtr) {
    naked_asm!(
        "movl 4(%esp), %eax",
        "movl 8(%esp), %edx",
        "pushfl",
        "cli",
        "pushl %cs",
        "pushl $2f",
        "pushal",
        "movl %esp, (%eax)",
        "movl (%edx), %esp",
        "popal",
        "iretl",
        "2:",
        "ret",
        options(att_syntax),
    );
}

#[unsafe(naked)]
unsafe extern "C" fn os_start_high_rdy(_to: *const OsStkPtr) -> ! {
    naked_asm!(
        "movl 4(%esp), %eax",
        "movl (%eax), %esp",
        "popal",
        "iretl",
        options(att_syntax),
    );
}

/// Interrupt entry for IDT gates. The CPU has pushed the `iret` frame;
/// `pushal` completes a task frame that the dispatcher may swap.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn ucos_x86_irq_entry() {
    naked_asm!(
        "pushal",
        "movl %esp, %eax",
        "cld",
        "pushl %eax",
        "call {dispatch}",
        "addl $4, %esp",
        "movl %eax, %esp",
        "popal",
        "iretl",
        dispatch = sym irq_dispatch,
        options(att_syntax),
    );
}

fn code_segment() -> u32 {
    let cs: u32;
    unsafe {
        asm!("mov %cs, {0:e}", out(reg) cs, options(att_syntax, nomem, nostack, preserves_flags));
    }
    cs
}

extern "C" fn task_trampoline(entry: usize, arg: *mut ()) -> ! {
    unsafe { interrupts_enable() };
    os_task_body(entry, arg)
}

/// Task return handler
pub fn os_task_return() -> ! {
    loop {
        unsafe { asm!("hlt", options(nomem, nostack)) };
    }
}

/// Idle hook
#[inline]
pub fn cpu_idle() {
    unsafe { asm!("hlt", options(nomem, nostack)) };
}

#[inline]
pub fn interrupts_enabled() -> bool {
    let flags: u32;
    unsafe {
        asm!("pushfl", "popl {0}", out(reg) flags, options(att_syntax, nomem));
    }
    flags & EFLAGS_IF != 0
}

#[inline]
pub fn interrupts_disable() {
    unsafe { asm!("cli", options(nomem, nostack)) };
}

#[inline]
pub unsafe fn interrupts_enable() {
    unsafe { asm!("sti", options(nomem, nostack)) };
}
