#![allow(named_asm_labels)]

use core::arch::{asm, naked_asm};
use core::ptr;

use cortex_m::interrupt;
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SCB;
use cortex_m::register::primask;

use super::frame::{UcStk, CONTEXT_STACK_SIZE};
use crate::port::{os_task_body, Port};
use crate::types::{OsStkElement, OsStkPtr, OsTaskFn};

/// Interrupt stack for MSP
#[no_mangle]
static mut INTERRUPT_STACK: [u64; 256] = [0xDEADBEEF_DEADBEEF; 256];

/// Slot PendSV saves the outgoing task into; null when there is none
#[no_mangle]
static mut OS_PENDSV_FROM: *mut OsStkPtr = ptr::null_mut();

/// Slot PendSV resumes
#[no_mangle]
static mut OS_PENDSV_TO: *const OsStkPtr = ptr::null();

/// Cortex-M4 CPU
pub struct CortexM4;

impl CortexM4 {
    pub const fn new() -> Self {
        CortexM4
    }
}

impl Port for CortexM4 {
    type Token = bool;

    #[inline(always)]
    fn irq_save(&self) -> bool {
        let was_active = primask::read().is_active();
        interrupt::disable();
        was_active
    }

    #[inline(always)]
    unsafe fn irq_restore(&self, was_active: bool) {
        if was_active {
            unsafe { interrupt::enable() }
        }
    }

    unsafe fn task_stk_init(
        &self,
        task_fn: OsTaskFn,
        arg: *mut (),
        stk_base: *mut OsStkElement,
        stk_size: usize,
    ) -> OsStkPtr {
        unsafe {
            let stk_top = stk_base.add(stk_size);
            let stk_aligned = ((stk_top as usize) & !7) as *mut u32;
            let frame_ptr = stk_aligned.sub(CONTEXT_STACK_SIZE) as *mut UcStk;

            frame_ptr.write(UcStk::initial(
                task_trampoline as *const () as u32,
                task_fn as usize as u32,
                arg as u32,
                os_task_return as *const () as u32,
            ));

            frame_ptr as OsStkPtr
        }
    }

    #[inline(always)]
    unsafe fn ctx_sw(&self, from: *mut OsStkPtr, to: *const OsStkPtr) {
        unsafe { pend_switch(from, to) }
    }

    #[inline(always)]
    unsafe fn int_ctx_sw(&self, from: *mut OsStkPtr, to: *const OsStkPtr) {
        unsafe { pend_switch(from, to) }
    }

    #[allow(static_mut_refs)]
    unsafe fn start_high_rdy(&self, to: *const OsStkPtr) {
        unsafe {
            let mut scb = cortex_m::Peripherals::steal().SCB;

            // Set PendSV and SysTick priority to lowest
            scb.set_priority(SystemHandler::PendSV, 0xF0);
            scb.set_priority(SystemHandler::SysTick, 0xF0);

            // Switch MSP to dedicated interrupt stack
            let msp_top = &INTERRUPT_STACK as *const _ as u32
                + core::mem::size_of_val(&INTERRUPT_STACK) as u32;

            asm!("msr msp, {0}", in(reg) msp_top);
            asm!("msr psp, {0}", in(reg) 0);

            OS_PENDSV_FROM = ptr::null_mut();
            OS_PENDSV_TO = to;

            interrupt::enable();
            SCB::set_pendsv();
        }

        loop {
            cortex_m::asm::wfi();
        }
    }
}

/// Request a PendSV switch. A switch that is already pending keeps its
/// outgoing slot, since that task is still the one on the CPU.
#[inline(always)]
unsafe fn pend_switch(from: *mut OsStkPtr, to: *const OsStkPtr) {
    unsafe {
        if !SCB::is_pendsv_pending() {
            OS_PENDSV_FROM = from;
        }
        OS_PENDSV_TO = to;
    }
    SCB::set_pendsv();
}

/// Initialize SysTick timer for system tick generation
///
/// # Arguments
/// * `cnts` - Reload value
///
/// # Example
/// For 16MHz clock with 100Hz tick rate: cnts = 16_000_000 / 100 = 160_000
pub fn os_cpu_systick_init(cnts: u32) {
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    p.SYST.set_reload(cnts - 1);
    p.SYST.clear_current();
    p.SYST.set_clock_source(SystClkSource::Core);
    p.SYST.enable_interrupt();
    p.SYST.enable_counter();
}

/// Called from PendSV with the outgoing task's stack pointer (already
/// holding r4-r11 and EXC_RETURN). Returns the stack pointer to resume.
#[inline(never)]
#[no_mangle]
unsafe extern "C" fn pendsv_switch_context(cur_sp: OsStkPtr) -> OsStkPtr {
    unsafe {
        if !OS_PENDSV_FROM.is_null() {
            *OS_PENDSV_FROM = cur_sp;
        }
        OS_PENDSV_FROM = ptr::null_mut();
        *OS_PENDSV_TO
    }
}

/// PendSV exception handler - performs full context switch
///
/// 1. Save R4-R11, LR to current task's PSP (skip if there is no outgoing task)
/// 2. Call pendsv_switch_context to store/load stack pointers
/// 3. Restore R4-R11, LR from new task's stack
/// 4. Exception return
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "dsb",
        "isb",

        "mrs r0, psp",

        "ldr r1, ={from}",
        "ldr r1, [r1]",
        "cbz r1, 1f",

        "stmdb r0!, {{r4-r11, lr}}",

        "1:",
        "bl {switch}",

        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",

        "cpsie i",
        "dsb",
        "isb",

        "bx lr",

        from = sym OS_PENDSV_FROM,
        switch = sym pendsv_switch_context,
    );
}

/// SysTick interrupt handler
#[no_mangle]
pub extern "C" fn SysTick() {
    crate::time::os_tick_isr();
}

extern "C" fn task_trampoline(entry: usize, arg: *mut ()) -> ! {
    unsafe { interrupt::enable() };
    os_task_body(entry, arg)
}

/// Task return handler
#[no_mangle]
pub fn os_task_return() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

/// Idle hook
#[inline]
pub fn cpu_idle() {
    cortex_m::asm::wfi();
}

#[inline]
pub fn interrupts_enabled() -> bool {
    primask::read().is_active()
}

#[inline]
pub fn interrupts_disable() {
    interrupt::disable();
}

#[inline]
pub unsafe fn interrupts_enable() {
    unsafe { interrupt::enable() }
}
