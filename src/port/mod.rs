//! Port layer - CPU-specific implementations
//!
//! The scheduler is written once against [`Port`]. Each architecture
//! supplies one implementation; hosted builds get [`sim::SimPort`] instead
//! of real hardware so the scheduler can be exercised by tests.
//!
//! Every port keeps its initial task frame as a plain `#[repr(C)]` record
//! in a `frame` submodule that is compiled on all targets.

use crate::types::{OsStkElement, OsStkPtr, OsTaskFn};

pub mod aarch64;
pub mod cortex_m4;
pub mod x86;

#[cfg(not(target_os = "none"))]
pub mod sim;

#[cfg(any(
    all(target_arch = "aarch64", target_os = "none"),
    all(target_arch = "x86", target_os = "none"),
))]
mod irq;

/// Architecture contract the scheduler core relies on.
///
/// All switch functions take pointers to the `stk_ptr` slots of task
/// control blocks: `from` receives the outgoing task's saved stack
/// pointer, `to` is read to resume the incoming task.
pub trait Port {
    /// Saved interrupt state returned by [`Port::irq_save`]
    type Token: Copy;

    /// Disable interrupts, returning the state that was live before.
    fn irq_save(&self) -> Self::Token;

    /// Restore exactly the state captured by the matching `irq_save`.
    ///
    /// # Safety
    /// `token` must come from `irq_save` on this port and be restored once,
    /// in LIFO order with respect to other critical sections.
    unsafe fn irq_restore(&self, token: Self::Token);

    /// Build the initial context of a new task on its stack.
    ///
    /// Resuming the returned stack pointer lands in a trampoline that
    /// enables interrupts, calls `task_fn(arg)`, and parks the context
    /// forever if the task ever returns.
    ///
    /// # Safety
    /// `stk_base..stk_base + stk_size` must be a writable stack region owned
    /// by the new task for the rest of the program.
    unsafe fn task_stk_init(
        &self,
        task_fn: OsTaskFn,
        arg: *mut (),
        stk_base: *mut OsStkElement,
        stk_size: usize,
    ) -> OsStkPtr;

    /// Switch from task level: save the caller into `*from`, resume `*to`.
    ///
    /// Returns only once the caller's context is resumed again.
    ///
    /// # Safety
    /// Must be called with interrupts disabled, outside interrupt context,
    /// with both slots pointing into live task control blocks.
    unsafe fn ctx_sw(&self, from: *mut OsStkPtr, to: *const OsStkPtr);

    /// Switch at the tail of the outermost interrupt handler. The
    /// interrupted task is already captured in the interrupt frame, which
    /// becomes its saved context in `*from`.
    ///
    /// # Safety
    /// Same as [`Port::ctx_sw`], but called from interrupt context.
    unsafe fn int_ctx_sw(&self, from: *mut OsStkPtr, to: *const OsStkPtr);

    /// Resume the first task at start-up. There is no outgoing context.
    ///
    /// # Safety
    /// `to` must hold a context built by `task_stk_init`. On real hardware
    /// this never returns.
    unsafe fn start_high_rdy(&self, to: *const OsStkPtr);
}

// ============ Port selection ============

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use cortex_m4::{
    cpu_idle, interrupts_disable, interrupts_enable, interrupts_enabled, os_task_return,
    CortexM4 as ActivePort,
};

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub use aarch64::{
    cpu_idle, interrupts_disable, interrupts_enable, interrupts_enabled, os_task_return,
    Aarch64 as ActivePort,
};

#[cfg(all(target_arch = "x86", target_os = "none"))]
pub use x86::{
    cpu_idle, interrupts_disable, interrupts_enable, interrupts_enabled, os_task_return,
    X86 as ActivePort,
};

#[cfg(not(target_os = "none"))]
pub use sim::{cpu_idle, os_task_return, SimPort as ActivePort};

#[cfg(all(
    target_os = "none",
    not(any(target_arch = "arm", target_arch = "aarch64", target_arch = "x86"))
))]
compile_error!("no port for this architecture");

/// Common body of every port's task trampoline, entered once interrupts
/// are enabled.
#[cfg_attr(not(target_os = "none"), allow(dead_code))]
pub(crate) fn os_task_body(entry: usize, arg: *mut ()) -> ! {
    // SAFETY: `entry` was stored by `task_stk_init` from an `OsTaskFn`.
    let task = unsafe { core::mem::transmute::<usize, OsTaskFn>(entry) };
    task(arg);

    crate::os_error!("task returned from its entry function");
    os_task_return()
}
