//! μC/OS-II style RTOS kernel core in Rust
//!
//! A small real-time scheduler providing:
//! - Strict priority preemptive scheduling over a fixed task table
//! - Tick-based task delays
//! - Interrupt nesting with preemption deferred to the outermost exit
//! - Ports for Cortex-M4, AArch64 and x86, plus a host simulation

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_os = "none")]
mod cs_impl {
    use critical_section::{set_impl, Impl, RawRestoreState};

    use crate::port::{interrupts_disable, interrupts_enable, interrupts_enabled};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = interrupts_enabled();
            interrupts_disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupts_enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod port;

// ============ Re-exports ============

pub use self::core::config;
pub use self::core::config::*;
pub use self::core::critical;
pub use self::core::error;
pub use self::core::error::{OsError, OsResult};
pub use self::core::kernel;
pub use self::core::kernel::{
    os_ctx_sw_ctr, os_init, os_int_enter, os_int_exit, os_sched_lock, os_sched_unlock, os_start,
    Kernel,
};
pub use self::core::prio;
pub use self::core::types;
pub use self::core::types::*;
pub use self::core::task;
pub use self::core::task::{os_task_create, os_task_stk_chk};
pub use self::core::sched;
pub use self::core::sched::os_sched;
pub use self::core::time;
pub use self::core::time::{
    os_tick_isr, os_time_dly, os_time_dly_hmsm, os_time_get, os_time_set, os_time_tick,
};
