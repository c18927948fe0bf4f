//! Compile-time configuration
//!
//! These constants control the resource limits and timing of the kernel.

use crate::types::{OsNestingCtr, OsPrio, OsStkElement};

/// Number of task slots, which is also the number of priority levels
pub const CFG_MAX_TASKS: usize = 8;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 100;

/// Minimum task stack size in words
pub const CFG_STK_SIZE_MIN: usize = 64;

/// Pattern written over a task stack at creation
pub const CFG_STK_FILL: OsStkElement =
    OsStkElement::from_ne_bytes([0xA5; core::mem::size_of::<OsStkElement>()]);

/// Idle task stack size in words
pub const CFG_IDLE_STK_SIZE: usize = 256;

/// Interrupt nesting saturates at this depth
pub const CFG_INT_NESTING_MAX: OsNestingCtr = 250;

/// Maximum scheduler lock nesting
pub const CFG_SCHED_LOCK_MAX: OsNestingCtr = 250;

/// Idle task priority
pub const CFG_PRIO_IDLE: OsPrio = (CFG_MAX_TASKS - 1) as OsPrio;

// The ready set is a single 32-bit word.
const _: () = assert!(CFG_MAX_TASKS >= 2 && CFG_MAX_TASKS <= 32);
