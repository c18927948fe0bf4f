//! Core type definitions
//!
//! Plain aliases for the scalar kernel quantities plus the few small
//! records returned by query functions.

/// Task priority (0 = highest priority). Doubles as the task table index.
pub type OsPrio = u8;

/// Tick counter type. Wraps at `u32::MAX`.
pub type OsTick = u32;

/// Nesting counter
pub type OsNestingCtr = u8;

/// Stack element type (native machine word of the target)
pub type OsStkElement = usize;

/// Saved execution context of a suspended task: its stack pointer.
///
/// Everything needed to resume the task lives on the stack below this
/// pointer, in the frame layout of the active port.
pub type OsStkPtr = *mut OsStkElement;

/// Task entry point. Receives the argument given at creation.
///
/// Returning from a task is a fatal condition; the port parks the
/// context forever.
pub type OsTaskFn = fn(*mut ());

/// Task state as seen by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsTaskState {
    /// Task is ready to run (or running)
    Ready = 0,
    /// Task is sleeping on a tick delay
    Delayed = 1,
}

/// Stack usage report from [`crate::task::os_task_stk_chk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OsStkData {
    /// Words never written since creation
    pub free: usize,
    /// Words touched at least once
    pub used: usize,
}
