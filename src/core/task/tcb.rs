//! Task Control Block (TCB) definition
//!
//! The TCB contains all the information needed to manage a task. TCBs live
//! in a fixed table indexed by priority, so a TCB never moves once created.

use crate::types::{OsPrio, OsStkElement, OsStkPtr, OsTaskFn, OsTaskState, OsTick};

/// Task Control Block
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OsTcb {
    // ============ Stack pointer ============
    /// Saved context of the task while it is not running
    pub stk_ptr: OsStkPtr,

    // ============ Stack information ============
    /// Base of stack
    pub stk_base: *mut OsStkElement,
    /// Stack size in words
    pub stk_size: usize,

    // ============ Task entry point ============
    /// Task function
    pub task_fn: Option<OsTaskFn>,
    /// Task argument
    pub task_arg: *mut (),

    // ============ Delay ============
    /// Remaining ticks to sleep; zero when not sleeping
    pub dly: OsTick,

    // ============ Priority ============
    /// Priority, equal to the slot index
    pub prio: OsPrio,

    /// Slot holds a task
    pub used: bool,
}

impl OsTcb {
    /// Create a new, unused TCB
    pub const fn new() -> Self {
        OsTcb {
            stk_ptr: core::ptr::null_mut(),
            stk_base: core::ptr::null_mut(),
            stk_size: 0,

            task_fn: None,
            task_arg: core::ptr::null_mut(),

            dly: 0,
            prio: 0,
            used: false,
        }
    }

    /// Initialize TCB to default values
    pub fn init(&mut self) {
        *self = Self::new();
    }

    /// Check if task is ready to run
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.used && self.dly == 0
    }

    /// Check if task is delayed
    #[inline]
    pub fn is_delayed(&self) -> bool {
        self.used && self.dly > 0
    }

    /// Scheduler view of the task, `None` for an empty slot
    #[inline]
    pub fn state(&self) -> Option<OsTaskState> {
        match (self.used, self.dly) {
            (false, _) => None,
            (true, 0) => Some(OsTaskState::Ready),
            (true, _) => Some(OsTaskState::Delayed),
        }
    }
}

impl Default for OsTcb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(_: *mut ()) {}

    #[test]
    fn test_new_tcb_is_empty() {
        let tcb = OsTcb::new();
        assert!(!tcb.used);
        assert!(!tcb.is_ready());
        assert_eq!(tcb.state(), None);
    }

    #[test]
    fn test_state_follows_delay() {
        let mut tcb = OsTcb::new();
        tcb.used = true;
        tcb.task_fn = Some(task);
        assert_eq!(tcb.state(), Some(OsTaskState::Ready));

        tcb.dly = 3;
        assert!(tcb.is_delayed());
        assert_eq!(tcb.state(), Some(OsTaskState::Delayed));

        tcb.init();
        assert!(tcb.task_fn.is_none());
        assert_eq!(tcb.state(), None);
    }
}
