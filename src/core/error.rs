//! Error types
//!
//! Uses Rust's Result pattern instead of C-style error codes. The numeric
//! discriminants are stable so they can be reported over a debug link.

use core::fmt;

/// RTOS error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ OS state errors ============
    /// OS is not initialized
    OsNotInit = 24203,
    /// OS is already running
    OsRunning = 24202,
    /// OS is not running
    OsNotRunning = 24201,

    // ============ Priority errors ============
    /// Priority is outside the task table
    InvalidPriority = 25203,
    /// Priority slot already holds a task
    PriorityInUse = 25201,

    // ============ Scheduler errors ============
    /// Cannot lock scheduler from ISR
    SchedLockIsr = 28002,
    /// Scheduler is locked
    SchedLocked = 28003,
    /// Scheduler is not locked
    SchedNotLocked = 28004,
    /// Cannot unlock scheduler from ISR
    SchedUnlockIsr = 28005,
    /// Lock nesting overflow
    LockNestingOvf = 21001,

    // ============ Stack errors ============
    /// Stack smaller than `CFG_STK_SIZE_MIN`
    StkSizeInvalid = 28208,

    // ============ Task errors ============
    /// No task at this priority
    TaskNotExist = 29010,

    // ============ Time errors ============
    /// Cannot delay from ISR
    TimeDlyIsr = 29301,
}

/// Result type alias for RTOS operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Numeric error code
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            OsError::OsNotInit => "kernel not initialized",
            OsError::OsRunning => "kernel already running",
            OsError::OsNotRunning => "kernel not running",
            OsError::InvalidPriority => "priority out of range",
            OsError::PriorityInUse => "priority already in use",
            OsError::SchedLockIsr => "scheduler lock from interrupt",
            OsError::SchedLocked => "scheduler is locked",
            OsError::SchedNotLocked => "scheduler is not locked",
            OsError::SchedUnlockIsr => "scheduler unlock from interrupt",
            OsError::LockNestingOvf => "scheduler lock nesting overflow",
            OsError::StkSizeInvalid => "stack too small",
            OsError::TaskNotExist => "no task at this priority",
            OsError::TimeDlyIsr => "delay from interrupt",
        };
        write!(f, "{} ({})", msg, self.code())
    }
}
