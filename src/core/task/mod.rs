//! Task management module
//!
//! Provides task creation and stack checking.

mod tcb;

pub use tcb::OsTcb;

use crate::config::{CFG_MAX_TASKS, CFG_STK_FILL, CFG_STK_SIZE_MIN};
use crate::critical::{critical_section, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::kernel::{kernel, Kernel};
use crate::port::Port;
use crate::types::{OsPrio, OsStkData, OsStkElement, OsTaskFn, OsTaskState, OsTick};

impl<P: Port> Kernel<P> {
    /// Create a new task
    ///
    /// The task is ready at once. If the kernel is running and the new task
    /// outranks the caller, the caller is preempted before this returns.
    ///
    /// # Arguments
    /// * `task_fn` - Task entry point function
    /// * `arg` - Argument to pass to task function
    /// * `stack` - Stack region, owned by the task from now on
    /// * `prio` - Task priority, also its slot in the task table
    pub fn task_create(
        &mut self,
        task_fn: OsTaskFn,
        arg: *mut (),
        stack: &'static mut [OsStkElement],
        prio: OsPrio,
    ) -> OsResult<()> {
        if !self.flags.is_initialized() {
            return Err(OsError::OsNotInit);
        }

        self.task_create_raw(task_fn, arg, stack, prio)?;

        if self.flags.is_running() {
            self.sched();
        }
        Ok(())
    }

    /// Slot setup shared with the idle task, which is created before the
    /// kernel counts as initialized.
    pub(crate) fn task_create_raw(
        &mut self,
        task_fn: OsTaskFn,
        arg: *mut (),
        stack: &'static mut [OsStkElement],
        prio: OsPrio,
    ) -> OsResult<()> {
        if prio as usize >= CFG_MAX_TASKS {
            return Err(OsError::InvalidPriority);
        }

        if stack.len() < CFG_STK_SIZE_MIN {
            return Err(OsError::StkSizeInvalid);
        }

        let _cs = CriticalSection::enter(&self.port);
        let sched = &mut self.sched;

        if sched.tcb_tbl[prio as usize].used {
            return Err(OsError::PriorityInUse);
        }

        // The fill pattern lets `task_stk_chk` find the high-water mark.
        stack.fill(CFG_STK_FILL);
        let stk_base = stack.as_mut_ptr();
        let stk_size = stack.len();

        // SAFETY: the `'static` stack now belongs to this slot alone.
        let stk_ptr = unsafe { self.port.task_stk_init(task_fn, arg, stk_base, stk_size) };

        let tcb = &mut sched.tcb_tbl[prio as usize];
        tcb.init();
        tcb.stk_ptr = stk_ptr;
        tcb.stk_base = stk_base;
        tcb.stk_size = stk_size;
        tcb.task_fn = Some(task_fn);
        tcb.task_arg = arg;
        tcb.prio = prio;
        tcb.used = true;

        sched.prio_tbl.insert(prio);

        if sched.cpu.tcb_high_rdy.is_none() || prio <= sched.cpu.prio_high_rdy {
            sched.cpu.prio_high_rdy = prio;
            sched.cpu.tcb_high_rdy = Some(prio as usize);
        }

        crate::os_debug!("task created at priority {=u8}, {=usize} words", prio, stk_size);
        Ok(())
    }

    /// Check stack usage of the task at `prio`
    ///
    /// Counts the words at the far end of the stack that still hold the
    /// fill pattern. Words written with any value, zero included, count as
    /// used. The free count can only shrink over the task's life.
    pub fn task_stk_chk(&self, prio: OsPrio) -> OsResult<OsStkData> {
        if prio as usize >= CFG_MAX_TASKS {
            return Err(OsError::InvalidPriority);
        }

        critical_section(&self.port, |_cs| {
            let tcb = &self.sched.tcb_tbl[prio as usize];
            if !tcb.used {
                return Err(OsError::TaskNotExist);
            }

            // SAFETY: `stk_base..stk_base + stk_size` is the task's stack.
            let free = (0..tcb.stk_size)
                .take_while(|&i| unsafe { tcb.stk_base.add(i).read_volatile() } == CFG_STK_FILL)
                .count();

            Ok(OsStkData {
                free,
                used: tcb.stk_size - free,
            })
        })
    }

    /// State of the task at `prio`, `None` if the slot is empty
    pub fn task_state(&self, prio: OsPrio) -> Option<OsTaskState> {
        self.sched.tcb_tbl.get(prio as usize).and_then(OsTcb::state)
    }

    /// Remaining delay of the task at `prio`, `None` if the slot is empty
    pub fn task_dly(&self, prio: OsPrio) -> Option<OsTick> {
        self.sched
            .tcb_tbl
            .get(prio as usize)
            .filter(|tcb| tcb.used)
            .map(|tcb| tcb.dly)
    }
}

// ============ Public API ============

/// Create a new task
///
/// # Arguments
/// * `task_fn` - Task entry point function
/// * `arg` - Argument to pass to task function
/// * `stack` - Stack region for the task
/// * `prio` - Task priority (0 is highest)
///
/// # Returns
/// * `Err(OsError::OsNotInit)` - OS not initialized
/// * `Err(OsError::InvalidPriority)` - Priority outside the task table
/// * `Err(OsError::StkSizeInvalid)` - Stack shorter than `CFG_STK_SIZE_MIN`
/// * `Err(OsError::PriorityInUse)` - Another task has this priority
pub fn os_task_create(
    task_fn: OsTaskFn,
    arg: *mut (),
    stack: &'static mut [OsStkElement],
    prio: OsPrio,
) -> OsResult<()> {
    unsafe { kernel() }.task_create(task_fn, arg, stack, prio)
}

/// Check stack usage of the task at `prio`
pub fn os_task_stk_chk(prio: OsPrio) -> OsResult<OsStkData> {
    unsafe { kernel() }.task_stk_chk(prio)
}
