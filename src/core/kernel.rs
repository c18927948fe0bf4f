//! Kernel state and initialization
//!
//! All scheduler state lives in one aggregate, [`Kernel`], generic over the
//! [`Port`] it runs on. Operations take the aggregate by exclusive
//! reference and guard shared state with the port's critical section.
//!
//! The process-wide instance is reached through the `os_*` free functions,
//! after an explicit [`os_init`]. There is no teardown.

use core::cell::UnsafeCell;

use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::config::{
    CFG_IDLE_STK_SIZE, CFG_INT_NESTING_MAX, CFG_MAX_TASKS, CFG_PRIO_IDLE, CFG_SCHED_LOCK_MAX,
};
use crate::critical::{critical_section, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::port::{ActivePort, Port};
use crate::prio::PrioTable;
use crate::task::OsTcb;
use crate::types::{OsNestingCtr, OsPrio, OsStkElement, OsStkPtr, OsTick};

// ============ Kernel State Structures ============

/// Atomic kernel flags
pub struct KernelFlags {
    initialized: AtomicBool,
    running: AtomicBool,
    int_nesting: AtomicU8,
    sched_lock_nesting: AtomicU8,
    tick_counter: AtomicU32,
    ctx_sw_ctr: AtomicU32,
}

impl KernelFlags {
    const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            int_nesting: AtomicU8::new(0),
            sched_lock_nesting: AtomicU8::new(0),
            tick_counter: AtomicU32::new(0),
            ctx_sw_ctr: AtomicU32::new(0),
        }
    }

    pub(crate) fn reset(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.int_nesting.store(0, Ordering::SeqCst);
        self.sched_lock_nesting.store(0, Ordering::SeqCst);
        self.tick_counter.store(0, Ordering::SeqCst);
        self.ctx_sw_ctr.store(0, Ordering::SeqCst);
    }

    /// Check if the OS is running
    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Check if OS is initialized
    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Get current tick count
    #[inline(always)]
    pub fn tick_get(&self) -> OsTick {
        self.tick_counter.load(Ordering::Relaxed)
    }

    /// Get interrupt nesting level
    #[inline(always)]
    pub fn int_nesting(&self) -> OsNestingCtr {
        self.int_nesting.load(Ordering::Relaxed)
    }

    /// Get scheduler lock nesting level
    #[inline(always)]
    pub fn sched_lock_nesting(&self) -> OsNestingCtr {
        self.sched_lock_nesting.load(Ordering::SeqCst)
    }

    /// Number of context switches since init
    #[inline(always)]
    pub fn ctx_sw_ctr(&self) -> u32 {
        self.ctx_sw_ctr.load(Ordering::Relaxed)
    }

    /// Increment and return tick count. Wraps at `OsTick::MAX`.
    #[inline(always)]
    pub(crate) fn tick_increment(&self) -> OsTick {
        self.tick_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    #[inline(always)]
    pub(crate) fn tick_set(&self, ticks: OsTick) {
        self.tick_counter.store(ticks, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn ctx_sw_increment(&self) {
        self.ctx_sw_ctr.fetch_add(1, Ordering::Relaxed);
    }

    /// Enter ISR. Saturates at `CFG_INT_NESTING_MAX`.
    ///
    /// Past saturation enters and exits no longer pair up, so the outermost
    /// exit is reached early. Debug builds treat that as a bug.
    #[inline(always)]
    pub(crate) fn int_enter(&self) {
        let saturated = self
            .int_nesting
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |nesting| {
                (nesting < CFG_INT_NESTING_MAX).then_some(nesting + 1)
            })
            .is_err();
        debug_assert!(!saturated, "interrupt nesting overflow");
    }

    /// Decrement int nesting, never below zero
    #[inline(always)]
    pub(crate) fn int_nesting_dec(&self) -> OsNestingCtr {
        let nesting = self.int_nesting.load(Ordering::Relaxed);
        if nesting > 0 {
            self.int_nesting.store(nesting - 1, Ordering::Relaxed);
        }
        nesting.saturating_sub(1)
    }

    /// Set initialized flag
    #[inline(always)]
    pub(crate) fn set_initialized(&self, val: bool) {
        self.initialized.store(val, Ordering::SeqCst);
    }

    /// Set running flag
    #[inline(always)]
    pub(crate) fn set_running(&self, val: bool) {
        self.running.store(val, Ordering::SeqCst);
    }

    /// Lock scheduler
    pub(crate) fn try_sched_lock(&self) -> OsResult<()> {
        let nesting = self.sched_lock_nesting.load(Ordering::SeqCst);
        if nesting >= CFG_SCHED_LOCK_MAX {
            return Err(OsError::LockNestingOvf);
        }
        self.sched_lock_nesting.store(nesting + 1, Ordering::SeqCst);
        Ok(())
    }

    /// Unlock scheduler
    pub(crate) fn try_sched_unlock(&self) -> OsResult<OsNestingCtr> {
        let nesting = self.sched_lock_nesting.load(Ordering::SeqCst);
        if nesting == 0 {
            return Err(OsError::SchedNotLocked);
        }
        self.sched_lock_nesting.store(nesting - 1, Ordering::SeqCst);
        Ok(nesting - 1)
    }
}

/// Results of the last scheduling decision
///
/// Tasks are named by their slot index, which is also their priority.
#[derive(Debug, Clone, Copy)]
pub struct CpuState {
    /// Slot of the running task (`None` before start)
    pub tcb_cur: Option<usize>,
    /// Slot of the highest priority ready task
    pub tcb_high_rdy: Option<usize>,
    /// Current running task's priority
    pub prio_cur: OsPrio,
    /// Highest ready priority
    pub prio_high_rdy: OsPrio,
    /// A switch was warranted but deferred by nesting or a lock
    pub ctx_sw_pend: bool,
}

impl CpuState {
    pub const fn new() -> Self {
        Self {
            tcb_cur: None,
            tcb_high_rdy: None,
            prio_cur: CFG_PRIO_IDLE,
            prio_high_rdy: CFG_PRIO_IDLE,
            ctx_sw_pend: false,
        }
    }
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}

/// Task table, ready set and scheduling results
pub struct SchedState {
    pub(crate) tcb_tbl: [OsTcb; CFG_MAX_TASKS],
    pub(crate) prio_tbl: PrioTable,
    pub(crate) cpu: CpuState,
}

impl SchedState {
    const fn new() -> Self {
        Self {
            tcb_tbl: [OsTcb::new(); CFG_MAX_TASKS],
            prio_tbl: PrioTable::new(),
            cpu: CpuState::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        for (prio, tcb) in self.tcb_tbl.iter_mut().enumerate() {
            tcb.init();
            tcb.prio = prio as OsPrio;
        }
        self.prio_tbl.init();
        self.cpu = CpuState::new();
    }

    /// Find the highest ready priority and cache it as the next task.
    pub(crate) fn sched_new(&mut self) -> OsPrio {
        let prio = self.prio_tbl.get_highest();
        self.cpu.prio_high_rdy = prio;
        self.cpu.tcb_high_rdy = Some(prio as usize);
        prio
    }

    /// Count down every sleeping task, readying those that reach zero.
    pub(crate) fn tick_delays(&mut self) {
        for tcb in self.tcb_tbl.iter_mut().filter(|tcb| tcb.used && tcb.dly > 0) {
            tcb.dly -= 1;
            if tcb.dly == 0 {
                self.prio_tbl.insert(tcb.prio);
            }
        }
    }
}

/// Which switch primitive a scheduling pass may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SwitchPath {
    /// From task level
    Task,
    /// From the outermost interrupt exit
    IntExit,
}

/// Kernel aggregate
pub struct Kernel<P> {
    pub(crate) port: P,
    pub(crate) flags: KernelFlags,
    pub(crate) sched: SchedState,
}

impl<P> Kernel<P> {
    pub const fn new(port: P) -> Self {
        Self {
            port,
            flags: KernelFlags::new(),
            sched: SchedState::new(),
        }
    }

    /// The port this kernel runs on
    #[inline(always)]
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Kernel flags
    #[inline(always)]
    pub fn flags(&self) -> &KernelFlags {
        &self.flags
    }

    /// Check if the kernel has been started
    #[inline]
    pub fn is_running(&self) -> bool {
        self.flags.is_running()
    }

    /// Interrupt nesting depth
    #[inline]
    pub fn int_nesting(&self) -> OsNestingCtr {
        self.flags.int_nesting()
    }

    /// Scheduler lock depth
    #[inline]
    pub fn sched_lock_nesting(&self) -> OsNestingCtr {
        self.flags.sched_lock_nesting()
    }

    /// Number of context switches since init
    #[inline]
    pub fn ctx_sw_ctr(&self) -> u32 {
        self.flags.ctx_sw_ctr()
    }

    /// Ready set, bit `p` for priority `p`
    #[inline]
    pub fn rdy_bits(&self) -> u32 {
        self.sched.prio_tbl.bits()
    }

    /// Check if the task at `prio` is in the ready set
    #[inline]
    pub fn is_ready(&self, prio: OsPrio) -> bool {
        self.sched.prio_tbl.is_set(prio)
    }

    /// Priority of the running task
    #[inline]
    pub fn prio_cur(&self) -> OsPrio {
        self.sched.cpu.prio_cur
    }

    /// Highest ready priority from the last scheduling decision
    #[inline]
    pub fn prio_high_rdy(&self) -> OsPrio {
        self.sched.cpu.prio_high_rdy
    }

    /// Snapshot of the scheduling results
    #[inline]
    pub fn cpu_state(&self) -> CpuState {
        self.sched.cpu
    }

    /// Whether a deferred switch is waiting for nesting or a lock to unwind
    #[inline]
    pub fn ctx_sw_pending(&self) -> bool {
        self.sched.cpu.ctx_sw_pend
    }

    /// Context slot of the task at `prio`, as handed to the port
    pub fn ctx_slot(&self, prio: OsPrio) -> *const OsStkPtr {
        &raw const self.sched.tcb_tbl[prio as usize].stk_ptr
    }
}

impl<P: Port> Kernel<P> {
    /// Initialize the kernel
    ///
    /// Resets every task slot and counter, then installs the idle task at
    /// the lowest priority on `idle_stk`. Must be called before any other
    /// operation.
    ///
    /// # Returns
    /// * `Ok(())` - Initialization successful
    /// * `Err(OsError::OsRunning)` - OS is already running
    pub fn init(&mut self, idle_stk: &'static mut [OsStkElement]) -> OsResult<()> {
        if self.flags.is_running() {
            return Err(OsError::OsRunning);
        }

        {
            let _cs = CriticalSection::enter(&self.port);
            self.flags.reset();
            self.sched.reset();
        }

        self.task_create_raw(os_idle_task, core::ptr::null_mut(), idle_stk, CFG_PRIO_IDLE)?;
        self.flags.set_initialized(true);

        crate::os_info!("kernel initialized");
        Ok(())
    }

    /// Start multitasking
    ///
    /// Dispatches the highest priority ready task. On hardware this never
    /// returns; control belongs to the tasks from here on.
    ///
    /// # Returns
    /// * `Err(OsError::OsNotInit)` - OS not initialized
    /// * `Err(OsError::OsRunning)` - OS is already running
    pub fn start(&mut self) -> OsResult<()> {
        if !self.flags.is_initialized() {
            return Err(OsError::OsNotInit);
        }

        if self.flags.is_running() {
            return Err(OsError::OsRunning);
        }

        let cs = CriticalSection::enter(&self.port);

        let prio = self.sched.sched_new();
        self.sched.cpu.prio_cur = prio;
        self.sched.cpu.tcb_cur = Some(prio as usize);
        self.flags.set_running(true);

        crate::os_info!("starting, first task at priority {=u8}", prio);

        let to = &raw const self.sched.tcb_tbl[prio as usize].stk_ptr;
        unsafe { self.port.start_high_rdy(to) };

        drop(cs);
        Ok(())
    }

    /// Enter ISR
    ///
    /// Call at the very start of every interrupt handler that touches
    /// scheduler state.
    #[inline]
    pub fn int_enter(&mut self) {
        self.flags.int_enter();
    }

    /// Exit ISR
    ///
    /// Every exit re-evaluates the ready set. While handlers are still
    /// nested a better task only marks the switch pending; the outermost
    /// exit performs it through the interrupt-exit path. An exit without a
    /// matching enter is ignored.
    pub fn int_exit(&mut self) {
        let _cs = CriticalSection::enter(&self.port);

        if self.flags.int_nesting() == 0 {
            crate::os_warn!("int_exit without matching int_enter");
            return;
        }

        self.flags.int_nesting_dec();
        Self::sched_in_cs(&self.port, &self.flags, &mut self.sched, SwitchPath::IntExit);
    }

    /// Lock the scheduler
    ///
    /// While locked, switches are deferred. Nestable.
    pub fn sched_lock(&mut self) -> OsResult<()> {
        if !self.flags.is_running() {
            return Err(OsError::OsNotRunning);
        }

        if self.flags.int_nesting() > 0 {
            return Err(OsError::SchedLockIsr);
        }

        critical_section(&self.port, |_cs| self.flags.try_sched_lock())
    }

    /// Unlock the scheduler
    ///
    /// Releasing the outermost lock runs the scheduler, so a switch
    /// deferred while locked happens here.
    pub fn sched_unlock(&mut self) -> OsResult<()> {
        if !self.flags.is_running() {
            return Err(OsError::OsNotRunning);
        }

        if self.flags.int_nesting() > 0 {
            return Err(OsError::SchedUnlockIsr);
        }

        let remaining = critical_section(&self.port, |_cs| self.flags.try_sched_unlock())?;
        if remaining == 0 {
            self.sched();
        }
        Ok(())
    }
}

/// Internal IDLE task function
fn os_idle_task(_: *mut ()) {
    loop {
        crate::port::cpu_idle();
    }
}

// ============ Global Instance ============

/// Holder for the process-wide kernel
pub(crate) struct KernelCell<T>(UnsafeCell<T>);

// SAFETY: single core; every mutation of the contents happens inside the
// port's critical section or is a single atomic access.
unsafe impl<T> Sync for KernelCell<T> {}

impl<T> KernelCell<T> {
    const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }
}

/// Global kernel instance
static KERNEL: KernelCell<Kernel<ActivePort>> = KernelCell::new(Kernel::new(ActivePort::new()));

/// IDLE task stack
static mut IDLE_STK: [OsStkElement; CFG_IDLE_STK_SIZE] = [0; CFG_IDLE_STK_SIZE];

/// Get the global kernel
///
/// # Safety
/// The caller must not keep the reference across another call into the
/// kernel from the same context.
#[inline(always)]
pub(crate) unsafe fn kernel() -> &'static mut Kernel<ActivePort> {
    unsafe { &mut *KERNEL.0.get() }
}

/// Shared view of the global kernel, for reads of atomic state
///
/// # Safety
/// No `&mut` from [`kernel`] may be live in the calling context. Only the
/// atomic flags may be read through the returned reference.
#[inline(always)]
pub(crate) unsafe fn kernel_ref() -> &'static Kernel<ActivePort> {
    unsafe { &*KERNEL.0.get() }
}

// ============ Public API ============

/// Initialize the RTOS kernel
///
/// This must be called before any other OS function.
/// IDLE task is automatically created.
///
/// # Returns
/// * `Ok(())` - Initialization successful
/// * `Err(OsError::OsRunning)` - OS is already running
pub fn os_init() -> OsResult<()> {
    // SAFETY: the idle slot is the only owner of IDLE_STK; a second
    // `os_init` discards the first idle task before reusing the stack.
    let idle_stk: &'static mut [OsStkElement] = unsafe { &mut *(&raw mut IDLE_STK) };
    unsafe { kernel() }.init(idle_stk)
}

/// Start multitasking
///
/// This function starts the highest priority ready task. It never returns
/// on hardware.
///
/// # Returns
/// * `Err(OsError::OsNotInit)` - OS not initialized
/// * `Err(OsError::OsRunning)` - OS is already running
pub fn os_start() -> OsResult<()> {
    unsafe { kernel() }.start()
}

/// Enter ISR
#[inline]
pub fn os_int_enter() {
    unsafe { kernel() }.int_enter()
}

/// Exit ISR
pub fn os_int_exit() {
    unsafe { kernel() }.int_exit()
}

/// Lock the scheduler
pub fn os_sched_lock() -> OsResult<()> {
    unsafe { kernel() }.sched_lock()
}

/// Unlock the scheduler
pub fn os_sched_unlock() -> OsResult<()> {
    unsafe { kernel() }.sched_unlock()
}

/// Number of context switches since init
#[inline]
pub fn os_ctx_sw_ctr() -> u32 {
    // SAFETY: called from task level between kernel operations; reads one
    // atomic.
    unsafe { kernel_ref() }.flags.ctx_sw_ctr()
}
