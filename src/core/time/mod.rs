//! Time management module
//!
//! Provides the tick counter, task delays and the tick interrupt body.

use crate::config::{CFG_PRIO_IDLE, CFG_TICK_RATE_HZ};
use crate::critical::CriticalSection;
use crate::error::{OsError, OsResult};
use crate::kernel::{kernel, kernel_ref, os_int_enter, os_int_exit, Kernel};
use crate::port::Port;
use crate::types::OsTick;

impl<P: Port> Kernel<P> {
    /// Process a system tick
    ///
    /// Advances the tick counter and counts down every sleeping task,
    /// readying those whose delay runs out. Called from the tick interrupt
    /// between `int_enter` and `int_exit`; the exit performs any switch.
    pub fn time_tick(&mut self) {
        let _cs = CriticalSection::enter(&self.port);
        self.flags.tick_increment();
        self.sched.tick_delays();
    }

    /// Delay the current task for `ticks` system ticks
    ///
    /// A zero delay returns at once without yielding.
    ///
    /// # Returns
    /// * `Err(OsError::TimeDlyIsr)` - Called from an ISR
    /// * `Err(OsError::OsNotRunning)` - Kernel not started
    /// * `Err(OsError::SchedLocked)` - Scheduler is locked
    pub fn time_dly(&mut self, ticks: OsTick) -> OsResult<()> {
        if self.flags.int_nesting() > 0 {
            return Err(OsError::TimeDlyIsr);
        }

        if !self.flags.is_running() {
            return Err(OsError::OsNotRunning);
        }

        if self.flags.sched_lock_nesting() > 0 {
            return Err(OsError::SchedLocked);
        }

        if ticks == 0 {
            return Ok(());
        }

        {
            let _cs = CriticalSection::enter(&self.port);
            let prio = self.sched.cpu.prio_cur;
            debug_assert!(prio != CFG_PRIO_IDLE, "idle task must not sleep");

            self.sched.tcb_tbl[prio as usize].dly = ticks;
            self.sched.prio_tbl.remove(prio);
        }

        self.sched();
        Ok(())
    }

    /// Delay the current task for a duration given in hours, minutes,
    /// seconds and milliseconds
    ///
    /// The duration is rounded down to whole ticks, with a minimum of one
    /// tick, and saturates at the largest representable delay.
    pub fn time_dly_hmsm(
        &mut self,
        hours: u8,
        minutes: u8,
        seconds: u8,
        milli: u16,
    ) -> OsResult<()> {
        self.time_dly(hmsm_to_ticks(hours, minutes, seconds, milli))
    }

    /// Get current tick count
    #[inline]
    pub fn time_get(&self) -> OsTick {
        self.flags.tick_get()
    }

    /// Set the tick count
    #[inline]
    pub fn time_set(&mut self, ticks: OsTick) {
        self.flags.tick_set(ticks);
    }
}

/// Convert a duration to system ticks, rounding down to at least one tick
pub fn hmsm_to_ticks(hours: u8, minutes: u8, seconds: u8, milli: u16) -> OsTick {
    let total_ms = hours as u64 * 3_600_000
        + minutes as u64 * 60_000
        + seconds as u64 * 1_000
        + milli as u64;
    let ticks = total_ms * CFG_TICK_RATE_HZ as u64 / 1_000;
    ticks.clamp(1, OsTick::MAX as u64) as OsTick
}

// ============ Public API ============

/// Process a system tick
pub fn os_time_tick() {
    unsafe { kernel() }.time_tick()
}

/// Delay the current task for `ticks` system ticks
pub fn os_time_dly(ticks: OsTick) -> OsResult<()> {
    unsafe { kernel() }.time_dly(ticks)
}

/// Delay the current task for a duration in hours, minutes, seconds and
/// milliseconds
pub fn os_time_dly_hmsm(hours: u8, minutes: u8, seconds: u8, milli: u16) -> OsResult<()> {
    unsafe { kernel() }.time_dly_hmsm(hours, minutes, seconds, milli)
}

/// Get current tick count
#[inline]
pub fn os_time_get() -> OsTick {
    // SAFETY: reads one atomic; no `&mut Kernel` is held across this call
    // by the kernel itself.
    unsafe { kernel_ref() }.flags().tick_get()
}

/// Set the tick count
pub fn os_time_set(ticks: OsTick) {
    unsafe { kernel() }.time_set(ticks)
}

/// Body of the periodic tick interrupt
pub fn os_tick_isr() {
    os_int_enter();
    os_time_tick();
    os_int_exit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmsm_conversion() {
        assert_eq!(hmsm_to_ticks(0, 0, 1, 0), CFG_TICK_RATE_HZ);
        assert_eq!(hmsm_to_ticks(0, 1, 0, 0), 60 * CFG_TICK_RATE_HZ);
        assert_eq!(hmsm_to_ticks(1, 0, 0, 0), 3600 * CFG_TICK_RATE_HZ);
    }

    #[test]
    fn test_hmsm_rounds_down_with_floor_of_one() {
        let tick_ms = (1000 / CFG_TICK_RATE_HZ) as u16;
        assert_eq!(hmsm_to_ticks(0, 0, 0, tick_ms * 2 + tick_ms / 2), 2);
        assert_eq!(hmsm_to_ticks(0, 0, 0, 1), 1);
        assert_eq!(hmsm_to_ticks(0, 0, 0, 0), 1);
    }

    #[test]
    fn test_hmsm_saturates() {
        let max = hmsm_to_ticks(u8::MAX, u8::MAX, u8::MAX, u16::MAX);
        let expected = (255u64 * 3_600_000 + 255 * 60_000 + 255 * 1_000 + 65_535)
            * CFG_TICK_RATE_HZ as u64
            / 1_000;
        assert_eq!(max as u64, expected.min(OsTick::MAX as u64));
    }
}
