//! Process-wide kernel reached through the `os_*` functions
//!
//! The global instance is shared by everything in this binary, so the
//! whole lifecycle runs as a single test.

use ucosii::config::{CFG_PRIO_IDLE, CFG_TICK_RATE_HZ};
use ucosii::error::OsError;
use ucosii::types::OsStkElement;
use ucosii::{
    os_ctx_sw_ctr, os_init, os_int_enter, os_int_exit, os_sched, os_sched_lock, os_sched_unlock,
    os_start, os_task_create, os_task_stk_chk, os_tick_isr, os_time_dly, os_time_dly_hmsm,
    os_time_get, os_time_set, os_time_tick,
};

fn task(_: *mut ()) {}

fn stack(words: usize) -> &'static mut [OsStkElement] {
    Box::leak(vec![0; words].into_boxed_slice())
}

#[test]
fn test_global_lifecycle() {
    assert_eq!(os_start(), Err(OsError::OsNotInit));

    os_init().unwrap();
    assert!(os_task_stk_chk(CFG_PRIO_IDLE).is_ok());

    os_task_create(task, core::ptr::null_mut(), stack(128), 2).unwrap();
    assert_eq!(
        os_task_create(task, core::ptr::null_mut(), stack(128), 2),
        Err(OsError::PriorityInUse)
    );
    assert_eq!(os_time_dly(1), Err(OsError::OsNotRunning));

    os_start().unwrap();
    assert_eq!(os_start(), Err(OsError::OsRunning));
    assert_eq!(os_ctx_sw_ctr(), 0);

    // Task 2 is current; it sleeps and idle takes over
    os_time_dly(3).unwrap();
    assert_eq!(os_ctx_sw_ctr(), 1);

    for _ in 0..2 {
        os_tick_isr();
    }
    assert_eq!(os_time_get(), 2);
    assert_eq!(os_ctx_sw_ctr(), 1);

    // Last tick delivered by hand
    os_int_enter();
    os_time_tick();
    os_int_exit();
    assert_eq!(os_time_get(), 3);
    assert_eq!(os_ctx_sw_ctr(), 2);

    os_sched_lock().unwrap();
    os_sched();
    os_sched_unlock().unwrap();
    assert_eq!(os_ctx_sw_ctr(), 2);

    os_time_dly_hmsm(0, 0, 1, 0).unwrap();
    assert_eq!(os_ctx_sw_ctr(), 3);
    for _ in 0..CFG_TICK_RATE_HZ {
        os_tick_isr();
    }
    assert_eq!(os_ctx_sw_ctr(), 4);

    os_time_set(u32::MAX);
    os_tick_isr();
    assert_eq!(os_time_get(), 0);
}
