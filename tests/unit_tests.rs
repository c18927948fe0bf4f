//! Unit tests for core RTOS modules
//!
//! These tests run on the host (not embedded target) to verify
//! the core algorithms work correctly.

#[cfg(test)]
mod prio_tests {
    use ucosii::config::{CFG_MAX_TASKS, CFG_PRIO_IDLE};
    use ucosii::prio::PrioTable;

    #[test]
    fn test_empty_table() {
        let table = PrioTable::new();
        assert!(table.is_empty());
        assert_eq!(table.get_highest(), CFG_PRIO_IDLE);
    }

    #[test]
    fn test_multiple_priorities() {
        let mut table = PrioTable::new();

        // Insert in random order
        table.insert(4);
        table.insert(1);
        table.insert(6);
        table.insert(0);
        table.insert(2);

        // Highest (lowest number) should be 0
        assert_eq!(table.get_highest(), 0);

        // Remove in order
        table.remove(0);
        assert_eq!(table.get_highest(), 1);

        table.remove(1);
        assert_eq!(table.get_highest(), 2);

        table.remove(2);
        assert_eq!(table.get_highest(), 4);

        table.remove(4);
        assert_eq!(table.get_highest(), 6);

        table.remove(6);
        assert!(table.is_empty());
    }

    #[test]
    fn test_all_priorities() {
        let mut table = PrioTable::new();

        for prio in 0..CFG_MAX_TASKS as u8 {
            table.insert(prio);
        }
        assert_eq!(table.bits().count_ones() as usize, CFG_MAX_TASKS);

        for prio in 0..CFG_MAX_TASKS as u8 {
            assert_eq!(table.get_highest(), prio);
            table.remove(prio);
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_insert_remove() {
        let mut table = PrioTable::new();

        table.insert(3);
        table.insert(3);
        assert_eq!(table.bits(), 1 << 3);

        table.remove(3);
        assert!(table.is_empty());

        // Removing an absent priority is harmless
        table.remove(3);
        assert!(table.is_empty());
    }
}

#[cfg(test)]
mod error_tests {
    use ucosii::error::OsError;

    #[test]
    fn test_error_variants() {
        assert_ne!(OsError::InvalidPriority, OsError::PriorityInUse);
        assert_eq!(OsError::PriorityInUse.code(), 25201);
        assert_eq!(OsError::InvalidPriority.code(), 25203);
        assert_eq!(OsError::TimeDlyIsr.code(), 29301);
    }

    #[test]
    fn test_error_display() {
        let msg = format!("{}", OsError::PriorityInUse);
        assert!(msg.contains("priority already in use"));
        assert!(msg.contains("25201"));
    }

    #[test]
    fn test_error_debug() {
        let msg = format!("{:?}", OsError::StkSizeInvalid);
        assert_eq!(msg, "StkSizeInvalid");
    }
}

#[cfg(test)]
mod types_tests {
    use ucosii::task::OsTcb;
    use ucosii::types::{OsStkData, OsTaskState};

    #[test]
    fn test_task_state_enum() {
        assert_eq!(OsTaskState::Ready as u8, 0);
        assert_eq!(OsTaskState::Delayed as u8, 1);
    }

    #[test]
    fn test_stk_data() {
        let data = OsStkData { free: 60, used: 4 };
        assert_eq!(data.free + data.used, 64);
    }

    #[test]
    fn test_tcb_default() {
        let tcb = OsTcb::default();
        assert!(!tcb.used);
        assert!(tcb.stk_ptr.is_null());
        assert_eq!(tcb.dly, 0);
        assert_eq!(tcb.state(), None);
    }
}

#[cfg(test)]
mod config_tests {
    use ucosii::config::*;

    #[test]
    fn test_config_values() {
        assert!(CFG_MAX_TASKS >= 2 && CFG_MAX_TASKS <= 32);
        assert_eq!(CFG_PRIO_IDLE as usize, CFG_MAX_TASKS - 1);
        assert!(CFG_TICK_RATE_HZ > 0 && CFG_TICK_RATE_HZ <= 1000);
        assert!(CFG_IDLE_STK_SIZE >= CFG_STK_SIZE_MIN);
        assert!(CFG_INT_NESTING_MAX > 0);
        assert!(CFG_SCHED_LOCK_MAX > 0);
    }
}

#[cfg(test)]
mod critical_tests {
    use ucosii::critical::{critical_section, CriticalSection};
    use ucosii::port::sim::SimPort;
    use ucosii::port::Port;

    #[test]
    fn test_nested_sections_restore_in_order() {
        let port = SimPort::new();
        assert!(port.irq_enabled());

        let outer = CriticalSection::enter(&port);
        assert!(!port.irq_enabled());

        {
            let _inner = CriticalSection::enter(&port);
            assert!(!port.irq_enabled());
        }
        // Inner restore keeps the outer section closed
        assert!(!port.irq_enabled());

        drop(outer);
        assert!(port.irq_enabled());
    }

    #[test]
    fn test_section_inside_disabled_region() {
        let port = SimPort::new();
        let token = port.irq_save();
        assert!(!port.irq_enabled());

        critical_section(&port, |_cs| assert!(!port.irq_enabled()));
        assert!(!port.irq_enabled());

        unsafe { port.irq_restore(token) };
        assert!(port.irq_enabled());
    }

    #[test]
    fn test_closure_result_passes_through() {
        let port = SimPort::new();
        let value = critical_section(&port, |_cs| 42);
        assert_eq!(value, 42);
        assert!(port.irq_enabled());
    }
}
