//! Ready set bitmap
//!
//! One bit per priority slot: bit `p` is set while the task at priority `p`
//! exists and is not sleeping. The highest ready priority is found with a
//! linear scan from priority 0 upward, which is plenty for the handful of
//! slots the task table holds.

use crate::config::{CFG_MAX_TASKS, CFG_PRIO_IDLE};
use crate::types::OsPrio;

/// Priority bitmap table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioTable {
    bitmap: u32,
}

impl PrioTable {
    pub const fn new() -> Self {
        PrioTable { bitmap: 0 }
    }

    pub fn init(&mut self) {
        self.bitmap = 0;
    }

    /// Mark a priority ready
    #[inline]
    pub fn insert(&mut self, prio: OsPrio) {
        debug_assert!((prio as usize) < CFG_MAX_TASKS);
        self.bitmap |= 1 << prio;
    }

    /// Mark a priority not ready
    #[inline]
    pub fn remove(&mut self, prio: OsPrio) {
        debug_assert!((prio as usize) < CFG_MAX_TASKS);
        self.bitmap &= !(1 << prio);
    }

    /// Get the highest ready priority, or the idle priority if no bit is set
    #[inline]
    pub fn get_highest(&self) -> OsPrio {
        (0..CFG_MAX_TASKS as OsPrio)
            .find(|&prio| self.is_set(prio))
            .unwrap_or(CFG_PRIO_IDLE)
    }

    /// Check if a specific priority is ready
    #[inline]
    pub fn is_set(&self, prio: OsPrio) -> bool {
        (prio as usize) < CFG_MAX_TASKS && self.bitmap & (1 << prio) != 0
    }

    /// Check if no priority is ready
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitmap == 0
    }

    /// Raw bitmap, bit `p` for priority `p`
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bitmap
    }
}

impl Default for PrioTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table() {
        let table = PrioTable::new();
        assert!(table.is_empty());
        assert_eq!(table.get_highest(), CFG_PRIO_IDLE);
    }

    #[test]
    fn test_insert_remove() {
        let mut table = PrioTable::new();

        table.insert(5);
        assert!(table.is_set(5));
        assert!(!table.is_set(4));
        assert_eq!(table.get_highest(), 5);

        table.insert(3);
        assert_eq!(table.get_highest(), 3);

        table.remove(3);
        assert_eq!(table.get_highest(), 5);

        table.remove(5);
        assert!(table.is_empty());
    }

    #[test]
    fn test_bit_per_priority() {
        let mut table = PrioTable::new();
        table.insert(0);
        table.insert(2);
        table.insert(CFG_PRIO_IDLE);
        assert_eq!(table.bits(), 0b101 | (1 << CFG_PRIO_IDLE));
    }

    #[test]
    fn test_idle_only() {
        let mut table = PrioTable::new();
        table.insert(CFG_PRIO_IDLE);
        assert_eq!(table.get_highest(), CFG_PRIO_IDLE);
        table.insert(1);
        assert_eq!(table.get_highest(), 1);
    }

    #[test]
    fn test_out_of_range_is_never_set() {
        let table = PrioTable { bitmap: u32::MAX };
        assert!(!table.is_set(CFG_MAX_TASKS as OsPrio));
    }
}
