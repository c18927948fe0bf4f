//! Cortex-M4 task frame

/// Context structure stored on the task stack, lowest address first.
///
/// `r4`-`r11` and `exc_return` are saved by PendSV; `r0` onward is the
/// frame the core stacks on exception entry.
#[repr(C, align(4))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UcStk {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    /// LR value for exception return
    pub exc_return: u32,
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

/// Frame size in words
pub const CONTEXT_STACK_SIZE: usize = 17;

/// Return to thread mode, process stack, no FP state
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// xPSR with only the Thumb bit set
pub const XPSR_THUMB: u32 = 0x0100_0000;

impl UcStk {
    /// Frame that enters `trampoline(entry, arg)` with `task_return` as the
    /// link register.
    pub const fn initial(trampoline: u32, entry: u32, arg: u32, task_return: u32) -> Self {
        UcStk {
            r4: 0x04040404,
            r5: 0x05050505,
            r6: 0x06060606,
            r7: 0x07070707,
            r8: 0x08080808,
            r9: 0x09090909,
            r10: 0x10101010,
            r11: 0x11111111,
            exc_return: EXC_RETURN_THREAD_PSP,
            r0: entry,
            r1: arg,
            r2: 0,
            r3: 0,
            r12: 0,
            lr: task_return | 1,
            pc: trampoline | 1,
            xpsr: XPSR_THUMB,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        assert_eq!(core::mem::size_of::<UcStk>(), CONTEXT_STACK_SIZE * 4);
    }

    #[test]
    fn test_hardware_frame_follows_software_frame() {
        assert_eq!(core::mem::offset_of!(UcStk, exc_return), 8 * 4);
        assert_eq!(core::mem::offset_of!(UcStk, r0), 9 * 4);
        assert_eq!(core::mem::offset_of!(UcStk, xpsr), 16 * 4);
    }

    #[test]
    fn test_initial_frame() {
        let frame = UcStk::initial(0x0800_1000, 0x0800_2000, 0x2000_0000, 0x0800_3000);
        assert_eq!(frame.pc, 0x0800_1001);
        assert_eq!(frame.lr, 0x0800_3001);
        assert_eq!(frame.r0, 0x0800_2000);
        assert_eq!(frame.r1, 0x2000_0000);
        assert_eq!(frame.xpsr, XPSR_THUMB);
        assert_eq!(frame.exc_return, EXC_RETURN_THREAD_PSP);
    }
}
