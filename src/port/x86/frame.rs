//! x86 task frame

/// Initial stack content of a new task, lowest address first.
///
/// The first eleven words are the frame every suspended task has: the
/// `pushal` block followed by an `iret` frame. The remaining words exist
/// only on a fresh stack and form the cdecl call frame the trampoline
/// sees: return address, then its two arguments.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskFrame {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// Ignored by `popal`
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub ret: u32,
    pub entry: u32,
    pub arg: u32,
    /// Keeps the trampoline's stack 16-byte aligned
    _pad: [u32; 2],
}

/// Words restored by a resume (`popal` + `iretl`)
pub const SWITCH_FRAME_WORDS: usize = 11;

/// Reserved EFLAGS bit 1; IF clear
pub const EFLAGS_INITIAL: u32 = 0x0000_0002;

/// Interrupt enable flag
pub const EFLAGS_IF: u32 = 0x0000_0200;

impl TaskFrame {
    /// Frame that `iret`s into `trampoline(entry, arg)` with interrupts
    /// off and `task_return` as its return address.
    pub const fn initial(trampoline: u32, cs: u32, entry: u32, arg: u32, task_return: u32) -> Self {
        TaskFrame {
            edi: 0,
            esi: 0,
            ebp: 0,
            esp: 0,
            ebx: 0,
            edx: 0,
            ecx: 0,
            eax: 0,
            eip: trampoline,
            cs,
            eflags: EFLAGS_INITIAL,
            ret: task_return,
            entry,
            arg,
            _pad: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(core::mem::size_of::<TaskFrame>(), 64);
        assert_eq!(core::mem::offset_of!(TaskFrame, eip), SWITCH_FRAME_WORDS * 4 - 12);
        assert_eq!(core::mem::offset_of!(TaskFrame, ret), SWITCH_FRAME_WORDS * 4);
    }

    #[test]
    fn test_trampoline_stack_alignment() {
        // After iret, esp points at `ret`; esp + 4 must be 16-byte aligned
        // when the frame ends at an aligned stack top.
        let ret = core::mem::offset_of!(TaskFrame, ret);
        let size = core::mem::size_of::<TaskFrame>();
        assert_eq!((size - ret - 4) % 16, 0);
    }

    #[test]
    fn test_initial_frame() {
        let frame = TaskFrame::initial(0x0010_0000, 0x08, 0x0010_2000, 0x0020_0000, 0x0010_3000);
        assert_eq!(frame.eip, 0x0010_0000);
        assert_eq!(frame.cs, 0x08);
        assert_eq!(frame.entry, 0x0010_2000);
        assert_eq!(frame.arg, 0x0020_0000);
        assert_eq!(frame.ret, 0x0010_3000);
        assert_eq!(frame.eflags & EFLAGS_IF, 0);
    }
}
