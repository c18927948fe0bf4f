//! AArch64 task frame

/// Saved register state, lowest address first. Used unchanged for
/// interrupted tasks, voluntarily switched tasks and new tasks.
///
/// Compiled Rust uses the SIMD registers freely, so q0-q31 and the FP
/// control and status registers are part of every saved context.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    /// x0-x30
    pub x: [u64; 31],
    pub elr: u64,
    pub spsr: u64,
    _pad: u64,
    /// q0-q31
    pub q: [u128; 32],
    pub fpcr: u64,
    pub fpsr: u64,
}

/// Frame size in bytes
pub const FRAME_SIZE: usize = 800;

/// Byte offset of `elr`; `spsr` follows it
pub const ELR_OFFSET: usize = 248;

/// Byte offset of `q0`
pub const FP_OFFSET: usize = 272;

/// Byte offset of `fpcr`; `fpsr` follows it
pub const FPCR_OFFSET: usize = 784;

/// SPSR mode field for EL1 using SP_EL1
pub const SPSR_EL1H: u64 = 0b0101;

/// SPSR D, A, I and F mask bits
pub const SPSR_DAIF: u64 = 0b1111 << 6;

const _: () = assert!(core::mem::size_of::<TrapFrame>() == FRAME_SIZE);

impl TrapFrame {
    /// Frame that enters `trampoline(entry, arg)` at EL1h with all
    /// exceptions masked; the trampoline unmasks IRQs itself.
    pub const fn initial(trampoline: u64, entry: u64, arg: u64, task_return: u64) -> Self {
        let mut x = [0; 31];
        x[0] = entry;
        x[1] = arg;
        x[30] = task_return;
        TrapFrame {
            x,
            elr: trampoline,
            spsr: SPSR_EL1H | SPSR_DAIF,
            _pad: 0,
            q: [0; 32],
            fpcr: 0,
            fpsr: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(core::mem::offset_of!(TrapFrame, elr), ELR_OFFSET);
        assert_eq!(core::mem::offset_of!(TrapFrame, spsr), ELR_OFFSET + 8);
        assert_eq!(core::mem::align_of::<TrapFrame>(), 16);
        assert_eq!(core::mem::offset_of!(TrapFrame, q), FP_OFFSET);
        assert_eq!(core::mem::offset_of!(TrapFrame, fpcr), FPCR_OFFSET);
        assert_eq!(core::mem::offset_of!(TrapFrame, fpsr), FPCR_OFFSET + 8);
    }

    #[test]
    fn test_fp_slots_fit_store_offsets() {
        // `stp q` takes a signed offset up to 1008 in steps of 16
        assert_eq!(FP_OFFSET % 16, 0);
        assert!(FP_OFFSET + 30 * 16 <= 1008);
        // `str x` takes an unsigned offset in steps of 8
        assert_eq!(FPCR_OFFSET % 8, 0);
    }

    #[test]
    fn test_initial_frame() {
        let frame = TrapFrame::initial(0x4000_1000, 0x4000_2000, 0x4008_0000, 0x4000_3000);
        assert_eq!(frame.elr, 0x4000_1000);
        assert_eq!(frame.x[0], 0x4000_2000);
        assert_eq!(frame.x[1], 0x4008_0000);
        assert_eq!(frame.x[30], 0x4000_3000);
        assert_eq!(frame.spsr & 0xF, SPSR_EL1H);
        assert_eq!(frame.q, [0; 32]);
        assert_eq!(frame.fpcr, 0);
        // IRQs masked until the trampoline runs
        assert_ne!(frame.spsr & (1 << 7), 0);
    }
}
