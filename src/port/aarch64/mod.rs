//! AArch64 port (EL1h)
//!
//! Tasks and interrupts share one frame shape: x0-x30, ELR, SPSR and the
//! FP/SIMD registers. A voluntary switch builds that frame by hand and both
//! paths leave with `eret`.
//!
//! The board must enable FP/SIMD at EL1 (`CPACR_EL1.FPEN`) before
//! `os_start`.

pub mod frame;

#[cfg(all(target_arch = "aarch64", target_os = "none", not(target_feature = "neon")))]
compile_error!("the AArch64 port saves FP/SIMD state and needs a target with `neon`");

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
mod cpu;

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub use cpu::*;
