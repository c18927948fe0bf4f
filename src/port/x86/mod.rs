//! x86 (i686, ring 0) port
//!
//! Tasks and interrupts share one frame shape: a `pushal` block above an
//! `iret` frame. A voluntary switch fakes the `iret` frame so both paths
//! resume a task the same way.

pub mod frame;

// Saved contexts hold integer registers only.
#[cfg(all(target_arch = "x86", target_os = "none", target_feature = "sse"))]
compile_error!("the x86 port does not save SSE state; build for a target with `-sse`");

#[cfg(all(target_arch = "x86", target_os = "none"))]
mod cpu;

#[cfg(all(target_arch = "x86", target_os = "none"))]
pub use cpu::*;
