//! Cortex-M4 port
//!
//! Context switches are deferred to the PendSV exception, which runs once
//! the requesting critical section ends.

pub mod frame;

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod cpu;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use cpu::*;
