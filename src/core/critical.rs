//! Critical section handling
//!
//! A critical section saves the port's interrupt state, disables
//! interrupts, and restores exactly that saved state when it ends. There is
//! no nesting counter: an inner section restores "disabled" and the outer
//! one restores whatever was live before it.

use crate::port::Port;

/// RAII guard for critical sections
///
/// When this guard is created, interrupts are disabled.
/// When it is dropped, interrupts are restored to their previous state.
pub struct CriticalSection<'p, P: Port> {
    port: &'p P,
    token: P::Token,
}

impl<'p, P: Port> CriticalSection<'p, P> {
    /// Enter a critical section by disabling interrupts.
    ///
    /// Returns a guard that will restore interrupt state when dropped.
    #[inline(always)]
    pub fn enter(port: &'p P) -> Self {
        let token = port.irq_save();
        CriticalSection { port, token }
    }
}

impl<P: Port> Drop for CriticalSection<'_, P> {
    #[inline(always)]
    fn drop(&mut self) {
        // SAFETY: the token came from `irq_save` on the same port and is
        // restored exactly once.
        unsafe { self.port.irq_restore(self.token) };
    }
}

/// Execute a closure with interrupts disabled
#[inline]
pub fn critical_section<P, F, R>(port: &P, f: F) -> R
where
    P: Port,
    F: FnOnce(&CriticalSection<'_, P>) -> R,
{
    let cs = CriticalSection::enter(port);
    f(&cs)
}
