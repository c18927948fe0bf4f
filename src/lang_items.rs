//! Language items and default exception handlers

// When defmt feature is enabled on bare-metal targets, log over RTT
#[cfg(all(feature = "defmt", target_os = "none"))]
use defmt_rtt as _;

#[cfg(all(feature = "defmt", target_arch = "arm", target_os = "none"))]
use panic_probe as _;

// Defmt panic handler
#[cfg(all(feature = "defmt", target_arch = "arm", target_os = "none"))]
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    cortex_m::asm::udf()
}

// Panic handler when defmt is disabled
#[cfg(all(not(feature = "defmt"), target_arch = "arm", target_os = "none"))]
#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {
        cortex_m::asm::udf();
    }
}

// Other bare-metal ports park the faulting context like a returned task
#[cfg(all(target_os = "none", not(target_arch = "arm")))]
#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    crate::os_error!("panic");
    crate::port::os_task_return()
}

// Default HardFault handler
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[cortex_m_rt::exception]
unsafe fn HardFault(_ef: &cortex_m_rt::ExceptionFrame) -> ! {
    loop {
        cortex_m::asm::udf();
    }
}

// Defmt timestamp
#[cfg(all(feature = "defmt", target_os = "none"))]
defmt::timestamp!("{=u32}", crate::time::os_time_get());
