//! OS-facing helpers: thread placement and the direct kernel call.

use crate::rendezvous::CallError;
use crate::topology::CoreId;

/// Pin the calling thread to `core`.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(core: CoreId) -> Result<(), std::io::Error> {
    use std::mem;

    unsafe {
        let mut set: libc::cpu_set_t = mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core as usize, &mut set);

        if libc::sched_setaffinity(0, mem::size_of::<libc::cpu_set_t>(), &set) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(_core: CoreId) -> Result<(), std::io::Error> {
    Ok(()) // No affinity control on non-Linux
}

/// The cheapest round trip into the kernel; one call is one operation.
#[cfg(target_os = "linux")]
pub fn direct_call() -> Result<(), CallError> {
    let rc = unsafe { libc::syscall(libc::SYS_getpid) };
    if rc < 0 {
        return Err(CallError::Kernel(
            std::io::Error::last_os_error().raw_os_error().unwrap_or(0),
        ));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn direct_call() -> Result<(), CallError> {
    // process::id() still crosses into the OS on most platforms.
    std::hint::black_box(std::process::id());
    Ok(())
}
