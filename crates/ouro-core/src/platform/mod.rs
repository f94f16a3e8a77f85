//! Platform backends.
//!
//! The Mach backend is the only real one; the controller debugs its own
//! host process through task and thread ports. The platform-independent
//! parts of the crate (wire protocol, breakpoint bookkeeping, event hub)
//! only need a notion of "the calling thread's kernel id", provided here
//! for every platform so their tests run anywhere.

#[cfg(target_os = "macos")]
pub mod macos;

use crate::types::ThreadId;

/// Kernel id of the calling thread.
///
/// On Mach this is the thread's own port name, the same name
/// `task_threads()` reports for it, which is what enumeration filters
/// against. The name is fetched once per thread and cached; the kernel
/// keeps the port right alive for the thread's lifetime.
#[cfg(target_os = "macos")]
#[must_use]
pub fn current_thread_id() -> ThreadId
{
    thread_local! {
        static SELF_PORT: libc::mach_port_t = unsafe { mach2::mach_init::mach_thread_self() };
    }
    SELF_PORT.with(|port| ThreadId::from(u64::from(*port)))
}

/// Kernel id of the calling thread.
///
/// Non-Mach fallback used by the platform-independent tests: a synthetic
/// id unique per thread for the lifetime of the process.
#[cfg(not(target_os = "macos"))]
#[must_use]
pub fn current_thread_id() -> ThreadId
{
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static SYNTHETIC_ID: u64 = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    }
    SYNTHETIC_ID.with(|id| ThreadId::from(*id))
}
