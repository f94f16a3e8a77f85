//! # Error Types
//!
//! General error handling for the controller.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Protocol-framing faults (`InvalidPacket`, `InvalidChecksum`) are *not*
//! errors: the framer is total and surfaces them as packet variants. Payload
//! parsing likewise reports an absent value (`Option::None`) rather than
//! failing loudly; callers classify.

use thiserror::Error;

use crate::types::Address;

/// Main error type for controller operations
///
/// ## Error Categories
///
/// 1. **Kernel errors**: `Mach` (any failure from a task/thread/VM primitive)
/// 2. **Synchronization errors**: `Poisoned` (a mutex/condvar was poisoned)
/// 3. **Breakpoint errors**: `InvalidBreakpoint` (remove on an unknown address)
/// 4. **Allocation errors**: `InvalidAllocation` (deallocate on an unknown base)
/// 5. **Lifetime errors**: `ControllerGone` (an `Interrupter` outlived its controller)
/// 6. **Argument errors**: `InvalidArgument` (everything the kernel never saw)
#[derive(Error, Debug)]
pub enum OuroError
{
    /// Mach kernel API error
    ///
    /// Wraps the `kern_return_t` from any task/thread/VM primitive; the raw
    /// code is preserved for unrecognized values.
    #[cfg(target_os = "macos")]
    #[error("Mach API error: {0}")]
    Mach(#[from] crate::platform::macos::error::MachError),

    /// A mutex or condition variable guarding controller state was poisoned
    ///
    /// The std synchronization primitives replace raw pthread calls, so the
    /// only failure they surface is a panic on another thread while the lock
    /// was held. Once this is returned, the controller's shared state can no
    /// longer be trusted.
    #[error("Synchronization state poisoned: {0}")]
    Poisoned(&'static str),

    /// No breakpoint is installed at the given address
    ///
    /// Returned by `remove_breakpoint` when the address was never installed
    /// (or its reference count already dropped to zero).
    #[error("No breakpoint at address {0}")]
    InvalidBreakpoint(Address),

    /// No allocation is recorded at the given base address
    ///
    /// Deallocation requires the exact base address returned by `allocate`.
    #[error("No allocation with base address {0}")]
    InvalidAllocation(Address),

    /// An `Interrupter` was used after the controller was torn down
    ///
    /// The interrupter holds a non-owning back-reference; it faults instead
    /// of extending the controller's lifetime.
    #[error("Controller has been torn down")]
    ControllerGone,

    /// Invalid argument passed to a controller function
    ///
    /// Examples:
    /// - A resume plan naming a thread that is not part of the task
    /// - A register index outside the selected register set
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for `Result<T, OuroError>`
pub type Result<T> = std::result::Result<T, OuroError>;
