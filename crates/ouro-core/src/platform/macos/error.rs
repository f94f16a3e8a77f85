//! # macOS Mach API Errors
//!
//! Error types for Mach API operations.
//!
//! Mach APIs return `kern_return_t` values, which are integer error codes.
//! This module converts those codes into Rust error types with descriptive
//! messages while preserving the raw code for everything unrecognized.

use thiserror::Error;

/// Mach kernel API error
///
/// Common `kern_return_t` values:
///
/// - `KERN_SUCCESS` (0): Operation succeeded
/// - `KERN_INVALID_ADDRESS` (1): Address not mapped
/// - `KERN_INVALID_ARGUMENT` (4): Invalid argument
/// - `KERN_PROTECTION_FAILURE` (5): Permission denied
/// - `KERN_FAILURE` (14): General failure
///
/// ## Why convert to an enum?
///
/// - **Type safety**: Can match on specific error types
/// - **Better error messages**: Descriptive strings instead of numbers
/// - **Error chaining**: Converts to `OuroError` automatically
#[derive(Error, Debug)]
pub enum MachError
{
    /// `KERN_PROTECTION_FAILURE` (error code 5)
    ///
    /// The operation touched memory or a port the kernel would not allow,
    /// e.g. protecting a region beyond its maximum protection.
    #[error("KERN_PROTECTION_FAILURE: Permission denied")]
    ProtectionFailure,

    /// `KERN_INVALID_ARGUMENT` (error code 4)
    ///
    /// One of the arguments passed to the Mach API was invalid: a stale
    /// thread port, a bad state flavor, an unmapped address.
    #[error("KERN_INVALID_ARGUMENT: Invalid port, flavor, or address")]
    InvalidArgument,

    /// `KERN_INVALID_ADDRESS` (error code 1)
    ///
    /// The address is not mapped in the task, or the requested range runs
    /// past the end of its region.
    #[error("KERN_INVALID_ADDRESS: Address not mapped")]
    InvalidAddress,

    /// `KERN_FAILURE` (error code 14)
    ///
    /// A general failure: the thread has exited, the port is dead, or the
    /// kernel simply declined.
    #[error("KERN_FAILURE: General kernel failure")]
    Failure,

    /// Unknown Mach error code
    ///
    /// An error code we don't recognize; the integer value is preserved so
    /// it can be looked up.
    #[error("Unknown Mach error: {0}")]
    Unknown(i32),
}

impl MachError
{
    /// The raw `kern_return_t` this error was built from.
    #[must_use]
    pub const fn code(&self) -> i32
    {
        match self {
            MachError::InvalidAddress => 1,
            MachError::InvalidArgument => 4,
            MachError::ProtectionFailure => 5,
            MachError::Failure => 14,
            MachError::Unknown(code) => *code,
        }
    }
}

impl From<libc::kern_return_t> for MachError
{
    fn from(code: libc::kern_return_t) -> Self
    {
        match code {
            1 => MachError::InvalidAddress,
            libc::KERN_INVALID_ARGUMENT => MachError::InvalidArgument,
            libc::KERN_PROTECTION_FAILURE => MachError::ProtectionFailure,
            libc::KERN_FAILURE => MachError::Failure,
            _ => MachError::Unknown(code),
        }
    }
}
