//! Exception and event types delivered by the controller.

use crate::types::ThreadId;

/// Kind of a caught debug exception.
///
/// Mirrors the Mach exception types the exception server subscribes to.
/// Values the server doesn't recognize are preserved in `Other` so callers
/// can still classify them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind
{
    /// Breakpoint or single-step trap (`EXC_BREAKPOINT`).
    Breakpoint,
    /// Invalid memory access (`EXC_BAD_ACCESS`).
    BadAccess,
    /// Illegal or undefined instruction (`EXC_BAD_INSTRUCTION`).
    BadInstruction,
    /// Arithmetic fault such as divide-by-zero (`EXC_ARITHMETIC`).
    Arithmetic,
    /// Software-generated exception (`EXC_SOFTWARE`).
    Software,
    /// Any other exception type, raw value preserved.
    Other(i32),
}

impl ExceptionKind
{
    /// Classify a raw Mach exception type.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self
    {
        match raw {
            1 => ExceptionKind::BadAccess,
            2 => ExceptionKind::BadInstruction,
            3 => ExceptionKind::Arithmetic,
            5 => ExceptionKind::Software,
            6 => ExceptionKind::Breakpoint,
            other => ExceptionKind::Other(other),
        }
    }

    /// The raw Mach exception type value.
    #[must_use]
    pub const fn raw(self) -> i32
    {
        match self {
            ExceptionKind::BadAccess => 1,
            ExceptionKind::BadInstruction => 2,
            ExceptionKind::Arithmetic => 3,
            ExceptionKind::Software => 5,
            ExceptionKind::Breakpoint => 6,
            ExceptionKind::Other(raw) => raw,
        }
    }
}

/// A debug exception caught from a sibling thread.
///
/// `data` is the exception's machine-word payload (the Mach `code` array).
/// The buffer is owned: it is created by the exception server, handed to the
/// consumer of [`DebugEvent::Exception`], and dropped with the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception
{
    /// Thread that raised the exception.
    pub thread: ThreadId,
    /// Exception classification.
    pub kind: ExceptionKind,
    /// Machine-word payload delivered with the exception message.
    pub data: Vec<u64>,
}

/// Outcome of a [`wait_for_event`](crate::controller::EventHub::wait_for_event) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent
{
    /// A sibling thread raised a debug exception.
    Exception(Exception),
    /// Another thread posted an interrupt to wake the controller.
    Interrupted,
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_exception_kind_round_trip()
    {
        for kind in [
            ExceptionKind::BadAccess,
            ExceptionKind::BadInstruction,
            ExceptionKind::Arithmetic,
            ExceptionKind::Software,
            ExceptionKind::Breakpoint,
        ] {
            assert_eq!(ExceptionKind::from_raw(kind.raw()), kind);
        }
    }

    #[test]
    fn test_exception_kind_unknown_preserved()
    {
        assert_eq!(ExceptionKind::from_raw(42), ExceptionKind::Other(42));
        assert_eq!(ExceptionKind::Other(42).raw(), 42);
    }
}
