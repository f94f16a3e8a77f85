//! Tests for error types and messages

use ouro_core::error::OuroError;
use ouro_core::types::Address;

#[test]
fn test_invalid_breakpoint_message_includes_address()
{
    let err = OuroError::InvalidBreakpoint(Address::from(0x2000));
    assert_eq!(err.to_string(), "No breakpoint at address 0x2000");
}

#[test]
fn test_invalid_allocation_message_includes_address()
{
    let err = OuroError::InvalidAllocation(Address::from(0xdead_0000));
    assert_eq!(err.to_string(), "No allocation with base address 0xdead0000");
}

#[test]
fn test_controller_gone_message()
{
    let err = OuroError::ControllerGone;
    assert_eq!(err.to_string(), "Controller has been torn down");
}

#[test]
fn test_poisoned_message_names_the_state()
{
    let err = OuroError::Poisoned("controller event state");
    assert_eq!(err.to_string(), "Synchronization state poisoned: controller event state");
}

#[test]
fn test_errors_implement_std_error()
{
    fn assert_error<E: std::error::Error>(_err: &E) {}
    assert_error(&OuroError::ControllerGone);
}

#[cfg(target_os = "macos")]
#[test]
fn test_mach_error_preserves_unknown_code()
{
    use ouro_core::platform::macos::error::MachError;

    let err = MachError::from(4242);
    assert!(matches!(err, MachError::Unknown(4242)));
    assert_eq!(err.code(), 4242);

    let err = MachError::from(libc::KERN_INVALID_ARGUMENT);
    assert!(matches!(err, MachError::InvalidArgument));
    assert_eq!(err.code(), 4);
}
