//! # Register Access
//!
//! Thread register access by register set and register index.
//!
//! A register set is a Mach thread-state flavor (`ARM_THREAD_STATE64`,
//! `ARM_DEBUG_STATE64`, `X86_THREAD_STATE64`, …). The kernel exchanges each
//! flavor as an array of `natural_t` (u32) values in which every 64-bit
//! register occupies two consecutive entries, low half first; a register
//! index here selects one of those 64-bit slots.

use libc::{c_int, mach_msg_type_number_t, natural_t, thread_act_t};
use mach2::kern_return::KERN_SUCCESS;

use crate::error::{OuroError, Result};
use crate::platform::macos::error::MachError;
use crate::platform::macos::{constants, ffi};
use crate::types::Address;

/// Read a thread's full register context for the given set.
///
/// The returned vector holds exactly the entries the kernel reported for
/// the flavor.
pub fn read_context(thread: thread_act_t, set: c_int) -> Result<Vec<natural_t>>
{
    let mut state = [0 as natural_t; constants::THREAD_STATE_MAX_COUNT as usize];
    let mut count: mach_msg_type_number_t = constants::THREAD_STATE_MAX_COUNT;
    let kr = unsafe { ffi::thread_get_state(thread, set, state.as_mut_ptr(), &mut count) };
    if kr != KERN_SUCCESS {
        return Err(MachError::from(kr).into());
    }
    Ok(state[..count as usize].to_vec())
}

/// Write a thread's full register context for the given set.
pub fn write_context(thread: thread_act_t, set: c_int, state: &[natural_t]) -> Result<()>
{
    let kr = unsafe { ffi::thread_set_state(thread, set, state.as_ptr(), state.len() as mach_msg_type_number_t) };
    if kr != KERN_SUCCESS {
        return Err(MachError::from(kr).into());
    }
    Ok(())
}

/// Read one 64-bit register from the given set.
///
/// ## Errors
///
/// - `InvalidArgument`: `index` is outside the set
pub fn read_register(thread: thread_act_t, set: c_int, index: usize) -> Result<u64>
{
    let state = read_context(thread, set)?;
    slot_value(&state, set, index)
}

/// Write one 64-bit register in the given set.
///
/// Reads the full context, replaces the slot, and writes the context back.
///
/// ## Errors
///
/// - `InvalidArgument`: `index` is outside the set
pub fn write_register(thread: thread_act_t, set: c_int, index: usize, value: u64) -> Result<()>
{
    let mut state = read_context(thread, set)?;
    let low = index * 2;
    if low + 1 >= state.len() {
        return Err(OuroError::InvalidArgument(format!(
            "register {index} is outside register set {set}"
        )));
    }
    state[low] = (value & 0xffff_ffff) as natural_t;
    state[low + 1] = (value >> 32) as natural_t;
    write_context(thread, set, &state)
}

/// Instruction pointer of a thread.
pub(crate) fn get_ip(thread: thread_act_t) -> Result<Address>
{
    read_register(thread, general_purpose_set(), constants::PC_SLOT).map(Address::from)
}

/// Move a thread's instruction pointer.
pub(crate) fn set_ip(thread: thread_act_t, address: Address) -> Result<()>
{
    write_register(thread, general_purpose_set(), constants::PC_SLOT, address.raw())
}

/// The general-purpose register set for the build architecture.
#[must_use]
pub const fn general_purpose_set() -> c_int
{
    #[cfg(target_arch = "aarch64")]
    {
        constants::ARM_THREAD_STATE64
    }
    #[cfg(target_arch = "x86_64")]
    {
        constants::X86_THREAD_STATE64
    }
}

/// Arm or clear the single-step trap for a thread.
///
/// The next `resume` after arming delivers one instruction's worth of
/// progress and a breakpoint-class exception.
#[cfg(target_arch = "aarch64")]
pub(crate) fn set_single_step(thread: thread_act_t, enable: bool) -> Result<()>
{
    let mut mdscr = read_register(thread, constants::ARM_DEBUG_STATE64, constants::MDSCR_EL1_SLOT)?;
    if enable {
        mdscr |= constants::MDSCR_EL1_SS;
    } else {
        mdscr &= !constants::MDSCR_EL1_SS;
    }
    write_register(thread, constants::ARM_DEBUG_STATE64, constants::MDSCR_EL1_SLOT, mdscr)
}

/// Arm or clear the single-step trap for a thread.
#[cfg(target_arch = "x86_64")]
pub(crate) fn set_single_step(thread: thread_act_t, enable: bool) -> Result<()>
{
    let mut rflags = read_register(thread, constants::X86_THREAD_STATE64, constants::RFLAGS_SLOT)?;
    if enable {
        rflags |= constants::RFLAGS_TRAP_FLAG;
    } else {
        rflags &= !constants::RFLAGS_TRAP_FLAG;
    }
    write_register(thread, constants::X86_THREAD_STATE64, constants::RFLAGS_SLOT, rflags)
}

fn slot_value(state: &[natural_t], set: c_int, index: usize) -> Result<u64>
{
    let low = index * 2;
    if low + 1 >= state.len() {
        return Err(OuroError::InvalidArgument(format!(
            "register {index} is outside register set {set}"
        )));
    }
    let low_half = u64::from(state[low]);
    let high_half = u64::from(state[low + 1]);
    Ok(low_half | (high_half << 32))
}
