//! # Machine-Level Breakpoint Patching
//!
//! The concrete patch sequence behind the breakpoint table: write the
//! architecture's trap encoding over the first bytes of an instruction,
//! remember the original bytes, and report where execution lands when the
//! trap fires.
//!
//! - **ARM64**: `BRK #0` (4 bytes); the trap reports the patched address
//!   itself, so landing address equals patch address.
//! - **x86-64**: `INT3` (1 byte); the trap reports the following address,
//!   so landing address is patch address + 1 and the controller rewinds.

use libc::mach_port_t;

use crate::breakpoints::PatchOperations;
use crate::error::Result;
use crate::platform::macos::{constants, vm};
use crate::types::{Address, Permissions};

/// Number of bytes the software-breakpoint patch covers.
pub const BREAKPOINT_BYTES: usize = constants::TRAP_INSTRUCTION.len();

/// Snapshot of the instruction bytes replaced by a trap encoding.
///
/// Opaque to the breakpoint table; only [`MachinePatcher::restore`] looks
/// inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchState
{
    original: Vec<u8>,
}

/// [`PatchOperations`] implementation over the controlled task.
#[derive(Debug, Clone, Copy)]
pub struct MachinePatcher
{
    task: mach_port_t,
}

impl MachinePatcher
{
    /// Create a patcher writing into the given task.
    #[must_use]
    pub fn new(task: mach_port_t) -> Self
    {
        Self { task }
    }
}

impl PatchOperations for MachinePatcher
{
    type State = PatchState;

    fn patch_len(&self) -> usize
    {
        BREAKPOINT_BYTES
    }

    fn widen_protection(&mut self, address: Address, len: usize) -> Result<()>
    {
        vm::protect(self.task, address, len as u64, Permissions::ALL)
    }

    fn patch(&mut self, address: Address) -> Result<(PatchState, Address)>
    {
        let original = vm::read_memory(self.task, address, BREAKPOINT_BYTES)?;
        vm::write_memory(self.task, address, &constants::TRAP_INSTRUCTION)?;
        Ok((PatchState { original }, address + constants::TRAP_LANDING_OFFSET))
    }

    fn restore(&mut self, state: &PatchState, address: Address) -> Result<()>
    {
        vm::write_memory(self.task, address, &state.original)?;
        Ok(())
    }
}
