//! Software breakpoint bookkeeping.
//!
//! This module centralizes breakpoint lifecycle tracking so the machine
//! layer can focus on the patch mechanics (writing the trap encoding,
//! restoring original bytes). Installation is reference counted: installing
//! at an already-patched address only bumps a counter, and the patch is
//! undone when the last reference is removed.
//!
//! Two indexes are kept consistent as one invariant: `by_address` maps each
//! patched address to its record, and `by_landing` maps the architecture's
//! post-trap instruction pointer back to the patched address. The landing
//! index is consulted exactly once outside install/remove: when rewinding a
//! thread's instruction pointer after a breakpoint exception.

use std::collections::HashMap;

use crate::error::{OuroError, Result};
use crate::types::Address;

/// Machine-layer seam consumed by the breakpoint table.
///
/// Implementations patch the trap encoding into the controlled task and
/// undo it later. `State` is whatever snapshot the machine needs to restore
/// the original instruction; the table stores it but never inspects it.
pub trait PatchOperations
{
    /// Snapshot of the original bytes at a patched address.
    type State;

    /// Number of bytes the patch covers.
    fn patch_len(&self) -> usize;

    /// Widen the page protection at `address` so the patch can be written.
    ///
    /// Must grant read, write, and execute over at least `len` bytes.
    fn widen_protection(&mut self, address: Address, len: usize) -> Result<()>;

    /// Write the trap encoding at `address`.
    ///
    /// Returns the restore snapshot and the landing address: the instruction
    /// pointer a thread will report when it traps on this patch (the patched
    /// address itself on architectures whose trap does not advance the IP,
    /// one instruction past it on those whose trap does).
    fn patch(&mut self, address: Address) -> Result<(Self::State, Address)>;

    /// Restore the original bytes at `address` from the snapshot.
    fn restore(&mut self, state: &Self::State, address: Address) -> Result<()>;
}

/// Record for one patched address.
#[derive(Debug)]
struct BreakpointRecord<S>
{
    machine_state: S,
    landing: Address,
    counter: u32,
}

/// Reference-counted table of installed breakpoints.
///
/// The table exists per controlled task; the task never holds more than one
/// record per address. A record is present iff its counter is at least one.
#[derive(Debug)]
pub struct BreakpointTable<S>
{
    by_address: HashMap<Address, BreakpointRecord<S>>,
    by_landing: HashMap<Address, Address>,
}

impl<S> Default for BreakpointTable<S>
{
    fn default() -> Self
    {
        Self {
            by_address: HashMap::new(),
            by_landing: HashMap::new(),
        }
    }
}

impl<S> BreakpointTable<S>
{
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Install a breakpoint at `address`, or bump its reference count.
    ///
    /// On first installation the page protection is widened to
    /// read+write+execute over the patch length before the machine layer
    /// writes the trap. If the patch itself then fails, the widened
    /// protection is left in place; the page stays writable and executable.
    pub fn install<Ops>(&mut self, ops: &mut Ops, address: Address) -> Result<()>
    where
        Ops: PatchOperations<State = S>,
    {
        if let Some(record) = self.by_address.get_mut(&address) {
            record.counter += 1;
            return Ok(());
        }

        ops.widen_protection(address, ops.patch_len())?;
        let (machine_state, landing) = ops.patch(address)?;
        self.by_landing.insert(landing, address);
        self.by_address.insert(
            address,
            BreakpointRecord {
                machine_state,
                landing,
                counter: 1,
            },
        );
        Ok(())
    }

    /// Drop one reference to the breakpoint at `address`.
    ///
    /// The trap stays in place while other references remain; the last
    /// removal restores the original instruction bytes and drops both index
    /// entries.
    ///
    /// ## Errors
    ///
    /// - `InvalidBreakpoint`: no breakpoint is installed at `address`
    pub fn remove<Ops>(&mut self, ops: &mut Ops, address: Address) -> Result<()>
    where
        Ops: PatchOperations<State = S>,
    {
        let record = self
            .by_address
            .get_mut(&address)
            .ok_or(OuroError::InvalidBreakpoint(address))?;

        if record.counter > 1 {
            record.counter -= 1;
            return Ok(());
        }

        ops.restore(&record.machine_state, address)?;
        let landing = record.landing;
        self.by_address.remove(&address);
        let back_reference = self.by_landing.remove(&landing);
        debug_assert_eq!(back_reference, Some(address));
        Ok(())
    }

    /// Map a landing address back to the patched address, if any.
    ///
    /// Used for instruction-pointer rewind after a breakpoint exception: if
    /// the faulting thread's IP is a known landing address, it is moved back
    /// to the original breakpoint address; otherwise the exception was a
    /// plain step and the IP is left alone.
    #[must_use]
    pub fn original_for_landing(&self, landing: Address) -> Option<Address>
    {
        self.by_landing.get(&landing).copied()
    }

    /// Whether a breakpoint is installed at `address`.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool
    {
        self.by_address.contains_key(&address)
    }

    /// The landing address recorded for the breakpoint at `address`.
    #[must_use]
    pub fn landing_address(&self, address: Address) -> Option<Address>
    {
        self.by_address.get(&address).map(|record| record.landing)
    }

    /// Current reference count at `address` (zero when absent).
    #[must_use]
    pub fn reference_count(&self, address: Address) -> u32
    {
        self.by_address.get(&address).map_or(0, |record| record.counter)
    }

    /// Number of distinct patched addresses.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.by_address.len()
    }

    /// Whether no breakpoints are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.by_address.is_empty()
    }
}
