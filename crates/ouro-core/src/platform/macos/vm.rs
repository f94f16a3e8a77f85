//! # macOS Virtual-Memory Operations
//!
//! Allocation, protection, and read/write access to the controlled task's
//! address space, plus the bookkeeping table that makes deallocation safe.
//!
//! Allocation and deallocation are paired through [`AllocationTable`]:
//! `allocate` records the base address and size the kernel handed back, and
//! `deallocate` only accepts a recorded base, releasing exactly the region
//! that was allocated.

use std::collections::HashMap;

use libc::{mach_msg_type_number_t, mach_port_t, vm_address_t, vm_map_t, vm_offset_t, vm_prot_t, vm_size_t};
use mach2::kern_return::KERN_SUCCESS;
use mach2::vm_statistics::VM_FLAGS_ANYWHERE;

use crate::error::{OuroError, Result};
use crate::platform::macos::error::MachError;
use crate::platform::macos::ffi;
use crate::types::{Address, Permissions};

/// Translate a permission set to native protection bits.
///
/// Each granted permission maps to the corresponding `VM_PROT_*` bit;
/// nothing else is set.
#[must_use]
pub fn protection_bits(permissions: Permissions) -> vm_prot_t
{
    let mut protection: vm_prot_t = 0;
    if permissions.read {
        protection |= libc::VM_PROT_READ;
    }
    if permissions.write {
        protection |= libc::VM_PROT_WRITE;
    }
    if permissions.execute {
        protection |= libc::VM_PROT_EXECUTE;
    }
    protection
}

/// Regions allocated in the controlled task, keyed by base address.
#[derive(Debug, Default)]
pub struct AllocationTable
{
    regions: HashMap<Address, u64>,
}

impl AllocationTable
{
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Whether a region with this base address is recorded.
    #[must_use]
    pub fn contains(&self, base: Address) -> bool
    {
        self.regions.contains_key(&base)
    }

    /// Size of the recorded region at `base`, if any.
    #[must_use]
    pub fn size_of(&self, base: Address) -> Option<u64>
    {
        self.regions.get(&base).copied()
    }

    /// Number of live allocations.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.regions.len()
    }

    /// Whether no allocations are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.regions.is_empty()
    }

    fn record(&mut self, base: Address, size: u64)
    {
        self.regions.insert(base, size);
    }

    fn take(&mut self, base: Address) -> Option<u64>
    {
        self.regions.remove(&base)
    }
}

/// Allocate `size` bytes anywhere in the task with the given permissions.
///
/// The pages come back zero-filled. If applying the requested protection
/// fails, the fresh region is deallocated again before the error surfaces,
/// so a failed call leaves no trace in the task.
pub fn allocate(task: mach_port_t, table: &mut AllocationTable, size: u64, permissions: Permissions) -> Result<Address>
{
    let mut base: u64 = 0;
    let kr = unsafe { ffi::mach_vm_allocate(task as vm_map_t, &mut base, size, VM_FLAGS_ANYWHERE) };
    if kr != KERN_SUCCESS {
        return Err(MachError::from(kr).into());
    }

    let address = Address::from(base);
    if let Err(err) = protect(task, address, size, permissions) {
        // Compensating deallocation; the protect error is the one reported.
        unsafe {
            let _ = ffi::mach_vm_deallocate(task as vm_map_t, base, size);
        }
        return Err(err);
    }

    table.record(address, size);
    Ok(address)
}

/// Release the region recorded at `address`.
///
/// ## Errors
///
/// - `InvalidAllocation`: `address` is not the base of a recorded region
pub fn deallocate(task: mach_port_t, table: &mut AllocationTable, address: Address) -> Result<()>
{
    let size = table.take(address).ok_or(OuroError::InvalidAllocation(address))?;
    let kr = unsafe { ffi::mach_vm_deallocate(task as vm_map_t, address.raw(), size) };
    if kr != KERN_SUCCESS {
        return Err(MachError::from(kr).into());
    }
    Ok(())
}

/// Apply the given permissions to an address range.
pub fn protect(task: mach_port_t, address: Address, size: u64, permissions: Permissions) -> Result<()>
{
    let kr = unsafe { ffi::mach_vm_protect(task as vm_map_t, address.raw(), size, 0, protection_bits(permissions)) };
    if kr != KERN_SUCCESS {
        return Err(MachError::from(kr).into());
    }
    Ok(())
}

/// Read memory from the task.
///
/// `vm_read()` allocates a kernel-filled buffer in our address space; the
/// bytes are copied into a `Vec` and the buffer is released before
/// returning.
pub fn read_memory(task: mach_port_t, address: Address, len: usize) -> Result<Vec<u8>>
{
    unsafe {
        let mut data: vm_offset_t = 0;
        let mut data_count: mach_msg_type_number_t = 0;

        let kr = ffi::vm_read(
            task as vm_map_t,
            address.raw() as vm_address_t,
            len as vm_size_t,
            &mut data,
            &mut data_count,
        );
        if kr != KERN_SUCCESS {
            return Err(MachError::from(kr).into());
        }

        let bytes_read = data_count as usize;
        let mut buffer = vec![0u8; bytes_read];
        std::ptr::copy_nonoverlapping(data as *const u8, buffer.as_mut_ptr(), bytes_read);

        let _ = ffi::vm_deallocate(task as vm_map_t, data as vm_address_t, data_count as vm_size_t);

        Ok(buffer)
    }
}

/// Write memory into the task.
///
/// Returns the number of bytes written (always `data.len()` on success).
pub fn write_memory(task: mach_port_t, address: Address, data: &[u8]) -> Result<usize>
{
    unsafe {
        let kr = ffi::vm_write(
            task as vm_map_t,
            address.raw() as vm_address_t,
            data.as_ptr() as vm_offset_t,
            data.len() as mach_msg_type_number_t,
        );
        if kr != KERN_SUCCESS {
            return Err(MachError::from(kr).into());
        }
        Ok(data.len())
    }
}
