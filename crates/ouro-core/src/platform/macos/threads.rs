//! # Thread Handles and Enumeration
//!
//! Sibling thread access via Mach thread ports.
//!
//! ## Mach APIs Used
//!
//! - **task_threads()**: Enumerate threads in the task
//! - **thread_suspend() / thread_resume()**: Per-thread run control
//! - **vm_deallocate()**: Free the array `task_threads()` allocates
//!
//! A [`Thread`] value is a snapshot handle: the thread it names may exit at
//! any point after enumeration, in which case operations on the handle
//! return a kernel error. Callers must not assume a handle stays valid
//! across resumption.

use std::mem;

use libc::{mach_msg_type_number_t, mach_port_t, thread_act_t, vm_address_t, vm_map_t, vm_size_t};
use mach2::kern_return::KERN_SUCCESS;
use mach2::task::task_threads;
use mach2::traps::mach_task_self;

use crate::error::Result;
use crate::platform::macos::error::MachError;
use crate::platform::macos::{ffi, registers};
use crate::types::{Address, ThreadId};

/// Handle to one sibling thread in the controlled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thread
{
    port: thread_act_t,
}

impl Thread
{
    /// Wrap a raw Mach thread port.
    pub(crate) fn from_port(port: thread_act_t) -> Self
    {
        Self { port }
    }

    /// The thread's kernel id (its port name).
    #[must_use]
    pub fn id(&self) -> ThreadId
    {
        ThreadId::from(u64::from(self.port))
    }

    /// The raw Mach port for kernel calls.
    pub(crate) fn port(&self) -> thread_act_t
    {
        self.port
    }

    /// Current instruction pointer.
    pub fn get_ip(&self) -> Result<Address>
    {
        registers::get_ip(self.port)
    }

    /// Move the instruction pointer.
    pub fn set_ip(&self, address: Address) -> Result<()>
    {
        registers::set_ip(self.port, address)
    }

    /// Suspend the thread (increments its suspend count).
    pub fn suspend(&self) -> Result<()>
    {
        let kr = unsafe { ffi::thread_suspend(self.port) };
        if kr != KERN_SUCCESS {
            return Err(MachError::from(kr).into());
        }
        Ok(())
    }

    /// Resume the thread (decrements its suspend count).
    pub fn resume(&self) -> Result<()>
    {
        let kr = unsafe { ffi::thread_resume(self.port) };
        if kr != KERN_SUCCESS {
            return Err(MachError::from(kr).into());
        }
        Ok(())
    }

    /// Arm or clear the single-step trap.
    ///
    /// With the trap armed, the next resume executes one instruction and
    /// raises a breakpoint-class exception.
    pub fn set_single_step(&self, enable: bool) -> Result<()>
    {
        registers::set_single_step(self.port, enable)
    }
}

/// Current thread ports of the task.
///
/// The array `task_threads()` hands back lives in our address space and is
/// released before returning; the port names are copied out. The result is
/// a snapshot: threads may come and go immediately after.
pub(crate) fn task_thread_ports(task: mach_port_t) -> Result<Vec<thread_act_t>>
{
    unsafe {
        let mut threads: *mut thread_act_t = std::ptr::null_mut();
        let mut count: mach_msg_type_number_t = 0;
        let kr = task_threads(task, &mut threads, &mut count);
        if kr != KERN_SUCCESS {
            return Err(MachError::from(kr).into());
        }

        let ports = std::slice::from_raw_parts(threads, count as usize).to_vec();
        deallocate_thread_array(threads, count);
        Ok(ports)
    }
}

/// Free the array allocated by `task_threads()`.
fn deallocate_thread_array(threads: *mut thread_act_t, count: mach_msg_type_number_t)
{
    if threads.is_null() || count == 0 {
        return;
    }

    let size = (count as usize).saturating_mul(mem::size_of::<thread_act_t>()) as vm_size_t;
    unsafe {
        let _ = ffi::vm_deallocate(mach_task_self() as vm_map_t, threads as vm_address_t, size);
    }
}
