//! # macOS Mach API FFI Declarations
//!
//! This module contains the unsafe extern "C" declarations for Mach APIs
//! that are not provided by the `mach2` crate (or that we declare ourselves
//! for direct control over the signature).
//!
//! ## Why Centralize These?
//!
//! - **Visibility**: All FFI declarations in one place for easy review
//! - **Maintenance**: Easier to update when macOS APIs change
//! - **Safety**: Clear separation between safe Rust code and unsafe FFI
//!
//! Every function here interacts directly with the kernel; each is wrapped
//! in a safe abstraction in the sibling modules.

use libc::{
    boolean_t, c_int, kern_return_t, mach_msg_type_number_t, mach_port_t, natural_t, thread_act_t, vm_address_t, vm_map_t,
    vm_offset_t, vm_prot_t, vm_size_t,
};

/// Structure returned by `task_info()` with the `TASK_DYLD_INFO` flavor.
///
/// `all_image_info_addr` is the address of dyld's all-image-infos table in
/// the task; remote debuggers use it to walk loaded images.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskDyldInfo
{
    /// Address of the dyld all-image-infos structure.
    pub all_image_info_addr: u64,
    /// Size of the structure at that address.
    pub all_image_info_size: u64,
    /// Format version of the structure.
    pub all_image_info_format: i32,
}

// Thread control and state.
//
// `thread_get_state` / `thread_set_state` exchange register state as
// arrays of natural_t whose layout depends on the flavor.
#[link(name = "c", kind = "dylib")]
extern "C" {
    /// Read a thread's register state for the given flavor.
    ///
    /// `old_state_count` is in/out: buffer capacity in, entries used out.
    pub fn thread_get_state(
        target_act: thread_act_t,
        flavor: c_int,
        old_state: *mut natural_t,
        old_state_count: *mut mach_msg_type_number_t,
    ) -> kern_return_t;

    /// Write a thread's register state for the given flavor.
    pub fn thread_set_state(
        target_act: thread_act_t,
        flavor: c_int,
        new_state: *const natural_t,
        new_state_count: mach_msg_type_number_t,
    ) -> kern_return_t;

    /// Increment a thread's suspend count; the thread stops running.
    pub fn thread_suspend(target_act: thread_act_t) -> kern_return_t;

    /// Decrement a thread's suspend count; at zero it runs again.
    pub fn thread_resume(target_act: thread_act_t) -> kern_return_t;

    /// Destroy a thread outright. No unwinding, no cleanup; last resort for
    /// a thread parked in a kernel primitive with no cancellation point.
    pub fn thread_terminate(target_act: thread_act_t) -> kern_return_t;

    /// Route the masked exception types raised by `thread` to `new_port`.
    pub fn thread_set_exception_ports(
        thread: thread_act_t,
        exception_mask: u32,
        new_port: mach_port_t,
        behavior: c_int,
        new_flavor: c_int,
    ) -> kern_return_t;
}

// Port management.
#[link(name = "c", kind = "dylib")]
extern "C" {
    /// Allocate a new port right (here: a receive right) in the task.
    pub fn mach_port_allocate(task: mach_port_t, right: c_int, name: *mut mach_port_t) -> kern_return_t;

    /// Insert a right derived from `poly` under `name` in the task; used to
    /// add a send right to our own receive right so the kernel can queue
    /// exception messages on it.
    pub fn mach_port_insert_right(
        task: mach_port_t,
        name: mach_port_t,
        poly: mach_port_t,
        poly_poly: u32,
    ) -> kern_return_t;

    /// Release one user reference to a port name.
    pub fn mach_port_deallocate(task: mach_port_t, name: mach_port_t) -> kern_return_t;

    /// Tear down every right held under a port name. Receivers blocked on
    /// the port wake with `MACH_RCV_PORT_DIED`.
    pub fn mach_port_destroy(task: mach_port_t, name: mach_port_t) -> kern_return_t;
}

// Virtual memory.
//
// The mach_vm_* entry points take 64-bit addresses and sizes regardless of
// the task's pointer width; vm_read/vm_write use the older word-sized
// signatures, which is fine for a self-debugging task.
#[link(name = "c", kind = "dylib")]
extern "C" {
    /// Allocate zero-filled pages in the task's address space.
    pub fn mach_vm_allocate(task: vm_map_t, address: *mut u64, size: u64, flags: c_int) -> kern_return_t;

    /// Change the protection of an address range.
    pub fn mach_vm_protect(
        task: vm_map_t,
        address: u64,
        size: u64,
        set_maximum: boolean_t,
        new_protection: vm_prot_t,
    ) -> kern_return_t;

    /// Release an address range previously allocated in the task.
    pub fn mach_vm_deallocate(task: vm_map_t, address: u64, size: u64) -> kern_return_t;

    /// Copy memory out of the task. The kernel allocates the output buffer
    /// in our address space; it must be freed with `vm_deallocate`.
    pub fn vm_read(
        target_task: vm_map_t,
        address: vm_address_t,
        size: vm_size_t,
        data: *mut vm_offset_t,
        data_count: *mut mach_msg_type_number_t,
    ) -> kern_return_t;

    /// Copy memory into the task.
    pub fn vm_write(
        target_task: vm_map_t,
        address: vm_address_t,
        data: vm_offset_t,
        data_count: mach_msg_type_number_t,
    ) -> kern_return_t;

    /// Free memory in our own address space (used for buffers `vm_read`
    /// and `task_threads` allocate on our behalf).
    pub fn vm_deallocate(target_task: vm_map_t, address: vm_address_t, size: vm_size_t) -> kern_return_t;
}

// Task queries and control.
#[link(name = "c", kind = "dylib")]
extern "C" {
    /// Query task-level info; flavor selects the output structure.
    pub fn task_info(
        target_task: mach_port_t,
        flavor: c_int,
        task_info_out: *mut natural_t,
        task_info_count: *mut mach_msg_type_number_t,
    ) -> kern_return_t;

    /// Terminate the whole task.
    pub fn task_terminate(target_task: mach_port_t) -> kern_return_t;
}
