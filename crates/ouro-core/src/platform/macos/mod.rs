//! # macOS Self-Debugging Backend
//!
//! Mach implementation of the controller: the process debugs itself
//! through its own task port.
//!
//! macOS uses the Mach microkernel, which delivers debug exceptions as
//! messages on ports rather than via `ptrace`:
//!
//! - **Mach task**: the whole process; owns threads, ports, address space
//! - **Mach threads**: kernel threads within the task
//! - **Mach ports**: message endpoints; one receives exception messages
//!
//! Because the controlled task is the current process, no `task_for_pid`
//! entitlement dance is needed: `mach_task_self()` already grants every
//! right the controller uses. The exception port is bound per thread (not
//! task-wide), so the controller's own threads can stay unbound and a fault
//! in the handler path cannot deadlock the handler.
//!
//! ## Dependencies
//!
//! We use a hybrid approach, same split as elsewhere in the ecosystem:
//! - **mach2 crate**: well-maintained Mach APIs (`mach_task_self`,
//!   `task_threads`, `mach_msg`, exception message types, `KERN_SUCCESS`)
//! - **libc crate**: type definitions (`mach_port_t`, `thread_act_t`,
//!   `natural_t`, `vm_prot_t`, …)
//! - **ffi module**: centralized declarations for the calls mach2 does not
//!   cover (`thread_set_exception_ports`, `mach_vm_allocate`, `task_info`, …)

pub mod constants;
pub mod error;
pub mod exception;
pub(crate) mod ffi;
pub mod machine;
pub mod registers;
pub mod task;
pub mod threads;
pub mod vm;

pub use machine::{MachinePatcher, PatchState};
pub use task::SelfDebugger;
pub use threads::Thread;
pub use vm::AllocationTable;
