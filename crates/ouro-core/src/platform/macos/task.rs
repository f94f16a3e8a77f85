//! # Self-Debugging Controller
//!
//! The controller attaches to its own host process: it owns the task port,
//! the exception server, the breakpoint table, and the allocation table,
//! and mediates every inspection or mutation of sibling threads.
//!
//! ## Threads and Ownership
//!
//! Three controller-side threads exist at most: the thread that constructed
//! the controller (the controller thread), the exception server thread, and
//! an optional utility thread. All three are excluded from enumeration so
//! the control surface only ever reports the threads being debugged.
//!
//! The task handle, exception port, breakpoint table, and allocation table
//! are owned exclusively by the controller and touched only from the
//! controller thread. A foreign thread that needs to mutate shared state
//! must go through [`SelfDebugger::interrupt`] (or an [`Interrupter`]),
//! whose closure runs inside the event hub's critical section.

use std::sync::Arc;
use std::thread::JoinHandle;

use libc::{c_int, mach_port_t, natural_t, thread_act_t};
use mach2::kern_return::KERN_SUCCESS;
use mach2::traps::mach_task_self;
use tracing::debug;

use crate::breakpoints::BreakpointTable;
use crate::controller::{self, EventHub, Interrupter};
use crate::error::{OuroError, Result};
use crate::platform::current_thread_id;
use crate::platform::macos::error::MachError;
use crate::platform::macos::machine::{MachinePatcher, PatchState};
use crate::platform::macos::threads::Thread;
use crate::platform::macos::vm::AllocationTable;
use crate::platform::macos::{constants, exception, ffi, registers, threads, vm};
use crate::types::{Address, DebugEvent, ExceptionKind, Permissions, ResumeEntry, ThreadAction, ThreadId};

/// In-process debugger over the current task.
///
/// Created once, attached once, torn down once. Between attach and drop the
/// exception server catches debug exceptions from watched sibling threads
/// and [`wait_for_event`](Self::wait_for_event) hands them to the caller.
pub struct SelfDebugger
{
    task: mach_port_t,
    controller_thread: ThreadId,
    exception_port: mach_port_t,
    hub: Arc<EventHub>,
    breakpoints: BreakpointTable<PatchState>,
    patcher: MachinePatcher,
    allocations: AllocationTable,
    server: Option<JoinHandle<()>>,
    utility: Option<JoinHandle<()>>,
}

impl SelfDebugger
{
    /// Create a controller over the current process.
    ///
    /// Records the constructing thread's kernel id; that thread is the
    /// controller thread and is excluded from enumeration. The exception
    /// port stays unallocated until [`attach`](Self::attach).
    pub fn new() -> Result<Self>
    {
        let task = unsafe { mach_task_self() };
        Ok(Self {
            task,
            controller_thread: current_thread_id(),
            exception_port: 0,
            hub: Arc::new(EventHub::new()),
            breakpoints: BreakpointTable::new(),
            patcher: MachinePatcher::new(task),
            allocations: AllocationTable::new(),
            server: None,
            utility: None,
        })
    }

    /// Initialize exception handling over the current sibling threads.
    ///
    /// Creates the exception port, binds it to every thread currently in
    /// the task except the controller thread, and starts the server thread.
    /// Returns once the server has registered its id, so enumeration
    /// excludes it from the moment this call completes.
    ///
    /// Threads spawned afterwards are not bound automatically; see
    /// [`watch_thread`](Self::watch_thread).
    pub fn attach(&mut self) -> Result<()>
    {
        if self.server.is_some() {
            return Err(OuroError::InvalidArgument("already attached".to_string()));
        }

        let port = exception::create_exception_port(self.task)?;
        self.exception_port = port;

        // The controller thread stays unbound: a fault on the thread that
        // drains events could never be drained.
        for thread_port in threads::task_thread_ports(self.task)? {
            if ThreadId::from(u64::from(thread_port)) == self.controller_thread {
                continue;
            }
            exception::bind_thread(port, thread_port)?;
        }

        let handle = exception::spawn_server(port, Arc::clone(&self.hub))?;
        self.server = Some(handle);
        let server_id = self.hub.wait_for_server_registration()?;
        debug!(server = server_id.raw(), "exception server started");
        Ok(())
    }

    /// Bind the exception port to one more thread.
    ///
    /// For threads created after [`attach`](Self::attach).
    pub fn watch_thread(&self, thread: ThreadId) -> Result<()>
    {
        if self.exception_port == 0 {
            return Err(OuroError::InvalidArgument("not attached".to_string()));
        }
        exception::bind_thread(self.exception_port, thread.raw() as thread_act_t)
    }

    /// Terminate the controlled task. Does not return on success.
    pub fn kill(&mut self) -> Result<()>
    {
        let kr = unsafe { ffi::task_terminate(self.task) };
        if kr != KERN_SUCCESS {
            return Err(MachError::from(kr).into());
        }
        Ok(())
    }

    /// Block until a debug exception is caught or an interrupt is posted.
    ///
    /// On a breakpoint exception the faulting thread's instruction pointer
    /// is rewound to the patched address before the event is returned (a
    /// plain single-step trap, whose IP is no known landing address, is
    /// left alone).
    pub fn wait_for_event(&mut self) -> Result<DebugEvent>
    {
        self.wait_for_event_with(|| {})
    }

    /// Like [`wait_for_event`](Self::wait_for_event), running `on_interrupt`
    /// under the hub mutex if the wake-up was an interrupt.
    pub fn wait_for_event_with<F>(&mut self, on_interrupt: F) -> Result<DebugEvent>
    where
        F: FnOnce(),
    {
        let event = self.hub.wait_for_event_with(on_interrupt)?;

        if let DebugEvent::Exception(exception) = &event {
            if exception.kind == ExceptionKind::Breakpoint {
                self.rewind_instruction_pointer(exception.thread)?;
            }
        }

        Ok(event)
    }

    /// Move a thread's IP back to the breakpoint it landed from, if any.
    fn rewind_instruction_pointer(&self, thread: ThreadId) -> Result<()>
    {
        let handle = Thread::from_port(thread.raw() as thread_act_t);
        let landing = handle.get_ip()?;
        if let Some(original) = self.breakpoints.original_for_landing(landing) {
            debug!(thread = thread.raw(), from = %landing, to = %original, "rewinding instruction pointer");
            handle.set_ip(original)?;
        }
        Ok(())
    }

    /// Post an interrupt to wake a blocked [`wait_for_event`](Self::wait_for_event).
    ///
    /// `f` runs on the calling thread inside the critical section; see
    /// [`EventHub::post_interrupt`].
    pub fn interrupt<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(),
    {
        self.hub.post_interrupt(f)
    }

    /// Hand out an interrupt capability for foreign threads.
    ///
    /// The handle holds a weak back-reference and fails with
    /// [`OuroError::ControllerGone`] once the controller is dropped.
    #[must_use]
    pub fn interrupter(&self) -> Interrupter
    {
        Interrupter::new(&self.hub)
    }

    /// Start the utility thread.
    ///
    /// Blocks until the worker has registered its kernel id through the
    /// registration interrupt; from then on enumeration excludes it. At
    /// most one utility thread may run per controller.
    pub fn run_utility_thread<F>(&mut self, worker: F) -> Result<()>
    where
        F: FnOnce(Interrupter) + Send + 'static,
    {
        if self.utility.is_some() {
            return Err(OuroError::InvalidArgument("utility thread already running".to_string()));
        }
        let handle = controller::run_utility_thread(&self.hub, worker)?;
        self.utility = Some(handle);
        Ok(())
    }

    /// Enumerate the threads being debugged.
    ///
    /// Asks the task for its current thread list and filters out the
    /// controller, server, and utility threads. The result is a snapshot;
    /// it is stale as soon as the task runs again.
    pub fn threads(&self) -> Result<Vec<Thread>>
    {
        let excluded = [
            Some(self.controller_thread),
            self.hub.server_thread(),
            self.hub.utility_thread(),
        ];

        let ports = threads::task_thread_ports(self.task)?;
        Ok(ports
            .into_iter()
            .filter(|port| !excluded.contains(&Some(ThreadId::from(u64::from(*port)))))
            .map(Thread::from_port)
            .collect())
    }

    /// Suspend every debugged thread.
    ///
    /// Any per-thread failure aborts the batch; threads already suspended
    /// by the batch stay suspended.
    pub fn suspend_threads(&self) -> Result<()>
    {
        for thread in self.threads()? {
            thread.suspend()?;
        }
        Ok(())
    }

    /// Resume every debugged thread.
    ///
    /// Any per-thread failure aborts the batch.
    pub fn resume_threads(&self) -> Result<()>
    {
        for thread in self.threads()? {
            thread.resume()?;
        }
        Ok(())
    }

    /// Apply a per-thread resume plan.
    ///
    /// Each entry may move the thread's instruction pointer first, then
    /// applies its action: suspend, resume, resume for a single step, or
    /// nothing. Stepping is delegated to the thread's trap flag; the
    /// resulting exception arrives like any breakpoint-class event.
    pub fn resume(&self, plan: &[ResumeEntry]) -> Result<()>
    {
        for entry in plan {
            let thread = self.thread_handle(entry.thread)?;
            if let Some(address) = entry.resume_from {
                thread.set_ip(address)?;
            }
            match entry.action {
                ThreadAction::None => {}
                ThreadAction::Stop => thread.suspend()?,
                ThreadAction::Continue => {
                    thread.set_single_step(false)?;
                    thread.resume()?;
                }
                ThreadAction::Step => {
                    thread.set_single_step(true)?;
                    thread.resume()?;
                }
            }
        }
        Ok(())
    }

    /// Install a software breakpoint, or add a reference to an existing one.
    pub fn install_breakpoint(&mut self, address: Address) -> Result<()>
    {
        self.breakpoints.install(&mut self.patcher, address)
    }

    /// Drop one reference to a breakpoint; the last removal restores the
    /// original instruction bytes.
    ///
    /// ## Errors
    ///
    /// - `InvalidBreakpoint`: no breakpoint is installed at `address`
    pub fn remove_breakpoint(&mut self, address: Address) -> Result<()>
    {
        self.breakpoints.remove(&mut self.patcher, address)
    }

    /// Read-only view of the breakpoint table.
    #[must_use]
    pub fn breakpoints(&self) -> &BreakpointTable<PatchState>
    {
        &self.breakpoints
    }

    /// Read one 64-bit register of a debugged thread.
    ///
    /// `set` is a Mach thread-state flavor; `index` selects a 64-bit slot
    /// within it.
    pub fn read_register(&self, thread: ThreadId, set: c_int, index: usize) -> Result<u64>
    {
        let handle = self.thread_handle(thread)?;
        registers::read_register(handle.port(), set, index)
    }

    /// Write one 64-bit register of a debugged thread.
    pub fn write_register(&self, thread: ThreadId, set: c_int, index: usize, value: u64) -> Result<()>
    {
        let handle = self.thread_handle(thread)?;
        registers::write_register(handle.port(), set, index, value)
    }

    /// Read a thread's full register context for one register set.
    pub fn read_context(&self, thread: ThreadId, set: c_int) -> Result<Vec<natural_t>>
    {
        let handle = self.thread_handle(thread)?;
        registers::read_context(handle.port(), set)
    }

    /// Write a thread's full register context for one register set.
    pub fn write_context(&self, thread: ThreadId, set: c_int, state: &[natural_t]) -> Result<()>
    {
        let handle = self.thread_handle(thread)?;
        registers::write_context(handle.port(), set, state)
    }

    /// Read memory from the task.
    pub fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        vm::read_memory(self.task, address, len)
    }

    /// Write memory into the task.
    pub fn write_memory(&mut self, address: Address, data: &[u8]) -> Result<usize>
    {
        vm::write_memory(self.task, address, data)
    }

    /// Allocate pages in the task with the given permissions.
    pub fn allocate(&mut self, size: u64, permissions: Permissions) -> Result<Address>
    {
        vm::allocate(self.task, &mut self.allocations, size, permissions)
    }

    /// Release an allocation by its exact base address.
    ///
    /// ## Errors
    ///
    /// - `InvalidAllocation`: `address` was not returned by [`allocate`](Self::allocate)
    pub fn deallocate(&mut self, address: Address) -> Result<()>
    {
        vm::deallocate(self.task, &mut self.allocations, address)
    }

    /// Read-only view of the allocation table.
    #[must_use]
    pub fn allocations(&self) -> &AllocationTable
    {
        &self.allocations
    }

    /// Address of dyld's all-image-infos structure.
    ///
    /// Remote clients use this to locate the loaded images of the task.
    pub fn shared_library_info_address(&self) -> Result<Address>
    {
        unsafe {
            let mut info = ffi::TaskDyldInfo::default();
            let mut count = constants::TASK_DYLD_INFO_COUNT;
            let kr = ffi::task_info(
                self.task,
                constants::TASK_DYLD_INFO,
                &mut info as *mut ffi::TaskDyldInfo as *mut natural_t,
                &mut count,
            );
            if kr != KERN_SUCCESS {
                return Err(MachError::from(kr).into());
            }
            Ok(Address::from(info.all_image_info_addr))
        }
    }

    /// Resolve a thread id to a handle, verifying task membership.
    fn thread_handle(&self, thread: ThreadId) -> Result<Thread>
    {
        let port = thread.raw() as thread_act_t;
        if threads::task_thread_ports(self.task)?.contains(&port) {
            Ok(Thread::from_port(port))
        } else {
            Err(OuroError::InvalidArgument(format!(
                "thread {thread} is not part of the controlled task"
            )))
        }
    }
}

impl Drop for SelfDebugger
{
    fn drop(&mut self)
    {
        // Best effort throughout; teardown failures are swallowed.
        self.hub.request_shutdown();

        if self.exception_port != 0 {
            // Destroying the receive right wakes the server's blocked
            // mach_msg with MACH_RCV_PORT_DIED.
            unsafe {
                let _ = ffi::mach_port_destroy(self.task, self.exception_port);
            }
            self.exception_port = 0;
        }

        if let Some(server) = self.server.take() {
            let _ = server.join();
        }

        if let Some(utility) = self.utility.take() {
            if utility.is_finished() {
                let _ = utility.join();
            } else if let Some(id) = self.hub.utility_thread() {
                // The worker ignored the stop flag; it may be parked in a
                // kernel primitive with no cancellation point.
                unsafe {
                    let _ = ffi::thread_terminate(id.raw() as thread_act_t);
                }
            }
        }
    }
}
