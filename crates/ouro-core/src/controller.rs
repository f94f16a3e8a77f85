//! # Controller Event Loop
//!
//! Synchronization core shared by the controller thread, the exception
//! server thread, and any thread that posts interrupts.
//!
//! One mutex and one condition variable guard a single-slot exception
//! buffer plus an interrupt flag. The exception server deposits at most one
//! caught exception at a time and blocks until the controller drains it
//! (back-pressure), which keeps exceptions from a single thread ordered and
//! never drops a payload buffer. Any thread may post an interrupt, which
//! wakes the controller through the same condition variable.
//!
//! ## Priority
//!
//! When an exception and an interrupt are both pending, `wait_for_event`
//! returns the exception first; the interrupt flag survives and the next
//! call returns `Interrupted`.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::JoinHandle;

use tracing::debug;

use crate::error::{OuroError, Result};
use crate::types::{DebugEvent, Exception, ThreadId};

/// State guarded by the hub mutex.
#[derive(Debug, Default)]
struct HubState
{
    /// Single-slot buffer written by the exception server.
    exception: Option<Exception>,
    /// Set by any thread posting an interrupt; cleared when observed.
    interrupted: bool,
    /// Kernel id of the exception server thread, once it has started.
    server_thread: Option<ThreadId>,
    /// Kernel id of the utility thread, once it has registered itself.
    utility_thread: Option<ThreadId>,
    /// Cooperative stop flag observed by the server and utility threads.
    shutdown: bool,
}

/// Mutex + condition variable pair at the heart of the controller.
///
/// The hub is shared as `Arc<EventHub>` between the controller, the
/// exception server thread, and any [`Interrupter`] handles. Interrupters
/// hold only a weak reference: they must not extend the controller's
/// lifetime, and they fault with [`OuroError::ControllerGone`] when used
/// after teardown.
#[derive(Debug, Default)]
pub struct EventHub
{
    state: Mutex<HubState>,
    cond: Condvar,
}

impl EventHub
{
    /// Create a hub with an empty exception slot.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Block until an exception is deposited or an interrupt is posted.
    ///
    /// Equivalent to [`wait_for_event_with`](Self::wait_for_event_with) with
    /// a no-op interrupt handler.
    pub fn wait_for_event(&self) -> Result<DebugEvent>
    {
        self.wait_for_event_with(|| {})
    }

    /// Block until an exception is deposited or an interrupt is posted.
    ///
    /// If an exception is pending it takes priority: the slot is drained,
    /// the server is woken, and the exception is returned. A pending
    /// interrupt is *not* consumed in that case; the next call observes it.
    ///
    /// On the interrupt path, `on_interrupt` runs while the hub mutex is
    /// still held, then the flag is cleared and `Interrupted` is returned.
    pub fn wait_for_event_with<F>(&self, on_interrupt: F) -> Result<DebugEvent>
    where
        F: FnOnce(),
    {
        let mut state = self.lock()?;
        while state.exception.is_none() && !state.interrupted {
            state = self.wait(state)?;
        }

        if let Some(exception) = state.exception.take() {
            // Wake the server if it is blocked on the full slot. The
            // interrupt flag, if set, stays for the next call.
            self.cond.notify_all();
            return Ok(DebugEvent::Exception(exception));
        }

        on_interrupt();
        state.interrupted = false;
        Ok(DebugEvent::Interrupted)
    }

    /// Deposit a caught exception, blocking while the slot is full.
    ///
    /// Called by the exception server thread. Returns `false` when the hub
    /// is shutting down (or its state is poisoned), which tells the server
    /// loop to exit instead of delivering.
    pub fn deposit_exception(&self, exception: Exception) -> bool
    {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        while state.exception.is_some() && !state.shutdown {
            state = match self.cond.wait(state) {
                Ok(guard) => guard,
                Err(_) => return false,
            };
        }
        if state.shutdown {
            return false;
        }
        state.exception = Some(exception);
        self.cond.notify_all();
        true
    }

    /// Post an interrupt and run `f` inside the critical section.
    ///
    /// `f` executes on the calling thread while the hub mutex is held; the
    /// controller is either outside `wait_for_event` or parked in the
    /// condition variable with the mutex released, so `f` has exclusive
    /// access to whatever state the hub lock guards. This is the only safe
    /// mutation path from foreign threads.
    ///
    /// `f` must not call back into the hub; the mutex is not reentrant.
    pub fn post_interrupt<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(),
    {
        let mut state = self.lock()?;
        state.interrupted = true;
        f();
        self.cond.notify_all();
        drop(state);
        Ok(())
    }

    /// Ask the server and utility threads to wind down.
    ///
    /// Sets the cooperative stop flag and wakes every waiter. A server
    /// blocked on a full slot gives up its delivery; a utility function is
    /// expected to poll [`Interrupter::stop_requested`] and return.
    pub fn request_shutdown(&self)
    {
        if let Ok(mut state) = self.state.lock() {
            state.shutdown = true;
            self.cond.notify_all();
        }
    }

    /// Whether shutdown has been requested.
    ///
    /// Reports `true` on a poisoned hub as well; a thread polling this flag
    /// should stop either way.
    #[must_use]
    pub fn stop_requested(&self) -> bool
    {
        self.state.lock().map_or(true, |state| state.shutdown)
    }

    /// Record the exception server's kernel thread id.
    ///
    /// Called once by the server thread as it starts, before its first
    /// receive, so enumeration can exclude it.
    pub fn record_server_thread(&self, id: ThreadId)
    {
        if let Ok(mut state) = self.state.lock() {
            state.server_thread = Some(id);
            self.cond.notify_all();
        }
    }

    /// Kernel thread id of the exception server, if it has started.
    #[must_use]
    pub fn server_thread(&self) -> Option<ThreadId>
    {
        self.state.lock().ok().and_then(|state| state.server_thread)
    }

    /// Block until the server thread has recorded its id.
    pub fn wait_for_server_registration(&self) -> Result<ThreadId>
    {
        let mut state = self.lock()?;
        loop {
            if let Some(id) = state.server_thread {
                return Ok(id);
            }
            state = self.wait(state)?;
        }
    }

    /// Post the utility thread's registration interrupt.
    ///
    /// Records the id and raises the interrupt flag in one critical
    /// section; the spawner parked in
    /// [`wait_for_utility_registration`](Self::wait_for_utility_registration)
    /// and a controller parked in `wait_for_event` both wake.
    pub fn register_utility_thread(&self, id: ThreadId)
    {
        if let Ok(mut state) = self.state.lock() {
            state.utility_thread = Some(id);
            state.interrupted = true;
            self.cond.notify_all();
        }
    }

    /// Kernel thread id of the utility thread, if one has registered.
    #[must_use]
    pub fn utility_thread(&self) -> Option<ThreadId>
    {
        self.state.lock().ok().and_then(|state| state.utility_thread)
    }

    /// Block until the utility thread has registered its id.
    pub fn wait_for_utility_registration(&self) -> Result<ThreadId>
    {
        let mut state = self.lock()?;
        loop {
            if let Some(id) = state.utility_thread {
                return Ok(id);
            }
            state = self.wait(state)?;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HubState>>
    {
        self.state.lock().map_err(|_| OuroError::Poisoned("controller event state"))
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, HubState>) -> Result<MutexGuard<'a, HubState>>
    {
        self.cond.wait(guard).map_err(|_| OuroError::Poisoned("controller event state"))
    }
}

/// Capability to wake the controller from another thread.
///
/// Holds a non-owning back-reference to the hub: dropping the controller
/// invalidates every outstanding interrupter instead of keeping the hub
/// alive.
#[derive(Debug, Clone)]
pub struct Interrupter
{
    hub: Weak<EventHub>,
}

impl Interrupter
{
    /// Create an interrupter for the given hub.
    #[must_use]
    pub fn new(hub: &Arc<EventHub>) -> Self
    {
        Self {
            hub: Arc::downgrade(hub),
        }
    }

    /// Post an interrupt, running `f` under the hub mutex.
    ///
    /// ## Errors
    ///
    /// - `ControllerGone`: the controller was torn down
    /// - `Poisoned`: the hub state mutex is poisoned
    pub fn send_interrupt<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(),
    {
        let hub = self.hub.upgrade().ok_or(OuroError::ControllerGone)?;
        hub.post_interrupt(f)
    }

    /// Whether the utility function should wind down.
    ///
    /// Reports `true` once shutdown is requested or the controller is gone.
    #[must_use]
    pub fn stop_requested(&self) -> bool
    {
        self.hub.upgrade().map_or(true, |hub| hub.stop_requested())
    }
}

/// Start the utility thread.
///
/// The worker registers its own kernel thread id through the registration
/// interrupt before `worker` runs, and this call blocks until that
/// registration has been processed: when it returns, enumeration already
/// excludes the new thread. At most one utility thread is expected per
/// controller.
///
/// The worker receives an [`Interrupter`] and is expected to poll
/// [`Interrupter::stop_requested`] at each iteration so teardown can stop
/// it cooperatively.
pub fn run_utility_thread<F>(hub: &Arc<EventHub>, worker: F) -> Result<JoinHandle<()>>
where
    F: FnOnce(Interrupter) + Send + 'static,
{
    let interrupter = Interrupter::new(hub);
    let registration_hub = Arc::clone(hub);
    let handle = std::thread::Builder::new()
        .name("ouro-utility".into())
        .spawn(move || {
            let id = crate::platform::current_thread_id();
            registration_hub.register_utility_thread(id);
            debug!(thread = id.raw(), "utility thread registered");
            worker(interrupter);
        })
        .map_err(|err| OuroError::InvalidArgument(format!("failed to spawn utility thread: {err}")))?;

    hub.wait_for_utility_registration()?;
    Ok(handle)
}
