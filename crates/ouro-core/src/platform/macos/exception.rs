//! # Mach Exception Server
//!
//! Owns the exception port and the dedicated kernel-message loop behind it.
//!
//! The controller allocates a receive right on its own task, binds it as
//! the exception-handler port of every sibling thread it watches, and runs
//! a server thread in a blocking `mach_msg()` receive. Each caught
//! exception is decoded into an [`Exception`] and deposited into the
//! controller's single event slot; the deposit blocks while the previous
//! event is undrained, which serializes delivery and preserves per-thread
//! exception order. Only after the deposit is the kernel told the exception
//! was handled.
//!
//! ## References
//!
//! - [thread_set_exception_ports(3)](https://developer.apple.com/documentation/kernel/1418473-thread_set_exception_ports/)
//! - [mach_msg(3)](https://developer.apple.com/documentation/kernel/1402149-mach_msg/)

use std::mem::MaybeUninit;
use std::sync::Arc;
use std::thread::JoinHandle;

use libc::{c_int, mach_port_t, thread_act_t};
use mach2::exc::{__Reply__exception_raise_t, __Request__exception_raise_t};
use mach2::exception_types::{
    EXCEPTION_DEFAULT, EXC_MASK_ARITHMETIC, EXC_MASK_BAD_ACCESS, EXC_MASK_BAD_INSTRUCTION, EXC_MASK_BREAKPOINT,
    EXC_MASK_SOFTWARE,
};
use mach2::kern_return::KERN_SUCCESS;
use mach2::message::{
    mach_msg, mach_msg_header_t, mach_msg_size_t, MACH_MSGH_BITS, MACH_MSG_SUCCESS, MACH_MSG_TIMEOUT_NONE,
    MACH_MSG_TYPE_MAKE_SEND, MACH_MSG_TYPE_MOVE_SEND_ONCE, MACH_RCV_LARGE, MACH_RCV_MSG, MACH_SEND_MSG,
};
use mach2::ndr::NDR_record;
use mach2::port::{MACH_PORT_NULL, MACH_PORT_RIGHT_RECEIVE};
use tracing::{debug, error};

use crate::controller::EventHub;
use crate::error::{OuroError, Result};
use crate::platform::macos::error::MachError;
use crate::platform::macos::{constants, ffi};
use crate::types::{Exception, ExceptionKind, ThreadId};

/// Exception types routed to the controller: breakpoints and the fault
/// classes a debugger mediates.
pub const EXCEPTION_MASK: u32 =
    EXC_MASK_BREAKPOINT | EXC_MASK_BAD_ACCESS | EXC_MASK_BAD_INSTRUCTION | EXC_MASK_ARITHMETIC | EXC_MASK_SOFTWARE;

/// Allocate the exception port on the task.
///
/// Creates a receive right and adds a send right under the same name so
/// the kernel can queue exception messages on it.
pub(crate) fn create_exception_port(task: mach_port_t) -> Result<mach_port_t>
{
    unsafe {
        let mut port: mach_port_t = 0;
        let kr = ffi::mach_port_allocate(task, MACH_PORT_RIGHT_RECEIVE as c_int, &mut port);
        if kr != KERN_SUCCESS {
            return Err(MachError::from(kr).into());
        }

        let kr = ffi::mach_port_insert_right(task, port, port, MACH_MSG_TYPE_MAKE_SEND);
        if kr != KERN_SUCCESS {
            let _ = ffi::mach_port_destroy(task, port);
            return Err(MachError::from(kr).into());
        }

        Ok(port)
    }
}

/// Bind `port` as the exception-handler port of one thread.
pub(crate) fn bind_thread(port: mach_port_t, thread: thread_act_t) -> Result<()>
{
    let kr = unsafe {
        ffi::thread_set_exception_ports(
            thread,
            EXCEPTION_MASK,
            port,
            EXCEPTION_DEFAULT as c_int,
            constants::THREAD_STATE_NONE,
        )
    };
    if kr != KERN_SUCCESS {
        return Err(MachError::from(kr).into());
    }
    Ok(())
}

/// Spawn the dedicated server thread for the given port.
pub(crate) fn spawn_server(port: mach_port_t, hub: Arc<EventHub>) -> Result<JoinHandle<()>>
{
    std::thread::Builder::new()
        .name("ouro-exception-server".into())
        .spawn(move || run_server_loop(port, hub))
        .map_err(|err| OuroError::InvalidArgument(format!("failed to spawn exception server: {err}")))
}

/// Receive loop of the exception server thread.
///
/// Blocks in `mach_msg()` until the kernel delivers an exception, deposits
/// it into the hub (blocking while the previous event is undrained), then
/// replies that the exception was handled. Exits when the port dies
/// (teardown destroys it) or the hub refuses a deposit during shutdown.
fn run_server_loop(port: mach_port_t, hub: Arc<EventHub>)
{
    hub.record_server_thread(crate::platform::current_thread_id());

    loop {
        let mut request = MaybeUninit::<__Request__exception_raise_t>::uninit();
        let recv_size = std::mem::size_of::<__Request__exception_raise_t>() as mach_msg_size_t;

        let kr = unsafe {
            mach_msg(
                request.as_mut_ptr() as *mut mach_msg_header_t,
                MACH_RCV_MSG | MACH_RCV_LARGE,
                0,
                recv_size,
                port,
                MACH_MSG_TIMEOUT_NONE,
                MACH_PORT_NULL,
            )
        };

        if kr != MACH_MSG_SUCCESS {
            if kr == mach2::message::MACH_RCV_PORT_DIED || kr == mach2::message::MACH_RCV_INVALID_NAME {
                debug!("exception port closed, exiting server loop");
                break;
            }
            continue;
        }

        let message = unsafe { request.assume_init() };
        let thread_port = message.thread.name as thread_act_t;
        let code_count = (message.codeCnt as usize).min(message.code.len());
        let data: Vec<u64> = message.code[..code_count].iter().map(|code| *code as i64 as u64).collect();

        let exception = Exception {
            thread: ThreadId::from(u64::from(thread_port)),
            kind: ExceptionKind::from_raw(message.exception as i32),
            data,
        };

        if !hub.deposit_exception(exception) {
            debug!("event hub shut down, exiting server loop");
            break;
        }

        if let Err(err) = send_exception_reply(&message) {
            error!("failed to send Mach exception reply: {err}");
            break;
        }
    }
}

/// Reply to a Mach exception message.
///
/// Tells the kernel the exception was handled so the faulting thread may
/// run again once its suspend count allows.
fn send_exception_reply(request: &__Request__exception_raise_t) -> Result<()>
{
    let mut reply = __Reply__exception_raise_t {
        Head: mach_msg_header_t {
            msgh_bits: MACH_MSGH_BITS(MACH_MSG_TYPE_MOVE_SEND_ONCE, 0),
            msgh_size: std::mem::size_of::<__Reply__exception_raise_t>() as mach_msg_size_t,
            msgh_remote_port: request.Head.msgh_local_port,
            msgh_local_port: MACH_PORT_NULL,
            msgh_voucher_port: MACH_PORT_NULL,
            msgh_id: request.Head.msgh_id + 100,
        },
        NDR: unsafe { NDR_record },
        RetCode: KERN_SUCCESS,
    };

    let kr = unsafe {
        mach_msg(
            &mut reply.Head,
            MACH_SEND_MSG,
            reply.Head.msgh_size,
            0,
            MACH_PORT_NULL,
            MACH_MSG_TIMEOUT_NONE,
            MACH_PORT_NULL,
        )
    };

    if kr != MACH_MSG_SUCCESS {
        return Err(MachError::from(kr).into());
    }

    Ok(())
}
