//! # ouro-core
//!
//! In-process self-debugging controller for Mach-based systems.
//!
//! The controller attaches to its own host process, catches debug
//! exceptions (breakpoints, single-step, faults) raised by sibling threads,
//! and mediates inspection and mutation of their execution state. Three
//! subsystems make up the core:
//!
//! - **Exception server**: a dedicated kernel-message loop receiving
//!   exception messages from the task's exception port, handing each one to
//!   the controller thread under a wait/signal discipline
//! - **Breakpoint engine**: software breakpoints via instruction patching,
//!   reference counted per address, with instruction-pointer rewind on hit
//! - **Debug control surface**: thread enumeration (self-excluding),
//!   virtual-memory allocation/protection, register access, and the
//!   remote-debugging wire protocol (framing, checksums, escaping, payload
//!   parsing)
//!
//! ## Platform Support
//!
//! The backend is Mach-only (`mach_task_self`, per-thread exception ports,
//! `mach_vm_*`); the wire protocol, breakpoint bookkeeping, and event hub
//! are platform-independent.
//!
//! ## Why unsafe code is needed
//!
//! The backend calls low-level kernel APIs that patch instructions, rewrite
//! registers, and receive raw kernel messages. These calls are inherently
//! unsafe; we wrap them in safe abstractions, but the underlying system
//! calls themselves must be `unsafe`.

#![allow(unsafe_code)] // Required for low-level Mach APIs

pub mod breakpoints;
pub mod controller;
pub mod error;
pub mod platform;
pub mod protocol;
pub mod types;

pub use breakpoints::{BreakpointTable, PatchOperations};
pub use controller::{EventHub, Interrupter};
// Re-export commonly used types
pub use error::{OuroError, Result};
#[cfg(target_os = "macos")]
pub use platform::macos::SelfDebugger;
pub use protocol::{Packet, PacketFramer, PayloadCursor};
pub use types::{Address, DebugEvent, Exception, ExceptionKind, Permissions, ResumeEntry, ThreadAction, ThreadId};
