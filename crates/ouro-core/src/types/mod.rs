//! Platform-agnostic core types.

pub mod address;
pub mod exception;
pub mod permissions;
pub mod thread;

pub use address::Address;
pub use exception::{DebugEvent, Exception, ExceptionKind};
pub use permissions::Permissions;
pub use thread::{ResumeEntry, ThreadAction, ThreadId};
