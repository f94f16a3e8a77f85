//! # macOS Platform Constants
//!
//! Centralized constants for Mach API operations: thread state flavors and
//! counts, trap encodings, register slot indices, and task info flavors.
//!
//! Thread state is exchanged with the kernel as arrays of `natural_t`
//! (u32); each 64-bit register occupies two consecutive entries, so the
//! "slot" indices below count 64-bit registers, not array entries.

use libc::{c_int, mach_msg_type_number_t};

// ============================================================================
// Thread State Flavors
// ============================================================================

/// ARM64 general-purpose thread state flavor.
///
/// Used with `thread_get_state()` / `thread_set_state()` for X0-X28, FP,
/// LR, SP, PC, CPSR.
#[cfg(target_arch = "aarch64")]
pub const ARM_THREAD_STATE64: c_int = 6;

/// ARM64 thread state count (68 u32 values).
#[cfg(target_arch = "aarch64")]
pub const ARM_THREAD_STATE64_COUNT: mach_msg_type_number_t = 68;

/// ARM64 debug state flavor (breakpoint/watchpoint registers and MDSCR).
#[cfg(target_arch = "aarch64")]
pub const ARM_DEBUG_STATE64: c_int = 15;

/// ARM64 debug state count (520 bytes / 4 = 130 u32 values).
#[cfg(target_arch = "aarch64")]
pub const ARM_DEBUG_STATE64_COUNT: mach_msg_type_number_t = 130;

/// Flavor placeholder when a call carries no thread state (ARM value).
#[cfg(target_arch = "aarch64")]
pub const THREAD_STATE_NONE: c_int = 5;

/// x86-64 general-purpose thread state flavor.
#[cfg(target_arch = "x86_64")]
pub const X86_THREAD_STATE64: c_int = 4;

/// x86-64 thread state count (42 u32 values).
#[cfg(target_arch = "x86_64")]
pub const X86_THREAD_STATE64_COUNT: mach_msg_type_number_t = 42;

/// Flavor placeholder when a call carries no thread state (x86 value).
#[cfg(target_arch = "x86_64")]
pub const THREAD_STATE_NONE: c_int = 13;

/// Upper bound on any flavor's state count (`THREAD_STATE_MAX` in the
/// kernel headers); sizes the receive buffer for arbitrary register sets.
pub const THREAD_STATE_MAX_COUNT: mach_msg_type_number_t = 1296;

// ============================================================================
// Register Slot Indices (64-bit slots within the general-purpose flavor)
// ============================================================================

/// PC slot in `ARM_THREAD_STATE64`: X0-X28, FP, LR, SP come first.
#[cfg(target_arch = "aarch64")]
pub const PC_SLOT: usize = 32;

/// MDSCR_EL1 slot in `ARM_DEBUG_STATE64`: after BVR/BCR/WVR/WCR (4 x 16).
#[cfg(target_arch = "aarch64")]
pub const MDSCR_EL1_SLOT: usize = 64;

/// Software-step bit in MDSCR_EL1.
#[cfg(target_arch = "aarch64")]
pub const MDSCR_EL1_SS: u64 = 1;

/// RIP slot in `X86_THREAD_STATE64`: 16 general-purpose registers first.
#[cfg(target_arch = "x86_64")]
pub const PC_SLOT: usize = 16;

/// RFLAGS slot in `X86_THREAD_STATE64`, directly after RIP.
#[cfg(target_arch = "x86_64")]
pub const RFLAGS_SLOT: usize = 17;

/// Trap flag in RFLAGS; arms a single-step exception.
#[cfg(target_arch = "x86_64")]
pub const RFLAGS_TRAP_FLAG: u64 = 0x100;

// ============================================================================
// Breakpoint Trap Encodings
// ============================================================================

/// ARM64 `BRK #0` instruction.
#[cfg(target_arch = "aarch64")]
pub const TRAP_INSTRUCTION: [u8; 4] = [0x00, 0x00, 0x20, 0xd4];

/// On ARM64 the trap does not advance the PC: execution lands on the
/// patched address itself.
#[cfg(target_arch = "aarch64")]
pub const TRAP_LANDING_OFFSET: u64 = 0;

/// x86-64 `INT3` instruction.
#[cfg(target_arch = "x86_64")]
pub const TRAP_INSTRUCTION: [u8; 1] = [0xcc];

/// `INT3` is one byte and the trap reports the following address: execution
/// lands one past the patched address.
#[cfg(target_arch = "x86_64")]
pub const TRAP_LANDING_OFFSET: u64 = 1;

// ============================================================================
// Task Info
// ============================================================================

/// `task_info()` flavor reporting the dyld all-image-infos location.
pub const TASK_DYLD_INFO: c_int = 17;

/// Size of the dyld info structure in `natural_t` units (8 + 8 + 4 bytes).
pub const TASK_DYLD_INFO_COUNT: mach_msg_type_number_t = 5;
