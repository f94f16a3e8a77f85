//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};

/// An address in the controlled task
///
/// Addresses here are integer-valued locations in the debugged task, never
/// host pointers: the controller hands them to kernel primitives, keys the
/// breakpoint and allocation tables on them, and prints them on the wire,
/// but never dereferences them. The newtype keeps them from mixing with
/// sizes, counts, and register values, and carries the hashing and ordering
/// the tables need.
///
/// ## Arithmetic policy
///
/// Offsets saturate instead of wrapping. A saturated address sits at the
/// top of the address space, which no kernel call accepts, so a corrupted
/// offset surfaces as a kernel error on the next call rather than silently
/// aliasing a low address. Distances between addresses clamp at zero for
/// the same reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address; no code or allocation the controller touches
    /// lives here, so it doubles as an "unset" sentinel.
    pub const NULL: Self = Address(0);

    /// Wrap a raw address value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self
    {
        Address(raw)
    }

    /// The raw value, for kernel calls and wire encoding.
    #[must_use]
    pub const fn raw(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address.
    #[must_use]
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }
}

impl From<u64> for Address
{
    fn from(raw: u64) -> Self
    {
        Address(raw)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{:#x}", self.0)
    }
}

/// Forward offset from an address; saturates at the top of the address
/// space.
impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, offset: u64) -> Self::Output
    {
        Address(self.0.saturating_add(offset))
    }
}

/// Distance from `rhs` up to `self`, in bytes; clamps at zero when `rhs`
/// is the higher address.
impl Sub<Address> for Address
{
    type Output = u64;

    fn sub(self, rhs: Address) -> Self::Output
    {
        self.0.saturating_sub(rhs.0)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_display_renders_compact_hex()
    {
        assert_eq!(Address::from(0x2000).to_string(), "0x2000");
        assert_eq!(Address::NULL.to_string(), "0x0");
        assert_eq!(Address::from(0x7fff_1234_5678).to_string(), "0x7fff12345678");
    }

    #[test]
    fn test_offset_saturates_at_address_space_top()
    {
        assert_eq!((Address::from(0x1000) + 0x10).raw(), 0x1010);
        assert_eq!(Address::from(u64::MAX) + 1, Address::from(u64::MAX));
    }

    #[test]
    fn test_distance_clamps_at_zero()
    {
        assert_eq!(Address::from(0x1010) - Address::from(0x1000), 0x10);
        assert_eq!(Address::from(0x1000) - Address::from(0x2000), 0);
    }

    #[test]
    fn test_null_detection()
    {
        assert!(Address::NULL.is_null());
        assert!(Address::from_raw(0).is_null());
        assert!(!Address::from(1).is_null());
    }

    #[test]
    fn test_raw_round_trip()
    {
        let address = Address::from_raw(0xfeed_f00d);
        assert_eq!(address.raw(), 0xfeed_f00d);
        assert_eq!(u64::from(address), 0xfeed_f00d);
        assert_eq!(Address::from(address.raw()), address);
    }
}
