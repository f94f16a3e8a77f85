//! Memory permission sets.

use std::fmt;

/// Permission set for a virtual-memory region
///
/// Each granted bit maps to the corresponding native protection bit when a
/// region is allocated or protected; anything else maps to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Permissions
{
    /// Region may be read.
    pub read: bool,
    /// Region may be written.
    pub write: bool,
    /// Region may be executed.
    pub execute: bool,
}

impl Permissions
{
    /// No access at all.
    pub const NONE: Self = Self {
        read: false,
        write: false,
        execute: false,
    };

    /// Read-only data.
    pub const READ: Self = Self {
        read: true,
        write: false,
        execute: false,
    };

    /// Ordinary writable data.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        execute: false,
    };

    /// Executable code.
    pub const READ_EXECUTE: Self = Self {
        read: true,
        write: false,
        execute: true,
    };

    /// Everything; used when widening a page for instruction patching.
    pub const ALL: Self = Self {
        read: true,
        write: true,
        execute: true,
    };

    /// Build a permission set from individual grants.
    #[must_use]
    pub const fn new(read: bool, write: bool, execute: bool) -> Self
    {
        Self { read, write, execute }
    }
}

impl fmt::Display for Permissions
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let r = if self.read { 'r' } else { '-' };
        let w = if self.write { 'w' } else { '-' };
        let x = if self.execute { 'x' } else { '-' };
        write!(f, "{r}{w}{x}")
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_permissions_display()
    {
        assert_eq!(Permissions::NONE.to_string(), "---");
        assert_eq!(Permissions::READ.to_string(), "r--");
        assert_eq!(Permissions::READ_WRITE.to_string(), "rw-");
        assert_eq!(Permissions::READ_EXECUTE.to_string(), "r-x");
        assert_eq!(Permissions::ALL.to_string(), "rwx");
    }

    #[test]
    fn test_permissions_constructor_honors_input()
    {
        // The constructor must reflect exactly what was asked for; a set
        // built from explicit grants is never silently empty.
        let perms = Permissions::new(true, false, true);
        assert!(perms.read);
        assert!(!perms.write);
        assert!(perms.execute);
        assert_eq!(perms, Permissions::READ_EXECUTE);
    }
}
