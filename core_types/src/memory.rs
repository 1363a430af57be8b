//! # Caller Memory Types
//!
//! This module defines how the storage service names memory that belongs to
//! a caller on the other side of the partition boundary.
//!
//! ## Philosophy
//!
//! - **An address is not a pointer**: a [`CallerAddr`] is an untrusted number
//!   until the partition manager confirms who owns the range behind it
//! - **Ownership is per range**: a check covers `[addr, addr + len)` as a whole
//! - **Least privilege**: read-write access requires both permissions
//!
//! ## Key Types
//!
//! - [`CallerAddr`]: Address in a caller's address space
//! - [`MemoryPerms`]: Permission flags of a mapped region
//! - [`MemoryAccess`]: The access mode a boundary check asks for
//! - [`MemoryRegion`]: A mapped `[base, base + len)` range with permissions

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Address in a caller's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerAddr(u32);

impl CallerAddr {
    /// The null address
    pub const NULL: Self = Self(0);

    /// Creates an address from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns the address `delta` bytes further on, or `None` on overflow
    pub fn checked_add(&self, delta: u32) -> Option<Self> {
        self.0.checked_add(delta).map(Self)
    }
}

impl fmt::Display for CallerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Memory permission flags
///
/// By default, no permissions are granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MemoryPerms {
    pub read: bool,
    pub write: bool,
}

impl MemoryPerms {
    /// No permissions
    pub fn none() -> Self {
        Self {
            read: false,
            write: false,
        }
    }

    /// Read-only permission
    pub fn read_only() -> Self {
        Self {
            read: true,
            write: false,
        }
    }

    /// Read and write permissions
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
        }
    }

    /// Check if this has read permission
    pub fn can_read(&self) -> bool {
        self.read
    }

    /// Check if this has write permission
    pub fn can_write(&self) -> bool {
        self.write
    }

    /// Returns true when these permissions allow `access`
    pub fn allows(&self, access: MemoryAccess) -> bool {
        match access {
            MemoryAccess::ReadOnly => self.read,
            MemoryAccess::ReadWrite => self.read && self.write,
        }
    }
}

impl fmt::Display for MemoryPerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            if self.read { "R" } else { "-" },
            if self.write { "W" } else { "-" }
        )
    }
}

/// Access mode requested when checking caller memory
///
/// A buffer the service will only read from (write payloads, tokens,
/// attribute records) is checked `ReadOnly`. A buffer the service will fill
/// (read payloads, info records) is checked `ReadWrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryAccess {
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for MemoryAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryAccess::ReadOnly => write!(f, "RO"),
            MemoryAccess::ReadWrite => write!(f, "RW"),
        }
    }
}

/// A mapped range of caller memory
///
/// Regions are immutable after creation. Within one address space regions
/// must not overlap; the partition manager enforces that when mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    /// First address of the region
    pub base: CallerAddr,
    /// Length in bytes
    pub len: u32,
    /// Memory permissions
    pub permissions: MemoryPerms,
}

impl MemoryRegion {
    /// Creates a new memory region
    pub fn new(base: CallerAddr, len: u32, permissions: MemoryPerms) -> Result<Self, MemoryError> {
        if len == 0 {
            return Err(MemoryError::InvalidRegionSize(len));
        }
        if base.checked_add(len).is_none() {
            return Err(MemoryError::AddressOverflow { addr: base, len });
        }
        Ok(Self {
            base,
            len,
            permissions,
        })
    }

    /// One past the last address of the region
    pub fn end(&self) -> u64 {
        self.base.as_u32() as u64 + self.len as u64
    }

    /// Returns true if `[addr, addr + len)` lies entirely inside this region
    pub fn contains(&self, addr: CallerAddr, len: u32) -> bool {
        let start = addr.as_u32() as u64;
        start >= self.base.as_u32() as u64 && start + len as u64 <= self.end()
    }

    /// Returns true if the two regions share at least one byte
    pub fn overlaps(&self, other: &MemoryRegion) -> bool {
        (self.base.as_u32() as u64) < other.end() && (other.base.as_u32() as u64) < self.end()
    }
}

/// Memory-related errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Invalid region size: {0} bytes (must be > 0)")]
    InvalidRegionSize(u32),

    #[error("Address range overflows: {addr} + {len}")]
    AddressOverflow { addr: CallerAddr, len: u32 },

    #[error("Region overlap detected at {0}")]
    RegionOverlap(CallerAddr),

    #[error("Range {addr}+{len} is not owned by the caller with {access} access")]
    NotOwned {
        addr: CallerAddr,
        len: u32,
        access: MemoryAccess,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_perms_read_only() {
        let perms = MemoryPerms::read_only();
        assert!(perms.can_read());
        assert!(!perms.can_write());
        assert!(perms.allows(MemoryAccess::ReadOnly));
        assert!(!perms.allows(MemoryAccess::ReadWrite));
    }

    #[test]
    fn test_memory_perms_read_write() {
        let perms = MemoryPerms::read_write();
        assert!(perms.allows(MemoryAccess::ReadOnly));
        assert!(perms.allows(MemoryAccess::ReadWrite));
        assert_eq!(format!("{}", perms), "RW");
    }

    #[test]
    fn test_write_only_is_not_read_write() {
        let perms = MemoryPerms {
            read: false,
            write: true,
        };
        assert!(!perms.allows(MemoryAccess::ReadWrite));
    }

    #[test]
    fn test_region_contains() {
        let region =
            MemoryRegion::new(CallerAddr::new(0x1000), 0x100, MemoryPerms::read_only()).unwrap();
        assert!(region.contains(CallerAddr::new(0x1000), 0x100));
        assert!(region.contains(CallerAddr::new(0x10f0), 0x10));
        assert!(!region.contains(CallerAddr::new(0x10f0), 0x11));
        assert!(!region.contains(CallerAddr::new(0x0fff), 1));
    }

    #[test]
    fn test_region_contains_near_top_of_address_space() {
        let region =
            MemoryRegion::new(CallerAddr::new(0xFFFF_FF00), 0xFF, MemoryPerms::read_only())
                .unwrap();
        assert!(!region.contains(CallerAddr::new(0xFFFF_FFF0), 0x20));
    }

    #[test]
    fn test_region_rejects_zero_length_and_overflow() {
        assert_eq!(
            MemoryRegion::new(CallerAddr::new(0x10), 0, MemoryPerms::read_only()),
            Err(MemoryError::InvalidRegionSize(0))
        );
        assert!(matches!(
            MemoryRegion::new(CallerAddr::new(0xFFFF_FFF0), 0x20, MemoryPerms::read_only()),
            Err(MemoryError::AddressOverflow { .. })
        ));
    }

    #[test]
    fn test_region_overlap() {
        let a = MemoryRegion::new(CallerAddr::new(0x1000), 0x100, MemoryPerms::none()).unwrap();
        let b = MemoryRegion::new(CallerAddr::new(0x10ff), 0x10, MemoryPerms::none()).unwrap();
        let c = MemoryRegion::new(CallerAddr::new(0x1100), 0x10, MemoryPerms::none()).unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
