//! Caller address spaces for SimulatedSpm
//!
//! This module simulates the memory each client owns, providing logical
//! isolation without an MPU. Every client has its own set of
//! non-overlapping regions; an address means nothing outside its owner's
//! space.

use core_types::{CallerAddr, MemoryAccess, MemoryError, MemoryPerms, MemoryRegion};
use identity::ClientId;
use kernel_api::{CallerMemory, KernelError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Address space audit events (test-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressSpaceEvent {
    /// Region mapped into a client's space
    RegionMapped {
        owner: ClientId,
        base: CallerAddr,
        len: u32,
        permissions: MemoryPerms,
    },
    /// Bytes copied out of a client's space
    BytesRead {
        owner: ClientId,
        addr: CallerAddr,
        len: u32,
    },
    /// Bytes copied into a client's space
    BytesWritten {
        owner: ClientId,
        addr: CallerAddr,
        len: u32,
    },
}

/// Audit log for address space operations
#[derive(Debug, Clone, Default)]
pub struct AddressSpaceAuditLog {
    events: Vec<AddressSpaceEvent>,
}

impl AddressSpaceAuditLog {
    /// Creates a new empty audit log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Records an event
    pub fn record(&mut self, event: AddressSpaceEvent) {
        self.events.push(event);
    }

    /// Returns all recorded events
    pub fn events(&self) -> &[AddressSpaceEvent] {
        &self.events
    }

    /// Clears all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Counts events matching the predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&AddressSpaceEvent) -> bool,
    {
        self.events.iter().filter(|e| predicate(e)).count()
    }
}

#[derive(Debug, Clone)]
struct MappedRegion {
    region: MemoryRegion,
    bytes: Vec<u8>,
}

impl MappedRegion {
    fn slice(&self, addr: CallerAddr, len: usize) -> &[u8] {
        let at = (addr.as_u32() - self.region.base.as_u32()) as usize;
        &self.bytes[at..at + len]
    }

    fn slice_mut(&mut self, addr: CallerAddr, len: usize) -> &mut [u8] {
        let at = (addr.as_u32() - self.region.base.as_u32()) as usize;
        &mut self.bytes[at..at + len]
    }
}

/// All client address spaces known to the simulator
#[derive(Debug, Clone, Default)]
pub struct AddressSpaces {
    spaces: HashMap<ClientId, Vec<MappedRegion>>,
    audit: AddressSpaceAuditLog,
}

impl AddressSpaces {
    /// Creates an empty set of address spaces
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a zero-filled region into `owner`'s space
    ///
    /// Fails if the region is empty, wraps the address space, or overlaps
    /// another region of the same owner.
    pub fn map(
        &mut self,
        owner: ClientId,
        base: CallerAddr,
        len: u32,
        permissions: MemoryPerms,
    ) -> Result<(), MemoryError> {
        let region = MemoryRegion::new(base, len, permissions)?;
        let space = self.spaces.entry(owner).or_default();
        if space.iter().any(|mapped| mapped.region.overlaps(&region)) {
            return Err(MemoryError::RegionOverlap(base));
        }
        space.push(MappedRegion {
            region,
            bytes: vec![0; len as usize],
        });
        self.audit.record(AddressSpaceEvent::RegionMapped {
            owner,
            base,
            len,
            permissions,
        });
        Ok(())
    }

    /// Returns the audit log
    pub fn audit_log(&self) -> &AddressSpaceAuditLog {
        &self.audit
    }

    /// Returns the audit log mutably (for clearing between test phases)
    pub fn audit_log_mut(&mut self) -> &mut AddressSpaceAuditLog {
        &mut self.audit
    }

    /// Writes bytes regardless of permissions (test setup)
    pub fn poke(
        &mut self,
        owner: ClientId,
        addr: CallerAddr,
        data: &[u8],
    ) -> Result<(), KernelError> {
        let len = data.len() as u32;
        let mapped = self
            .find_mut(owner, addr, len)
            .ok_or_else(|| not_owned(addr, len, MemoryAccess::ReadOnly))?;
        mapped.slice_mut(addr, data.len()).copy_from_slice(data);
        Ok(())
    }

    /// Reads bytes regardless of permissions (test inspection)
    pub fn peek(&self, owner: ClientId, addr: CallerAddr, len: u32) -> Result<Vec<u8>, KernelError> {
        let mapped = self
            .find(owner, addr, len)
            .ok_or_else(|| not_owned(addr, len, MemoryAccess::ReadOnly))?;
        Ok(mapped.slice(addr, len as usize).to_vec())
    }

    fn find(&self, owner: ClientId, addr: CallerAddr, len: u32) -> Option<&MappedRegion> {
        self.spaces
            .get(&owner)?
            .iter()
            .find(|mapped| mapped.region.contains(addr, len))
    }

    fn find_mut(&mut self, owner: ClientId, addr: CallerAddr, len: u32) -> Option<&mut MappedRegion> {
        self.spaces
            .get_mut(&owner)?
            .iter_mut()
            .find(|mapped| mapped.region.contains(addr, len))
    }
}

fn not_owned(addr: CallerAddr, len: u32, access: MemoryAccess) -> KernelError {
    KernelError::MemoryFault {
        addr,
        source: MemoryError::NotOwned { addr, len, access },
    }
}

impl CallerMemory for AddressSpaces {
    fn check_range(
        &self,
        owner: ClientId,
        addr: CallerAddr,
        len: u32,
        access: MemoryAccess,
    ) -> bool {
        if len == 0 {
            return true;
        }
        self.find(owner, addr, len)
            .map(|mapped| mapped.region.permissions.allows(access))
            .unwrap_or(false)
    }

    fn read_bytes(
        &mut self,
        owner: ClientId,
        addr: CallerAddr,
        buf: &mut [u8],
    ) -> Result<(), KernelError> {
        let len = buf.len() as u32;
        if !self.check_range(owner, addr, len, MemoryAccess::ReadOnly) {
            return Err(not_owned(addr, len, MemoryAccess::ReadOnly));
        }
        if let Some(mapped) = self.find(owner, addr, len) {
            buf.copy_from_slice(mapped.slice(addr, buf.len()));
        }
        self.audit
            .record(AddressSpaceEvent::BytesRead { owner, addr, len });
        Ok(())
    }

    fn write_bytes(
        &mut self,
        owner: ClientId,
        addr: CallerAddr,
        data: &[u8],
    ) -> Result<(), KernelError> {
        let len = data.len() as u32;
        if !self.check_range(owner, addr, len, MemoryAccess::ReadWrite) {
            return Err(not_owned(addr, len, MemoryAccess::ReadWrite));
        }
        if let Some(mapped) = self.find_mut(owner, addr, len) {
            mapped.slice_mut(addr, data.len()).copy_from_slice(data);
        }
        self.audit
            .record(AddressSpaceEvent::BytesWritten { owner, addr, len });
        Ok(())
    }
}
