//! # Boundary Validator
//!
//! Every address a caller hands the service names memory on the other side
//! of the isolation boundary. Nothing here trusts such an address until the
//! partition manager has confirmed the caller owns the whole range with the
//! access the service is about to use.
//!
//! Descriptors are copied before they are validated, and validated before
//! they are used. The caller may keep writing to its own memory while the
//! request is in flight; only the private copy is ever consulted.

use core_types::{AccessToken, BufferDescriptor, CallerAddr, MemoryAccess, TokenRef};
use identity::ClientId;
use kernel_api::CallerMemory;
use log::warn;
use thiserror::Error;

/// Errors validating caller memory
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BoundaryError {
    #[error("Range {addr}+{len} is not owned by the caller")]
    NotOwned { addr: CallerAddr, len: u32 },

    #[error("Copy from caller memory at {0} failed")]
    CopyFailed(CallerAddr),
}

/// Fails unless `caller` owns `[addr, addr + len)` with `access`
pub fn check_owned<M: CallerMemory + ?Sized>(
    mem: &M,
    caller: ClientId,
    addr: CallerAddr,
    len: u32,
    access: MemoryAccess,
) -> Result<(), BoundaryError> {
    if len == 0 {
        return Ok(());
    }
    if addr.checked_add(len).is_none() || !mem.check_range(caller, addr, len, access) {
        warn!(
            "boundary: {} does not own {}+{} for {}",
            caller, addr, len, access
        );
        return Err(BoundaryError::NotOwned { addr, len });
    }
    Ok(())
}

/// Copies a buffer descriptor out of caller memory, then validates it
///
/// 1. the 12-byte descriptor at `src` must be readable by `caller`
/// 2. it is copied into service memory and decoded
/// 3. the copy's `data`/`size` range must be owned by `caller` with `access`
///
/// The returned descriptor is the private copy.
pub fn validate_and_copy_descriptor<M: CallerMemory + ?Sized>(
    mem: &mut M,
    src: CallerAddr,
    caller: ClientId,
    access: MemoryAccess,
) -> Result<BufferDescriptor, BoundaryError> {
    let mut raw = [0u8; BufferDescriptor::WIRE_SIZE];
    check_owned(
        mem,
        caller,
        src,
        BufferDescriptor::WIRE_SIZE as u32,
        MemoryAccess::ReadOnly,
    )?;
    mem.read_bytes(caller, src, &mut raw)
        .map_err(|_| BoundaryError::CopyFailed(src))?;

    let descriptor =
        BufferDescriptor::from_wire(&raw).map_err(|_| BoundaryError::CopyFailed(src))?;
    check_owned(mem, caller, descriptor.data, descriptor.size, access)?;
    Ok(descriptor)
}

/// Copies `len` read-only bytes from caller memory
pub fn copy_in<M: CallerMemory + ?Sized>(
    mem: &mut M,
    caller: ClientId,
    addr: CallerAddr,
    len: u32,
) -> Result<Vec<u8>, BoundaryError> {
    check_owned(mem, caller, addr, len, MemoryAccess::ReadOnly)?;
    let mut bytes = vec![0u8; len as usize];
    if len > 0 {
        mem.read_bytes(caller, addr, &mut bytes)
            .map_err(|_| BoundaryError::CopyFailed(addr))?;
    }
    Ok(bytes)
}

/// Copies the token named by `token_ref` out of caller memory
pub fn copy_token<M: CallerMemory + ?Sized>(
    mem: &mut M,
    caller: ClientId,
    token_ref: TokenRef,
) -> Result<AccessToken, BoundaryError> {
    copy_in(mem, caller, token_ref.addr, token_ref.len).map(AccessToken::from)
}

/// Copies `data` into caller memory the caller owns read-write
pub fn copy_out<M: CallerMemory + ?Sized>(
    mem: &mut M,
    caller: ClientId,
    addr: CallerAddr,
    data: &[u8],
) -> Result<(), BoundaryError> {
    let len = u32::try_from(data.len()).map_err(|_| BoundaryError::NotOwned {
        addr,
        len: u32::MAX,
    })?;
    check_owned(mem, caller, addr, len, MemoryAccess::ReadWrite)?;
    if len > 0 {
        mem.write_bytes(caller, addr, data)
            .map_err(|_| BoundaryError::CopyFailed(addr))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{MemoryPerms, MemoryRegion};
    use kernel_api::KernelError;

    const CALLER: ClientId = ClientId::new(-1);

    /// Memory double: one region per owner, optionally rewriting bytes after
    /// the first read to model a caller racing the service.
    struct RacyMemory {
        owner: ClientId,
        region: MemoryRegion,
        bytes: Vec<u8>,
        reads: usize,
        after_first_read: Option<(usize, Vec<u8>)>,
    }

    impl RacyMemory {
        fn new(perms: MemoryPerms) -> Self {
            Self {
                owner: CALLER,
                region: MemoryRegion::new(CallerAddr::new(0x1000), 0x100, perms).unwrap(),
                bytes: vec![0; 0x100],
                reads: 0,
                after_first_read: None,
            }
        }

        fn put(&mut self, addr: u32, data: &[u8]) {
            let at = (addr - 0x1000) as usize;
            self.bytes[at..at + data.len()].copy_from_slice(data);
        }
    }

    impl CallerMemory for RacyMemory {
        fn check_range(
            &self,
            owner: ClientId,
            addr: CallerAddr,
            len: u32,
            access: MemoryAccess,
        ) -> bool {
            len == 0
                || (owner == self.owner
                    && self.region.contains(addr, len)
                    && self.region.permissions.allows(access))
        }

        fn read_bytes(
            &mut self,
            _owner: ClientId,
            addr: CallerAddr,
            buf: &mut [u8],
        ) -> Result<(), KernelError> {
            let at = (addr.as_u32() - 0x1000) as usize;
            buf.copy_from_slice(&self.bytes[at..at + buf.len()]);
            self.reads += 1;
            if self.reads == 1 {
                if let Some((at, data)) = self.after_first_read.take() {
                    self.bytes[at..at + data.len()].copy_from_slice(&data);
                }
            }
            Ok(())
        }

        fn write_bytes(
            &mut self,
            _owner: ClientId,
            addr: CallerAddr,
            data: &[u8],
        ) -> Result<(), KernelError> {
            let at = (addr.as_u32() - 0x1000) as usize;
            self.bytes[at..at + data.len()].copy_from_slice(data);
            Ok(())
        }
    }

    fn descriptor(data: u32, size: u32) -> [u8; BufferDescriptor::WIRE_SIZE] {
        BufferDescriptor {
            data: CallerAddr::new(data),
            offset: 0,
            size,
        }
        .to_wire()
    }

    #[test]
    fn test_valid_descriptor_copied() {
        let mut mem = RacyMemory::new(MemoryPerms::read_write());
        mem.put(0x1000, &descriptor(0x1040, 0x20));
        let desc = validate_and_copy_descriptor(
            &mut mem,
            CallerAddr::new(0x1000),
            CALLER,
            MemoryAccess::ReadWrite,
        )
        .unwrap();
        assert_eq!(desc.data, CallerAddr::new(0x1040));
        assert_eq!(desc.size, 0x20);
    }

    #[test]
    fn test_descriptor_outside_caller_memory() {
        let mut mem = RacyMemory::new(MemoryPerms::read_write());
        let result = validate_and_copy_descriptor(
            &mut mem,
            CallerAddr::new(0x10FA),
            CALLER,
            MemoryAccess::ReadOnly,
        );
        assert!(matches!(result, Err(BoundaryError::NotOwned { len: 12, .. })));
        assert_eq!(mem.reads, 0);
    }

    #[test]
    fn test_payload_outside_caller_memory() {
        let mut mem = RacyMemory::new(MemoryPerms::read_write());
        mem.put(0x1000, &descriptor(0x10F0, 0x20));
        let result = validate_and_copy_descriptor(
            &mut mem,
            CallerAddr::new(0x1000),
            CALLER,
            MemoryAccess::ReadOnly,
        );
        assert!(matches!(result, Err(BoundaryError::NotOwned { .. })));
    }

    #[test]
    fn test_read_only_memory_rejected_for_output() {
        let mut mem = RacyMemory::new(MemoryPerms::read_only());
        mem.put(0x1000, &descriptor(0x1040, 0x10));
        assert!(validate_and_copy_descriptor(
            &mut mem,
            CallerAddr::new(0x1000),
            CALLER,
            MemoryAccess::ReadWrite,
        )
        .is_err());
        assert!(validate_and_copy_descriptor(
            &mut mem,
            CallerAddr::new(0x1000),
            CALLER,
            MemoryAccess::ReadOnly,
        )
        .is_ok());
    }

    #[test]
    fn test_descriptor_rewritten_after_copy_is_ignored() {
        let mut mem = RacyMemory::new(MemoryPerms::read_write());
        mem.put(0x1000, &descriptor(0x1040, 0x10));
        // After the service copies the descriptor, the caller points it at
        // memory it does not own.
        mem.after_first_read = Some((0, descriptor(0x9000_0000, 0x1000).to_vec()));

        let desc = validate_and_copy_descriptor(
            &mut mem,
            CallerAddr::new(0x1000),
            CALLER,
            MemoryAccess::ReadWrite,
        )
        .unwrap();
        assert_eq!(desc.data, CallerAddr::new(0x1040));
        assert_eq!(desc.size, 0x10);
    }

    #[test]
    fn test_zero_length_always_owned() {
        let mut mem = RacyMemory::new(MemoryPerms::read_only());
        mem.put(0x1000, &descriptor(0xDEAD_0000, 0));
        assert!(validate_and_copy_descriptor(
            &mut mem,
            CallerAddr::new(0x1000),
            CALLER,
            MemoryAccess::ReadWrite,
        )
        .is_ok());
        assert_eq!(
            copy_token(&mut mem, CALLER, TokenRef::empty()),
            Ok(AccessToken::empty())
        );
    }

    #[test]
    fn test_other_owner_rejected() {
        let mut mem = RacyMemory::new(MemoryPerms::read_write());
        assert!(copy_in(&mut mem, ClientId::new(-2), CallerAddr::new(0x1000), 4).is_err());
    }

    #[test]
    fn test_copy_out_requires_read_write() {
        let mut mem = RacyMemory::new(MemoryPerms::read_only());
        assert!(copy_out(&mut mem, CALLER, CallerAddr::new(0x1000), b"abcd").is_err());
        assert_eq!(&mem.bytes[..4], &[0, 0, 0, 0]);
    }
}
