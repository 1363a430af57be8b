//! # Direct Call Path
//!
//! Entry points for secure callers that invoke the service as a function
//! call instead of through messages. Arguments arrive as caller addresses:
//! token references, attribute and info records, and buffer descriptors.
//!
//! Output records are produced into service memory and copied to the caller
//! only after the operation has succeeded.

use crate::boundary::{check_owned, copy_in, copy_out, copy_token, validate_and_copy_descriptor};
use crate::error::SstError;
use crate::manager::AssetManager;
use crate::object_store::ObjectStore;
use core_types::{AssetAttributes, AssetInfo, AssetUuid, CallerAddr, MemoryAccess, TokenRef};
use identity::ClientId;
use kernel_api::CallerMemory;
use log::warn;

/// Function-call access to an asset manager over caller memory
pub struct DirectCallPath<'a, 'p, S: ObjectStore, M: CallerMemory> {
    manager: &'a mut AssetManager<'p, S>,
    memory: &'a mut M,
}

impl<'a, 'p, S: ObjectStore, M: CallerMemory> DirectCallPath<'a, 'p, S, M> {
    pub fn new(manager: &'a mut AssetManager<'p, S>, memory: &'a mut M) -> Self {
        Self { manager, memory }
    }

    pub fn create(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: TokenRef,
    ) -> Result<(), SstError> {
        let token = copy_token(&mut *self.memory, caller, token)?;
        self.manager.create(caller, uuid, &token)
    }

    /// Writes the asset's info record to `info_addr`
    ///
    /// `info_addr` must be caller-owned read-write, otherwise `ParamError`.
    pub fn get_info(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: TokenRef,
        info_addr: CallerAddr,
    ) -> Result<(), SstError> {
        self.check_output(caller, info_addr, AssetInfo::WIRE_SIZE)?;
        let token = copy_token(&mut *self.memory, caller, token)?;
        let info = self.manager.get_info(caller, uuid, &token)?;
        copy_out(&mut *self.memory, caller, info_addr, &info.to_wire())?;
        Ok(())
    }

    /// Writes the asset's attribute record to `attrs_addr`
    pub fn get_attributes(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: TokenRef,
        attrs_addr: CallerAddr,
    ) -> Result<(), SstError> {
        self.check_output(caller, attrs_addr, AssetAttributes::WIRE_SIZE)?;
        let token = copy_token(&mut *self.memory, caller, token)?;
        let attrs = self.manager.get_attributes(caller, uuid, &token)?;
        copy_out(&mut *self.memory, caller, attrs_addr, &attrs.to_wire())?;
        Ok(())
    }

    /// Reads the attribute record at `attrs_addr` and stores it
    ///
    /// `attrs_addr` must be caller-owned and readable, otherwise `ParamError`.
    pub fn set_attributes(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: TokenRef,
        attrs_addr: CallerAddr,
    ) -> Result<(), SstError> {
        let len = AssetAttributes::WIRE_SIZE as u32;
        let raw = copy_in(&mut *self.memory, caller, attrs_addr, len)
            .map_err(|_| SstError::ParamError)?;
        let attrs = AssetAttributes::from_wire(&raw)?;
        let token = copy_token(&mut *self.memory, caller, token)?;
        self.manager.set_attributes(caller, uuid, &token, &attrs)
    }

    /// Reads into the buffer described by the descriptor at `desc_addr`
    pub fn read(
        &mut self,
        caller: ClientId,
        client: ClientId,
        uuid: AssetUuid,
        token: TokenRef,
        desc_addr: CallerAddr,
    ) -> Result<(), SstError> {
        let desc = validate_and_copy_descriptor(
            &mut *self.memory,
            desc_addr,
            caller,
            MemoryAccess::ReadWrite,
        )?;
        let token = copy_token(&mut *self.memory, caller, token)?;

        let mut local = vec![0u8; desc.size as usize];
        self.manager
            .read(caller, client, uuid, &token, desc.offset, &mut local)?;
        copy_out(&mut *self.memory, caller, desc.data, &local)?;
        Ok(())
    }

    /// Writes from the buffer described by the descriptor at `desc_addr`
    pub fn write(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: TokenRef,
        desc_addr: CallerAddr,
    ) -> Result<(), SstError> {
        let desc = validate_and_copy_descriptor(
            &mut *self.memory,
            desc_addr,
            caller,
            MemoryAccess::ReadOnly,
        )?;
        let token = copy_token(&mut *self.memory, caller, token)?;
        let data = copy_in(&mut *self.memory, caller, desc.data, desc.size)?;
        self.manager.write(caller, uuid, &token, desc.offset, &data)
    }

    pub fn delete(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: TokenRef,
    ) -> Result<(), SstError> {
        let token = copy_token(&mut *self.memory, caller, token)?;
        self.manager.delete(caller, uuid, &token)
    }

    fn check_output(
        &self,
        caller: ClientId,
        addr: CallerAddr,
        len: usize,
    ) -> Result<(), SstError> {
        check_owned(&*self.memory, caller, addr, len as u32, MemoryAccess::ReadWrite).map_err(
            |_| {
                warn!("direct call: output record at {} rejected", addr);
                SstError::ParamError
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::failing_store::{FailingObjectStore, FailurePolicy};
    use crate::object_store::InMemoryObjectStore;
    use core_types::{AssetType, BufferDescriptor, MemoryPerms};
    use policy::{PermissionSet, PolicyDatabase};
    use sim_kernel::address_space::AddressSpaces;

    const CALLER: ClientId = ClientId::new(3);
    const UUID: AssetUuid = AssetUuid::new(0x10);
    const RW_BASE: u32 = 0x2000_0000;
    const RO_BASE: u32 = 0x3000_0000;

    fn policy() -> PolicyDatabase {
        PolicyDatabase::builder()
            .asset(UUID, AssetType::RAW, 64)
            .grant(ClientId::new(-1), PermissionSet::READ)
            .build()
            .unwrap()
    }

    fn memory() -> AddressSpaces {
        let mut spaces = AddressSpaces::new();
        spaces
            .map(CALLER, CallerAddr::new(RW_BASE), 0x400, MemoryPerms::read_write())
            .unwrap();
        spaces
            .map(CALLER, CallerAddr::new(RO_BASE), 0x100, MemoryPerms::read_only())
            .unwrap();
        spaces
    }

    fn prepared<S: ObjectStore>(policy: &PolicyDatabase, store: S) -> AssetManager<'_, S> {
        let mut manager = AssetManager::new(policy, store, StorageConfig::default());
        manager.prepare().unwrap();
        manager
    }

    fn put_descriptor(mem: &mut AddressSpaces, at: u32, data: u32, offset: u32, size: u32) {
        let desc = BufferDescriptor {
            data: CallerAddr::new(data),
            offset,
            size,
        };
        mem.poke(CALLER, CallerAddr::new(at), &desc.to_wire())
            .unwrap();
    }

    #[test]
    fn test_write_then_read_through_descriptors() {
        let db = policy();
        let mut manager = prepared(&db, InMemoryObjectStore::new());
        let mut mem = memory();
        mem.poke(CALLER, CallerAddr::new(RO_BASE + 0x20), b"payload!")
            .unwrap();
        put_descriptor(&mut mem, RW_BASE, RO_BASE + 0x20, 0, 8);
        put_descriptor(&mut mem, RW_BASE + 0x10, RW_BASE + 0x100, 0, 8);

        let mut path = DirectCallPath::new(&mut manager, &mut mem);
        path.create(CALLER, UUID, TokenRef::empty()).unwrap();
        path.write(CALLER, UUID, TokenRef::empty(), CallerAddr::new(RW_BASE))
            .unwrap();
        path.read(
            CALLER,
            identity::DIRECT_CLIENT_READ,
            UUID,
            TokenRef::empty(),
            CallerAddr::new(RW_BASE + 0x10),
        )
        .unwrap();

        let out = mem.peek(CALLER, CallerAddr::new(RW_BASE + 0x100), 8).unwrap();
        assert_eq!(&out, b"payload!");
    }

    #[test]
    fn test_read_into_read_only_memory_is_not_found() {
        let db = policy();
        let mut manager = prepared(&db, InMemoryObjectStore::new());
        let mut mem = memory();
        put_descriptor(&mut mem, RW_BASE, RO_BASE, 0, 4);

        let mut path = DirectCallPath::new(&mut manager, &mut mem);
        path.create(CALLER, UUID, TokenRef::empty()).unwrap();
        assert_eq!(
            path.read(
                CALLER,
                identity::DIRECT_CLIENT_READ,
                UUID,
                TokenRef::empty(),
                CallerAddr::new(RW_BASE)
            ),
            Err(SstError::AssetNotFound)
        );
    }

    #[test]
    fn test_info_output_must_be_writable() {
        let db = policy();
        let mut manager = prepared(&db, InMemoryObjectStore::new());
        let mut mem = memory();
        let mut path = DirectCallPath::new(&mut manager, &mut mem);
        path.create(CALLER, UUID, TokenRef::empty()).unwrap();
        assert_eq!(
            path.get_info(CALLER, UUID, TokenRef::empty(), CallerAddr::new(RO_BASE)),
            Err(SstError::ParamError)
        );
        assert_eq!(
            path.get_info(CALLER, UUID, TokenRef::empty(), CallerAddr::new(0x10)),
            Err(SstError::ParamError)
        );
        path.get_info(CALLER, UUID, TokenRef::empty(), CallerAddr::new(RW_BASE))
            .unwrap();
    }

    #[test]
    fn test_set_attributes_input_must_be_owned() {
        let db = policy();
        let mut manager = prepared(&db, InMemoryObjectStore::new());
        let mut mem = memory();
        let mut path = DirectCallPath::new(&mut manager, &mut mem);
        path.create(CALLER, UUID, TokenRef::empty()).unwrap();
        assert_eq!(
            path.set_attributes(CALLER, UUID, TokenRef::empty(), CallerAddr::new(0x4000_0000)),
            Err(SstError::ParamError)
        );
        // Zeroed read-only memory is a valid, empty attribute record.
        path.set_attributes(CALLER, UUID, TokenRef::empty(), CallerAddr::new(RO_BASE))
            .unwrap();
    }

    #[test]
    fn test_failed_get_attributes_leaves_output_untouched() {
        let db = policy();
        let store = FailingObjectStore::new(InMemoryObjectStore::new(), FailurePolicy::Never);
        let mut manager = prepared(&db, store);
        let mut mem = memory();
        let sentinel = [0xEEu8; AssetAttributes::WIRE_SIZE];
        mem.poke(CALLER, CallerAddr::new(RW_BASE), &sentinel).unwrap();

        manager
            .create(CALLER, UUID, &core_types::AccessToken::empty())
            .unwrap();
        manager
            .store_mut()
            .set_policy(FailurePolicy::MetadataReads);
        let mut path = DirectCallPath::new(&mut manager, &mut mem);
        assert_eq!(
            path.get_attributes(CALLER, UUID, TokenRef::empty(), CallerAddr::new(RW_BASE)),
            Err(SstError::SystemError)
        );

        let after = mem
            .peek(CALLER, CallerAddr::new(RW_BASE), AssetAttributes::WIRE_SIZE as u32)
            .unwrap();
        assert_eq!(after, sentinel);
    }

    #[test]
    fn test_token_outside_caller_memory_is_not_found() {
        let db = policy();
        let mut manager = prepared(&db, InMemoryObjectStore::new());
        let mut mem = memory();
        let mut path = DirectCallPath::new(&mut manager, &mut mem);
        let token = TokenRef {
            addr: CallerAddr::new(0x5000_0000),
            len: 8,
        };
        assert_eq!(path.create(CALLER, UUID, token), Err(SstError::AssetNotFound));
    }
}
