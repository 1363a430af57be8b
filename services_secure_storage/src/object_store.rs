//! # Object Store
//!
//! The persistent object layer the asset manager sits on. The storage core
//! treats it as an external collaborator: each call is assumed atomic and
//! synchronous, and the core never looks behind this trait.
//!
//! [`InMemoryObjectStore`] is the reference implementation used by the
//! simulator and the tests.

use core_types::{AccessToken, AssetAttributes, AssetInfo, AssetType, AssetUuid};
use log::debug;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors reported by an object store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Object not found")]
    NotFound,

    #[error("Token does not match object")]
    AuthenticationFailed,

    #[error("Range {offset}+{size} exceeds limit {limit}")]
    OutOfRange { offset: u32, size: u32, limit: u32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Object store not prepared")]
    NotPrepared,

    #[error("Object store full")]
    StorageFull,

    #[error("I/O error: {0}")]
    Io(String),
}

/// Persistent storage of asset contents and metadata
pub trait ObjectStore {
    /// Checks the backing layout and makes the store usable
    fn prepare(&mut self) -> Result<(), StoreError>;

    /// Erases every object and lays out an empty store
    fn wipe_all(&mut self) -> Result<(), StoreError>;

    /// Creates an empty object bound to `token`
    ///
    /// Creating an object that already exists with the same token succeeds
    /// without changing it.
    fn create(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        asset_type: AssetType,
        max_size: u32,
    ) -> Result<(), StoreError>;

    fn get_info(&mut self, uuid: AssetUuid, token: &AccessToken) -> Result<AssetInfo, StoreError>;

    fn get_attributes(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
    ) -> Result<AssetAttributes, StoreError>;

    fn set_attributes(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        attributes: &AssetAttributes,
    ) -> Result<(), StoreError>;

    /// Fills `buf` from `[offset, offset + buf.len())` of the object
    fn read(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<(), StoreError>;

    /// Writes `data` at `offset`, growing the object if needed
    fn write(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        offset: u32,
        data: &[u8],
    ) -> Result<(), StoreError>;

    fn delete(&mut self, uuid: AssetUuid, token: &AccessToken) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct StoredObject {
    token: AccessToken,
    asset_type: AssetType,
    max_size: u32,
    attributes: AssetAttributes,
    data: Vec<u8>,
}

impl StoredObject {
    fn info(&self) -> AssetInfo {
        AssetInfo {
            current_size: self.data.len() as u32,
            max_size: self.max_size,
            asset_type: self.asset_type.as_u32(),
        }
    }
}

/// Object store held entirely in memory
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore {
    objects: BTreeMap<AssetUuid, StoredObject>,
    capacity: usize,
    prepared: bool,
    calls: usize,
}

impl InMemoryObjectStore {
    /// Default number of objects a store can hold
    pub const DEFAULT_CAPACITY: usize = 32;

    /// Creates an unprepared store with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates an unprepared store holding at most `capacity` objects
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            objects: BTreeMap::new(),
            capacity,
            prepared: false,
            calls: 0,
        }
    }

    /// Number of object operations that reached this store (for testing)
    ///
    /// `prepare` and `wipe_all` are not counted.
    pub fn call_count(&self) -> usize {
        self.calls
    }

    /// Raw contents of an object, bypassing tokens (for testing)
    pub fn contents(&self, uuid: AssetUuid) -> Option<&[u8]> {
        self.objects.get(&uuid).map(|object| object.data.as_slice())
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn enter(&mut self) -> Result<(), StoreError> {
        self.calls += 1;
        if !self.prepared {
            return Err(StoreError::NotPrepared);
        }
        Ok(())
    }

    fn object(&self, uuid: AssetUuid, token: &AccessToken) -> Result<&StoredObject, StoreError> {
        let object = self.objects.get(&uuid).ok_or(StoreError::NotFound)?;
        if object.token != *token {
            return Err(StoreError::AuthenticationFailed);
        }
        Ok(object)
    }

    fn object_mut(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
    ) -> Result<&mut StoredObject, StoreError> {
        let object = self.objects.get_mut(&uuid).ok_or(StoreError::NotFound)?;
        if object.token != *token {
            return Err(StoreError::AuthenticationFailed);
        }
        Ok(object)
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn prepare(&mut self) -> Result<(), StoreError> {
        self.prepared = true;
        Ok(())
    }

    fn wipe_all(&mut self) -> Result<(), StoreError> {
        debug!("object store: wiping {} objects", self.objects.len());
        self.objects.clear();
        Ok(())
    }

    fn create(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        asset_type: AssetType,
        max_size: u32,
    ) -> Result<(), StoreError> {
        self.enter()?;
        if self.objects.contains_key(&uuid) {
            return self.object(uuid, token).map(|_| ());
        }
        if self.objects.len() >= self.capacity {
            return Err(StoreError::StorageFull);
        }
        self.objects.insert(
            uuid,
            StoredObject {
                token: token.clone(),
                asset_type,
                max_size,
                attributes: AssetAttributes::default(),
                data: Vec::new(),
            },
        );
        Ok(())
    }

    fn get_info(&mut self, uuid: AssetUuid, token: &AccessToken) -> Result<AssetInfo, StoreError> {
        self.enter()?;
        self.object(uuid, token).map(StoredObject::info)
    }

    fn get_attributes(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
    ) -> Result<AssetAttributes, StoreError> {
        self.enter()?;
        self.object(uuid, token).map(|object| object.attributes)
    }

    fn set_attributes(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        attributes: &AssetAttributes,
    ) -> Result<(), StoreError> {
        self.enter()?;
        self.object_mut(uuid, token)?.attributes = *attributes;
        Ok(())
    }

    fn read(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<(), StoreError> {
        self.enter()?;
        let object = self.object(uuid, token)?;
        let size = u32::try_from(buf.len()).map_err(|_| StoreError::InvalidArgument("size"))?;
        let limit = object.data.len() as u32;
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= limit)
            .ok_or(StoreError::OutOfRange {
                offset,
                size,
                limit,
            })?;
        buf.copy_from_slice(&object.data[offset as usize..end as usize]);
        Ok(())
    }

    fn write(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        offset: u32,
        data: &[u8],
    ) -> Result<(), StoreError> {
        self.enter()?;
        let object = self.object_mut(uuid, token)?;
        let size = u32::try_from(data.len()).map_err(|_| StoreError::InvalidArgument("size"))?;
        let current = object.data.len() as u32;
        if offset > current {
            return Err(StoreError::OutOfRange {
                offset,
                size,
                limit: current,
            });
        }
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= object.max_size)
            .ok_or(StoreError::OutOfRange {
                offset,
                size,
                limit: object.max_size,
            })?;
        if end > current {
            object.data.resize(end as usize, 0);
        }
        object.data[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn delete(&mut self, uuid: AssetUuid, token: &AccessToken) -> Result<(), StoreError> {
        self.enter()?;
        self.object(uuid, token)?;
        self.objects.remove(&uuid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: AssetUuid = AssetUuid::new(0xAA);

    fn prepared() -> InMemoryObjectStore {
        let mut store = InMemoryObjectStore::new();
        store.prepare().unwrap();
        store
    }

    fn token(bytes: &[u8]) -> AccessToken {
        AccessToken::from(bytes)
    }

    #[test]
    fn test_operations_before_prepare_fail() {
        let mut store = InMemoryObjectStore::new();
        assert_eq!(
            store.create(UUID, &AccessToken::empty(), AssetType::RAW, 8),
            Err(StoreError::NotPrepared)
        );
    }

    #[test]
    fn test_create_is_idempotent_for_same_token() {
        let mut store = prepared();
        store.create(UUID, &token(b"t"), AssetType::RAW, 8).unwrap();
        store.write(UUID, &token(b"t"), 0, b"abc").unwrap();
        store.create(UUID, &token(b"t"), AssetType::RAW, 8).unwrap();
        assert_eq!(store.contents(UUID), Some(&b"abc"[..]));
        assert_eq!(
            store.create(UUID, &token(b"x"), AssetType::RAW, 8),
            Err(StoreError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_wrong_token_rejected() {
        let mut store = prepared();
        store.create(UUID, &token(b"owner"), AssetType::RAW, 8).unwrap();
        assert_eq!(
            store.get_info(UUID, &token(b"thief")),
            Err(StoreError::AuthenticationFailed)
        );
        assert_eq!(
            store.delete(UUID, &token(b"thief")),
            Err(StoreError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_write_enforces_max_size_and_holes() {
        let mut store = prepared();
        let t = AccessToken::empty();
        store.create(UUID, &t, AssetType::RAW, 8).unwrap();
        assert!(matches!(
            store.write(UUID, &t, 1, b"x"),
            Err(StoreError::OutOfRange { limit: 0, .. })
        ));
        store.write(UUID, &t, 0, b"12345678").unwrap();
        assert!(matches!(
            store.write(UUID, &t, 6, b"abc"),
            Err(StoreError::OutOfRange { limit: 8, .. })
        ));
        store.write(UUID, &t, 6, b"ab").unwrap();
        assert_eq!(store.contents(UUID), Some(&b"123456ab"[..]));
    }

    #[test]
    fn test_read_bounded_by_current_size() {
        let mut store = prepared();
        let t = AccessToken::empty();
        store.create(UUID, &t, AssetType::RAW, 16).unwrap();
        store.write(UUID, &t, 0, b"hello").unwrap();

        let mut buf = [0u8; 3];
        store.read(UUID, &t, 2, &mut buf).unwrap();
        assert_eq!(&buf, b"llo");

        let mut too_far = [0u8; 4];
        assert!(matches!(
            store.read(UUID, &t, 2, &mut too_far),
            Err(StoreError::OutOfRange { limit: 5, .. })
        ));
    }

    #[test]
    fn test_info_and_attributes() {
        let mut store = prepared();
        let t = AccessToken::empty();
        store.create(UUID, &t, AssetType::KEY_PAIR, 64).unwrap();
        store.write(UUID, &t, 0, &[1, 2, 3]).unwrap();
        let info = store.get_info(UUID, &t).unwrap();
        assert_eq!(info.current_size, 3);
        assert_eq!(info.max_size, 64);
        assert_eq!(info.asset_type, AssetType::KEY_PAIR.as_u32());

        let attrs = AssetAttributes {
            flags: 0x5,
            ..Default::default()
        };
        store.set_attributes(UUID, &t, &attrs).unwrap();
        assert_eq!(store.get_attributes(UUID, &t), Ok(attrs));
    }

    #[test]
    fn test_capacity_and_wipe() {
        let mut store = InMemoryObjectStore::with_capacity(1);
        store.prepare().unwrap();
        let t = AccessToken::empty();
        store.create(AssetUuid::new(1), &t, AssetType::RAW, 4).unwrap();
        assert_eq!(
            store.create(AssetUuid::new(2), &t, AssetType::RAW, 4),
            Err(StoreError::StorageFull)
        );
        store.wipe_all().unwrap();
        assert_eq!(store.object_count(), 0);
    }

    #[test]
    fn test_delete_then_not_found() {
        let mut store = prepared();
        let t = AccessToken::empty();
        store.create(UUID, &t, AssetType::RAW, 4).unwrap();
        store.delete(UUID, &t).unwrap();
        assert_eq!(store.get_info(UUID, &t), Err(StoreError::NotFound));
        assert_eq!(store.call_count(), 3);
    }
}
