//! # Failing Object Store
//!
//! An ObjectStore wrapper that can simulate failures for testing the
//! storage core. Useful for exercising partially committed chunked writes
//! and output records on failed metadata reads.

use crate::object_store::{ObjectStore, StoreError};
use core_types::{AccessToken, AssetAttributes, AssetInfo, AssetType, AssetUuid};

/// Policy for when failures should occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Never fail (passthrough)
    Never,
    /// Fail every write after N successful writes
    AfterWrites(usize),
    /// Fail `get_info` and `get_attributes`
    MetadataReads,
    /// Fail `prepare` the first N times it is called
    PrepareTimes(usize),
}

/// Wrapper around an ObjectStore that can simulate failures
pub struct FailingObjectStore<S: ObjectStore> {
    inner: S,
    policy: FailurePolicy,
    write_count: usize,
    prepare_count: usize,
}

impl<S: ObjectStore> FailingObjectStore<S> {
    /// Create a new failing store with the given policy
    pub fn new(inner: S, policy: FailurePolicy) -> Self {
        Self {
            inner,
            policy,
            write_count: 0,
            prepare_count: 0,
        }
    }

    /// Get the underlying store (for inspection)
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get mutable access to the underlying store
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Get the number of writes that have succeeded
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Reset the failure policy
    pub fn set_policy(&mut self, policy: FailurePolicy) {
        self.policy = policy;
        self.write_count = 0;
        self.prepare_count = 0;
    }

    fn injected() -> StoreError {
        StoreError::Io("injected failure".to_string())
    }
}

impl<S: ObjectStore> ObjectStore for FailingObjectStore<S> {
    fn prepare(&mut self) -> Result<(), StoreError> {
        if let FailurePolicy::PrepareTimes(n) = self.policy {
            if self.prepare_count < n {
                self.prepare_count += 1;
                return Err(Self::injected());
            }
        }
        self.inner.prepare()
    }

    fn wipe_all(&mut self) -> Result<(), StoreError> {
        self.inner.wipe_all()
    }

    fn create(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        asset_type: AssetType,
        max_size: u32,
    ) -> Result<(), StoreError> {
        self.inner.create(uuid, token, asset_type, max_size)
    }

    fn get_info(&mut self, uuid: AssetUuid, token: &AccessToken) -> Result<AssetInfo, StoreError> {
        if self.policy == FailurePolicy::MetadataReads {
            return Err(Self::injected());
        }
        self.inner.get_info(uuid, token)
    }

    fn get_attributes(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
    ) -> Result<AssetAttributes, StoreError> {
        if self.policy == FailurePolicy::MetadataReads {
            return Err(Self::injected());
        }
        self.inner.get_attributes(uuid, token)
    }

    fn set_attributes(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        attributes: &AssetAttributes,
    ) -> Result<(), StoreError> {
        self.inner.set_attributes(uuid, token, attributes)
    }

    fn read(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<(), StoreError> {
        self.inner.read(uuid, token, offset, buf)
    }

    fn write(
        &mut self,
        uuid: AssetUuid,
        token: &AccessToken,
        offset: u32,
        data: &[u8],
    ) -> Result<(), StoreError> {
        if matches!(self.policy, FailurePolicy::AfterWrites(n) if self.write_count >= n) {
            return Err(Self::injected());
        }
        self.inner.write(uuid, token, offset, data)?;
        self.write_count += 1;
        Ok(())
    }

    fn delete(&mut self, uuid: AssetUuid, token: &AccessToken) -> Result<(), StoreError> {
        self.inner.delete(uuid, token)
    }
}
