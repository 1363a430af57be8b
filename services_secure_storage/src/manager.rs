//! # Asset Manager
//!
//! Policy-gated wrappers around the object store, one per operation.
//!
//! Authorization and parameter checks run before the object store is
//! touched, so a refused request has no side effects. Metadata results are
//! returned by value; callers copy them out only once the whole operation
//! has succeeded.

use crate::config::StorageConfig;
use crate::error::SstError;
use crate::object_store::ObjectStore;
use core_types::{AccessToken, AssetAttributes, AssetInfo, AssetUuid};
use identity::{ClientId, DIRECT_CLIENT_READ};
use log::{debug, error, info, warn};
use policy::{PermissionSet, PolicyDatabase};

/// Fails unless `[sub_start, sub_start + sub_size)` lies within
/// `[super_start, super_start + super_size)`
pub fn check_contained_in(
    super_start: u32,
    super_size: u32,
    sub_start: u32,
    sub_size: u32,
) -> Result<(), SstError> {
    let super_end = super_start as u64 + super_size as u64;
    let sub_end = sub_start as u64 + sub_size as u64;
    if sub_start < super_start || sub_end > super_end {
        return Err(SstError::ParamError);
    }
    Ok(())
}

/// Proof that a read of one asset was authorized
///
/// Only [`AssetManager::authorize_read`] creates one. The chunked read path
/// authorizes once and then streams every chunk under the same grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadGrant {
    uuid: AssetUuid,
}

impl ReadGrant {
    pub fn uuid(&self) -> AssetUuid {
        self.uuid
    }
}

/// Executes storage operations on behalf of authenticated callers
pub struct AssetManager<'p, S: ObjectStore> {
    policy: &'p PolicyDatabase,
    store: S,
    config: StorageConfig,
}

impl<'p, S: ObjectStore> AssetManager<'p, S> {
    pub fn new(policy: &'p PolicyDatabase, store: S, config: StorageConfig) -> Self {
        Self {
            policy,
            store,
            config,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn policy(&self) -> &'p PolicyDatabase {
        self.policy
    }

    /// The object store (for inspection)
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Checks configuration and policy integrity, then prepares the store
    ///
    /// When the store fails to prepare and `create_layout_on_failure` is
    /// set, the store is wiped and prepared once more.
    pub fn prepare(&mut self) -> Result<(), SstError> {
        if let Err(err) = self.config.validate() {
            error!("asset manager: invalid configuration: {}", err);
            return Err(SstError::SystemError);
        }
        if let Err(err) = self.policy.validate() {
            error!("asset manager: policy database integrity check failed: {}", err);
            return Err(SstError::SystemError);
        }

        match self.store.prepare() {
            Ok(()) => {}
            Err(err) if self.config.create_layout_on_failure => {
                warn!("asset manager: store prepare failed ({}), creating layout", err);
                self.store.wipe_all().map_err(|_| SstError::SystemError)?;
                self.store.prepare().map_err(|_| SstError::SystemError)?;
            }
            Err(err) => {
                error!("asset manager: store prepare failed: {}", err);
                return Err(SstError::SystemError);
            }
        }

        info!(
            "asset manager: prepared with {} assets, staging {} bytes",
            self.policy.assets().len(),
            self.config.staging_buffer_size
        );
        Ok(())
    }

    pub fn create(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: &AccessToken,
    ) -> Result<(), SstError> {
        let entry = self
            .policy
            .authorize(caller, caller, uuid, PermissionSet::WRITE)?;
        debug!("asset manager: create {} for {}", uuid, caller);
        self.store
            .create(uuid, token, entry.asset_type, entry.max_size)?;
        Ok(())
    }

    pub fn get_info(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: &AccessToken,
    ) -> Result<AssetInfo, SstError> {
        self.policy
            .authorize(caller, caller, uuid, PermissionSet::any_access())?;
        Ok(self.store.get_info(uuid, token)?)
    }

    pub fn get_attributes(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: &AccessToken,
    ) -> Result<AssetAttributes, SstError> {
        self.policy
            .authorize(caller, caller, uuid, PermissionSet::any_access())?;
        Ok(self.store.get_attributes(uuid, token)?)
    }

    /// Stores new attributes; a non-zero validity window is refused
    pub fn set_attributes(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: &AccessToken,
        attributes: &AssetAttributes,
    ) -> Result<(), SstError> {
        self.policy
            .authorize(caller, caller, uuid, PermissionSet::any_access())?;
        if !attributes.validity.is_unset() {
            warn!("asset manager: validity window not supported on {}", uuid);
            return Err(SstError::ParamError);
        }
        self.store.set_attributes(uuid, token, attributes)?;
        Ok(())
    }

    /// Authorizes `caller` to read `uuid`, optionally by reference
    ///
    /// Any `client` other than [`DIRECT_CLIENT_READ`] asks to read on that
    /// client's behalf: the caller must be secure and the client must hold
    /// Reference on the asset. The caller itself must then hold Read.
    pub fn authorize_read(
        &self,
        caller: ClientId,
        client: ClientId,
        uuid: AssetUuid,
        offset: u32,
    ) -> Result<ReadGrant, SstError> {
        if client != DIRECT_CLIENT_READ {
            if !caller.is_secure() {
                warn!(
                    "asset manager: {} may not read {} by reference as {}",
                    caller, uuid, client
                );
                return Err(SstError::AssetNotFound);
            }
            self.policy
                .authorize(caller, client, uuid, PermissionSet::REFERENCE)?;
        }

        self.policy
            .authorize(caller, caller, uuid, PermissionSet::READ)?;

        if !self.config.partial_asset_rw && offset != 0 {
            return Err(SstError::ParamError);
        }
        Ok(ReadGrant { uuid })
    }

    /// Reads `buf.len()` bytes at `offset` under an existing grant
    pub fn read_granted(
        &mut self,
        grant: &ReadGrant,
        token: &AccessToken,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<(), SstError> {
        self.store.read(grant.uuid, token, offset, buf)?;
        Ok(())
    }

    /// Single-shot read of `buf.len()` bytes at `offset`
    pub fn read(
        &mut self,
        caller: ClientId,
        client: ClientId,
        uuid: AssetUuid,
        token: &AccessToken,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<(), SstError> {
        let grant = self.authorize_read(caller, client, uuid, offset)?;
        self.read_granted(&grant, token, offset, buf)
    }

    /// Authorizes `caller` to write `[offset, offset + size)` of `uuid`
    ///
    /// The range must fit within the asset's declared maximum size. The
    /// chunked write path checks the whole transfer here before any chunk
    /// reaches the store.
    pub fn check_write_range(
        &self,
        caller: ClientId,
        uuid: AssetUuid,
        offset: u32,
        size: u32,
    ) -> Result<(), SstError> {
        let entry = self
            .policy
            .authorize(caller, caller, uuid, PermissionSet::WRITE)?;

        if let Err(err) = check_contained_in(0, entry.max_size, offset, size) {
            warn!(
                "asset manager: write {}+{} exceeds {} bytes of {}",
                offset, size, entry.max_size, uuid
            );
            return Err(err);
        }
        Ok(())
    }

    /// Single-shot write of `data` at `offset`
    ///
    /// The range must fit within the asset's declared maximum size.
    pub fn write(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: &AccessToken,
        offset: u32,
        data: &[u8],
    ) -> Result<(), SstError> {
        let size = u32::try_from(data.len()).map_err(|_| SstError::ParamError)?;
        self.check_write_range(caller, uuid, offset, size)?;

        if !self.config.partial_asset_rw && offset != 0 {
            return Err(SstError::ParamError);
        }

        self.store.write(uuid, token, offset, data)?;
        Ok(())
    }

    /// Deletes an asset; deletion needs Write
    pub fn delete(
        &mut self,
        caller: ClientId,
        uuid: AssetUuid,
        token: &AccessToken,
    ) -> Result<(), SstError> {
        self.policy
            .authorize(caller, caller, uuid, PermissionSet::WRITE)?;
        debug!("asset manager: delete {} for {}", uuid, caller);
        self.store.delete(uuid, token)?;
        Ok(())
    }
}
