//! Policy tables: one entry per asset, a flat list of client grants

use crate::permission::{Permission, PermissionSet};
use core_types::{AssetType, AssetUuid};
use identity::ClientId;
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Policy for one asset
///
/// The asset owns the grants at
/// `[perms_start_index, perms_start_index + perms_count)` of the
/// permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetPolicyEntry {
    pub uuid: AssetUuid,
    pub asset_type: AssetType,
    pub max_size: u32,
    pub perms_start_index: u32,
    pub perms_count: u32,
}

/// Access rights of one client on one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionEntry {
    pub client_id: ClientId,
    pub perm_bits: PermissionSet,
}

/// Errors building or loading a policy database
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Duplicate asset uuid: {0}")]
    DuplicateUuid(AssetUuid),

    #[error("Permissions of {uuid} at {start}+{count} fall outside a table of {len}")]
    PermissionSliceOutOfRange {
        uuid: AssetUuid,
        start: u32,
        count: u32,
        len: usize,
    },

    #[error("Grant for {0} given before any asset")]
    GrantWithoutAsset(ClientId),

    #[error("Invalid policy document: {0}")]
    InvalidDocument(String),
}

/// The policy and permission tables
///
/// Built once at start-up and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyDatabase {
    assets: Vec<AssetPolicyEntry>,
    permissions: Vec<PermissionEntry>,
}

impl PolicyDatabase {
    /// Creates a database from raw tables without checking them
    ///
    /// Call [`PolicyDatabase::validate`] before use.
    pub fn from_tables(assets: Vec<AssetPolicyEntry>, permissions: Vec<PermissionEntry>) -> Self {
        Self {
            assets,
            permissions,
        }
    }

    /// Starts building a database asset by asset
    pub fn builder() -> PolicyDatabaseBuilder {
        PolicyDatabaseBuilder::default()
    }

    /// Loads a database from its JSON description
    ///
    /// ```json
    /// { "assets": [ { "uuid": 170, "asset_type": 1, "max_size": 32,
    ///                 "grants": [ { "client_id": 5, "access": ["Read", "Write"] } ] } ] }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let document: PolicyDocument = serde_json::from_str(json)
            .map_err(|err| PolicyError::InvalidDocument(err.to_string()))?;

        let mut builder = Self::builder();
        for asset in document.assets {
            builder = builder.asset(
                AssetUuid::new(asset.uuid),
                AssetType::new(asset.asset_type),
                asset.max_size,
            );
            for grant in asset.grants {
                builder = builder.grant(
                    ClientId::new(grant.client_id),
                    grant.access.into_iter().collect(),
                );
            }
        }
        builder.build()
    }

    /// Checks the integrity of the tables
    ///
    /// Asset uuids must be unique and every asset's permission slice must lie
    /// within the permission table.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let mut seen = BTreeSet::new();
        for entry in &self.assets {
            if !seen.insert(entry.uuid) {
                return Err(PolicyError::DuplicateUuid(entry.uuid));
            }
            let end = entry.perms_start_index as u64 + entry.perms_count as u64;
            if end > self.permissions.len() as u64 {
                return Err(PolicyError::PermissionSliceOutOfRange {
                    uuid: entry.uuid,
                    start: entry.perms_start_index,
                    count: entry.perms_count,
                    len: self.permissions.len(),
                });
            }
        }
        Ok(())
    }

    /// Finds the policy entry for `uuid`
    pub fn lookup_policy(&self, uuid: AssetUuid) -> Option<&AssetPolicyEntry> {
        self.assets.iter().find(|entry| entry.uuid == uuid)
    }

    /// Finds `client_id`'s grant within `entry`'s permission slice
    pub fn lookup_client_permission(
        &self,
        entry: &AssetPolicyEntry,
        client_id: ClientId,
    ) -> Option<&PermissionEntry> {
        let start = entry.perms_start_index as usize;
        let end = start.checked_add(entry.perms_count as usize)?;
        self.permissions
            .get(start..end)?
            .iter()
            .find(|perm| perm.client_id == client_id)
    }

    /// All asset entries, in table order
    pub fn assets(&self) -> &[AssetPolicyEntry] {
        &self.assets
    }

    /// The flat permission table
    pub fn permissions(&self) -> &[PermissionEntry] {
        &self.permissions
    }
}

/// Incremental construction of a [`PolicyDatabase`]
///
/// Each `grant` applies to the most recently added asset.
#[derive(Debug, Default)]
pub struct PolicyDatabaseBuilder {
    assets: Vec<AssetPolicyEntry>,
    permissions: Vec<PermissionEntry>,
    error: Option<PolicyError>,
}

impl PolicyDatabaseBuilder {
    /// Adds an asset with no grants
    pub fn asset(mut self, uuid: AssetUuid, asset_type: AssetType, max_size: u32) -> Self {
        self.assets.push(AssetPolicyEntry {
            uuid,
            asset_type,
            max_size,
            perms_start_index: self.permissions.len() as u32,
            perms_count: 0,
        });
        self
    }

    /// Grants `perm_bits` on the last added asset to `client_id`
    pub fn grant(mut self, client_id: ClientId, perm_bits: PermissionSet) -> Self {
        match self.assets.last_mut() {
            Some(entry) => {
                entry.perms_count += 1;
                self.permissions.push(PermissionEntry {
                    client_id,
                    perm_bits,
                });
            }
            None => {
                self.error.get_or_insert(PolicyError::GrantWithoutAsset(client_id));
            }
        }
        self
    }

    /// Finishes the database and checks its integrity
    pub fn build(self) -> Result<PolicyDatabase, PolicyError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let db = PolicyDatabase::from_tables(self.assets, self.permissions);
        db.validate()?;
        Ok(db)
    }
}

#[derive(Deserialize)]
struct PolicyDocument {
    #[serde(default)]
    assets: Vec<AssetDocument>,
}

#[derive(Deserialize)]
struct AssetDocument {
    uuid: u32,
    asset_type: u32,
    max_size: u32,
    #[serde(default)]
    grants: Vec<GrantDocument>,
}

#[derive(Deserialize)]
struct GrantDocument {
    client_id: i32,
    access: Vec<Permission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_assets() -> PolicyDatabase {
        PolicyDatabase::builder()
            .asset(AssetUuid::new(1), AssetType::RAW, 16)
            .grant(ClientId::new(-1), PermissionSet::READ)
            .asset(AssetUuid::new(2), AssetType::KEY_SYMMETRIC, 32)
            .grant(ClientId::new(-1), PermissionSet::WRITE)
            .grant(ClientId::new(-2), PermissionSet::REFERENCE)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_lays_out_contiguous_slices() {
        let db = two_assets();
        assert_eq!(db.assets()[0].perms_start_index, 0);
        assert_eq!(db.assets()[0].perms_count, 1);
        assert_eq!(db.assets()[1].perms_start_index, 1);
        assert_eq!(db.assets()[1].perms_count, 2);
        assert_eq!(db.permissions().len(), 3);
    }

    #[test]
    fn test_lookup_client_permission_stays_in_slice() {
        let db = two_assets();
        let first = db.lookup_policy(AssetUuid::new(1)).unwrap();
        assert!(db.lookup_client_permission(first, ClientId::new(-2)).is_none());

        let second = db.lookup_policy(AssetUuid::new(2)).unwrap();
        let grant = db.lookup_client_permission(second, ClientId::new(-1)).unwrap();
        assert_eq!(grant.perm_bits, PermissionSet::WRITE);
    }

    #[test]
    fn test_lookup_unknown_uuid() {
        assert!(two_assets().lookup_policy(AssetUuid::new(99)).is_none());
    }

    #[test]
    fn test_duplicate_uuid_rejected() {
        let result = PolicyDatabase::builder()
            .asset(AssetUuid::new(7), AssetType::RAW, 16)
            .asset(AssetUuid::new(7), AssetType::RAW, 16)
            .build();
        assert_eq!(result, Err(PolicyError::DuplicateUuid(AssetUuid::new(7))));
    }

    #[test]
    fn test_out_of_range_slice_rejected() {
        let db = PolicyDatabase::from_tables(
            vec![AssetPolicyEntry {
                uuid: AssetUuid::new(3),
                asset_type: AssetType::RAW,
                max_size: 8,
                perms_start_index: 1,
                perms_count: 1,
            }],
            vec![PermissionEntry {
                client_id: ClientId::new(-1),
                perm_bits: PermissionSet::READ,
            }],
        );
        assert!(matches!(
            db.validate(),
            Err(PolicyError::PermissionSliceOutOfRange { len: 1, .. })
        ));
    }

    #[test]
    fn test_grant_without_asset() {
        let result = PolicyDatabase::builder()
            .grant(ClientId::new(-1), PermissionSet::READ)
            .build();
        assert_eq!(result, Err(PolicyError::GrantWithoutAsset(ClientId::new(-1))));
    }

    #[test]
    fn test_from_json() {
        let db = PolicyDatabase::from_json(
            r#"{ "assets": [ { "uuid": 170, "asset_type": 1, "max_size": 32,
                 "grants": [ { "client_id": 5, "access": ["Read", "Write"] } ] } ] }"#,
        )
        .unwrap();
        let entry = db.lookup_policy(AssetUuid::new(0xAA)).unwrap();
        assert_eq!(entry.max_size, 32);
        let grant = db.lookup_client_permission(entry, ClientId::new(5)).unwrap();
        assert_eq!(grant.perm_bits, PermissionSet::READ | PermissionSet::WRITE);
    }

    #[test]
    fn test_from_json_rejects_unknown_permission() {
        let result = PolicyDatabase::from_json(
            r#"{ "assets": [ { "uuid": 1, "asset_type": 1, "max_size": 4,
                 "grants": [ { "client_id": -1, "access": ["Execute"] } ] } ] }"#,
        );
        assert!(matches!(result, Err(PolicyError::InvalidDocument(_))));
    }
}
