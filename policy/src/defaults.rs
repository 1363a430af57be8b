//! The built-in asset table

use crate::database::{AssetPolicyEntry, PermissionEntry, PolicyDatabase};
use crate::permission::PermissionSet;
use core_types::{AssetType, AssetUuid};
use identity::ClientId;

/// Non-secure application that owns the demo assets
pub const NS_APP_CLIENT: ClientId = ClientId::new(-1);
/// Non-secure application allowed reference reads only
pub const NS_PEER_CLIENT: ClientId = ClientId::new(-2);

/// Returns the table the service uses when none is configured
///
/// Secure partitions reach every asset through the bypass path and need no
/// rows here.
pub fn default_policy() -> PolicyDatabase {
    let rw = PermissionSet::READ | PermissionSet::WRITE;
    PolicyDatabase::from_tables(
        vec![
            AssetPolicyEntry {
                uuid: AssetUuid::new(0x0001),
                asset_type: AssetType::KEY_SYMMETRIC,
                max_size: 16,
                perms_start_index: 0,
                perms_count: 2,
            },
            AssetPolicyEntry {
                uuid: AssetUuid::new(0x0002),
                asset_type: AssetType::KEY_PAIR,
                max_size: 64,
                perms_start_index: 2,
                perms_count: 1,
            },
            AssetPolicyEntry {
                uuid: AssetUuid::new(0x0003),
                asset_type: AssetType::CERTIFICATE,
                max_size: 512,
                perms_start_index: 3,
                perms_count: 2,
            },
            AssetPolicyEntry {
                uuid: AssetUuid::new(0x0004),
                asset_type: AssetType::RAW,
                max_size: 1024,
                perms_start_index: 5,
                perms_count: 1,
            },
        ],
        vec![
            PermissionEntry {
                client_id: NS_APP_CLIENT,
                perm_bits: rw,
            },
            PermissionEntry {
                client_id: NS_PEER_CLIENT,
                perm_bits: PermissionSet::REFERENCE,
            },
            PermissionEntry {
                client_id: NS_APP_CLIENT,
                perm_bits: rw | PermissionSet::REFERENCE,
            },
            PermissionEntry {
                client_id: NS_APP_CLIENT,
                perm_bits: rw,
            },
            PermissionEntry {
                client_id: NS_PEER_CLIENT,
                perm_bits: PermissionSet::READ,
            },
            PermissionEntry {
                client_id: NS_APP_CLIENT,
                perm_bits: rw,
            },
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_consistent() {
        assert_eq!(default_policy().validate(), Ok(()));
    }

    #[test]
    fn test_default_peer_can_only_reference_key() {
        let db = default_policy();
        let key = db.lookup_policy(AssetUuid::new(0x0001)).unwrap();
        let grant = db.lookup_client_permission(key, NS_PEER_CLIENT).unwrap();
        assert_eq!(grant.perm_bits, PermissionSet::REFERENCE);
    }
}
