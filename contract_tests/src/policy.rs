//! Policy contract tests
//!
//! The built-in asset table and the JSON policy document format are part
//! of the build interface: integrators ship documents against them.

#[allow(dead_code)]
const POLICY_DOCUMENT: &str = r#"{
    "assets": [
        {
            "uuid": 170,
            "asset_type": 1,
            "max_size": 32,
            "grants": [
                { "client_id": 5, "access": ["Read", "Write"] },
                { "client_id": -3, "access": ["Reference"] }
            ]
        }
    ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{AssetType, AssetUuid};
    use identity::ClientId;
    use policy::{default_policy, PermissionSet, PolicyDatabase, NS_APP_CLIENT, NS_PEER_CLIENT};

    #[test]
    fn test_default_table() {
        let db = default_policy();
        assert!(db.validate().is_ok());

        let expected = [
            (0x1, AssetType::KEY_SYMMETRIC, 16),
            (0x2, AssetType::KEY_PAIR, 64),
            (0x3, AssetType::CERTIFICATE, 512),
            (0x4, AssetType::RAW, 1024),
        ];
        assert_eq!(db.assets().len(), expected.len());
        for (entry, (uuid, asset_type, max_size)) in db.assets().iter().zip(expected) {
            assert_eq!(entry.uuid, AssetUuid::new(uuid));
            assert_eq!(entry.asset_type, asset_type);
            assert_eq!(entry.max_size, max_size);
        }
    }

    #[test]
    fn test_default_client_ids() {
        assert_eq!(NS_APP_CLIENT, ClientId::new(-1));
        assert_eq!(NS_PEER_CLIENT, ClientId::new(-2));
    }

    #[test]
    fn test_asset_type_values() {
        assert_eq!(AssetType::RAW.as_u32(), 0x0000_0001);
        assert_eq!(AssetType::KEY_SYMMETRIC.as_u32(), 0x0400_0000);
        assert_eq!(AssetType::KEY_PAIR.as_u32(), 0x0700_0000);
        assert_eq!(AssetType::CERTIFICATE.as_u32(), 0x0800_0000);
    }

    #[test]
    fn test_policy_document_format() {
        let db = PolicyDatabase::from_json(POLICY_DOCUMENT).unwrap();
        let entry = db.lookup_policy(AssetUuid::new(0xAA)).unwrap();
        assert_eq!(entry.max_size, 32);
        assert_eq!(entry.asset_type, AssetType::RAW);

        let owner = db.lookup_client_permission(entry, ClientId::new(5)).unwrap();
        assert_eq!(owner.perm_bits, PermissionSet::READ | PermissionSet::WRITE);
        let peer = db.lookup_client_permission(entry, ClientId::new(-3)).unwrap();
        assert_eq!(peer.perm_bits, PermissionSet::REFERENCE);
    }
}
