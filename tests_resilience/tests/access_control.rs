//! Access Control Tests
//!
//! Validates authorization end to end: identities come from the partition
//! manager, non-secure callers cannot borrow secure identities, and a
//! denied request is indistinguishable from a request for an unknown asset.

use core_types::{AssetAttributes, AssetType, AssetUuid, CallerAddr, ValidityWindow};
use identity::ClientId;
use policy::{PermissionSet, PolicyDatabase};
use services_secure_storage::{SstError, StorageConfig};
use tests_resilience::storage_client;

const NS_APP: ClientId = ClientId::new(-1);
const NS_PEER: ClientId = ClientId::new(-2);
const NS_STRANGER: ClientId = ClientId::new(-3);
const PARTITION: ClientId = ClientId::new(9);
const ASSET: AssetUuid = AssetUuid::new(0xAA);
const UNKNOWN: AssetUuid = AssetUuid::new(0xBB);

const APP_TOKEN: CallerAddr = CallerAddr::new(0x3000_0000);
const PEER_TOKEN: CallerAddr = CallerAddr::new(0x3100_0000);
const STRANGER_TOKEN: CallerAddr = CallerAddr::new(0x3200_0000);
const PARTITION_TOKEN: CallerAddr = CallerAddr::new(0x1000_0000);

fn policy() -> PolicyDatabase {
    PolicyDatabase::builder()
        .asset(ASSET, AssetType::KEY_SYMMETRIC, 32)
        .grant(NS_APP, PermissionSet::READ | PermissionSet::WRITE)
        .grant(NS_PEER, PermissionSet::REFERENCE)
        .build()
        .unwrap()
}

/// Test: A non-secure caller cannot read as a secure client
#[test]
fn test_non_secure_cannot_spoof_secure_identity() {
    let _ = env_logger::builder().is_test(true).try_init();
    let policy = policy();
    let mut client = storage_client(&policy, StorageConfig::default(), NS_APP).unwrap();
    let token = client
        .transport_mut()
        .install_token(NS_APP, APP_TOKEN, b"app")
        .unwrap();
    client.create(ASSET, token).unwrap();
    client.write(ASSET, token, 0, b"secret").unwrap();

    let mut buf = [0u8; 6];
    assert_eq!(
        client.read_by_reference(PARTITION, ASSET, token, 0, &mut buf),
        Err(SstError::AssetNotFound)
    );
    // Only secure callers may read on someone else's behalf.
    assert_eq!(
        client.read_by_reference(NS_PEER, ASSET, token, 0, &mut buf),
        Err(SstError::AssetNotFound)
    );
    assert_eq!(buf, [0u8; 6]);
}

/// Test: A secure partition reads by reference for a client holding
/// Reference, and only for such a client
#[test]
fn test_secure_partition_reads_by_reference() {
    let policy = policy();
    let mut client = storage_client(&policy, StorageConfig::default(), NS_APP).unwrap();
    let app_token = client
        .transport_mut()
        .install_token(NS_APP, APP_TOKEN, b"shared")
        .unwrap();
    client.create(ASSET, app_token).unwrap();
    client.write(ASSET, app_token, 0, b"key material").unwrap();

    let partition_token = client
        .transport_mut()
        .install_token(PARTITION, PARTITION_TOKEN, b"shared")
        .unwrap();
    client.transport_mut().set_client(PARTITION);

    let mut buf = [0u8; 12];
    client
        .read_by_reference(NS_PEER, ASSET, partition_token, 0, &mut buf)
        .unwrap();
    assert_eq!(&buf, b"key material");

    let mut buf = [0u8; 12];
    assert_eq!(
        client.read_by_reference(NS_STRANGER, ASSET, partition_token, 0, &mut buf),
        Err(SstError::AssetNotFound)
    );
}

/// Test: Reference alone does not grant Read to the holder itself
#[test]
fn test_reference_holder_cannot_read_directly() {
    let policy = policy();
    let mut client = storage_client(&policy, StorageConfig::default(), NS_APP).unwrap();
    let app_token = client
        .transport_mut()
        .install_token(NS_APP, APP_TOKEN, b"shared")
        .unwrap();
    client.create(ASSET, app_token).unwrap();
    client.write(ASSET, app_token, 0, b"abcd").unwrap();

    let peer_token = client
        .transport_mut()
        .install_token(NS_PEER, PEER_TOKEN, b"shared")
        .unwrap();
    client.transport_mut().set_client(NS_PEER);

    let mut buf = [0u8; 4];
    assert_eq!(
        client.read(ASSET, peer_token, 0, &mut buf),
        Err(SstError::AssetNotFound)
    );
    assert_eq!(
        client.write(ASSET, peer_token, 0, b"zz"),
        Err(SstError::AssetNotFound)
    );
    // Any access at all is enough for metadata.
    assert_eq!(client.get_info(ASSET, peer_token).unwrap().current_size, 4);
}

/// Test: Denied and unknown return the same status
#[test]
fn test_denied_and_unknown_are_indistinguishable() {
    let policy = policy();
    let mut client = storage_client(&policy, StorageConfig::default(), NS_APP).unwrap();
    let app_token = client
        .transport_mut()
        .install_token(NS_APP, APP_TOKEN, b"app")
        .unwrap();
    client.create(ASSET, app_token).unwrap();

    let unknown = client.get_info(UNKNOWN, app_token).map(|_| ());
    let unknown_create = client.create(UNKNOWN, app_token);

    let stranger_token = client
        .transport_mut()
        .install_token(NS_STRANGER, STRANGER_TOKEN, b"app")
        .unwrap();
    client.transport_mut().set_client(NS_STRANGER);
    let denied = client.get_info(ASSET, stranger_token).map(|_| ());
    let denied_delete = client.delete(ASSET, stranger_token);

    assert_eq!(unknown, Err(SstError::AssetNotFound));
    assert_eq!(unknown, denied);
    assert_eq!(unknown_create, denied_delete);
}

/// Test: A secure partition acting as itself bypasses the table
#[test]
fn test_secure_partition_bypasses_table() {
    let policy = policy();
    let mut client = storage_client(&policy, StorageConfig::default(), PARTITION).unwrap();
    let token = client
        .transport_mut()
        .install_token(PARTITION, PARTITION_TOKEN, b"sp")
        .unwrap();

    client.create(ASSET, token).unwrap();
    client.write(ASSET, token, 0, b"xyz").unwrap();
    client.delete(ASSET, token).unwrap();
    assert_eq!(
        client.create(UNKNOWN, token),
        Err(SstError::AssetNotFound)
    );
}

/// Test: A wrong token is reported like a missing asset
#[test]
fn test_wrong_token_is_not_found() {
    let policy = policy();
    let mut client = storage_client(&policy, StorageConfig::default(), NS_APP).unwrap();
    let token = client
        .transport_mut()
        .install_token(NS_APP, APP_TOKEN, b"right")
        .unwrap();
    let wrong = client
        .transport_mut()
        .install_token(NS_APP, CallerAddr::new(0x3000_1000), b"wrong")
        .unwrap();
    client.create(ASSET, token).unwrap();

    assert_eq!(client.get_info(ASSET, wrong), Err(SstError::AssetNotFound));
    assert_eq!(client.delete(ASSET, wrong), Err(SstError::AssetNotFound));
    assert!(client.get_info(ASSET, token).is_ok());
}

/// Test: Validity windows are refused before storage is touched
#[test]
fn test_attribute_validity_guard() {
    let policy = policy();
    let mut client = storage_client(&policy, StorageConfig::default(), NS_APP).unwrap();
    let token = client
        .transport_mut()
        .install_token(NS_APP, APP_TOKEN, b"app")
        .unwrap();
    client.create(ASSET, token).unwrap();
    let calls = client.transport().store().call_count();

    for validity in [
        ValidityWindow { start: 1, end: 0 },
        ValidityWindow { start: 0, end: 1 },
        ValidityWindow {
            start: u64::MAX,
            end: u64::MAX,
        },
    ] {
        let attrs = AssetAttributes { validity, flags: 0 };
        assert_eq!(
            client.set_attributes(ASSET, token, &attrs),
            Err(SstError::ParamError)
        );
    }
    assert_eq!(client.transport().store().call_count(), calls);

    let attrs = AssetAttributes {
        validity: ValidityWindow::default(),
        flags: 0x11,
    };
    client.set_attributes(ASSET, token, &attrs).unwrap();
    assert_eq!(client.get_attributes(ASSET, token).unwrap(), attrs);
}
