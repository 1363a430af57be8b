//! # Core Types
//!
//! This crate defines the fundamental types shared by the secure storage
//! service, its policy engine and the partition runtime it sits on.
//!
//! ## Philosophy
//!
//! Core types are designed with these principles:
//! - **Untrusted until validated**: anything naming caller memory is a plain
//!   value; nothing here dereferences it.
//! - **Fixed wire shapes**: every record that crosses the partition boundary
//!   has one exact encoded size.
//! - **Type safety first**: asset ids, asset types and caller addresses are
//!   distinct types and cannot be confused.
//!
//! ## Key Types
//!
//! - [`AssetUuid`]: Identifier of a secret object in the policy table
//! - [`AssetInfo`] / [`AssetAttributes`]: Fixed-size metadata records
//! - [`BufferDescriptor`]: Caller-supplied `{data, offset, size}` triple
//! - [`AccessToken`]: Opaque credential forwarded to the object store
//! - [`Sid`]: Service identifiers with minor-version gating

pub mod asset;
pub mod ids;
pub mod memory;
pub mod service_ids;

pub use asset::{
    decode_offset, decode_uuid, AccessToken, AssetAttributes, AssetInfo, BufferDescriptor,
    ReadTarget, TokenRef, ValidityWindow, WireError,
};
pub use ids::{AssetType, AssetUuid};
pub use memory::{CallerAddr, MemoryAccess, MemoryError, MemoryPerms, MemoryRegion};
pub use service_ids::{
    MinorVersion, Sid, SST_CREATE_SID, SST_DELETE_SID, SST_GET_ATTRIBUTES_SID, SST_GET_INFO_SID,
    SST_MINOR_VERSION, SST_READ_SID, SST_SET_ATTRIBUTES_SID, SST_SIDS, SST_WRITE_SID,
};
