//! # Asset Policy Engine
//!
//! This crate decides whether a client may touch a stored asset.
//!
//! ## Philosophy
//!
//! - **Tables, not code**: who may do what is data in a [`PolicyDatabase`],
//!   built once and shared by reference for the life of the service
//! - **One answer for every refusal**: an unknown asset and a denied asset
//!   both yield [`AssetNotFound`]; a hostile caller learns nothing from the
//!   difference
//! - **Identity decides the path**: secure callers acting for themselves
//!   bypass the tables, non-secure callers are filtered through them, and
//!   spoofed identities are refused outright
//!
//! ## Core Concepts
//!
//! - `PermissionSet`: Bitset over Reference, Read and Write
//! - `AssetPolicyEntry` / `PermissionEntry`: One asset and its client grants
//! - `AccessDecision`: Bypass, Forbidden, or Filtered
//! - `PolicyDatabase::authorize`: The single entry point the asset manager uses
//!
//! ## Known Limitation
//!
//! Lookups are linear scans that stop early. The time taken differs between
//! allowed and denied requests, which is an open timing side channel.
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - Authentication (tokens are checked by the object store)
//! - A mutable ACL store (tables are fixed once built)

pub mod database;
pub mod defaults;
pub mod engine;
pub mod permission;

pub use database::{
    AssetPolicyEntry, PermissionEntry, PolicyDatabase, PolicyDatabaseBuilder, PolicyError,
};
pub use defaults::{default_policy, NS_APP_CLIENT, NS_PEER_CLIENT};
pub use engine::{classify_access, AccessDecision, AssetNotFound};
pub use permission::{Permission, PermissionSet};
