//! # Secure Storage Service
//!
//! This crate is the secure storage partition: a policy-enforced asset
//! manager behind a message dispatcher.
//!
//! ## Philosophy
//!
//! **Nothing from the caller is trusted until it has been copied and
//! checked.**
//!
//! - Caller identity comes from the partition manager, never from the
//!   request
//! - Every caller address is validated against the caller's own memory
//!   before a byte moves
//! - "Unknown asset" and "access denied" look the same from outside
//!
//! ## Layers
//!
//! - [`boundary`]: ownership checks and copies across the isolation
//!   boundary
//! - [`manager`]: the seven operations, gated by the policy database
//! - [`object_store`]: the storage collaborator the manager drives
//! - [`dispatcher`]: the signal loop serving messages
//! - [`direct_call`]: the same operations as plain function calls
//! - [`client`]: the caller side of the message protocol

pub mod boundary;
pub mod client;
pub mod config;
pub mod direct_call;
pub mod dispatcher;
pub mod error;
pub mod failing_store;
pub mod manager;
pub mod object_store;

pub use boundary::{
    check_owned, copy_in, copy_out, copy_token, validate_and_copy_descriptor, BoundaryError,
};
pub use client::StorageClient;
pub use config::{StorageConfig, DEFAULT_STAGING_BUFFER_SIZE};
pub use direct_call::DirectCallPath;
pub use dispatcher::{DispatchState, Operation, StorageService};
pub use error::{
    status_of, ConfigError, SstError, SST_ERR_ASSET_NOT_FOUND, SST_ERR_PARAM_ERROR,
    SST_ERR_SYSTEM_ERROR, SST_SUCCESS,
};
pub use failing_store::{FailingObjectStore, FailurePolicy};
pub use manager::{check_contained_in, AssetManager, ReadGrant};
pub use object_store::{InMemoryObjectStore, ObjectStore, StoreError};
