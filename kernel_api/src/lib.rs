//! # Partition Runtime API
//!
//! This crate defines the interface between a secure service partition and
//! the partition manager it runs under.
//!
//! ## Philosophy
//!
//! The partition manager provides **mechanisms**, not policies:
//! - Signal delivery and message retrieval
//! - Vector transfer between caller and service
//! - Memory ownership checks on caller addresses
//!
//! What a request means, and whether it is allowed, is decided by the
//! service on top of these traits.
//!
//! ## Design Goals
//!
//! 1. **Testability**: every trait can be backed by a simulator
//! 2. **Explicitness**: caller identity always arrives with the message
//! 3. **Simplicity**: minimal surface area
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A scheduler (partitions are serialized outside this interface)
//! - A general RPC framework
//! - A specific transport (the traits can be implemented many ways)

pub mod client;
pub mod error;
pub mod memory;
pub mod partition;

pub use client::{ClientTransport, ConnectionHandle};
pub use error::KernelError;
pub use memory::CallerMemory;
pub use partition::PartitionApi;
