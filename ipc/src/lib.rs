//! # Partition Messaging
//!
//! This crate defines the message-passing primitives a secure partition
//! receives from the partition manager.
//!
//! ## Philosophy
//!
//! - **Signals wake, messages carry**: a signal bit says a service has work
//!   pending; the message fetched for that signal says what the work is
//! - **Sizes before bytes**: every message announces the length of each of
//!   its input and output vectors before any byte is transferred
//! - **Versionable**: each service is published with a minor version and
//!   connections are gated on it
//!
//! ## Architecture
//!
//! A client connects to a service identifier, issues calls carrying up to
//! [`MAX_IOVEC`] input vectors and [`MAX_IOVEC`] output vectors, then
//! disconnects. Each of those three steps reaches the service as one
//! [`Message`] of the matching [`MessageKind`], and is answered with exactly
//! one signed status.

pub mod message;
pub mod signal;
pub mod version;

pub use message::{IoSizes, Message, MessageHandle, MessageKind, MAX_IOVEC};
pub use signal::SignalSet;
pub use version::{Compatibility, VersionPolicy};

/// Framework status: the request completed
pub const PSA_SUCCESS: i32 = 0;
/// Framework status: the service refused the connection
pub const PSA_CONNECTION_REFUSED: i32 = -1;
/// Framework status: the connection was dropped by the partition manager
pub const PSA_DROP_CONNECTION: i32 = -2;
