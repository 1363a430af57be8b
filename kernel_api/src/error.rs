//! Partition runtime error types

use core_types::{CallerAddr, MemoryError, Sid};
use identity::IdentityError;
use ipc::MessageHandle;
use thiserror::Error;

/// Errors that can occur when interacting with the partition manager
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KernelError {
    /// No signal is pending and none can arrive
    #[error("No pending signals")]
    Idle,

    /// No message is queued for the requested signal
    #[error("No message pending for signal {0:#x}")]
    NoMessage(u32),

    /// Too many messages are queued for a signal
    #[error("Message queue full for signal {0:#x}")]
    QueueFull(u32),

    /// Handle does not name an in-flight message
    #[error("Invalid message handle: {0}")]
    InvalidHandle(MessageHandle),

    /// Vector index is outside the message's vectors
    #[error("Invalid vector index {index} for {handle}")]
    InvalidVector { handle: MessageHandle, index: usize },

    /// Output would exceed the caller's output vector
    #[error("Output vector {index} overflow: capacity {capacity}, attempted {attempted}")]
    OutputOverflow {
        index: usize,
        capacity: usize,
        attempted: usize,
    },

    /// Caller identity is the reserved invalid id
    #[error("Invalid caller: {0}")]
    InvalidCaller(#[from] IdentityError),

    /// Service identifier is not registered
    #[error("Service not found: {0}")]
    ServiceNotFound(Sid),

    /// Service refused the connection
    #[error("Connection refused by {0}")]
    ConnectionRefused(Sid),

    /// Connection handle is not open
    #[error("Invalid connection handle: {0}")]
    InvalidConnection(u32),

    /// Caller memory access failed
    #[error("Memory fault at {addr}: {source}")]
    MemoryFault {
        addr: CallerAddr,
        source: MemoryError,
    },

    /// Message was dropped in transit
    #[error("Message dropped: {0}")]
    Dropped(MessageHandle),
}
