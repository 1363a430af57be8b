//! Message types delivered to a service partition

use identity::ClientId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of input or output vectors per call
pub const MAX_IOVEC: usize = 4;

/// Handle naming one in-flight message
///
/// Handles are issued by the partition manager and are valid until the
/// message is replied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageHandle(u32);

impl MessageHandle {
    /// Creates a handle from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}

/// What a message asks the service to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// A client is opening a connection
    Connect,
    /// A client is issuing a request on an open connection
    Call,
    /// A client is closing its connection
    Disconnect,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Connect => write!(f, "Connect"),
            MessageKind::Call => write!(f, "Call"),
            MessageKind::Disconnect => write!(f, "Disconnect"),
        }
    }
}

/// Declared lengths of a message's vectors
///
/// Unused slots are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IoSizes(pub [usize; MAX_IOVEC]);

impl IoSizes {
    /// Builds a size table from a list of lengths
    ///
    /// Returns `None` if more than [`MAX_IOVEC`] lengths are given.
    pub fn from_lengths(lengths: &[usize]) -> Option<Self> {
        if lengths.len() > MAX_IOVEC {
            return None;
        }
        let mut sizes = [0usize; MAX_IOVEC];
        sizes[..lengths.len()].copy_from_slice(lengths);
        Some(Self(sizes))
    }

    /// Length of vector `index`, zero when out of range
    pub fn get(&self, index: usize) -> usize {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// Returns true if every vector has exactly the expected length
    ///
    /// Slots beyond `expected` must be empty.
    pub fn matches(&self, expected: &[usize]) -> bool {
        (0..MAX_IOVEC).all(|index| self.get(index) == expected.get(index).copied().unwrap_or(0))
    }
}

/// A message fetched for a pending signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub handle: MessageHandle,
    pub kind: MessageKind,
    /// Identity of the caller, as established by the partition manager
    pub client_id: ClientId,
    pub in_size: IoSizes,
    pub out_size: IoSizes,
}

impl Message {
    /// Creates a connect or disconnect message, which carries no vectors
    pub fn control(handle: MessageHandle, kind: MessageKind, client_id: ClientId) -> Self {
        Self {
            handle,
            kind,
            client_id,
            in_size: IoSizes::default(),
            out_size: IoSizes::default(),
        }
    }
}
