//! # Asset Records
//!
//! Fixed-size records exchanged with callers of the storage service, and the
//! little-endian encoding used when they cross the partition boundary.
//!
//! Every record has a `WIRE_SIZE` and decodes only from a slice of exactly
//! that length. Callers are expected to have checked vector sizes already;
//! the length check here is the last line, not the first.

use crate::ids::AssetUuid;
use crate::memory::CallerAddr;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors decoding a wire record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("{record} record must be {expected} bytes, got {actual}")]
    WrongLength {
        record: &'static str,
        expected: usize,
        actual: usize,
    },
}

fn exact<const N: usize>(record: &'static str, bytes: &[u8]) -> Result<[u8; N], WireError> {
    bytes.try_into().map_err(|_| WireError::WrongLength {
        record,
        expected: N,
        actual: bytes.len(),
    })
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(word)
}

fn u64_at(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

/// Decodes an asset uuid record
pub fn decode_uuid(bytes: &[u8]) -> Result<AssetUuid, WireError> {
    exact::<{ AssetUuid::WIRE_SIZE }>("uuid", bytes).map(AssetUuid::from_le_bytes)
}

/// Decodes a 4-byte offset record
pub fn decode_offset(bytes: &[u8]) -> Result<u32, WireError> {
    exact::<4>("offset", bytes).map(u32::from_le_bytes)
}

/// Metadata describing a stored asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Bytes currently held by the asset
    pub current_size: u32,
    /// Largest size the asset may grow to
    pub max_size: u32,
    /// Declared asset type
    pub asset_type: u32,
}

impl AssetInfo {
    pub const WIRE_SIZE: usize = 12;

    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..4].copy_from_slice(&self.current_size.to_le_bytes());
        out[4..8].copy_from_slice(&self.max_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.asset_type.to_le_bytes());
        out
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        let raw = exact::<{ Self::WIRE_SIZE }>("asset info", bytes)?;
        Ok(Self {
            current_size: u32_at(&raw, 0),
            max_size: u32_at(&raw, 4),
            asset_type: u32_at(&raw, 8),
        })
    }
}

/// Time window during which an asset may be used
///
/// Reserved. Both bounds must currently be zero when attributes are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub start: u64,
    pub end: u64,
}

impl ValidityWindow {
    /// Returns true when neither bound is set
    pub fn is_unset(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

/// Mutable attributes of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetAttributes {
    pub validity: ValidityWindow,
    /// Lock and usage bits, opaque to the storage core
    pub flags: u32,
}

impl AssetAttributes {
    pub const WIRE_SIZE: usize = 20;

    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..8].copy_from_slice(&self.validity.start.to_le_bytes());
        out[8..16].copy_from_slice(&self.validity.end.to_le_bytes());
        out[16..20].copy_from_slice(&self.flags.to_le_bytes());
        out
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        let raw = exact::<{ Self::WIRE_SIZE }>("asset attributes", bytes)?;
        Ok(Self {
            validity: ValidityWindow {
                start: u64_at(&raw, 0),
                end: u64_at(&raw, 8),
            },
            flags: u32_at(&raw, 16),
        })
    }
}

/// Opaque credential forwarded to the object store
///
/// The storage core never looks inside a token; it only copies it out of
/// caller memory and hands it on unchanged.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessToken(Vec<u8>);

impl AccessToken {
    /// A token with no bytes
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for AccessToken {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for AccessToken {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// Token bytes are credentials; keep them out of logs.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({} bytes)", self.0.len())
    }
}

/// Location of token bytes in caller memory, as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub addr: CallerAddr,
    pub len: u32,
}

impl TokenRef {
    pub const WIRE_SIZE: usize = 8;

    /// A reference to an empty token
    pub fn empty() -> Self {
        Self {
            addr: CallerAddr::NULL,
            len: 0,
        }
    }

    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..4].copy_from_slice(&self.addr.as_u32().to_le_bytes());
        out[4..8].copy_from_slice(&self.len.to_le_bytes());
        out
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        let raw = exact::<{ Self::WIRE_SIZE }>("token", bytes)?;
        Ok(Self {
            addr: CallerAddr::new(u32_at(&raw, 0)),
            len: u32_at(&raw, 4),
        })
    }
}

/// Target of a read request: the client to read as, and the asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadTarget {
    pub client_id: i32,
    pub uuid: AssetUuid,
}

impl ReadTarget {
    pub const WIRE_SIZE: usize = 8;

    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..4].copy_from_slice(&self.client_id.to_le_bytes());
        out[4..8].copy_from_slice(&self.uuid.to_le_bytes());
        out
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        let raw = exact::<{ Self::WIRE_SIZE }>("read target", bytes)?;
        Ok(Self {
            client_id: u32_at(&raw, 0) as i32,
            uuid: AssetUuid::new(u32_at(&raw, 4)),
        })
    }
}

/// Caller-supplied description of a buffer in its own address space
///
/// Never trusted until the boundary validator has copied and checked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferDescriptor {
    /// Start of the payload in caller memory
    pub data: CallerAddr,
    /// Offset into the asset
    pub offset: u32,
    /// Payload length in bytes
    pub size: u32,
}

impl BufferDescriptor {
    pub const WIRE_SIZE: usize = 12;

    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..4].copy_from_slice(&self.data.as_u32().to_le_bytes());
        out[4..8].copy_from_slice(&self.offset.to_le_bytes());
        out[8..12].copy_from_slice(&self.size.to_le_bytes());
        out
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        let raw = exact::<{ Self::WIRE_SIZE }>("buffer descriptor", bytes)?;
        Ok(Self {
            data: CallerAddr::new(u32_at(&raw, 0)),
            offset: u32_at(&raw, 4),
            size: u32_at(&raw, 8),
        })
    }
}
