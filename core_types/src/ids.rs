//! Identifiers for stored assets

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of an asset in the policy table
///
/// Asset uuids are small integers chosen at build time. They are not
/// random and carry no meaning beyond table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetUuid(u32);

impl AssetUuid {
    /// Encoded size on the wire
    pub const WIRE_SIZE: usize = 4;

    /// Creates an asset uuid from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Encodes the uuid as four little-endian bytes
    pub fn to_le_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        self.0.to_le_bytes()
    }

    /// Decodes a uuid from four little-endian bytes
    pub fn from_le_bytes(bytes: [u8; Self::WIRE_SIZE]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

impl fmt::Display for AssetUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Asset({:#x})", self.0)
    }
}

/// Kind of secret held by an asset
///
/// The type is declared in the policy table and reported back by
/// `get_info`. The storage core never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetType(u32);

impl AssetType {
    /// Raw bytes with no further structure
    pub const RAW: Self = Self(0x0000_0001);
    /// Symmetric key material
    pub const KEY_SYMMETRIC: Self = Self(0x0400_0000);
    /// Asymmetric key pair
    pub const KEY_PAIR: Self = Self(0x0700_0000);
    /// Certificate or other public credential
    pub const CERTIFICATE: Self = Self(0x0800_0000);

    /// Creates an asset type from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::RAW => write!(f, "raw"),
            Self::KEY_SYMMETRIC => write!(f, "key-symmetric"),
            Self::KEY_PAIR => write!(f, "key-pair"),
            Self::CERTIFICATE => write!(f, "certificate"),
            Self(other) => write!(f, "type:{:#x}", other),
        }
    }
}
