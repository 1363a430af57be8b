//! Stable service identifiers for the secure storage service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Service identifier a client connects to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sid(u32);

impl Sid {
    /// Creates a service identifier from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sid:{:#06x}", self.0)
    }
}

/// Minor version of a service interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorVersion(pub u32);

impl fmt::Display for MinorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

pub const SST_CREATE_SID: Sid = Sid::new(0x2000);
pub const SST_GET_INFO_SID: Sid = Sid::new(0x2001);
pub const SST_GET_ATTRIBUTES_SID: Sid = Sid::new(0x2002);
pub const SST_SET_ATTRIBUTES_SID: Sid = Sid::new(0x2003);
pub const SST_READ_SID: Sid = Sid::new(0x2004);
pub const SST_WRITE_SID: Sid = Sid::new(0x2005);
pub const SST_DELETE_SID: Sid = Sid::new(0x2006);

/// Minor version every storage operation is published with.
pub const SST_MINOR_VERSION: MinorVersion = MinorVersion(1);

/// All storage service identifiers in dispatch priority order.
pub const SST_SIDS: [Sid; 7] = [
    SST_CREATE_SID,
    SST_GET_INFO_SID,
    SST_GET_ATTRIBUTES_SID,
    SST_SET_ATTRIBUTES_SID,
    SST_READ_SID,
    SST_WRITE_SID,
    SST_DELETE_SID,
];
