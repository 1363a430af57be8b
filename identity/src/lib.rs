//! # Identity
//!
//! This crate provides client identity primitives for the secure storage
//! service.
//!
//! ## Philosophy
//!
//! - **Identity is assigned by the partition manager, never by the caller**
//! - **The trust domain is a property of the id itself**
//! - **Identity does NOT grant authority by itself**: the policy table does
//!
//! ## Core Concepts
//!
//! - `ClientId`: Signed identity of a calling partition or application
//! - `TrustDomain`: Which side of the isolation boundary an id belongs to
//!
//! ## Convention
//!
//! Strictly positive ids are secure partitions, strictly negative ids are
//! non-secure clients. Zero is never a valid caller and doubles as
//! [`DIRECT_CLIENT_READ`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identity of a client of the storage service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(i32);

/// Read-request sentinel meaning "read as the caller itself".
///
/// Any other client id in a read request asks to read by reference on
/// behalf of that client.
pub const DIRECT_CLIENT_READ: ClientId = ClientId(0);

impl ClientId {
    /// Creates a client id from its raw value
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Creates a caller identity, rejecting the reserved zero value
    ///
    /// The partition manager admits requests only from ids built this way.
    pub fn caller(raw: i32) -> Result<Self, IdentityError> {
        if raw == 0 {
            return Err(IdentityError::InvalidClientId(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the raw value
    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// Returns the trust domain this id belongs to
    pub fn trust_domain(&self) -> TrustDomain {
        match self.0 {
            id if id > 0 => TrustDomain::Secure,
            id if id < 0 => TrustDomain::NonSecure,
            _ => TrustDomain::Invalid,
        }
    }

    /// Returns true for secure-world identities
    pub fn is_secure(&self) -> bool {
        self.trust_domain() == TrustDomain::Secure
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client:{}", self.0)
    }
}

/// Returns true if `id` is a secure-world identity
pub fn is_secure(id: ClientId) -> bool {
    id.is_secure()
}

/// Trust domain of a client identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustDomain {
    /// Isolated secure partition
    Secure,
    /// Untrusted non-secure world
    NonSecure,
    /// Reserved id that no caller may hold
    Invalid,
}

impl fmt::Display for TrustDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustDomain::Secure => write!(f, "secure"),
            TrustDomain::NonSecure => write!(f, "non-secure"),
            TrustDomain::Invalid => write!(f, "invalid"),
        }
    }
}

/// Identity-related errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid client id: {0}")]
    InvalidClientId(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_domain_from_sign() {
        assert_eq!(ClientId::new(5).trust_domain(), TrustDomain::Secure);
        assert_eq!(ClientId::new(-1).trust_domain(), TrustDomain::NonSecure);
        assert_eq!(ClientId::new(0).trust_domain(), TrustDomain::Invalid);
    }

    #[test]
    fn test_is_secure() {
        assert!(is_secure(ClientId::new(i32::MAX)));
        assert!(!is_secure(ClientId::new(i32::MIN)));
        assert!(!is_secure(DIRECT_CLIENT_READ));
    }

    #[test]
    fn test_caller_rejects_zero() {
        assert_eq!(ClientId::caller(0), Err(IdentityError::InvalidClientId(0)));
        assert_eq!(ClientId::caller(-7), Ok(ClientId::new(-7)));
    }
}
