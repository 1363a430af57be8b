//! Access permissions a client can hold on an asset

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Set of access rights
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PermissionSet: u8 {
        /// Lets a secure partition read on this client's behalf
        const REFERENCE = 1 << 0;
        const READ = 1 << 1;
        const WRITE = 1 << 2;
    }
}

impl PermissionSet {
    /// Any access at all, as required by the metadata operations
    pub fn any_access() -> Self {
        Self::all()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.contains(Self::REFERENCE) { "F" } else { "-" },
            if self.contains(Self::READ) { "R" } else { "-" },
            if self.contains(Self::WRITE) { "W" } else { "-" }
        )
    }
}

/// A single access right, as named in policy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    Reference,
    Read,
    Write,
}

impl From<Permission> for PermissionSet {
    fn from(permission: Permission) -> Self {
        match permission {
            Permission::Reference => PermissionSet::REFERENCE,
            Permission::Read => PermissionSet::READ,
            Permission::Write => PermissionSet::WRITE,
        }
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter()
            .fold(PermissionSet::empty(), |set, permission| set | permission.into())
    }
}
