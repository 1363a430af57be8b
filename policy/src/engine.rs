//! Access classification and authorization

use crate::database::{AssetPolicyEntry, PolicyDatabase};
use crate::permission::PermissionSet;
use core_types::AssetUuid;
use identity::ClientId;
use log::warn;
use std::fmt;
use thiserror::Error;

/// The only refusal the policy engine reports
///
/// Unknown assets and denied requests are deliberately indistinguishable.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Asset not found")]
pub struct AssetNotFound;

/// How a request must be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Secure caller acting for a secure identity: full access
    Bypass,
    /// Refused before any table lookup
    Forbidden,
    /// Check these rights against the client's grant
    Filtered(PermissionSet),
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessDecision::Bypass => write!(f, "Bypass"),
            AccessDecision::Forbidden => write!(f, "Forbidden"),
            AccessDecision::Filtered(set) => write!(f, "Filtered({})", set),
        }
    }
}

/// Classifies a request by the trust domains of caller and claimed client
///
/// - secure caller, secure client: `Bypass`
/// - secure caller, non-secure client: only Reference can be delegated
/// - non-secure caller claiming a secure client: `Forbidden`
/// - non-secure caller, non-secure client: `Filtered(requested)`
pub fn classify_access(
    caller: ClientId,
    client: ClientId,
    requested: PermissionSet,
) -> AccessDecision {
    match (caller.is_secure(), client.is_secure()) {
        (true, true) => AccessDecision::Bypass,
        (true, false) => {
            if requested.contains(PermissionSet::REFERENCE) {
                AccessDecision::Filtered(PermissionSet::REFERENCE)
            } else {
                AccessDecision::Forbidden
            }
        }
        (false, true) => AccessDecision::Forbidden,
        (false, false) => AccessDecision::Filtered(requested),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Denial {
    Forbidden,
    UnknownAsset,
    NoGrant,
    NoMatchingRight,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::Forbidden => write!(f, "forbidden by trust domain"),
            Denial::UnknownAsset => write!(f, "unknown asset"),
            Denial::NoGrant => write!(f, "no grant for client"),
            Denial::NoMatchingRight => write!(f, "grant does not cover request"),
        }
    }
}

impl PolicyDatabase {
    /// Authorizes `caller`, acting as `client`, for any of `requested` on `uuid`
    ///
    /// Succeeds with the asset's policy entry when the request is bypassed
    /// or the client's grant shares at least one right with the request.
    /// Every other outcome is [`AssetNotFound`].
    pub fn authorize(
        &self,
        caller: ClientId,
        client: ClientId,
        uuid: AssetUuid,
        requested: PermissionSet,
    ) -> Result<&AssetPolicyEntry, AssetNotFound> {
        self.evaluate(caller, client, uuid, requested).map_err(|denial| {
            warn!(
                "policy: {} as {} denied {} on {}: {}",
                caller, client, requested, uuid, denial
            );
            AssetNotFound
        })
    }

    fn evaluate(
        &self,
        caller: ClientId,
        client: ClientId,
        uuid: AssetUuid,
        requested: PermissionSet,
    ) -> Result<&AssetPolicyEntry, Denial> {
        let filter = match classify_access(caller, client, requested) {
            AccessDecision::Forbidden => return Err(Denial::Forbidden),
            AccessDecision::Bypass => None,
            AccessDecision::Filtered(filter) => Some(filter),
        };

        let entry = self.lookup_policy(uuid).ok_or(Denial::UnknownAsset)?;
        let Some(filter) = filter else {
            return Ok(entry);
        };

        let grant = self
            .lookup_client_permission(entry, client)
            .ok_or(Denial::NoGrant)?;
        if grant.perm_bits.intersects(filter) {
            Ok(entry)
        } else {
            Err(Denial::NoMatchingRight)
        }
    }
}
