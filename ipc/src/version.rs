//! Minor-version gating for service connections

use core_types::MinorVersion;
use std::fmt;

/// Compatibility result for version checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// Versions are compatible
    Compatible,
    /// Client version is older than the service still supports
    UpgradeRequired,
    /// Client asks for a version newer than the service implements
    Unsupported,
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compatibility::Compatible => write!(f, "compatible"),
            Compatibility::UpgradeRequired => write!(f, "upgrade required"),
            Compatibility::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Version policy for a service
///
/// Defines which minor versions a service accepts at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPolicy {
    /// Current version the service implements
    current: MinorVersion,
    /// Oldest version still accepted
    min: MinorVersion,
}

impl VersionPolicy {
    /// Creates a policy accepting exactly `current`
    pub const fn current(current: MinorVersion) -> Self {
        Self {
            current,
            min: current,
        }
    }

    /// Sets the oldest supported minor version
    ///
    /// Example: if current is v3 and min is v2, the policy accepts v2 and
    /// v3, and rejects v1 and v4.
    pub const fn with_min(mut self, min: MinorVersion) -> Self {
        self.min = min;
        self
    }

    /// Checks if a requested minor version is compatible
    pub fn check_compatibility(&self, requested: MinorVersion) -> Compatibility {
        if requested > self.current {
            return Compatibility::Unsupported;
        }
        if requested < self.min {
            return Compatibility::UpgradeRequired;
        }
        Compatibility::Compatible
    }

    /// Returns the current version
    pub fn current_version(&self) -> MinorVersion {
        self.current
    }

    /// Returns the minimum supported version
    pub fn min_version(&self) -> MinorVersion {
        self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_policy_window() {
        let policy = VersionPolicy::current(MinorVersion(3)).with_min(MinorVersion(2));
        assert_eq!(policy.check_compatibility(MinorVersion(1)), Compatibility::UpgradeRequired);
        assert_eq!(policy.check_compatibility(MinorVersion(2)), Compatibility::Compatible);
        assert_eq!(policy.check_compatibility(MinorVersion(3)), Compatibility::Compatible);
        assert_eq!(policy.check_compatibility(MinorVersion(4)), Compatibility::Unsupported);
    }

    #[test]
    fn test_exact_policy() {
        let policy = VersionPolicy::current(MinorVersion(1));
        assert_eq!(policy.min_version(), MinorVersion(1));
        assert_eq!(policy.check_compatibility(MinorVersion(0)), Compatibility::UpgradeRequired);
    }
}
