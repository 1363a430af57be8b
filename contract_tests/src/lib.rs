//! # Service Contract Tests
//!
//! This crate provides "golden" tests for the secure storage contract to
//! ensure it doesn't drift accidentally over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: identifiers, bit layouts and byte layouts
//!   are written out as literals
//! - **Testability first**: contract tests fail when interfaces change
//! - **Mechanism not policy**: define what must be stable, not how to use it
//!
//! ## Structure
//!
//! - [`storage`]: service identifiers, signals, wire records, status codes
//!   and request shapes
//! - [`policy`]: the built-in asset table and the policy document format

pub mod policy;
pub mod storage;

/// Common test helpers for contract validation
pub mod test_helpers {
    /// Verifies an encoded record against its golden bytes
    pub fn verify_record_bytes(record: &str, actual: &[u8], expected: &[u8]) {
        assert_eq!(
            actual.len(),
            expected.len(),
            "{} record size changed: expected {}, got {}",
            record,
            expected.len(),
            actual.len()
        );
        assert_eq!(
            actual, expected,
            "{} record layout changed: expected {:02x?}, got {:02x?}",
            record, expected, actual
        );
    }

    /// Verifies a status code keeps its wire value
    pub fn verify_status(name: &str, actual: i32, expected: i32) {
        assert_eq!(
            actual, expected,
            "Status {} changed: expected {}, got {}",
            name, expected, actual
        );
    }
}
