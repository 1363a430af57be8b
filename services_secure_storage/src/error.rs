//! Caller-visible status codes and internal error conversions

use crate::boundary::BoundaryError;
use crate::object_store::StoreError;
use core_types::WireError;
use kernel_api::KernelError;
use policy::AssetNotFound;
use thiserror::Error;

/// Status code of a successful request
pub const SST_SUCCESS: i32 = 0;
/// Status code for [`SstError::AssetNotFound`]
pub const SST_ERR_ASSET_NOT_FOUND: i32 = 2;
/// Status code for [`SstError::ParamError`]
pub const SST_ERR_PARAM_ERROR: i32 = 3;
/// Status code for [`SstError::SystemError`]
pub const SST_ERR_SYSTEM_ERROR: i32 = 6;

/// Every failure a caller of the storage service can observe
///
/// Nothing richer than this is ever returned across the boundary.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SstError {
    /// Malformed or disallowed request shape
    #[error("Invalid parameter")]
    ParamError,

    /// Unknown asset, denied access, or caller buffer failed validation
    #[error("Asset not found")]
    AssetNotFound,

    /// Storage failure or transport protocol violation
    #[error("System error")]
    SystemError,
}

impl SstError {
    /// The signed status sent in a reply
    pub fn status(&self) -> i32 {
        match self {
            SstError::ParamError => SST_ERR_PARAM_ERROR,
            SstError::AssetNotFound => SST_ERR_ASSET_NOT_FOUND,
            SstError::SystemError => SST_ERR_SYSTEM_ERROR,
        }
    }

    /// Interprets a reply status, with `Ok` for success
    ///
    /// Unknown non-zero values are reported as `SystemError`.
    pub fn from_status(status: i32) -> Result<(), SstError> {
        match status {
            SST_SUCCESS => Ok(()),
            SST_ERR_ASSET_NOT_FOUND => Err(SstError::AssetNotFound),
            SST_ERR_PARAM_ERROR => Err(SstError::ParamError),
            _ => Err(SstError::SystemError),
        }
    }
}

/// Converts a request result into its reply status
pub fn status_of<T>(result: &Result<T, SstError>) -> i32 {
    match result {
        Ok(_) => SST_SUCCESS,
        Err(err) => err.status(),
    }
}

impl From<AssetNotFound> for SstError {
    fn from(_: AssetNotFound) -> Self {
        SstError::AssetNotFound
    }
}

impl From<BoundaryError> for SstError {
    fn from(_: BoundaryError) -> Self {
        SstError::AssetNotFound
    }
}

impl From<StoreError> for SstError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound | StoreError::AuthenticationFailed => SstError::AssetNotFound,
            StoreError::OutOfRange { .. } | StoreError::InvalidArgument(_) => SstError::ParamError,
            StoreError::NotPrepared | StoreError::StorageFull | StoreError::Io(_) => {
                SstError::SystemError
            }
        }
    }
}

impl From<KernelError> for SstError {
    fn from(_: KernelError) -> Self {
        SstError::SystemError
    }
}

impl From<WireError> for SstError {
    fn from(_: WireError) -> Self {
        SstError::ParamError
    }
}

/// Errors loading service configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration document: {0}")]
    InvalidDocument(String),

    #[error("Staging buffer size must be non-zero")]
    ZeroStagingBuffer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::CallerAddr;

    #[test]
    fn test_status_codes() {
        assert_eq!(SstError::AssetNotFound.status(), 2);
        assert_eq!(SstError::ParamError.status(), 3);
        assert_eq!(SstError::SystemError.status(), 6);
        assert_eq!(status_of::<()>(&Ok(())), 0);
    }

    #[test]
    fn test_from_status_round_trip() {
        for err in [SstError::ParamError, SstError::AssetNotFound, SstError::SystemError] {
            assert_eq!(SstError::from_status(err.status()), Err(err));
        }
        assert_eq!(SstError::from_status(0), Ok(()));
        assert_eq!(SstError::from_status(-1), Err(SstError::SystemError));
    }

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(SstError::from(StoreError::AuthenticationFailed), SstError::AssetNotFound);
        assert_eq!(
            SstError::from(StoreError::OutOfRange { offset: 4, size: 4, limit: 6 }),
            SstError::ParamError
        );
        assert_eq!(SstError::from(StoreError::NotPrepared), SstError::SystemError);
    }

    #[test]
    fn test_boundary_error_is_not_found() {
        let err = BoundaryError::NotOwned {
            addr: CallerAddr::new(0x10),
            len: 4,
        };
        assert_eq!(SstError::from(err), SstError::AssetNotFound);
    }
}
