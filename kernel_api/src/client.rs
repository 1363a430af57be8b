//! The client side of the partition interface

use crate::KernelError;
use core_types::{MinorVersion, Sid};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to an open connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionHandle(u32);

impl ConnectionHandle {
    /// Creates a connection handle from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Operations a client uses to reach a service
pub trait ClientTransport {
    /// Opens a connection to `sid` at minor version `version`
    ///
    /// A version outside the service's policy is refused with
    /// [`KernelError::ConnectionRefused`].
    fn connect(&mut self, sid: Sid, version: MinorVersion)
        -> Result<ConnectionHandle, KernelError>;

    /// Issues one request and returns the service's signed status
    ///
    /// `outputs` are filled with whatever the service wrote, up to their
    /// lengths.
    fn call(
        &mut self,
        connection: ConnectionHandle,
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
    ) -> Result<i32, KernelError>;

    /// Closes a connection
    fn close(&mut self, connection: ConnectionHandle) -> Result<(), KernelError>;
}
