//! Client library for the storage service
//!
//! Each call opens a connection to the operation's service identifier,
//! issues one request and closes the connection again.

use crate::dispatcher::Operation;
use crate::error::SstError;
use core_types::{
    AssetAttributes, AssetInfo, AssetUuid, MinorVersion, ReadTarget, TokenRef, SST_MINOR_VERSION,
};
use identity::{ClientId, DIRECT_CLIENT_READ};
use kernel_api::{ClientTransport, KernelError};
use log::warn;

/// Issues storage requests over a [`ClientTransport`]
pub struct StorageClient<T: ClientTransport> {
    transport: T,
    version: MinorVersion,
}

impl<T: ClientTransport> StorageClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            version: SST_MINOR_VERSION,
        }
    }

    /// Connects with `version` instead of the current minor version
    pub fn with_version(mut self, version: MinorVersion) -> Self {
        self.version = version;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn create(&mut self, uuid: AssetUuid, token: TokenRef) -> Result<(), SstError> {
        self.request(
            Operation::Create,
            &[&uuid.to_le_bytes(), &token.to_wire()],
            &mut [],
        )
    }

    pub fn get_info(&mut self, uuid: AssetUuid, token: TokenRef) -> Result<AssetInfo, SstError> {
        let mut raw = [0u8; AssetInfo::WIRE_SIZE];
        self.request(
            Operation::GetInfo,
            &[&uuid.to_le_bytes(), &token.to_wire()],
            &mut [&mut raw],
        )?;
        Ok(AssetInfo::from_wire(&raw)?)
    }

    pub fn get_attributes(
        &mut self,
        uuid: AssetUuid,
        token: TokenRef,
    ) -> Result<AssetAttributes, SstError> {
        let mut raw = [0u8; AssetAttributes::WIRE_SIZE];
        self.request(
            Operation::GetAttributes,
            &[&uuid.to_le_bytes(), &token.to_wire()],
            &mut [&mut raw],
        )?;
        Ok(AssetAttributes::from_wire(&raw)?)
    }

    pub fn set_attributes(
        &mut self,
        uuid: AssetUuid,
        token: TokenRef,
        attributes: &AssetAttributes,
    ) -> Result<(), SstError> {
        self.request(
            Operation::SetAttributes,
            &[&uuid.to_le_bytes(), &token.to_wire(), &attributes.to_wire()],
            &mut [],
        )
    }

    /// Reads `buf.len()` bytes at `offset` as the calling client
    pub fn read(
        &mut self,
        uuid: AssetUuid,
        token: TokenRef,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<(), SstError> {
        self.read_by_reference(DIRECT_CLIENT_READ, uuid, token, offset, buf)
    }

    /// Reads on behalf of `client`, which must hold Reference on the asset
    pub fn read_by_reference(
        &mut self,
        client: ClientId,
        uuid: AssetUuid,
        token: TokenRef,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<(), SstError> {
        let target = ReadTarget {
            client_id: client.as_i32(),
            uuid,
        };
        self.request(
            Operation::Read,
            &[&target.to_wire(), &token.to_wire(), &offset.to_le_bytes()],
            &mut [buf],
        )
    }

    pub fn write(
        &mut self,
        uuid: AssetUuid,
        token: TokenRef,
        offset: u32,
        data: &[u8],
    ) -> Result<(), SstError> {
        self.request(
            Operation::Write,
            &[&uuid.to_le_bytes(), &token.to_wire(), &offset.to_le_bytes(), data],
            &mut [],
        )
    }

    pub fn delete(&mut self, uuid: AssetUuid, token: TokenRef) -> Result<(), SstError> {
        self.request(
            Operation::Delete,
            &[&uuid.to_le_bytes(), &token.to_wire()],
            &mut [],
        )
    }

    fn request(
        &mut self,
        op: Operation,
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
    ) -> Result<(), SstError> {
        let connection = match self.transport.connect(op.sid(), self.version) {
            Ok(connection) => connection,
            Err(KernelError::ConnectionRefused(_)) => return Err(SstError::ParamError),
            Err(err) => {
                warn!("storage client: connect for {} failed: {}", op, err);
                return Err(SstError::SystemError);
            }
        };

        let status = self.transport.call(connection, inputs, outputs);
        if let Err(err) = self.transport.close(connection) {
            warn!("storage client: close of {} failed: {}", connection, err);
        }

        let status = status.map_err(|err| {
            warn!("storage client: {} call failed: {}", op, err);
            SstError::SystemError
        })?;
        if status < 0 {
            return Err(SstError::SystemError);
        }
        SstError::from_status(status)
    }
}
