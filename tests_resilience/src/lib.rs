//! Resilience Test Utilities
//!
//! This crate provides shared utilities for end-to-end tests of the secure
//! storage partition.
//!
//! ## Test Philosophy
//!
//! - **Real path**: requests travel client library → simulated partition
//!   manager → dispatcher → asset manager → object store and back
//! - **Deterministic failures**: all faults are reproducible via a
//!   `FaultPlan` or a `FailingObjectStore` policy
//! - **Nothing leaks**: a failed request leaves caller memory and storage
//!   exactly as the status says it does

use core_types::{CallerAddr, MemoryPerms, MinorVersion, Sid, TokenRef};
use identity::ClientId;
use ipc::{MessageHandle, PSA_SUCCESS};
use kernel_api::{ClientTransport, ConnectionHandle, KernelError};
use log::debug;
use policy::PolicyDatabase;
use services_secure_storage::{
    AssetManager, InMemoryObjectStore, ObjectStore, SstError, StorageClient, StorageConfig,
    StorageService,
};
use sim_kernel::{CallOutcome, SimulatedSpm};
use std::collections::HashMap;

/// A client and the storage partition joined by a [`SimulatedSpm`]
///
/// Every transport operation submits one message and runs the service
/// until that message has been answered.
pub struct LoopbackTransport<'p, S: ObjectStore> {
    spm: SimulatedSpm,
    service: StorageService<'p, S>,
    client: ClientId,
    connections: HashMap<ConnectionHandle, Sid>,
    next_connection: u32,
}

impl<'p, S: ObjectStore> LoopbackTransport<'p, S> {
    /// Registers the storage services and binds requests to `client`
    pub fn new(service: StorageService<'p, S>, client: ClientId) -> Self {
        let mut spm = SimulatedSpm::new();
        spm.register_storage_service();
        Self {
            spm,
            service,
            client,
            connections: HashMap::new(),
            next_connection: 1,
        }
    }

    /// Identity the partition manager attaches to later requests
    pub fn set_client(&mut self, client: ClientId) {
        self.client = client;
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn spm(&self) -> &SimulatedSpm {
        &self.spm
    }

    pub fn spm_mut(&mut self) -> &mut SimulatedSpm {
        &mut self.spm
    }

    pub fn service(&self) -> &StorageService<'p, S> {
        &self.service
    }

    pub fn store(&self) -> &S {
        self.service.manager().store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.service.manager_mut().store_mut()
    }

    /// Maps `bytes` read-only at `addr` for `owner` and returns a reference
    /// to them
    pub fn install_token(
        &mut self,
        owner: ClientId,
        addr: CallerAddr,
        bytes: &[u8],
    ) -> Result<TokenRef, KernelError> {
        let len = u32::try_from(bytes.len()).map_err(|_| KernelError::MemoryFault {
            addr,
            source: core_types::MemoryError::InvalidRegionSize(u32::MAX),
        })?;
        if len > 0 {
            self.spm
                .map_region(owner, addr, len, MemoryPerms::read_only())
                .map_err(|source| KernelError::MemoryFault { addr, source })?;
            self.spm.memory_mut().poke(owner, addr, bytes)?;
        }
        Ok(TokenRef { addr, len })
    }

    /// Runs the service until `handle` has an outcome
    fn complete(&mut self, handle: MessageHandle) -> Result<CallOutcome, KernelError> {
        loop {
            if let Some(outcome) = self.spm.take_reply(handle) {
                return Ok(outcome);
            }
            let op = self.service.step(&mut self.spm)?;
            debug!("loopback: service handled {}", op);
        }
    }

    fn route(&self, connection: ConnectionHandle) -> Result<Sid, KernelError> {
        self.connections
            .get(&connection)
            .copied()
            .ok_or(KernelError::InvalidConnection(connection.as_u32()))
    }
}

impl<'p, S: ObjectStore> ClientTransport for LoopbackTransport<'p, S> {
    fn connect(
        &mut self,
        sid: Sid,
        version: MinorVersion,
    ) -> Result<ConnectionHandle, KernelError> {
        let handle = self.spm.connect(self.client, sid, version)?;
        let outcome = self.complete(handle)?;
        if outcome.status != PSA_SUCCESS {
            return Err(KernelError::ConnectionRefused(sid));
        }
        let connection = ConnectionHandle::new(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(connection, sid);
        Ok(connection)
    }

    fn call(
        &mut self,
        connection: ConnectionHandle,
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
    ) -> Result<i32, KernelError> {
        let sid = self.route(connection)?;
        let inputs = inputs.iter().map(|input| input.to_vec()).collect();
        let caps = outputs.iter().map(|output| output.len()).collect();
        let handle = self.spm.call(self.client, sid, inputs, caps)?;

        let outcome = self.complete(handle)?;
        for (output, written) in outputs.iter_mut().zip(&outcome.outputs) {
            output[..written.len()].copy_from_slice(written);
        }
        Ok(outcome.status)
    }

    fn close(&mut self, connection: ConnectionHandle) -> Result<(), KernelError> {
        let sid = self.route(connection)?;
        self.connections.remove(&connection);
        let handle = self.spm.disconnect(self.client, sid)?;
        self.complete(handle)?;
        Ok(())
    }
}

/// Builds a prepared storage partition over `store` and a client bound to
/// `client`
pub fn storage_client_with_store<S: ObjectStore>(
    policy: &PolicyDatabase,
    store: S,
    config: StorageConfig,
    client: ClientId,
) -> Result<StorageClient<LoopbackTransport<'_, S>>, SstError> {
    let mut service = StorageService::new(AssetManager::new(policy, store, config));
    service.prepare()?;
    Ok(StorageClient::new(LoopbackTransport::new(service, client)))
}

/// Builds a prepared storage partition over a fresh in-memory store
pub fn storage_client(
    policy: &PolicyDatabase,
    config: StorageConfig,
    client: ClientId,
) -> Result<StorageClient<LoopbackTransport<'_, InMemoryObjectStore>>, SstError> {
    storage_client_with_store(policy, InMemoryObjectStore::new(), config, client)
}
