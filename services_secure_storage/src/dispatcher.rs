//! # Message Dispatcher
//!
//! The service side of the storage partition. One [`StorageService`] waits
//! on the seven storage signals, fetches the message behind the first
//! asserted signal in priority order, decodes its vectors into service
//! memory, runs the matching asset manager operation and replies with
//! exactly one status.
//!
//! Reads and writes move their payload through a small staging buffer,
//! one chunk at a time.

use crate::boundary::copy_token;
use crate::error::{status_of, SstError};
use crate::manager::AssetManager;
use crate::object_store::ObjectStore;
use core_types::{
    decode_offset, decode_uuid, AccessToken, AssetAttributes, AssetInfo, AssetUuid, ReadTarget,
    Sid, TokenRef, SST_CREATE_SID, SST_DELETE_SID, SST_GET_ATTRIBUTES_SID, SST_GET_INFO_SID,
    SST_READ_SID, SST_SET_ATTRIBUTES_SID, SST_WRITE_SID,
};
use identity::ClientId;
use ipc::{IoSizes, Message, MessageHandle, MessageKind, SignalSet, MAX_IOVEC, PSA_SUCCESS};
use kernel_api::{CallerMemory, KernelError, PartitionApi};
use log::{debug, error, info, warn};
use std::fmt;

const UUID_SIZE: usize = AssetUuid::WIRE_SIZE;
const TOKEN_SIZE: usize = TokenRef::WIRE_SIZE;
const OFFSET_SIZE: usize = 4;

/// The seven storage operations, in dispatch priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    GetInfo,
    GetAttributes,
    SetAttributes,
    Read,
    Write,
    Delete,
}

impl Operation {
    /// Every operation, highest priority first
    pub const ALL: [Operation; 7] = [
        Operation::Create,
        Operation::GetInfo,
        Operation::GetAttributes,
        Operation::SetAttributes,
        Operation::Read,
        Operation::Write,
        Operation::Delete,
    ];

    /// Position in priority order
    pub fn index(self) -> u32 {
        match self {
            Operation::Create => 0,
            Operation::GetInfo => 1,
            Operation::GetAttributes => 2,
            Operation::SetAttributes => 3,
            Operation::Read => 4,
            Operation::Write => 5,
            Operation::Delete => 6,
        }
    }

    pub fn signal(self) -> SignalSet {
        SignalSet::for_operation(self.index())
    }

    pub fn sid(self) -> Sid {
        match self {
            Operation::Create => SST_CREATE_SID,
            Operation::GetInfo => SST_GET_INFO_SID,
            Operation::GetAttributes => SST_GET_ATTRIBUTES_SID,
            Operation::SetAttributes => SST_SET_ATTRIBUTES_SID,
            Operation::Read => SST_READ_SID,
            Operation::Write => SST_WRITE_SID,
            Operation::Delete => SST_DELETE_SID,
        }
    }

    /// The highest-priority operation whose signal is asserted
    pub fn from_signals(asserted: SignalSet) -> Option<Operation> {
        Self::ALL
            .into_iter()
            .find(|op| asserted.contains(op.signal()))
    }

    pub fn from_sid(sid: Sid) -> Option<Operation> {
        Self::ALL.into_iter().find(|op| op.sid() == sid)
    }

    /// Checks declared vector sizes against the operation's wire shape
    ///
    /// Fixed-size records must match exactly. The read output and the
    /// write payload may have any length.
    pub fn accepts(self, in_size: &IoSizes, out_size: &IoSizes) -> bool {
        match self {
            Operation::Create | Operation::Delete => {
                in_size.matches(&[UUID_SIZE, TOKEN_SIZE]) && out_size.matches(&[])
            }
            Operation::GetInfo => {
                in_size.matches(&[UUID_SIZE, TOKEN_SIZE])
                    && out_size.matches(&[AssetInfo::WIRE_SIZE])
            }
            Operation::GetAttributes => {
                in_size.matches(&[UUID_SIZE, TOKEN_SIZE])
                    && out_size.matches(&[AssetAttributes::WIRE_SIZE])
            }
            Operation::SetAttributes => {
                in_size.matches(&[UUID_SIZE, TOKEN_SIZE, AssetAttributes::WIRE_SIZE])
                    && out_size.matches(&[])
            }
            Operation::Read => {
                in_size.matches(&[ReadTarget::WIRE_SIZE, TOKEN_SIZE, OFFSET_SIZE])
                    && (1..MAX_IOVEC).all(|index| out_size.get(index) == 0)
            }
            Operation::Write => {
                in_size.matches(&[UUID_SIZE, TOKEN_SIZE, OFFSET_SIZE, in_size.get(3)])
                    && out_size.matches(&[])
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::GetInfo => "get_info",
            Operation::GetAttributes => "get_attributes",
            Operation::SetAttributes => "set_attributes",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Where the dispatch loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    AwaitingSignal,
    Decoding,
    Executing,
    Replying,
}

/// The storage service partition
pub struct StorageService<'p, S: ObjectStore> {
    manager: AssetManager<'p, S>,
    state: DispatchState,
    staging: Vec<u8>,
}

impl<'p, S: ObjectStore> StorageService<'p, S> {
    pub fn new(manager: AssetManager<'p, S>) -> Self {
        let staging = vec![0u8; manager.config().staging_buffer_size.max(1)];
        Self {
            manager,
            state: DispatchState::Idle,
            staging,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn manager(&self) -> &AssetManager<'p, S> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut AssetManager<'p, S> {
        &mut self.manager
    }

    /// Prepares the asset manager
    ///
    /// The outcome is logged; callers start the loop either way.
    pub fn prepare(&mut self) -> Result<(), SstError> {
        let result = self.manager.prepare();
        match &result {
            Ok(()) => info!("storage service: prepared"),
            Err(err) => error!("storage service: preparation failed: {}", err),
        }
        result
    }

    /// Serves messages until the runtime stops delivering them
    ///
    /// On a device `wait` blocks forever and this never returns. Under a
    /// simulator it returns the error that ended the loop, normally
    /// [`KernelError::Idle`].
    pub fn run<P: PartitionApi + CallerMemory>(&mut self, rt: &mut P) -> KernelError {
        loop {
            if let Err(err) = self.step(rt) {
                self.state = DispatchState::Idle;
                return err;
            }
        }
    }

    /// Handles exactly one message
    pub fn step<P: PartitionApi + CallerMemory>(
        &mut self,
        rt: &mut P,
    ) -> Result<Operation, KernelError> {
        self.state = DispatchState::AwaitingSignal;
        let asserted = rt.wait(SignalSet::storage_signals())?;
        let Some(op) = Operation::from_signals(asserted) else {
            error!("storage service: invalid signal {:#x}", asserted.bits());
            return Err(KernelError::NoMessage(asserted.bits()));
        };

        self.state = DispatchState::Decoding;
        let msg = rt.get(op.signal()).map_err(|err| {
            error!("storage service: failed to get {} message: {}", op, err);
            err
        })?;
        debug!("storage service: {} {} from {}", op, msg.kind, msg.client_id);

        let status = match msg.kind {
            MessageKind::Connect | MessageKind::Disconnect => PSA_SUCCESS,
            MessageKind::Call => {
                let result = self.handle_call(rt, op, &msg);
                if let Err(err) = &result {
                    debug!("storage service: {} {} failed: {}", op, msg.handle, err);
                }
                status_of(&result)
            }
        };

        self.state = DispatchState::Replying;
        rt.reply(msg.handle, status).map_err(|err| {
            error!("storage service: failed to reply to {}: {}", msg.handle, err);
            err
        })?;
        self.state = DispatchState::AwaitingSignal;
        Ok(op)
    }

    fn handle_call<P: PartitionApi + CallerMemory>(
        &mut self,
        rt: &mut P,
        op: Operation,
        msg: &Message,
    ) -> Result<(), SstError> {
        if !op.accepts(&msg.in_size, &msg.out_size) {
            warn!(
                "storage service: {} from {} has wrong vector sizes {:?}/{:?}",
                op, msg.client_id, msg.in_size, msg.out_size
            );
            return Err(SstError::ParamError);
        }

        let caller = msg.client_id;
        let handle = msg.handle;
        match op {
            Operation::Create => {
                let uuid = read_uuid(rt, handle)?;
                let token = read_token(rt, caller, handle)?;
                self.state = DispatchState::Executing;
                self.manager.create(caller, uuid, &token)
            }
            Operation::GetInfo => {
                let uuid = read_uuid(rt, handle)?;
                let token = read_token(rt, caller, handle)?;
                self.state = DispatchState::Executing;
                let info = self.manager.get_info(caller, uuid, &token)?;
                rt.write(handle, 0, &info.to_wire())?;
                Ok(())
            }
            Operation::GetAttributes => {
                let uuid = read_uuid(rt, handle)?;
                let token = read_token(rt, caller, handle)?;
                self.state = DispatchState::Executing;
                let attrs = self.manager.get_attributes(caller, uuid, &token)?;
                rt.write(handle, 0, &attrs.to_wire())?;
                Ok(())
            }
            Operation::SetAttributes => {
                let uuid = read_uuid(rt, handle)?;
                let token = read_token(rt, caller, handle)?;
                let mut raw = [0u8; AssetAttributes::WIRE_SIZE];
                read_exact(rt, handle, 2, &mut raw)?;
                let attrs = AssetAttributes::from_wire(&raw)?;
                self.state = DispatchState::Executing;
                self.manager.set_attributes(caller, uuid, &token, &attrs)
            }
            Operation::Read => {
                let mut raw = [0u8; ReadTarget::WIRE_SIZE];
                read_exact(rt, handle, 0, &mut raw)?;
                let target = ReadTarget::from_wire(&raw)?;
                let token = read_token(rt, caller, handle)?;
                let offset = read_offset(rt, handle)?;
                self.state = DispatchState::Executing;
                self.read_chunked(rt, msg, target, &token, offset)
            }
            Operation::Write => {
                let uuid = read_uuid(rt, handle)?;
                let token = read_token(rt, caller, handle)?;
                let offset = read_offset(rt, handle)?;
                self.state = DispatchState::Executing;
                self.write_chunked(rt, msg, uuid, &token, offset)
            }
            Operation::Delete => {
                let uuid = read_uuid(rt, handle)?;
                let token = read_token(rt, caller, handle)?;
                self.state = DispatchState::Executing;
                self.manager.delete(caller, uuid, &token)
            }
        }
    }

    /// Authorizes once, then streams the asset into output vector 0
    fn read_chunked<P: PartitionApi>(
        &mut self,
        rt: &mut P,
        msg: &Message,
        target: ReadTarget,
        token: &AccessToken,
        mut offset: u32,
    ) -> Result<(), SstError> {
        let client = ClientId::new(target.client_id);
        let grant = self
            .manager
            .authorize_read(msg.client_id, client, target.uuid, offset)?;

        let mut remaining = msg.out_size.get(0);
        loop {
            let chunk = remaining.min(self.staging.len());
            let buf = &mut self.staging[..chunk];
            self.manager.read_granted(&grant, token, offset, buf)?;
            rt.write(msg.handle, 0, buf)?;

            offset = advance(offset, chunk)?;
            remaining -= chunk;
            debug!(
                "storage service: read {} bytes of {}, {} left",
                chunk, target.uuid, remaining
            );
            if remaining == 0 {
                return Ok(());
            }
        }
    }

    /// Writes input vector 3 chunk by chunk
    ///
    /// The whole range is authorized and bounds-checked before the first
    /// chunk. Each chunk is then a separate single-shot write. A failing
    /// chunk ends the request and earlier chunks stay written.
    fn write_chunked<P: PartitionApi>(
        &mut self,
        rt: &mut P,
        msg: &Message,
        uuid: AssetUuid,
        token: &AccessToken,
        mut offset: u32,
    ) -> Result<(), SstError> {
        let mut remaining = msg.in_size.get(3);
        let total = u32::try_from(remaining).map_err(|_| SstError::ParamError)?;
        self.manager
            .check_write_range(msg.client_id, uuid, offset, total)?;

        loop {
            let chunk = remaining.min(self.staging.len());
            let buf = &mut self.staging[..chunk];
            read_exact(rt, msg.handle, 3, buf)?;
            self.manager
                .write(msg.client_id, uuid, token, offset, buf)?;

            offset = advance(offset, chunk)?;
            remaining -= chunk;
            debug!(
                "storage service: wrote {} bytes of {}, {} left",
                chunk, uuid, remaining
            );
            if remaining == 0 {
                return Ok(());
            }
        }
    }
}

fn advance(offset: u32, chunk: usize) -> Result<u32, SstError> {
    u32::try_from(chunk)
        .ok()
        .and_then(|chunk| offset.checked_add(chunk))
        .ok_or(SstError::ParamError)
}

/// Reads exactly `buf.len()` bytes of input vector `index`
///
/// Fewer bytes than declared is a transport protocol violation.
fn read_exact<P: PartitionApi>(
    rt: &mut P,
    handle: MessageHandle,
    index: usize,
    buf: &mut [u8],
) -> Result<(), SstError> {
    let count = rt.read(handle, index, buf)?;
    if count != buf.len() {
        error!(
            "storage service: short read on {} vector {}: {} of {} bytes",
            handle,
            index,
            count,
            buf.len()
        );
        return Err(SstError::SystemError);
    }
    Ok(())
}

fn read_uuid<P: PartitionApi>(rt: &mut P, handle: MessageHandle) -> Result<AssetUuid, SstError> {
    let mut raw = [0u8; UUID_SIZE];
    read_exact(rt, handle, 0, &mut raw)?;
    Ok(decode_uuid(&raw)?)
}

fn read_offset<P: PartitionApi>(rt: &mut P, handle: MessageHandle) -> Result<u32, SstError> {
    let mut raw = [0u8; OFFSET_SIZE];
    read_exact(rt, handle, 2, &mut raw)?;
    Ok(decode_offset(&raw)?)
}

/// Reads the token record from vector 1 and copies the token it names
fn read_token<P: PartitionApi + CallerMemory>(
    rt: &mut P,
    caller: ClientId,
    handle: MessageHandle,
) -> Result<AccessToken, SstError> {
    let mut raw = [0u8; TOKEN_SIZE];
    read_exact(rt, handle, 1, &mut raw)?;
    let token_ref = TokenRef::from_wire(&raw)?;
    Ok(copy_token(rt, caller, token_ref)?)
}
