//! # Simulated Partition Manager
//!
//! This crate provides a simulated implementation of the partition runtime
//! API.
//!
//! ## Purpose
//!
//! The simulated partition manager allows testing a secure service without
//! hardware:
//! - Runs under `cargo test`
//! - Deterministic (one thread, FIFO queues, no real time)
//! - Inspectable (pending messages, replies and caller memory are all
//!   accessible)
//!
//! Clients submit connect, call and disconnect requests. Each request is
//! queued behind the signal of the service it targets; the service side
//! drives [`PartitionApi`] exactly as it would on a device, and the reply
//! is parked until the client collects it with
//! [`SimulatedSpm::take_reply`].

pub mod address_space;
pub mod fault_injection;
pub mod message_queue;

use address_space::AddressSpaces;
use core_types::{
    CallerAddr, MemoryAccess, MemoryError, MemoryPerms, MinorVersion, Sid, SST_MINOR_VERSION,
    SST_SIDS,
};
use fault_injection::{FaultInjector, FaultPlan};
use identity::ClientId;
use ipc::{
    Compatibility, IoSizes, Message, MessageHandle, MessageKind, SignalSet, VersionPolicy,
    MAX_IOVEC, PSA_DROP_CONNECTION,
};
use kernel_api::{CallerMemory, KernelError, PartitionApi};
use log::{debug, warn};
use message_queue::{MessageQueue, QueueError};
use std::collections::{BTreeMap, HashMap};

/// Messages that may wait behind a single signal
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Where requests for a service identifier are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceRoute {
    pub signal: SignalSet,
    pub version: VersionPolicy,
}

/// Final status and output bytes of a replied message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub status: i32,
    /// Bytes written to each output vector, in order
    pub outputs: Vec<Vec<u8>>,
}

#[derive(Debug)]
struct PendingMessage {
    message: Message,
    signal: SignalSet,
    inputs: Vec<Vec<u8>>,
    read_cursors: [usize; MAX_IOVEC],
    output_caps: Vec<usize>,
    outputs: Vec<Vec<u8>>,
}

/// Simulated secure partition manager
///
/// Hosts a single service partition and any number of clients.
pub struct SimulatedSpm {
    routes: HashMap<Sid, ServiceRoute>,
    queues: BTreeMap<u32, MessageQueue>,
    /// Queued and in-flight messages
    messages: HashMap<MessageHandle, PendingMessage>,
    replies: HashMap<MessageHandle, CallOutcome>,
    next_handle: u32,
    queue_capacity: usize,
    memory: AddressSpaces,
    fault_injector: Option<FaultInjector>,
}

impl Default for SimulatedSpm {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSpm {
    /// Creates a partition manager with no services and no client memory
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates a partition manager whose signal queues hold `capacity`
    /// messages each
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            routes: HashMap::new(),
            queues: BTreeMap::new(),
            messages: HashMap::new(),
            replies: HashMap::new(),
            next_handle: 1,
            queue_capacity: capacity,
            memory: AddressSpaces::new(),
            fault_injector: None,
        }
    }

    /// Publishes `sid` behind `signal`
    pub fn register_service(&mut self, sid: Sid, signal: SignalSet, version: VersionPolicy) {
        self.routes.insert(sid, ServiceRoute { signal, version });
        self.queues
            .entry(signal.bits())
            .or_insert_with(|| MessageQueue::with_capacity(self.queue_capacity));
    }

    /// Publishes the seven secure storage services at minor version 1
    pub fn register_storage_service(&mut self) {
        for (index, sid) in SST_SIDS.iter().enumerate() {
            self.register_service(
                *sid,
                SignalSet::for_operation(index as u32),
                VersionPolicy::current(SST_MINOR_VERSION),
            );
        }
    }

    /// Returns the route for `sid`, if registered
    pub fn route(&self, sid: Sid) -> Option<ServiceRoute> {
        self.routes.get(&sid).copied()
    }

    /// Installs a transport fault plan
    pub fn set_fault_plan(&mut self, plan: FaultPlan) {
        self.fault_injector = Some(FaultInjector::new(plan));
    }

    /// Removes any transport fault plan
    pub fn clear_fault_plan(&mut self) {
        self.fault_injector = None;
    }

    /// Returns the active fault injector
    pub fn fault_injector(&self) -> Option<&FaultInjector> {
        self.fault_injector.as_ref()
    }

    /// Maps a region into `owner`'s address space
    pub fn map_region(
        &mut self,
        owner: ClientId,
        base: CallerAddr,
        len: u32,
        perms: MemoryPerms,
    ) -> Result<(), MemoryError> {
        self.memory.map(owner, base, len, perms)
    }

    pub fn memory(&self) -> &AddressSpaces {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut AddressSpaces {
        &mut self.memory
    }

    /// Submits a connect request
    ///
    /// A requested version outside the service's policy is refused here,
    /// before the service sees any message.
    pub fn connect(
        &mut self,
        client: ClientId,
        sid: Sid,
        version: MinorVersion,
    ) -> Result<MessageHandle, KernelError> {
        let client = ClientId::caller(client.as_i32())?;
        let route = self.route(sid).ok_or(KernelError::ServiceNotFound(sid))?;
        let compatibility = route.version.check_compatibility(version);
        if compatibility != Compatibility::Compatible {
            warn!(
                "refusing connect from {} to {} at v{}: {}",
                client, sid, version.0, compatibility
            );
            return Err(KernelError::ConnectionRefused(sid));
        }
        let handle = self.allocate_handle();
        self.enqueue(
            route.signal,
            PendingMessage {
                message: Message::control(handle, MessageKind::Connect, client),
                signal: route.signal,
                inputs: Vec::new(),
                read_cursors: [0; MAX_IOVEC],
                output_caps: Vec::new(),
                outputs: Vec::new(),
            },
        )?;
        Ok(handle)
    }

    /// Submits a call carrying `inputs` and expecting outputs of at most
    /// `output_caps` bytes each
    pub fn call(
        &mut self,
        client: ClientId,
        sid: Sid,
        inputs: Vec<Vec<u8>>,
        output_caps: Vec<usize>,
    ) -> Result<MessageHandle, KernelError> {
        let client = ClientId::caller(client.as_i32())?;
        let route = self.route(sid).ok_or(KernelError::ServiceNotFound(sid))?;
        let handle = self.allocate_handle();
        let in_lengths: Vec<usize> = inputs.iter().map(Vec::len).collect();
        let in_size = IoSizes::from_lengths(&in_lengths).ok_or(KernelError::InvalidVector {
            handle,
            index: MAX_IOVEC,
        })?;
        let out_size = IoSizes::from_lengths(&output_caps).ok_or(KernelError::InvalidVector {
            handle,
            index: MAX_IOVEC,
        })?;

        let dropped = self
            .fault_injector
            .as_mut()
            .map(|injector| injector.should_drop_call(sid))
            .unwrap_or(false);
        if dropped {
            warn!("dropping call {} from {} to {}", handle, client, sid);
            self.replies.insert(
                handle,
                CallOutcome {
                    status: PSA_DROP_CONNECTION,
                    outputs: Vec::new(),
                },
            );
            return Ok(handle);
        }

        let outputs = vec![Vec::new(); output_caps.len()];
        self.enqueue(
            route.signal,
            PendingMessage {
                message: Message {
                    handle,
                    kind: MessageKind::Call,
                    client_id: client,
                    in_size,
                    out_size,
                },
                signal: route.signal,
                inputs,
                read_cursors: [0; MAX_IOVEC],
                output_caps,
                outputs,
            },
        )?;
        Ok(handle)
    }

    /// Submits a disconnect request
    pub fn disconnect(&mut self, client: ClientId, sid: Sid) -> Result<MessageHandle, KernelError> {
        let client = ClientId::caller(client.as_i32())?;
        let route = self.route(sid).ok_or(KernelError::ServiceNotFound(sid))?;
        let handle = self.allocate_handle();
        self.enqueue(
            route.signal,
            PendingMessage {
                message: Message::control(handle, MessageKind::Disconnect, client),
                signal: route.signal,
                inputs: Vec::new(),
                read_cursors: [0; MAX_IOVEC],
                output_caps: Vec::new(),
                outputs: Vec::new(),
            },
        )?;
        Ok(handle)
    }

    /// Drops every message still queued behind `signal`
    ///
    /// Each dropped message completes with `PSA_DROP_CONNECTION`. Returns
    /// the number of messages dropped.
    pub fn drop_pending(&mut self, signal: SignalSet) -> usize {
        let handles = match self.queues.get_mut(&signal.bits()) {
            Some(queue) => queue.drain(),
            None => return 0,
        };
        for handle in &handles {
            self.messages.remove(handle);
            warn!("dropping pending {}", handle);
            self.replies.insert(
                *handle,
                CallOutcome {
                    status: PSA_DROP_CONNECTION,
                    outputs: Vec::new(),
                },
            );
        }
        handles.len()
    }

    /// Collects the outcome of a replied (or dropped) message
    pub fn take_reply(&mut self, handle: MessageHandle) -> Option<CallOutcome> {
        self.replies.remove(&handle)
    }

    /// Signals that currently have at least one queued message
    pub fn asserted_signals(&self) -> SignalSet {
        self.queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .fold(SignalSet::empty(), |set, (bits, _)| {
                set | SignalSet::from_bits_retain(*bits)
            })
    }

    /// Number of messages queued or in flight
    pub fn pending_count(&self) -> usize {
        self.messages.len()
    }

    fn allocate_handle(&mut self) -> MessageHandle {
        let handle = MessageHandle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn enqueue(&mut self, signal: SignalSet, pending: PendingMessage) -> Result<(), KernelError> {
        let handle = pending.message.handle;
        let queue = self
            .queues
            .get_mut(&signal.bits())
            .ok_or(KernelError::NoMessage(signal.bits()))?;
        match queue.push(handle) {
            Ok(()) => {}
            Err(QueueError::Full) => return Err(KernelError::QueueFull(signal.bits())),
        }
        debug!(
            "queued {} {} from {} on {:#x}",
            pending.message.kind,
            handle,
            pending.message.client_id,
            signal.bits()
        );
        self.messages.insert(handle, pending);
        Ok(())
    }

    fn in_flight(&mut self, handle: MessageHandle) -> Result<&mut PendingMessage, KernelError> {
        self.messages
            .get_mut(&handle)
            .ok_or(KernelError::InvalidHandle(handle))
    }
}

impl PartitionApi for SimulatedSpm {
    fn wait(&mut self, mask: SignalSet) -> Result<SignalSet, KernelError> {
        let asserted = self.asserted_signals() & mask;
        if asserted.is_empty() {
            return Err(KernelError::Idle);
        }
        Ok(asserted)
    }

    fn get(&mut self, signal: SignalSet) -> Result<Message, KernelError> {
        let handle = self
            .queues
            .get_mut(&signal.bits())
            .and_then(MessageQueue::pop)
            .ok_or(KernelError::NoMessage(signal.bits()))?;
        let pending = self.in_flight(handle)?;
        debug_assert_eq!(pending.signal, signal);
        Ok(pending.message.clone())
    }

    fn read(
        &mut self,
        handle: MessageHandle,
        index: usize,
        buf: &mut [u8],
    ) -> Result<usize, KernelError> {
        if index >= MAX_IOVEC {
            return Err(KernelError::InvalidVector { handle, index });
        }
        let limit = self
            .fault_injector
            .as_mut()
            .and_then(FaultInjector::take_read_limit);
        let pending = self.in_flight(handle)?;
        let Some(input) = pending.inputs.get(index) else {
            return Ok(0);
        };
        let cursor = pending.read_cursors[index];
        let remaining = &input[cursor..];
        let mut count = buf.len().min(remaining.len());
        if let Some(limit) = limit {
            count = count.min(limit);
        }
        buf[..count].copy_from_slice(&remaining[..count]);
        pending.read_cursors[index] += count;
        Ok(count)
    }

    fn write(&mut self, handle: MessageHandle, index: usize, data: &[u8]) -> Result<(), KernelError> {
        let pending = self.in_flight(handle)?;
        let capacity = *pending
            .output_caps
            .get(index)
            .ok_or(KernelError::InvalidVector { handle, index })?;
        let output = &mut pending.outputs[index];
        let attempted = output.len() + data.len();
        if attempted > capacity {
            return Err(KernelError::OutputOverflow {
                index,
                capacity,
                attempted,
            });
        }
        output.extend_from_slice(data);
        Ok(())
    }

    fn reply(&mut self, handle: MessageHandle, status: i32) -> Result<(), KernelError> {
        let pending = self
            .messages
            .remove(&handle)
            .ok_or(KernelError::InvalidHandle(handle))?;
        debug!("{} replied with {}", handle, status);
        self.replies.insert(
            handle,
            CallOutcome {
                status,
                outputs: pending.outputs,
            },
        );
        Ok(())
    }
}

impl CallerMemory for SimulatedSpm {
    fn check_range(
        &self,
        owner: ClientId,
        addr: CallerAddr,
        len: u32,
        access: MemoryAccess,
    ) -> bool {
        self.memory.check_range(owner, addr, len, access)
    }

    fn read_bytes(
        &mut self,
        owner: ClientId,
        addr: CallerAddr,
        buf: &mut [u8],
    ) -> Result<(), KernelError> {
        self.memory.read_bytes(owner, addr, buf)
    }

    fn write_bytes(
        &mut self,
        owner: ClientId,
        addr: CallerAddr,
        data: &[u8],
    ) -> Result<(), KernelError> {
        self.memory.write_bytes(owner, addr, data)
    }
}
