//! The service side of the partition interface

use crate::KernelError;
use ipc::{Message, MessageHandle, SignalSet};

/// Operations a service partition uses to receive and answer requests
///
/// Multiple implementations are possible:
/// - Simulated partition manager (for testing)
/// - Real secure partition manager (supervisor calls)
///
/// # Design Principles
///
/// **Signals before messages**: a service first waits for a signal, then
/// fetches the single message queued behind it.
///
/// **Sizes are announced**: the [`Message`] returned by `get` carries the
/// declared length of every vector, so a service can reject a malformed
/// request without transferring a byte.
///
/// **One reply per message**: every handle returned by `get` must be
/// answered with exactly one `reply`, after which it is invalid.
///
/// # Example
///
/// ```
/// use ipc::SignalSet;
/// use kernel_api::{KernelError, PartitionApi};
///
/// fn accept_one<P: PartitionApi>(rt: &mut P) -> Result<(), KernelError> {
///     let ready = rt.wait(SignalSet::storage_signals())?;
///     let msg = rt.get(ready)?;
///     rt.reply(msg.handle, ipc::PSA_SUCCESS)
/// }
/// ```
pub trait PartitionApi {
    /// Blocks until at least one signal in `mask` is asserted
    ///
    /// # Returns
    ///
    /// The subset of `mask` currently asserted. More than one bit may be set.
    fn wait(&mut self, mask: SignalSet) -> Result<SignalSet, KernelError>;

    /// Retrieves the next message for a single asserted signal
    ///
    /// # Arguments
    ///
    /// * `signal` - Exactly one signal bit
    fn get(&mut self, signal: SignalSet) -> Result<Message, KernelError>;

    /// Reads from input vector `index` of an in-flight message
    ///
    /// Each input vector has a read cursor; successive reads continue where
    /// the previous one stopped.
    ///
    /// # Returns
    ///
    /// The number of bytes copied into `buf`, which is less than
    /// `buf.len()` only when the vector has fewer bytes left.
    fn read(
        &mut self,
        handle: MessageHandle,
        index: usize,
        buf: &mut [u8],
    ) -> Result<usize, KernelError>;

    /// Appends `data` to output vector `index` of an in-flight message
    fn write(&mut self, handle: MessageHandle, index: usize, data: &[u8])
        -> Result<(), KernelError>;

    /// Completes a message with a signed status
    ///
    /// The handle is invalid afterwards.
    fn reply(&mut self, handle: MessageHandle, status: i32) -> Result<(), KernelError>;
}
