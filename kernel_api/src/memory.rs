//! Ownership checks and copies on caller memory

use crate::KernelError;
use core_types::{CallerAddr, MemoryAccess};
use identity::ClientId;

/// Access to the address space of a calling client
///
/// The service never dereferences a caller address itself. It asks the
/// partition manager whether the caller owns a range and then copies
/// through this trait.
pub trait CallerMemory {
    /// Returns true if `owner` holds `[addr, addr + len)` with `access`
    ///
    /// A zero-length range is always owned.
    fn check_range(&self, owner: ClientId, addr: CallerAddr, len: u32, access: MemoryAccess)
        -> bool;

    /// Copies `buf.len()` bytes from `owner`'s memory at `addr`
    fn read_bytes(
        &mut self,
        owner: ClientId,
        addr: CallerAddr,
        buf: &mut [u8],
    ) -> Result<(), KernelError>;

    /// Copies `data` into `owner`'s memory at `addr`
    fn write_bytes(
        &mut self,
        owner: ClientId,
        addr: CallerAddr,
        data: &[u8],
    ) -> Result<(), KernelError>;
}
