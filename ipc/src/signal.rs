//! Signal bits a service partition waits on

use bitflags::bitflags;

bitflags! {
    /// Set of signals asserted for a partition
    ///
    /// Bits 0-3 are reserved for the partition manager. The storage service
    /// owns one bit per operation starting at bit 4.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SignalSet: u32 {
        const SST_CREATE = 1 << 4;
        const SST_GET_INFO = 1 << 5;
        const SST_GET_ATTRIBUTES = 1 << 6;
        const SST_SET_ATTRIBUTES = 1 << 7;
        const SST_READ = 1 << 8;
        const SST_WRITE = 1 << 9;
        const SST_DELETE = 1 << 10;
    }
}

impl SignalSet {
    /// Every signal the storage service handles
    pub fn storage_signals() -> Self {
        Self::all()
    }

    /// Bit for the storage operation at `index` in dispatch order
    pub fn for_operation(index: u32) -> Self {
        Self::from_bits_retain(1 << (index + 4))
    }
}
