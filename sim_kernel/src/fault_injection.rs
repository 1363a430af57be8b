//! Deterministic transport fault injection
//!
//! Lets tests break the delivery path between a client and a service:
//! messages can vanish before the service sees them, and vector reads can
//! come back shorter than the size the message declared.
//!
//! ## Example
//!
//! ```
//! use sim_kernel::fault_injection::{FaultPlan, TransportFault};
//!
//! let plan = FaultPlan::new()
//!     .with_fault(TransportFault::DropNext { count: 1 })
//!     .with_fault(TransportFault::TruncateNextRead { max_bytes: 2 });
//! assert_eq!(plan.faults().len(), 2);
//! ```

use core_types::Sid;
use std::collections::HashMap;

/// A fault to inject into message transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFault {
    /// Drop the next N submitted calls on any service
    DropNext { count: usize },

    /// Drop the next N submitted calls to a specific service
    DropNextOnSid { sid: Sid, count: usize },

    /// Cap the next vector read at `max_bytes`
    TruncateNextRead { max_bytes: usize },
}

/// A plan describing all faults to inject
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    faults: Vec<TransportFault>,
}

impl FaultPlan {
    /// Creates a new empty fault plan
    pub fn new() -> Self {
        Self { faults: Vec::new() }
    }

    /// Adds a fault to the plan
    pub fn with_fault(mut self, fault: TransportFault) -> Self {
        self.faults.push(fault);
        self
    }

    pub fn faults(&self) -> &[TransportFault] {
        &self.faults
    }
}

/// Applies a [`FaultPlan`], tracking how much of it has been consumed
#[derive(Debug, Default)]
pub struct FaultInjector {
    drop_next_count: usize,
    drop_next_on_sid: HashMap<Sid, usize>,
    truncations: Vec<usize>,
    dropped: usize,
}

impl FaultInjector {
    /// Creates a new fault injector with the given plan
    pub fn new(plan: FaultPlan) -> Self {
        let mut injector = Self::default();
        for fault in plan.faults() {
            match fault {
                TransportFault::DropNext { count } => {
                    injector.drop_next_count += *count;
                }
                TransportFault::DropNextOnSid { sid, count } => {
                    *injector.drop_next_on_sid.entry(*sid).or_insert(0) += *count;
                }
                TransportFault::TruncateNextRead { max_bytes } => {
                    injector.truncations.push(*max_bytes);
                }
            }
        }
        // Consumed from the back.
        injector.truncations.reverse();
        injector
    }

    /// Checks if a call to `sid` should be dropped
    pub fn should_drop_call(&mut self, sid: Sid) -> bool {
        if self.drop_next_count > 0 {
            self.drop_next_count -= 1;
            self.dropped += 1;
            return true;
        }
        if let Some(count) = self.drop_next_on_sid.get_mut(&sid) {
            if *count > 0 {
                *count -= 1;
                self.dropped += 1;
                return true;
            }
        }
        false
    }

    /// Returns the byte cap for the next vector read, if any
    pub fn take_read_limit(&mut self) -> Option<usize> {
        self.truncations.pop()
    }

    /// Number of calls dropped so far
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }
}
