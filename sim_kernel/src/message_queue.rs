//! Bounded per-signal message queue
//!
//! Provides deterministic FIFO ordering with explicit capacity limits.

use ipc::MessageHandle;
use std::collections::VecDeque;

/// Queue error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    Full,
}

/// Bounded FIFO queue of messages waiting behind one signal
#[derive(Debug, Clone)]
pub struct MessageQueue {
    capacity: usize,
    handles: VecDeque<MessageHandle>,
}

impl MessageQueue {
    /// Creates a queue with the specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            handles: VecDeque::new(),
        }
    }

    /// Returns the configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Pushes a message onto the queue
    pub fn push(&mut self, handle: MessageHandle) -> Result<(), QueueError> {
        if self.handles.len() >= self.capacity {
            return Err(QueueError::Full);
        }
        self.handles.push_back(handle);
        Ok(())
    }

    /// Pops the oldest message
    pub fn pop(&mut self) -> Option<MessageHandle> {
        self.handles.pop_front()
    }

    /// Removes and returns every queued message (for fault injection only)
    pub fn drain(&mut self) -> Vec<MessageHandle> {
        self.handles.drain(..).collect()
    }
}
