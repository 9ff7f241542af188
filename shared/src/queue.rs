//! Bounded command queue
//!
//! Fixed arena of `capacity` slots addressed by a read and a write index that
//! wrap modulo the capacity. One slot is always left empty so that
//! `read == write` means empty and `write + 1 == read` means full. Storage is
//! allocated once; enqueue and dequeue never allocate.
//!
//! Producers (network tasks) only append at the write index and never touch a
//! slot after publishing it; the single consumer (the scheduler loop) only
//! advances the read index. Both indices are published together under one lock,
//! so the consumer never observes a half-written slot or a stale occupancy.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::{limits, Command};

/// Enqueue was refused because every usable slot is occupied. Carries the
/// rejected command back to the caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("command queue full, rejected command {}", .command.id)]
pub struct QueueFull {
    pub command: Command,
}

#[derive(Debug)]
struct Ring {
    slots: Box<[Option<Command>]>,
    read: usize,
    write: usize,
}

impl Ring {
    fn len(&self) -> usize {
        let capacity = self.slots.len();
        (self.write + capacity - self.read) % capacity
    }
}

/// Multi-producer, single-consumer FIFO of admitted commands
#[derive(Debug)]
pub struct CommandQueue {
    ring: Mutex<Ring>,
    capacity: usize,
}

impl CommandQueue {
    /// Create a queue with `capacity` slots (`capacity - 1` usable)
    ///
    /// # Panics
    /// If `capacity < 2`.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity >= 2, "command queue needs at least 2 slots");
        Self {
            ring: Mutex::new(Ring {
                slots: vec![None; capacity].into_boxed_slice(),
                read: 0,
                write: 0,
            }),
            capacity,
        }
    }

    /// Append a command, or hand it back if the queue is full
    pub fn enqueue(&self, command: Command) -> Result<(), QueueFull> {
        let mut ring = self.lock();
        let next = (ring.write + 1) % self.capacity;
        if next == ring.read {
            return Err(QueueFull { command });
        }
        let write = ring.write;
        ring.slots[write] = Some(command);
        ring.write = next;
        Ok(())
    }

    /// Move up to `max` commands, oldest first, into `out`
    ///
    /// Returns the number of commands moved. Does not allocate if `out` has
    /// spare capacity for them.
    pub fn drain_into(&self, max: usize, out: &mut Vec<Command>) -> usize {
        let mut ring = self.lock();
        let mut taken = 0;
        while taken < max && ring.read != ring.write {
            let read = ring.read;
            if let Some(command) = ring.slots[read].take() {
                out.push(command);
            }
            ring.read = (read + 1) % self.capacity;
            taken += 1;
        }
        taken
    }

    /// Remove up to `max` commands in arrival order
    pub fn dequeue_batch(&self, max: usize) -> Vec<Command> {
        let mut out = Vec::with_capacity(max.min(self.len()));
        self.drain_into(max, &mut out);
        out
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slots, including the one held back
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum number of commands the queue can hold
    pub fn usable_capacity(&self) -> usize {
        self.capacity - 1
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::with_capacity(limits::QUEUE_CAPACITY)
    }
}
