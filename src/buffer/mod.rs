//! Shared ring buffer between the ingest and apply tasks.
//!
//! A fixed-capacity queue of byte slots (`slot_size × slot_count`), safe for
//! one producer and one consumer task. `push` waits while the buffer is
//! full, `pop` waits while it is empty; both have timeout variants. The
//! buffer is reference-counted so an outgoing and an incoming instance can
//! briefly share it during a reconfiguration hand-off.

#[cfg(test)]
mod buffer_test;

//---
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::BufferAllocError;

struct Slot {
    data: Box<[u8]>,
    len: usize,
}

struct Inner {
    slots: Vec<Slot>,
    head: usize,
    tail: usize,
    len: usize,
}

pub struct RingBuffer {
    inner: Mutex<Inner>,
    readable: Notify,
    writable: Notify,
    slot_size: usize,
    slot_count: usize,
}

impl RingBuffer {
    /// Allocates a buffer of `slot_count` slots of `slot_size` bytes each.
    ///
    /// Allocation failure is reported instead of aborting the process, so a
    /// reconfiguration attempt can roll back on memory pressure.
    pub fn allocate(
        slot_size: usize,
        slot_count: usize,
    ) -> std::result::Result<Arc<Self>, BufferAllocError> {
        let bytes = slot_size * slot_count;

        let mut slots = Vec::new();
        slots.try_reserve_exact(slot_count).map_err(|_| BufferAllocError { bytes })?;
        for _ in 0..slot_count {
            let mut data = Vec::new();
            data.try_reserve_exact(slot_size).map_err(|_| BufferAllocError { bytes })?;
            data.resize(slot_size, 0u8);
            slots.push(Slot {
                data: data.into_boxed_slice(),
                len: 0,
            });
        }

        Ok(Arc::new(Self {
            inner: Mutex::new(Inner {
                slots,
                head: 0,
                tail: 0,
                len: 0,
            }),
            readable: Notify::new(),
            writable: Notify::new(),
            slot_size,
            slot_count,
        }))
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Enqueues one record, waiting while the buffer is full.
    ///
    /// `record` must fit in a single slot; the producer reads upstream data
    /// in chunks of at most `slot_size` bytes.
    pub async fn push(
        &self,
        record: &[u8],
    ) {
        debug_assert!(record.len() <= self.slot_size);
        loop {
            // Register for the wakeup before checking state, otherwise a
            // notify between the check and the await is lost.
            let writable = self.writable.notified();
            {
                let mut inner = self.inner.lock();
                if inner.len < self.slot_count {
                    let tail = inner.tail;
                    let slot = &mut inner.slots[tail];
                    slot.data[..record.len()].copy_from_slice(record);
                    slot.len = record.len();
                    inner.tail = (inner.tail + 1) % self.slot_count;
                    inner.len += 1;
                    self.readable.notify_one();
                    return;
                }
            }
            writable.await;
        }
    }

    /// Dequeues one record, waiting while the buffer is empty.
    pub async fn pop(&self) -> Vec<u8> {
        loop {
            let readable = self.readable.notified();
            {
                let mut inner = self.inner.lock();
                if inner.len > 0 {
                    let head = inner.head;
                    let slot = &inner.slots[head];
                    let record = slot.data[..slot.len].to_vec();
                    inner.head = (inner.head + 1) % self.slot_count;
                    inner.len -= 1;
                    self.writable.notify_one();
                    return record;
                }
            }
            readable.await;
        }
    }

    /// `push` bounded by `wait`; returns false if the buffer stayed full.
    pub async fn push_timeout(
        &self,
        record: &[u8],
        wait: Duration,
    ) -> bool {
        tokio::time::timeout(wait, self.push(record)).await.is_ok()
    }

    /// `pop` bounded by `wait`; returns None if the buffer stayed empty.
    pub async fn pop_timeout(
        &self,
        wait: Duration,
    ) -> Option<Vec<u8>> {
        tokio::time::timeout(wait, self.pop()).await.ok()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
