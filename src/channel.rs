//! Channel: one ring buffer, a set of attached clients, and the
//! flow-control algorithm tying write room to the slowest reader.
//!
//! # Locking
//!
//! Two lock domains live here, acquired in this order when both are
//! needed (the registry lock in [`crate::registry`] comes before either):
//!
//! 1. client-set mutex — membership and the slowest-reader scan
//! 2. buffer rwlock — storage and the write cursor; readers take it
//!    shared (each advances only its own cursor), a writer or a poll
//!    takes it exclusive to see a consistent snapshot of every cursor
//!
//! Blocking waits hold neither lock; see [`crate::notify`] for how the
//! condition re-check loop avoids lost wakeups.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::client::{Mode, Readiness};
use crate::error::ChannelError;
use crate::notify::WaitQueue;
use crate::ring::RingBuffer;

/// Identity of one attachment to a channel. Unique within the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Per-attachment state shared between the channel and the client handle.
///
/// The read cursor is stored atomically so a reader can advance it while
/// holding the buffer lock in shared mode; a writer observes all cursors
/// under the exclusive lock, which orders the accesses.
pub(crate) struct ClientRecord {
    pub(crate) offset: AtomicUsize,
    pub(crate) interrupted: AtomicBool,
}

/// A named broadcast byte stream: ring buffer plus attached clients.
///
/// Every byte written is delivered to every client attached at the time
/// of the write. The writer may never overwrite a byte some client has
/// not yet read, so write room is bounded by the least-progressed
/// client; a client that attaches and never reads will eventually stall
/// all writers. That backpressure contract is deliberate.
pub struct Channel {
    key: String,
    clients: Mutex<HashMap<ClientId, Arc<ClientRecord>>>,
    buffer: RwLock<RingBuffer>,
    /// Woken when new data exists ("whom to wake when data is available").
    pub(crate) data_wq: WaitQueue,
    /// Woken when write room may have increased.
    pub(crate) room_wq: WaitQueue,
    next_id: AtomicU64,
    max_clients: Option<usize>,
}

impl Channel {
    pub(crate) fn new(key: &str, capacity: usize, max_clients: Option<usize>) -> Self {
        Self {
            key: key.to_string(),
            clients: Mutex::new(HashMap::new()),
            buffer: RwLock::new(RingBuffer::new(capacity)),
            data_wq: WaitQueue::new(),
            room_wq: WaitQueue::new(),
            next_id: AtomicU64::new(1),
            max_clients,
        }
    }

    /// Key this channel is registered under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of currently attached clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    pub(crate) fn has_clients(&self) -> bool {
        !self.clients.lock().is_empty()
    }

    /// Attach a new client. Its cursor starts at the current write
    /// cursor: a new client never sees history, only future writes.
    pub(crate) fn new_client(&self) -> Result<(ClientId, Arc<ClientRecord>), ChannelError> {
        let mut clients = self.clients.lock();
        if let Some(max) = self.max_clients {
            if clients.len() >= max {
                log::warn!(
                    "channel {}: client limit {} reached, refusing attach",
                    self.key,
                    max
                );
                return Err(ChannelError::ResourceExhausted);
            }
        }

        let end = self.buffer.read().end();
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = Arc::new(ClientRecord {
            offset: AtomicUsize::new(end),
            interrupted: AtomicBool::new(false),
        });
        clients.insert(id, Arc::clone(&record));
        log::debug!("channel {}: client {:?} attached at offset {}", self.key, id, end);
        Ok((id, record))
    }

    /// Detach a client. Removing the slowest client can unblock writers,
    /// so the room queue is always woken.
    pub(crate) fn remove_client(&self, id: ClientId) -> bool {
        let removed = self.clients.lock().remove(&id).is_some();
        if removed {
            log::debug!("channel {}: client {:?} detached", self.key, id);
            self.room_wq.wake_all();
        }
        removed
    }

    /// Read cursor of the client with the most unread data, or the write
    /// cursor itself when no client constrains the writer.
    fn blocking_offset(
        clients: &HashMap<ClientId, Arc<ClientRecord>>,
        buffer: &RingBuffer,
    ) -> usize {
        let end = buffer.end();
        let mut max_unread = 0;
        let mut offset = end;
        for record in clients.values() {
            let cursor = record.offset.load(Ordering::Relaxed);
            let unread = buffer.dist(cursor, end);
            if unread > max_unread {
                max_unread = unread;
                offset = cursor;
            }
        }
        offset
    }

    /// Bytes that can be appended before colliding with the slowest
    /// reader's unread window. Stops one byte short of the blocking
    /// offset, because cursor == write cursor means "nothing unread":
    /// with no gap, a full buffer would read as empty.
    fn room_to_write(
        clients: &HashMap<ClientId, Arc<ClientRecord>>,
        buffer: &RingBuffer,
    ) -> usize {
        let capacity = buffer.capacity();
        let max_idx = (Self::blocking_offset(clients, buffer) + capacity - 1) % capacity;
        buffer.dist(buffer.end(), max_idx)
    }

    /// Read for one client: copy unread bytes at its cursor, advancing
    /// the cursor by the amount copied, then wake writers.
    pub(crate) fn read(
        &self,
        id: ClientId,
        record: &ClientRecord,
        buf: &mut [u8],
        mode: Mode,
    ) -> Result<usize, ChannelError> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let ticket = self.data_wq.ticket();
            let copied = {
                let buffer = self.buffer.read();
                let pos = record.offset.load(Ordering::Relaxed);
                let unread = buffer.dist(pos, buffer.end());
                if unread == 0 {
                    None
                } else {
                    let n = buffer.read_at(pos, buf, unread);
                    record
                        .offset
                        .store((pos + n) % buffer.capacity(), Ordering::Relaxed);
                    Some(n)
                }
            };
            if let Some(n) = copied {
                log::debug!("channel {}: client {:?} read {} bytes", self.key, id, n);
                // There may be more room now that we've read.
                self.room_wq.wake_all();
                return Ok(n);
            }
            if mode == Mode::NonBlocking {
                return Err(ChannelError::WouldBlock);
            }
            log::debug!("channel {}: client {:?} waiting for data", self.key, id);
            self.data_wq.wait(ticket, &record.interrupted)?;
        }
    }

    /// Write: copy up to the available room, advancing the write cursor,
    /// then wake readers. A blocked writer resumes as soon as any room
    /// appears; it accepts a partial write rather than waiting for the
    /// whole request to fit.
    pub(crate) fn write(
        &self,
        id: ClientId,
        record: &ClientRecord,
        data: &[u8],
        mode: Mode,
    ) -> Result<usize, ChannelError> {
        if data.is_empty() {
            // Return early without waking readers: empty writes must not
            // wake waiting clients.
            return Ok(0);
        }
        loop {
            let ticket = self.room_wq.ticket();
            let written = {
                let clients = self.clients.lock();
                let mut buffer = self.buffer.write();
                let room = Self::room_to_write(&clients, &buffer);
                if room == 0 {
                    None
                } else {
                    // Membership is pinned for the scan above; a detach
                    // during the copy can only increase room.
                    drop(clients);
                    Some(buffer.append(data, room))
                }
            };
            if let Some(n) = written {
                log::debug!("channel {}: client {:?} wrote {} bytes", self.key, id, n);
                // There is more data for readers.
                self.data_wq.wake_all();
                return Ok(n);
            }
            if mode == Mode::NonBlocking {
                return Err(ChannelError::WouldBlock);
            }
            log::debug!("channel {}: client {:?} waiting for room", self.key, id);
            self.room_wq.wait(ticket, &record.interrupted)?;
        }
    }

    /// Readiness bits for one client.
    ///
    /// Needs the exclusive buffer lock so no reader is advancing its
    /// cursor while both cursor families are inspected.
    pub(crate) fn poll(&self, record: &ClientRecord) -> Readiness {
        let clients = self.clients.lock();
        let buffer = self.buffer.write();
        let pos = record.offset.load(Ordering::Relaxed);
        Readiness {
            readable: buffer.dist(pos, buffer.end()) > 0,
            writable: Self::room_to_write(&clients, &buffer) > 0,
        }
    }
}
