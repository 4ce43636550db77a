//! Fixed-capacity circular byte store with a single write cursor.
//!
//! The ring performs no flow control of its own: it trusts the caller to
//! pass a `room` / `limit` bound computed from the client cursors, and only
//! clamps copies against that bound. Cursor bookkeeping and the writable
//! room computation live in [`crate::channel`].

/// Circular byte buffer with one advancing write cursor.
///
/// Positions are indices in `[0, capacity)`. The distance convention is
/// `dist(a, a) == 0`, so the write cursor may never catch up to the least
/// advanced read cursor from behind: a full buffer keeps a one-byte gap,
/// otherwise "full" and "empty" would be indistinguishable.
pub struct RingBuffer {
    storage: Box<[u8]>,
    end: usize,
}

impl RingBuffer {
    /// Create a ring with the given capacity.
    ///
    /// # Panics
    /// Panics if `capacity < 2`. One byte of capacity is permanently
    /// reserved for the full/empty gap, so anything smaller can never
    /// hold data.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring capacity must be at least 2");
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            end: 0,
        }
    }

    /// Total capacity in bytes (one of which is the reserved gap).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Current write cursor position.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Circular forward distance from `a` to `b`.
    ///
    /// `dist(a, a) == 0`: a cursor equal to the write position has no
    /// unread data.
    #[must_use]
    pub fn dist(&self, a: usize, b: usize) -> usize {
        if a <= b {
            b - a
        } else {
            self.capacity() + b - a
        }
    }

    /// Append up to `room` bytes from `data` at the write cursor.
    ///
    /// Copies `min(data.len(), room)` bytes, advancing the write cursor
    /// circularly by the amount copied, and returns that amount. The
    /// caller is responsible for `room` not overlapping any unread
    /// client window.
    pub fn append(&mut self, data: &[u8], room: usize) -> usize {
        let n = data.len().min(room);
        let first = n.min(self.capacity() - self.end);
        self.storage[self.end..self.end + first].copy_from_slice(&data[..first]);
        self.storage[..n - first].copy_from_slice(&data[first..n]);
        self.end = (self.end + n) % self.capacity();
        n
    }

    /// Copy up to `limit` bytes starting at `cursor` into `buf`.
    ///
    /// Copies `min(buf.len(), limit)` bytes and returns the amount
    /// copied. Does not mutate the write cursor; advancing `cursor` is
    /// the caller's job. The caller is responsible for `limit` not
    /// exceeding the unread distance from `cursor` to the write cursor.
    pub fn read_at(&self, cursor: usize, buf: &mut [u8], limit: usize) -> usize {
        let n = buf.len().min(limit);
        let first = n.min(self.capacity() - cursor);
        buf[..first].copy_from_slice(&self.storage[cursor..cursor + first]);
        buf[first..n].copy_from_slice(&self.storage[..n - first]);
        n
    }
}
