//! Client handle: one attachment to a channel, with its own read cursor.
//!
//! # Thread Safety
//!
//! - **Thread-safe with other clients**: all clients of a channel share
//!   state through the channel's own locks; any number of them may read
//!   and write concurrently from different threads.
//! - **NOT shareable itself**: `read()` and `write()` take `&mut self`,
//!   so one `Client` is used by one thread at a time — enforced at
//!   compile time by the borrow checker. Move it between threads freely
//!   (`Client` is `Send`), or attach once per thread.
//! - **Interruption crosses threads**: an [`Interrupter`] taken from a
//!   client may be cloned and fired from any thread to cancel that
//!   client's blocked call.

use std::fmt;
use std::sync::Arc;

use crate::channel::{Channel, ClientId, ClientRecord};
use crate::error::ChannelError;
use crate::registry::Registry;

/// Whether read/write suspend the caller or fail with `WouldBlock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Blocking,
    NonBlocking,
}

/// Readiness bits reported by [`Client::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    /// The client has unread data.
    pub readable: bool,
    /// A write would accept at least one byte.
    pub writable: bool,
}

/// One attachment to a channel.
///
/// Created by [`Registry::attach`]; releases its slot on [`detach`] or
/// drop. Detaching the last client of a channel destroys the channel.
///
/// [`detach`]: Client::detach
pub struct Client {
    key: String,
    id: ClientId,
    channel: Arc<Channel>,
    registry: Registry,
    record: Arc<ClientRecord>,
    mode: Mode,
    detached: bool,
}

impl Client {
    pub(crate) fn new(
        key: &str,
        id: ClientId,
        channel: Arc<Channel>,
        registry: Registry,
        record: Arc<ClientRecord>,
        mode: Mode,
    ) -> Self {
        Self {
            key: key.to_string(),
            id,
            channel,
            registry,
            record,
            mode,
            detached: false,
        }
    }

    /// Key of the channel this client is attached to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current blocking mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch between blocking and non-blocking calls, like toggling
    /// `O_NONBLOCK` on an open file.
    pub fn set_nonblocking(&mut self, nonblocking: bool) {
        self.mode = if nonblocking {
            Mode::NonBlocking
        } else {
            Mode::Blocking
        };
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Read bytes written after this client attached, in order, without
    /// gaps or duplication.
    ///
    /// Blocks while the client has no unread data (non-blocking mode
    /// fails with `WouldBlock` instead). Returns the number of bytes
    /// copied, at most `buf.len()`.
    ///
    /// # Errors
    /// `WouldBlock`, `Interrupted`, or `NotFound` after detach.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        if self.detached {
            return Err(ChannelError::NotFound);
        }
        self.channel.read(self.id, &self.record, buf, self.mode)
    }

    /// Write bytes into the channel for every attached client to read.
    ///
    /// Accepts up to the currently available room and returns the number
    /// of bytes taken, which may be less than `data.len()`. Blocks only
    /// while the room is zero (non-blocking mode fails with `WouldBlock`
    /// instead).
    ///
    /// # Errors
    /// `WouldBlock`, `Interrupted`, or `NotFound` after detach.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        if self.detached {
            return Err(ChannelError::NotFound);
        }
        self.channel.write(self.id, &self.record, data, self.mode)
    }

    /// Readiness query for an external event-multiplexing facility.
    ///
    /// # Errors
    /// `NotFound` after detach.
    pub fn poll(&self) -> Result<Readiness, ChannelError> {
        if self.detached {
            return Err(ChannelError::NotFound);
        }
        Ok(self.channel.poll(&self.record))
    }

    /// Detach from the channel, destroying it if this was its last
    /// client. Detaching twice is a logged no-op success.
    ///
    /// # Errors
    /// Infallible today; `Result` keeps the release path uniform with
    /// the other operations.
    pub fn detach(&mut self) -> Result<(), ChannelError> {
        if self.detached {
            log::warn!("client {:?} on {}: detach called twice", self.id, self.key);
            return Ok(());
        }
        self.detached = true;
        self.channel.remove_client(self.id);
        self.registry.maybe_destroy(&self.key);
        Ok(())
    }

    /// Cancellation token for this client's blocking calls.
    ///
    /// Cloneable and independent of the client's lifetime, so another
    /// thread can hold it while this one blocks in `read` or `write`.
    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            record: Arc::clone(&self.record),
            channel: Arc::clone(&self.channel),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Client(key={}, id={:?}, mode={:?}, detached={})",
            self.key, self.id, self.mode, self.detached
        )
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if !self.detached {
            let _ = self.detach();
        }
    }
}

/// Cancels a blocked read or write on one client.
#[derive(Clone)]
pub struct Interrupter {
    record: Arc<ClientRecord>,
    channel: Arc<Channel>,
}

impl Interrupter {
    /// Make the client's blocked call (if any) return `Interrupted`.
    ///
    /// The client's cursor is left unchanged. If no call is blocked, the
    /// next blocking wait on this client is cancelled instead.
    pub fn interrupt(&self) {
        self.record
            .interrupted
            .store(true, std::sync::atomic::Ordering::SeqCst);
        self.channel.data_wq.wake_all();
        self.channel.room_wq.wake_all();
    }
}
