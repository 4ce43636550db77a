//! Registry: process-wide mapping from channel key to channel.
//!
//! Channels are created lazily on first attach and destroyed when their
//! last client detaches. The registry lock is the outermost of the three
//! lock domains; it is held across get-or-create plus client insertion so
//! no two channels can ever coexist for one key, and across the
//! empty-check plus removal on destroy so a racing attach either finds
//! the old channel still populated or creates a fresh one.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::channel::Channel;
use crate::client::{Client, Mode};
use crate::error::ChannelError;

/// Default ring capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 2048;

/// Per-registry channel configuration.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Ring buffer capacity for every channel created by this registry.
    /// One byte is reserved for the full/empty gap, so the usable window
    /// is `capacity - 1`.
    pub capacity: usize,
    /// Maximum attached clients per channel; `None` means unlimited.
    pub max_clients: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_clients: None,
        }
    }
}

struct RegistryInner {
    channels: Mutex<HashMap<String, Arc<Channel>>>,
    config: Config,
}

/// Shared handle to the channel registry.
///
/// Clones share the same underlying map; every [`Client`] keeps one so
/// that detach can run the destroy check.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Create a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                channels: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Attach to the channel named `key`, creating it on first attach.
    ///
    /// The returned client's cursor starts at the channel's current
    /// write cursor: it observes exactly the bytes written after this
    /// call, never history.
    ///
    /// # Errors
    /// `ResourceExhausted` if the channel's client limit is reached; a
    /// channel created by this very call is rolled back, leaving the
    /// registry as if the attach never happened.
    pub fn attach(&self, key: &str, mode: Mode) -> Result<Client, ChannelError> {
        let mut channels = self.inner.channels.lock();
        let (channel, created) = match channels.get(key) {
            Some(channel) => (Arc::clone(channel), false),
            None => {
                log::debug!("registry: creating channel for key {key}");
                let channel = Arc::new(Channel::new(
                    key,
                    self.inner.config.capacity,
                    self.inner.config.max_clients,
                ));
                channels.insert(key.to_string(), Arc::clone(&channel));
                (channel, true)
            }
        };

        match channel.new_client() {
            Ok((id, record)) => {
                drop(channels);
                Ok(Client::new(key, id, channel, self.clone(), record, mode))
            }
            Err(err) => {
                if created {
                    // Nobody else can have attached: the registry lock is
                    // still held. Roll the creation back.
                    channels.remove(key);
                }
                Err(err)
            }
        }
    }

    /// Destroy the channel for `key` if its client set is empty.
    ///
    /// Called after every detach that could have emptied the set. The
    /// emptiness check and the removal happen under the registry lock,
    /// atomically with respect to any attach racing to reuse the key.
    pub(crate) fn maybe_destroy(&self, key: &str) {
        let mut channels = self.inner.channels.lock();
        let destroy = channels.get(key).is_some_and(|ch| !ch.has_clients());
        if destroy {
            channels.remove(key);
            log::debug!("registry: destroyed channel for key {key}");
        } else {
            log::debug!("registry: keeping channel for key {key}");
        }
    }

    /// Number of live channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.channels.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.channels.lock().is_empty()
    }

    /// Whether a channel currently exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.channels.lock().contains_key(key)
    }

    /// Log every key still present and return how many there were.
    ///
    /// Intended for process shutdown: a surviving key means clients that
    /// never detached. That is a reportable anomaly, not a fatal one.
    pub fn report_leaks(&self) -> usize {
        let channels = self.inner.channels.lock();
        for (key, channel) in channels.iter() {
            log::warn!(
                "registry: key {} still has {} attached client(s) at shutdown",
                key,
                channel.client_count()
            );
        }
        channels.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
