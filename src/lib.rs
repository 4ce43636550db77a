//! Multi-reader broadcast byte channel.
//!
//! One logical stream of bytes, written by any number of producers, is
//! delivered independently and in full to every attached consumer. Each
//! consumer reads at its own pace from a fixed-size ring buffer; the
//! writer may never overwrite bytes some consumer has not read yet, so
//! producers stall (or report `WouldBlock`) instead of dropping data. The
//! channel is exactly as fast as its slowest live subscriber.
//!
//! Channels are purely in-memory and ephemeral: they are created on the
//! first attach to a key and destroyed when the last client detaches.
//!
//! ```
//! use bytepipe::{Mode, Registry};
//!
//! let registry = Registry::new();
//! let mut alice = registry.attach("room", Mode::NonBlocking).unwrap();
//! let mut bob = registry.attach("room", Mode::NonBlocking).unwrap();
//!
//! alice.write(b"hello").unwrap();
//!
//! let mut buf = [0u8; 16];
//! let n = bob.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello");
//! ```

pub mod channel;
pub mod client;
pub mod error;
pub mod notify;
pub mod registry;
pub mod ring;

// Re-export channel types for convenience
pub use channel::{Channel, ClientId};

// Re-export the client handle types for convenience
pub use client::{Client, Interrupter, Mode, Readiness};

// Re-export the error taxonomy
pub use error::ChannelError;

// Re-export the wait layer
pub use notify::WaitQueue;

// Re-export registry types for convenience
pub use registry::{Config, Registry, DEFAULT_CAPACITY};

// Re-export the ring buffer
pub use ring::RingBuffer;
