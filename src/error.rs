//! Error taxonomy for channel operations.

use std::fmt;

/// Errors returned by attach, read, write and poll operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// A non-blocking call could not proceed immediately. Not a failure;
    /// the caller should retry later (or after a poll reports readiness).
    WouldBlock,
    /// A blocking call was asked to abandon its wait via an
    /// [`Interrupter`](crate::client::Interrupter). The client's cursor is
    /// unchanged; the caller may retry.
    Interrupted,
    /// The operation used a handle that was already detached.
    NotFound,
    /// A channel or client could not be allocated (e.g. the per-channel
    /// client limit was reached). The registry is left as if the attach
    /// never happened.
    ResourceExhausted,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WouldBlock => write!(f, "operation would block"),
            Self::Interrupted => write!(f, "blocking operation was interrupted"),
            Self::NotFound => write!(f, "client is already detached"),
            Self::ResourceExhausted => write!(f, "channel or client allocation failed"),
        }
    }
}

impl std::error::Error for ChannelError {}
