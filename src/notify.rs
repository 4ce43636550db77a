//! Wait/notify layer for "no data yet" and "no room yet" suspension.
//!
//! A blocked call and the peer that unblocks it race on two lock domains:
//! the waiter checks its condition under the buffer lock, but sleeps on a
//! condition variable that the peer signals after releasing that lock. The
//! window between the condition check and falling asleep would lose
//! wakeups, so the queue hands out a generation ticket:
//!
//! 10. Waiter: take a ticket
//! 20. Waiter: check the condition (under the channel's own locks)
//! 30. Waiter: sleep until the generation moves past the ticket
//!
//! 40. Peer: mutate state, release the channel locks
//! 50. Peer: bump the generation and broadcast
//!
//! If step 50 lands between 20 and 30, the stale ticket makes step 30
//! return immediately and the waiter re-checks. Spurious wakeups are
//! absorbed the same way: every wakeup returns to the caller's re-check
//! loop rather than assuming the condition now holds.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ChannelError;

/// Broadcast wait queue with lost-wakeup protection via generation tickets.
pub struct WaitQueue {
    generation: Mutex<u64>,
    cond: Condvar,
}

impl WaitQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    /// Take a ticket for the current generation.
    ///
    /// Must be taken before checking the wait condition; see the module
    /// documentation for the ordering argument.
    #[must_use]
    pub fn ticket(&self) -> u64 {
        *self.generation.lock()
    }

    /// Advance the generation and wake every waiter.
    pub fn wake_all(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.cond.notify_all();
    }

    /// Block until the generation moves past `ticket`.
    ///
    /// Returns immediately if a wakeup already happened since the ticket
    /// was taken. The wait is cancellable: when `interrupted` is set (and
    /// the queue woken), the flag is consumed and the call returns
    /// [`ChannelError::Interrupted`] so the blocked caller cannot hang
    /// indefinitely.
    ///
    /// # Errors
    /// Returns `Interrupted` if the wait was cancelled.
    pub fn wait(&self, ticket: u64, interrupted: &AtomicBool) -> Result<(), ChannelError> {
        let mut generation = self.generation.lock();
        while *generation == ticket {
            if interrupted.swap(false, Ordering::SeqCst) {
                return Err(ChannelError::Interrupted);
            }
            self.cond.wait(&mut generation);
        }
        // An interrupt also bumps the generation; catch the flag here so
        // a cancelled waiter does not report a normal wakeup.
        if interrupted.swap(false, Ordering::SeqCst) {
            return Err(ChannelError::Interrupted);
        }
        Ok(())
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
