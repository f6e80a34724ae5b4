//! Request/reply engine.
//!
//! The wire protocol has no request identifier, so a reply can only be tied
//! to its request by making sure there is never more than one request in
//! flight on a socket. [`RequestEngine`] owns the channel behind a mutex and
//! holds the lock for the whole send-then-receive of one command.
//!
//! Datagrams left over from an earlier exchange are discarded before each
//! request goes out, so a late reply can't be taken for the answer to a
//! newer request.
//!
//! A command is sent exactly once. The engine then waits for the reply up to
//! [`MAX_ATTEMPTS`] times, each wait bounded by the channel timeout. Only
//! timeouts are retried; any other failure ends the exchange at once.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::command::Command;
use crate::error::{EtherIoError, Result};
use crate::transport::Channel;

/// Receive attempts per command before giving up with a timeout.
pub const MAX_ATTEMPTS: usize = 3;

/// Sends `request` once and waits for a reply of `reply_len` bytes.
///
/// # Errors
///
/// Returns `EtherIoError::Timeout` after [`MAX_ATTEMPTS`] consecutive
/// timeouts. Send failures, a pending cancellation and non-timeout receive
/// failures are returned without retrying.
pub fn exchange<C: Channel + ?Sized>(
    channel: &C,
    request: &[u8],
    reply_len: usize,
) -> Result<Vec<u8>> {
    channel.discard_pending()?;
    channel.send(request)?;

    for attempt in 1..=MAX_ATTEMPTS {
        match channel.receive(reply_len) {
            Ok(reply) => return Ok(reply),
            Err(EtherIoError::Timeout) => {
                debug!(
                    "no reply to {:02X?} (attempt {}/{})",
                    request, attempt, MAX_ATTEMPTS
                );
            }
            Err(e) => return Err(e),
        }
    }

    Err(EtherIoError::Timeout)
}

/// Serializes commands on one channel.
#[derive(Debug)]
pub struct RequestEngine<C> {
    channel: Mutex<C>,
}

impl<C: Channel> RequestEngine<C> {
    /// Wraps `channel`.
    pub fn new(channel: C) -> Self {
        Self {
            channel: Mutex::new(channel),
        }
    }

    /// Sends `command` and, if the operation has a reply, waits for it.
    ///
    /// Fire-and-forget commands return an empty vector as soon as the
    /// datagram is handed to the socket.
    pub fn execute(&self, command: &Command) -> Result<Vec<u8>> {
        let channel = self.lock();
        match command.reply_len() {
            Some(len) => exchange(&*channel, command.as_bytes(), len),
            None => {
                channel.discard_pending()?;
                channel.send(command.as_bytes())?;
                Ok(Vec::new())
            }
        }
    }

    /// Runs `f` with exclusive access to the channel.
    pub fn with_channel<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, C> {
        // A panic mid-exchange leaves the socket itself usable.
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
