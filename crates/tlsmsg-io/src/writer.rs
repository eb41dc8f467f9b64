use std::io;

use tlsmsg_channel::{ChannelError, ChannelErrorKind, SecureChannel};
use tracing::{trace, warn};

use crate::error::{IoError, Result};

/// Writes complete messages to a [`SecureChannel`].
///
/// Each payload goes out in a single raw write. Failures are reported, never
/// retried: backoff is a read-side concern only.
pub struct MessageWriter<C> {
    inner: C,
}

impl<C: SecureChannel> MessageWriter<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// Write the whole payload (blocking) and return the bytes written.
    pub fn write_message(&mut self, payload: &[u8]) -> Result<usize> {
        if payload.is_empty() {
            return Ok(0);
        }

        match self.inner.write_raw(payload) {
            Ok(0) => {
                warn!(bytes = payload.len(), "channel wrote nothing for non-empty payload");
                Err(IoError::Write(ChannelError::with_source(
                    ChannelErrorKind::Syscall,
                    io::ErrorKind::WriteZero.into(),
                )))
            }
            Ok(written) => {
                trace!(bytes = written, "message written");
                Ok(written)
            }
            Err(err) => {
                if err.kind().is_would_block() {
                    warn!(kind = %err.kind(), "write would block, not retrying");
                } else {
                    warn!(error = %err, "error within the secure channel during write");
                }
                Err(IoError::Write(err))
            }
        }
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the writer and return the inner channel.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

/// Write one complete message to `channel`.
pub fn write_full_message<C: SecureChannel + ?Sized>(
    channel: &mut C,
    payload: &[u8],
) -> Result<usize> {
    MessageWriter::new(channel).write_message(payload)
}
