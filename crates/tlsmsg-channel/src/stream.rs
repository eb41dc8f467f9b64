use std::io::{ErrorKind, Read, Write};

use tracing::{debug, trace};

use crate::error::{ChannelError, ChannelErrorKind, Result};
use crate::traits::SecureChannel;

/// Which primitive produced an I/O error; decides how "would block" maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

/// Adapts any established blocking `Read + Write` stream into a
/// [`SecureChannel`].
///
/// Typical inner types are a `rustls::StreamOwned` after the handshake, or a
/// socket with a read timeout configured so that idle gaps between records
/// surface as "would block".
///
/// Mapping:
/// - `Interrupted` is retried inside the primitive.
/// - `WouldBlock` / `TimedOut` become `WantRead` on reads and `WantWrite` on
///   writes.
/// - `InvalidData` (how TLS stacks report record and alert failures) becomes
///   `Protocol`.
/// - Everything else is `Syscall`.
pub struct IoChannel<T> {
    inner: T,
}

impl<T> IoChannel<T> {
    /// Wrap an already-established stream.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the channel and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> SecureChannel for IoChannel<T> {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => {
                    trace!(bytes = n, "raw read");
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(classify_io_error(err, Direction::Read)),
            }
        }
    }

    fn write_raw(&mut self, payload: &[u8]) -> Result<usize> {
        let mut offset = 0usize;
        while offset < payload.len() {
            match self.inner.write(&payload[offset..]) {
                Ok(0) => {
                    return Err(ChannelError::with_source(
                        ChannelErrorKind::Syscall,
                        std::io::Error::from(ErrorKind::WriteZero),
                    ))
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(classify_io_error(err, Direction::Write)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(classify_io_error(err, Direction::Write)),
            }
        }

        trace!(bytes = offset, "raw write");
        Ok(offset)
    }
}

impl<T> std::fmt::Debug for IoChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoChannel")
            .field("inner", &std::any::type_name::<T>())
            .finish()
    }
}

fn classify_io_error(err: std::io::Error, direction: Direction) -> ChannelError {
    let kind = io_error_kind(&err, direction);
    debug!(%kind, error = %err, ?direction, "classified channel error");
    ChannelError::with_source(kind, err)
}

fn io_error_kind(err: &std::io::Error, direction: Direction) -> ChannelErrorKind {
    #[cfg(feature = "rustls")]
    if wraps_rustls_error(err) {
        return ChannelErrorKind::Protocol;
    }

    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => match direction {
            Direction::Read => ChannelErrorKind::WantRead,
            Direction::Write => ChannelErrorKind::WantWrite,
        },
        ErrorKind::InvalidData => ChannelErrorKind::Protocol,
        _ => ChannelErrorKind::Syscall,
    }
}

#[cfg(feature = "rustls")]
fn wraps_rustls_error(err: &std::io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.downcast_ref::<rustls::Error>().is_some())
}
