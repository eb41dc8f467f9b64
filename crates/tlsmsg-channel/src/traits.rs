use crate::error::Result;

/// An established, authenticated secure channel.
///
/// The handshake, certificate validation and socket ownership all live
/// outside this trait; implementors only expose the two blocking record
/// primitives. Error introspection is carried by the returned
/// [`ChannelError`](crate::ChannelError) itself.
///
/// Implementations are not expected to be internally synchronized. Exactly
/// one read or write may be in flight on a given channel at a time, which
/// `&mut self` enforces.
pub trait SecureChannel {
    /// Read at most `buf.len()` decrypted bytes.
    ///
    /// `Ok(0)` means the primitive returned zero bytes: either the peer
    /// closed the channel or the current record ended with nothing more to
    /// deliver. `Ok(n)` with `n > 0` is data.
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write the whole payload as one logical operation.
    ///
    /// Returns the number of bytes written on success. A primitive that
    /// manages to write nothing reports an error rather than `Ok(0)`.
    fn write_raw(&mut self, payload: &[u8]) -> Result<usize>;
}

impl<C: SecureChannel + ?Sized> SecureChannel for &mut C {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_raw(buf)
    }

    fn write_raw(&mut self, payload: &[u8]) -> Result<usize> {
        (**self).write_raw(payload)
    }
}
