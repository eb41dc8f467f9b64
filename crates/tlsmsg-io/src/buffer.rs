use std::collections::TryReserveError;

use bytes::Bytes;
use tracing::{debug, trace};

/// Errors from growing a [`MessageBuffer`]. The buffer is unchanged on error.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// Growing would exceed the configured maximum.
    #[error("buffer limit exceeded ({required} bytes, max {limit})")]
    LimitExceeded { required: usize, limit: usize },

    /// The requested size does not fit in `usize`.
    #[error("buffer capacity overflow")]
    CapacityOverflow,

    /// The allocator refused the reservation.
    #[error("buffer allocation failed ({requested} bytes): {source}")]
    Alloc {
        requested: usize,
        source: TryReserveError,
    },
}

/// Append-only byte accumulator for one in-flight read.
///
/// Tracks a logical `capacity` that doubles whenever a chunk does not fit in
/// the remaining headroom. The backing storage always has room for
/// `capacity + 1` bytes so the finalized message can carry a trailing `0`.
#[derive(Debug)]
pub struct MessageBuffer {
    storage: Vec<u8>,
    capacity: usize,
    limit: usize,
}

impl MessageBuffer {
    /// Create a buffer with `initial_capacity` logical bytes, never growing
    /// past `limit`.
    pub fn with_capacity(initial_capacity: usize, limit: usize) -> Result<Self, BufferError> {
        let reserve = initial_capacity
            .checked_add(1)
            .ok_or(BufferError::CapacityOverflow)?;
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(reserve)
            .map_err(|source| BufferError::Alloc {
                requested: reserve,
                source,
            })?;

        Ok(Self {
            storage,
            capacity: initial_capacity,
            limit: limit.max(initial_capacity),
        })
    }

    /// Append `chunk` at the logical end, doubling capacity first if needed.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), BufferError> {
        if chunk.len() > self.headroom() {
            self.grow_for(chunk.len())?;
        }
        self.storage.extend_from_slice(chunk);
        trace!(
            appended = chunk.len(),
            total = self.storage.len(),
            "buffered chunk"
        );
        Ok(())
    }

    fn grow_for(&mut self, additional: usize) -> Result<(), BufferError> {
        let required = self
            .len()
            .checked_add(additional)
            .ok_or(BufferError::CapacityOverflow)?;
        if required > self.limit {
            return Err(BufferError::LimitExceeded {
                required,
                limit: self.limit,
            });
        }

        let mut new_capacity = self.capacity.max(1);
        while new_capacity < required {
            new_capacity = new_capacity.saturating_mul(2);
        }
        let new_capacity = new_capacity.min(self.limit);

        let reserve = new_capacity
            .checked_add(1)
            .ok_or(BufferError::CapacityOverflow)?;
        self.storage
            .try_reserve_exact(reserve - self.storage.len())
            .map_err(|source| BufferError::Alloc {
                requested: reserve,
                source,
            })?;

        debug!(
            from = self.capacity,
            to = new_capacity,
            "grew message buffer"
        );
        self.capacity = new_capacity;
        Ok(())
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Current logical capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that can be appended without growing.
    pub fn headroom(&self) -> usize {
        self.capacity - self.storage.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.storage
    }

    /// Shrink to exactly `len + 1` bytes and write the trailing `0`.
    ///
    /// If the exact-size allocation cannot be made, the oversized storage is
    /// kept as is. Data is never dropped.
    pub fn finalize(self) -> Bytes {
        let len = self.storage.len();
        let mut exact = Vec::new();
        let exact = match exact.try_reserve_exact(len + 1) {
            Ok(()) => Some(exact),
            Err(err) => {
                debug!(len, error = %err, "shrink failed, keeping oversized buffer");
                None
            }
        };
        self.finish(exact)
    }

    fn finish(mut self, exact: Option<Vec<u8>>) -> Bytes {
        match exact {
            Some(mut exact) if self.storage.capacity() > self.storage.len() + 1 => {
                exact.extend_from_slice(&self.storage);
                exact.push(0);
                Bytes::from(exact)
            }
            _ => {
                // Storage always has room for the sentinel.
                self.storage.push(0);
                Bytes::from(self.storage)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_within_headroom_keeps_capacity() {
        let mut buf = MessageBuffer::with_capacity(16, usize::MAX).unwrap();
        buf.append(b"hello").unwrap();
        buf.append(b" world").unwrap();

        assert_eq!(buf.as_slice(), b"hello world");
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.headroom(), 5);
    }

    #[test]
    fn overflow_doubles_capacity() {
        let mut buf = MessageBuffer::with_capacity(8, usize::MAX).unwrap();
        buf.append(b"12345678").unwrap();
        assert_eq!(buf.capacity(), 8);

        buf.append(b"9").unwrap();
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.as_slice(), b"123456789");
    }

    #[test]
    fn large_chunk_doubles_until_it_fits() {
        let mut buf = MessageBuffer::with_capacity(4, usize::MAX).unwrap();
        buf.append(&[7u8; 3]).unwrap();
        buf.append(&[9u8; 30]).unwrap();

        assert_eq!(buf.capacity(), 64);
        assert!(buf.capacity() >= buf.len());
        assert_eq!(&buf.as_slice()[..3], &[7u8; 3]);
        assert_eq!(&buf.as_slice()[3..], &[9u8; 30][..]);
    }

    #[test]
    fn many_growth_events_preserve_bytes() {
        let mut buf = MessageBuffer::with_capacity(1, usize::MAX).unwrap();
        let mut expected = Vec::new();
        for i in 0..500u32 {
            let chunk: Vec<u8> = (0..(i % 13 + 1)).map(|b| (b + i) as u8).collect();
            let before = buf.len();
            buf.append(&chunk).unwrap();
            expected.extend_from_slice(&chunk);
            assert!(buf.capacity() >= before + chunk.len());
        }
        assert_eq!(buf.as_slice(), expected.as_slice());
    }

    #[test]
    fn limit_exceeded_leaves_buffer_unchanged() {
        let mut buf = MessageBuffer::with_capacity(4, 8).unwrap();
        buf.append(b"abcd").unwrap();

        let err = buf.append(b"efghi").unwrap_err();
        assert!(matches!(
            err,
            BufferError::LimitExceeded {
                required: 9,
                limit: 8
            }
        ));
        assert_eq!(buf.as_slice(), b"abcd");
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn growth_is_clamped_to_limit() {
        let mut buf = MessageBuffer::with_capacity(4, 6).unwrap();
        buf.append(b"abcdef").unwrap();
        assert_eq!(buf.capacity(), 6);
        assert_eq!(buf.headroom(), 0);
    }

    #[test]
    fn impossible_reservation_reports_alloc_error() {
        let err = MessageBuffer::with_capacity(isize::MAX as usize, usize::MAX).unwrap_err();
        assert!(matches!(err, BufferError::Alloc { .. }));

        let err = MessageBuffer::with_capacity(usize::MAX, usize::MAX).unwrap_err();
        assert!(matches!(err, BufferError::CapacityOverflow));
    }

    #[test]
    fn finalize_is_exact_with_sentinel() {
        let mut buf = MessageBuffer::with_capacity(1024, usize::MAX).unwrap();
        buf.append(b"payload").unwrap();

        let bytes = buf.finalize();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..7], b"payload");
        assert_eq!(bytes[7], 0);
    }

    #[test]
    fn finalize_empty_buffer_is_just_sentinel() {
        let buf = MessageBuffer::with_capacity(16, usize::MAX).unwrap();
        let bytes = buf.finalize();
        assert_eq!(bytes.as_ref(), &[0u8]);
    }

    #[test]
    fn failed_shrink_keeps_oversized_storage() {
        let mut buf = MessageBuffer::with_capacity(1024, usize::MAX).unwrap();
        buf.append(b"keep me").unwrap();

        let bytes = buf.finish(None);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..7], b"keep me");
        assert_eq!(bytes[7], 0);
    }
}
