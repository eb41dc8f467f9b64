use bytes::Bytes;
use tlsmsg_channel::ChannelErrorKind;

/// Why a read ended before the message was known to be complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Nothing arrived within the first-message retry budget.
    FirstMessageTimeout { attempts: u32 },
    /// The channel reported a failure that is not retried during reads.
    Channel(ChannelErrorKind),
    /// The message buffer could not grow any further.
    BufferExhausted,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::FirstMessageTimeout { attempts } => {
                write!(f, "no data after {attempts} attempts")
            }
            AbortReason::Channel(kind) => write!(f, "channel {kind} error"),
            AbortReason::BufferExhausted => f.write_str("message buffer exhausted"),
        }
    }
}

/// How a read operation terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The message ended normally (zero-byte read or quiet record boundary).
    Complete,
    /// The read stopped abnormally. Bytes received so far are still returned.
    Aborted(AbortReason),
}

impl ReadOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, ReadOutcome::Complete)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, ReadOutcome::Aborted(_))
    }
}

/// A finalized message handed to the caller.
///
/// The backing storage holds the payload followed by a single `0` byte, so
/// text protocols can treat it as a terminated string without copying.
#[derive(Debug, Clone)]
pub struct Message {
    storage: Bytes,
    len: usize,
    end_of_connection: bool,
    outcome: ReadOutcome,
}

impl Message {
    /// Build a message from sentinel-terminated storage.
    pub(crate) fn from_terminated(
        storage: Bytes,
        end_of_connection: bool,
        outcome: ReadOutcome,
    ) -> Self {
        debug_assert_eq!(storage.last(), Some(&0));
        let len = storage.len().saturating_sub(1);
        Self {
            storage,
            len,
            end_of_connection,
            outcome,
        }
    }

    /// The payload bytes, without the trailing sentinel.
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    /// The payload followed by the trailing `0`.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.storage[..]
    }

    /// The payload as UTF-8 text, if it is valid.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    /// A cheap reference-counted handle to the payload.
    pub fn payload(&self) -> Bytes {
        self.storage.slice(..self.len)
    }

    pub fn into_payload(self) -> Bytes {
        self.storage.slice(..self.len)
    }

    /// Total bytes read.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The peer closed the channel before anything was received.
    pub fn end_of_connection(&self) -> bool {
        self.end_of_connection
    }

    pub fn outcome(&self) -> ReadOutcome {
        self.outcome
    }
}
