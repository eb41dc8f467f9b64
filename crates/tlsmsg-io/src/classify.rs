//! Retry decisions for failed raw reads.
//!
//! A TLS session hands data over one record at a time. Between records the
//! socket is briefly not readable, so a "want read" after some data has
//! arrived usually means "next record not here yet", and a few of them in a
//! row mean "no more records". Before any data has arrived, longer waits are
//! expected and get their own, larger budget.

use tlsmsg_channel::ChannelErrorKind;
use tracing::{debug, warn};

use crate::backoff::Backoff;
use crate::config::ReadConfig;

/// Retry counters for one read operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Pauses taken while nothing has been received yet.
    pub attempts_before_first_byte: u32,
    /// Consecutive pauses since the last successful read.
    pub attempts_after_frame_boundary: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// New bytes arrived; the post-boundary budget starts over.
    pub fn data_received(&mut self) {
        self.attempts_after_frame_boundary = 0;
    }
}

/// What the last unsuccessful raw read produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEvent {
    /// The primitive returned zero bytes.
    Closed,
    /// The primitive failed with the given class.
    Failed(ChannelErrorKind),
}

/// Classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDecision {
    /// Read again.
    Retry,
    /// The message is complete.
    Complete,
    /// The peer closed before sending anything.
    EndOfConnection,
    /// Stop with an abnormal termination.
    Abort(ChannelErrorKind),
}

/// First-message waiter verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitDecision {
    Retry,
    GiveUp,
}

/// Decide how to continue after a raw read that produced no data.
///
/// | event | result |
/// |---|---|
/// | zero bytes, nothing read yet | `EndOfConnection` |
/// | zero bytes, some data read | `Complete` |
/// | `WantRead` | pause; `Complete` once the post-boundary ceiling is hit, else `Retry` |
/// | `WantWrite`, `Syscall`, `Protocol` | `Abort` |
///
/// The counter is bumped and the pause taken before the ceiling check, so a
/// ceiling of `n` means exactly `n` pauses.
pub fn classify_read_failure<B: Backoff>(
    event: ReadEvent,
    retry: &mut RetryState,
    total_bytes: usize,
    config: &ReadConfig,
    backoff: &mut B,
) -> ReadDecision {
    match event {
        ReadEvent::Closed if total_bytes == 0 => ReadDecision::EndOfConnection,
        ReadEvent::Closed => ReadDecision::Complete,
        ReadEvent::Failed(ChannelErrorKind::WantRead) => {
            retry.attempts_after_frame_boundary += 1;
            backoff.pause(config.backoff);

            if retry.attempts_after_frame_boundary >= config.end_of_message_attempts {
                debug!(
                    attempts = retry.attempts_after_frame_boundary,
                    total_bytes, "no further records, message complete"
                );
                ReadDecision::Complete
            } else {
                ReadDecision::Retry
            }
        }
        ReadEvent::Failed(kind) => {
            warn!(%kind, total_bytes, "error in read, aborting message");
            ReadDecision::Abort(kind)
        }
    }
}

/// Tolerate initial latency before the first byte arrives.
///
/// Each call counts one attempt and pauses once; gives up when the
/// first-message ceiling is reached.
pub fn wait_for_first_message<B: Backoff>(
    retry: &mut RetryState,
    config: &ReadConfig,
    backoff: &mut B,
) -> WaitDecision {
    retry.attempts_before_first_byte += 1;
    backoff.pause(config.backoff);

    if retry.attempts_before_first_byte >= config.first_message_attempts {
        debug!(
            attempts = retry.attempts_before_first_byte,
            "first message never arrived"
        );
        WaitDecision::GiveUp
    } else {
        WaitDecision::Retry
    }
}
