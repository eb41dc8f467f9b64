use tlsmsg_channel::{ChannelError, ChannelErrorKind};

use crate::message::Message;

/// Errors that can occur while reading or writing complete messages.
///
/// Channel trouble during a read is not an error: it ends the read with an
/// aborted [`ReadOutcome`](crate::ReadOutcome) and whatever bytes arrived.
/// The buffer variants carry the partial message so nothing accumulated is
/// lost.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// The read configuration cannot drive a read loop.
    #[error("invalid read configuration: {0}")]
    InvalidConfig(&'static str),

    /// The allocator refused to grow the message buffer.
    #[error("out of memory growing message buffer to {requested} bytes ({} bytes kept)", .partial.len())]
    OutOfMemory { requested: usize, partial: Message },

    /// The message outgrew the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge {
        size: usize,
        max: usize,
        partial: Message,
    },

    /// The channel failed to accept a full payload.
    #[error("write failed: {0}")]
    Write(#[from] ChannelError),
}

impl IoError {
    /// The channel failure class behind a write error.
    pub fn channel_kind(&self) -> Option<ChannelErrorKind> {
        match self {
            IoError::Write(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Take back the bytes accumulated before a buffer failure.
    pub fn into_partial(self) -> Option<Message> {
        match self {
            IoError::OutOfMemory { partial, .. } | IoError::MessageTooLarge { partial, .. } => {
                Some(partial)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IoError>;
