//! Complete-message reads and writes over frame-delivering secure channels.
//!
//! A TLS session delivers plaintext one record at a time. A single raw read
//! may return a fragment of the intended message, report "want read" while
//! the next record is still in flight, or return zero bytes for either a
//! closed peer or a finished record. This crate hides that behind two calls:
//! - [`read_full_message`]: read until the message is complete, the peer
//!   closes, or the bounded retry budget runs out
//! - [`write_full_message`]: write a payload in one logical operation
//!
//! Everything is synchronous and blocking. Retry pauses are real sleeps.

pub mod backoff;
pub mod buffer;
pub mod classify;
pub mod config;
pub mod error;
pub mod message;
pub mod reader;
pub mod writer;

pub use backoff::{Backoff, ThreadSleep};
pub use buffer::{BufferError, MessageBuffer};
pub use classify::{
    classify_read_failure, wait_for_first_message, ReadDecision, ReadEvent, RetryState,
    WaitDecision,
};
pub use config::{
    ReadConfig, DEFAULT_BACKOFF, DEFAULT_CHUNK_SIZE, DEFAULT_INITIAL_CAPACITY,
    DEFAULT_MAX_MESSAGE_SIZE, MAX_ATTEMPTS_TO_START_READING, MAX_ATTEMPTS_TO_STOP_READING,
};
pub use error::{IoError, Result};
pub use message::{AbortReason, Message, ReadOutcome};
pub use reader::{read_full_message, read_full_message_with_config, MessageReader, ReadState};
pub use writer::{write_full_message, MessageWriter};

pub use tlsmsg_channel::{ChannelError, ChannelErrorKind, IoChannel, SecureChannel};
