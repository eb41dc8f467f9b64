use std::time::Duration;

use crate::error::{IoError, Result};

/// Pause between retry attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(10);

/// Attempts tolerated before the first byte of a message arrives.
pub const MAX_ATTEMPTS_TO_START_READING: u32 = 10;

/// Consecutive "would block" results after a record boundary that end a message.
pub const MAX_ATTEMPTS_TO_STOP_READING: u32 = 3;

/// Logical capacity of a fresh message buffer.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Bytes requested from the channel per raw read.
pub const DEFAULT_CHUNK_SIZE: usize = 160;

/// Default cap on a single message: 16 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for complete-message reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadConfig {
    /// Pause taken before every retry. Default: 10 ms.
    pub backoff: Duration,
    /// Retry ceiling while nothing has been received yet. Default: 10.
    pub first_message_attempts: u32,
    /// Retry ceiling after data has been received. Default: 3.
    pub end_of_message_attempts: u32,
    /// Initial logical buffer capacity in bytes. Default: 1024.
    pub initial_capacity: usize,
    /// Maximum bytes requested per raw read. Default: 160.
    pub chunk_size: usize,
    /// Largest message the buffer may grow to. Default: 16 MiB.
    pub max_message_size: usize,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
            first_message_attempts: MAX_ATTEMPTS_TO_START_READING,
            end_of_message_attempts: MAX_ATTEMPTS_TO_STOP_READING,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ReadConfig {
    /// Reject values that would make a read loop spin forever or never start.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(IoError::InvalidConfig("chunk_size must be non-zero"));
        }
        if self.initial_capacity == 0 {
            return Err(IoError::InvalidConfig("initial_capacity must be non-zero"));
        }
        if self.first_message_attempts == 0 {
            return Err(IoError::InvalidConfig(
                "first_message_attempts must be non-zero",
            ));
        }
        if self.end_of_message_attempts == 0 {
            return Err(IoError::InvalidConfig(
                "end_of_message_attempts must be non-zero",
            ));
        }
        if self.max_message_size < self.initial_capacity {
            return Err(IoError::InvalidConfig(
                "max_message_size must be at least initial_capacity",
            ));
        }
        Ok(())
    }
}
