//! Complete-message I/O over record-framed secure channels.
//!
//! tlsmsg turns the fragmenting, sometimes-would-block record reads of an
//! established TLS session into whole messages, and writes whole payloads
//! back.
//!
//! # Crate Structure
//!
//! - [`channel`] — The secure-channel seam (raw primitives, error classes)
//! - [`io`] — Message reader and writer with bounded retry/backoff
//!
//! The most common entry points are re-exported at the root.

/// Re-export channel types.
pub mod channel {
    pub use tlsmsg_channel::*;
}

/// Re-export message I/O types.
pub mod io {
    pub use tlsmsg_io::*;
}

pub use tlsmsg_channel::{ChannelError, ChannelErrorKind, IoChannel, SecureChannel};
pub use tlsmsg_io::{
    read_full_message, read_full_message_with_config, write_full_message, IoError, Message,
    MessageReader, MessageWriter, ReadConfig, ReadOutcome,
};
