use std::fmt;
use std::io;

use tlsmsg_channel::ChannelErrorKind;
use tlsmsg_io::{AbortReason, IoError};

// Exit codes follow the sysexits-style table used across the CLI.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn message_error(context: &str, err: IoError) -> CliError {
    let code = match &err {
        IoError::InvalidConfig(_) => USAGE,
        IoError::MessageTooLarge { .. } => DATA_INVALID,
        IoError::OutOfMemory { .. } => INTERNAL,
        IoError::Write(channel) => channel_code(channel.kind()),
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Map an aborted read to an exit code.
pub fn abort_error(context: &str, reason: AbortReason) -> CliError {
    let code = match reason {
        AbortReason::FirstMessageTimeout { .. } => TIMEOUT,
        AbortReason::Channel(kind) => channel_code(kind),
        AbortReason::BufferExhausted => INTERNAL,
    };
    CliError::new(code, format!("{context}: {reason}"))
}

fn channel_code(kind: ChannelErrorKind) -> i32 {
    match kind {
        ChannelErrorKind::WantRead | ChannelErrorKind::WantWrite => TIMEOUT,
        ChannelErrorKind::Syscall | ChannelErrorKind::Protocol => TRANSPORT_ERROR,
    }
}
