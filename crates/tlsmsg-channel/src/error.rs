use std::fmt;

/// Failure classes reported by a secure channel's raw primitives.
///
/// These mirror what a TLS library exposes after a failed record read or
/// write: the operation either wants to be retried once the socket is
/// readable/writable, or it failed at the OS or protocol level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelErrorKind {
    /// The operation cannot complete until more data is readable.
    WantRead,
    /// The operation cannot complete until the socket is writable.
    WantWrite,
    /// The underlying OS call failed (includes unexpected EOF).
    Syscall,
    /// The TLS layer rejected the data (bad record, alert, decrypt failure).
    Protocol,
}

impl ChannelErrorKind {
    /// Whether this class is a "would block" condition.
    pub fn is_would_block(self) -> bool {
        matches!(self, ChannelErrorKind::WantRead | ChannelErrorKind::WantWrite)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelErrorKind::WantRead => "want-read",
            ChannelErrorKind::WantWrite => "want-write",
            ChannelErrorKind::Syscall => "syscall",
            ChannelErrorKind::Protocol => "protocol",
        }
    }
}

impl fmt::Display for ChannelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure from a raw channel primitive.
#[derive(Debug, thiserror::Error)]
#[error("channel {kind} error{}", source_suffix(.source))]
pub struct ChannelError {
    kind: ChannelErrorKind,
    #[source]
    source: Option<std::io::Error>,
}

fn source_suffix(source: &Option<std::io::Error>) -> String {
    match source {
        Some(err) => format!(": {err}"),
        None => String::new(),
    }
}

impl ChannelError {
    /// Create an error of the given class with no underlying cause.
    pub fn new(kind: ChannelErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create an error of the given class wrapping an I/O cause.
    pub fn with_source(kind: ChannelErrorKind, source: std::io::Error) -> Self {
        Self {
            kind,
            source: Some(source),
        }
    }

    /// Error introspection: which class of failure the last operation hit.
    pub fn kind(&self) -> ChannelErrorKind {
        self.kind
    }

    /// Borrow the underlying I/O error, if any.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        self.source.as_ref()
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
