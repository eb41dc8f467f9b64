//! Blocking secure-channel abstraction.
//!
//! This is the lowest layer of tlsmsg. It describes the only things the
//! message layer needs from an already-established TLS session:
//! - a raw record read that may return a fragment, zero bytes, or an error
//! - a raw full-payload write
//! - a classification of the last failure ([`ChannelErrorKind`])
//!
//! Establishing the session (handshake, certificates, cipher negotiation)
//! is the caller's job. [`IoChannel`] adapts any established blocking
//! `Read + Write` stream, such as a `rustls::StreamOwned`.

pub mod error;
pub mod stream;
pub mod traits;

pub use error::{ChannelError, ChannelErrorKind, Result};
pub use stream::IoChannel;
pub use traits::SecureChannel;
