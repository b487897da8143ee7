//! The crate's error taxonomy (spec.md §7).

use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The socket closed unexpectedly mid-transfer. Surfaced as an abort;
    /// no retransmission is attempted.
    #[error("channel to {0} closed unexpectedly")]
    ChannelClosed(SocketAddr),

    /// `rot` elapsed without the expected ACK. Recovered locally by a
    /// bounded retransmit; only escalates via `RetransmitExhausted`.
    #[error("timed out waiting for ack after {0}ms")]
    Timeout(u64),

    /// Three transmissions of one segment elapsed without acknowledgment.
    #[error("segment seq={0} exhausted retransmissions")]
    RetransmitExhausted(u16),

    /// Inbound bytes shorter than the 4-byte header, or an unknown
    /// `type` field. Dropped silently by the caller; kept here so tests
    /// and diagnostics can name the condition.
    #[error("malformed segment ({0} bytes)")]
    MalformedSegment(usize),

    /// Wrong argument count or an out-of-range argument value.
    #[error("usage error: {0}")]
    UsageError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid integer argument: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    #[error("invalid float argument: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),
}

pub type Result<T> = std::result::Result<T, Error>;
