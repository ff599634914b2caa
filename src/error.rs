use bytes::Bytes;
use std::io;
use std::time::Duration;

/// Errors produced while pulling frames off a logger connection.
///
/// Both variants that are not `Io` end the session: the protocol has no
/// resynchronization marker, so nothing after a bad frame can be trusted.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream ended after a header was seen but before the frame was complete.
    #[error("stream closed mid-frame: have {have} bytes, need {need}")]
    ShortRead { have: usize, need: usize },

    /// Start marker, end marker, length or checksum did not check out.
    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String, raw: Bytes },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    pub fn invalid(reason: impl Into<String>, raw: &[u8]) -> Self {
        Self::InvalidFrame {
            reason: reason.into(),
            raw: Bytes::copy_from_slice(raw),
        }
    }
}

/// Reasons a request could not be relayed to the vendor collector.
///
/// None of these reach the logger; the session answers locally instead.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("connection to {address} failed: {source}")]
    Connect { address: String, source: io::Error },

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("upstream closed the connection without replying")]
    Empty,
}
