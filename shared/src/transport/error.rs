use std::io;

use thiserror::Error;

use rti_serde::SerdeErr;

/// Errors that can occur while moving frames over a channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The underlying stream failed
    #[error("I/O error ({kind:?}): {message}")]
    Io {
        kind: io::ErrorKind,
        message: String,
    },

    /// The peer did not follow the Welcome/Ready exchange
    #[error("Handshake failed: expected {expected}, received {received}")]
    HandshakeFailed {
        expected: &'static str,
        received: String,
    },

    /// A frame header carried a tag this build does not know
    #[error("Unknown frame kind 0x{tag:08x}")]
    UnknownFrameKind {
        tag: u32,
    },

    /// A frame header announced more bytes than the configured limit
    #[error("Frame of {length} bytes exceeds the limit of {limit} bytes")]
    FrameTooLarge {
        length: usize,
        limit: usize,
    },

    /// A bundle payload ended partway through a sub-frame
    #[error("Malformed bundle: truncated sub-frame at offset {offset}")]
    MalformedBundle {
        offset: usize,
    },

    /// A control frame was too short to hold its request id
    #[error("Control frame of {length} bytes is missing its request id")]
    MissingRequestId {
        length: usize,
    },

    /// Nobody answered a synchronous request in time
    #[error("No response to request {request_id} after {waited_ms}ms")]
    ResponseTimeout {
        request_id: u32,
        waited_ms: u64,
    },

    /// The connection dropped while a caller was waiting on it
    #[error("Channel disconnected")]
    Disconnected,

    /// The channel was closed locally
    #[error("Channel is closed")]
    ChannelClosed,

    /// A payload could not be decoded
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] SerdeErr),
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::Io {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}
