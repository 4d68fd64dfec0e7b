use std::{default::Default, time::Duration};

/// Largest bundle accumulated before a flush is forced, in bytes
pub const DEFAULT_BUNDLE_MAX_SIZE: usize = 64_000;

/// Longest a message may sit in the bundler before it is sent
pub const DEFAULT_BUNDLE_MAX_TIME: Duration = Duration::from_millis(20);

/// Contains Config properties which will be used by a channel
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Whether small messages are coalesced into bundles. When off, every
    /// message is written as soon as it is submitted.
    pub bundling: bool,
    /// Buffered size at which the bundler flushes without waiting for its
    /// timer
    pub bundle_max_size: usize,
    /// Maximum time a message is held back waiting for company
    pub bundle_max_time: Duration,
    /// How long a synchronous control request waits for its response before
    /// the attempt is abandoned
    pub response_timeout: Duration,
    /// Bound on establishing the stream and completing the handshake
    pub connect_timeout: Duration,
    /// Bound on waiting for the receiver and sender threads at teardown
    pub join_timeout: Duration,
    /// Frames announcing more than this many bytes are treated as corrupt
    pub max_frame_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            bundling: true,
            bundle_max_size: DEFAULT_BUNDLE_MAX_SIZE,
            bundle_max_time: DEFAULT_BUNDLE_MAX_TIME,
            response_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(2),
            max_frame_size: 16 * 1024 * 1024,
        }
    }
}
