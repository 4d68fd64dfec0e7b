mod bundler;
mod channel;
mod config;
mod correlator;
mod error;
mod frame;

pub use bundler::{Bundler, BundlerMetrics};
pub use channel::{Channel, ChannelListener};
pub use config::{ConnectionConfig, DEFAULT_BUNDLE_MAX_SIZE, DEFAULT_BUNDLE_MAX_TIME};
pub use correlator::ResponseCorrelator;
pub use error::TransportError;
pub use frame::{pack_bundle, read_frame, unpack_bundle, write_frame, Frame, FrameKind, FRAME_HEADER_LENGTH};
