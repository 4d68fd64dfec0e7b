mod message_context;
mod message_sink;
mod outcome;

pub use message_context::MessageContext;
pub use message_sink::{MessageHandler, MessageSink, SinkPlugin};
pub use outcome::Outcome;
