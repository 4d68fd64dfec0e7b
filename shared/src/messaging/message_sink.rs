use std::collections::HashMap;

use log::{debug, warn};

use crate::{
    error::RtiError,
    messages::{MessageType, Response},
    messaging::{MessageContext, Outcome},
};

/// One step in a handler chain, run against state of type `S`
pub trait MessageHandler<S>: Send + Sync {
    fn process(&self, state: &mut S, context: &mut MessageContext) -> Outcome;
}

impl<S, F> MessageHandler<S> for F
where
    F: Fn(&mut S, &mut MessageContext) -> Outcome + Send + Sync,
{
    fn process(&self, state: &mut S, context: &mut MessageContext) -> Outcome {
        self(state, context)
    }
}

/// A group of handlers registered together, one per service area
pub trait SinkPlugin<S> {
    fn build(&self, sink: &mut MessageSink<S>);
}

struct NamedHandler<S> {
    name: &'static str,
    handler: Box<dyn MessageHandler<S>>,
}

/// Routes a message to the ordered list of handlers registered for its
/// type. The table is built once, up front, and locked before use.
pub struct MessageSink<S> {
    name: &'static str,
    handlers: HashMap<MessageType, Vec<NamedHandler<S>>>,
    locked: bool,
}

impl<S> MessageSink<S> {
    pub fn builder(name: &'static str) -> Self {
        Self {
            name,
            handlers: HashMap::new(),
            locked: false,
        }
    }

    pub fn add_plugin<P: SinkPlugin<S>>(&mut self, plugin: P) -> &mut Self {
        self.check_lock();
        plugin.build(self);
        self
    }

    /// Appends a handler to the chain for `message_type`
    pub fn add_handler<H: MessageHandler<S> + 'static>(
        &mut self,
        message_type: MessageType,
        name: &'static str,
        handler: H,
    ) -> &mut Self {
        self.check_lock();
        self.handlers
            .entry(message_type)
            .or_default()
            .push(NamedHandler {
                name,
                handler: Box::new(handler),
            });
        self
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn check_lock(&self) {
        if self.locked {
            panic!("Sink {} already locked!", self.name);
        }
    }

    pub fn has_handlers(&self, message_type: MessageType) -> bool {
        self.handlers
            .get(&message_type)
            .is_some_and(|chain| !chain.is_empty())
    }

    pub fn handler_names(&self, message_type: MessageType) -> Vec<&'static str> {
        self.handlers
            .get(&message_type)
            .map(|chain| chain.iter().map(|named| named.name).collect())
            .unwrap_or_default()
    }

    /// Runs the chain for the context's message.
    ///
    /// Returns `Ok(true)` if every handler let the message through,
    /// `Ok(false)` if one vetoed it, and the error if one failed. A failure
    /// is also recorded as the context's response.
    pub fn process(&self, state: &mut S, context: &mut MessageContext) -> Result<bool, RtiError> {
        let message_type = context.request().message_type();
        let Some(chain) = self.handlers.get(&message_type) else {
            let error = RtiError::internal(format!(
                "Sink {}: no handler registered for {:?}",
                self.name, message_type
            ));
            context.error(error.clone());
            return Err(error);
        };

        for named in chain {
            match named.handler.process(state, context) {
                Outcome::Continue => continue,
                Outcome::Veto => {
                    debug!("Sink {}: {:?} vetoed by {}", self.name, message_type, named.name);
                    return Ok(false);
                }
                Outcome::Error(error) => {
                    debug!(
                        "Sink {}: {:?} failed in {}: {}",
                        self.name, message_type, named.name, error
                    );
                    context.error(error.clone());
                    return Err(error);
                }
            }
        }
        Ok(true)
    }

    /// Processes a message that arrived unsolicited off the network. Nothing
    /// waits on the result, so failures are logged and dropped.
    pub fn process_quietly(&self, state: &mut S, context: &mut MessageContext) -> bool {
        if !self.has_handlers(context.request().message_type()) {
            debug!(
                "Sink {}: ignoring {:?}, nothing registered",
                self.name,
                context.request().message_type()
            );
            return false;
        }
        match self.process(state, context) {
            Ok(passed) => passed,
            Err(error) => {
                warn!(
                    "Sink {}: error processing {:?} from {}: {}",
                    self.name,
                    context.request().message_type(),
                    context.request().source,
                    error
                );
                false
            }
        }
    }

    /// Processes a request and produces the response to send back. A chain
    /// that finishes without setting one counts as success.
    pub fn process_request(&self, state: &mut S, context: &mut MessageContext) -> Response {
        let _ = self.process(state, context);
        context.take_response().unwrap_or_else(Response::success)
    }
}
