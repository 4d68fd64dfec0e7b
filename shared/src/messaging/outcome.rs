use crate::error::RtiError;

/// Result of one handler step in a [`MessageSink`](crate::messaging::MessageSink)
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Pass the message on to the next handler
    Continue,
    /// Stop here without error. Remaining handlers do not run.
    Veto,
    /// Stop here and report the failure to the caller
    Error(RtiError),
}

impl From<Result<(), RtiError>> for Outcome {
    fn from(result: Result<(), RtiError>) -> Self {
        match result {
            Ok(()) => Outcome::Continue,
            Err(error) => Outcome::Error(error),
        }
    }
}
