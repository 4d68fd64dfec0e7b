use std::io;

use thiserror::Error;

use rti_shared::transport::TransportError;

/// Failures that stop an RTI or router process from starting or running
#[derive(Debug, Error)]
pub enum RtiServerError {
    #[error("Could not bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Could not spawn thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
}
