use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShimError {
    #[error("Announcement text is null")]
    NullInput,
    #[error("Pipe {endpoint} unavailable: {source}")]
    ConnectionUnavailable {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("No pipe connection")]
    NotConnected,
    #[error("Pipe write failed: {0}")]
    WriteFailure(#[source] io::Error),
    #[error("Listener IO error: {0}")]
    Listener(#[from] io::Error),
}
