// Client side of the pipe: opens an existing endpoint for writing.

use crate::error::ShimError;
use log::debug;
use std::io::{self, Write};

/// Opens the outbound end of the announcement pipe.
pub trait Connector {
    type Stream: Write;

    /// Endpoint name used for diagnostics.
    fn endpoint(&self) -> &str;

    /// Open the endpoint. Fails when no listener has created it.
    fn open(&self) -> Result<Self::Stream, ShimError>;
}

#[cfg(windows)]
pub type PipeStream = std::fs::File;

#[cfg(unix)]
pub type PipeStream = std::os::unix::net::UnixStream;

/// Connector for the platform's local pipe primitive.
#[derive(Debug, Clone)]
pub struct NamedPipeConnector {
    endpoint: String,
}

impl NamedPipeConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Connector for NamedPipeConnector {
    type Stream = PipeStream;

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn open(&self) -> Result<PipeStream, ShimError> {
        let stream = open_pipe(&self.endpoint).map_err(|source| {
            ShimError::ConnectionUnavailable {
                endpoint: self.endpoint.clone(),
                source,
            }
        })?;
        debug!("[PIPE] Opened {}", self.endpoint);
        Ok(stream)
    }
}

/// Write-only, open-existing, no sharing.
#[cfg(windows)]
fn open_pipe(endpoint: &str) -> io::Result<PipeStream> {
    use std::os::windows::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .write(true)
        .share_mode(0)
        .open(endpoint)
}

#[cfg(unix)]
fn open_pipe(endpoint: &str) -> io::Result<PipeStream> {
    let stream = std::os::unix::net::UnixStream::connect(endpoint)?;
    stream.shutdown(std::net::Shutdown::Read)?;
    Ok(stream)
}
