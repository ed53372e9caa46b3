// Pipe transport: the announcer's client side and a diagnostic listener.

pub mod client;
pub mod listener;

pub use client::{Connector, NamedPipeConnector, PipeStream};
pub use listener::{read_session, serve, SessionEnd};

/// Named pipe path the listener creates and the shim opens.
#[cfg(windows)]
pub const PIPE_NAME: &str = r"\\.\pipe\d4lf";

/// Unix domain socket standing in for the named pipe on development hosts.
#[cfg(not(windows))]
pub const PIPE_NAME: &str = "/tmp/d4lf.sock";
