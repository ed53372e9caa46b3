// Diagnostic listener built on Tokio pipes: creates the endpoint the shim
// opens and hands every announcement it reads to a callback.

use crate::error::ShimError;
use crate::DISCONNECTED_SENTINEL;
use log::{debug, info, warn};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read buffer and pipe in-buffer size. Larger than any announcement a host sends.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Quiet period after which unterminated bytes on a stream count as one announcement.
pub const IDLE_FLUSH: Duration = Duration::from_millis(50);

/// Why a client session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The shim sent its disconnect sentinel.
    Disconnected,
    /// The client closed the pipe.
    Closed,
}

/// How the transport marks the end of one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Each write arrives as its own message (Windows message-mode pipe).
    Message,
    /// Writes run together (Unix socket); a NUL or an idle gap ends one.
    Stream,
}

/// Collects pipe bytes into announcements.
///
/// Bytes are only decoded once a piece is complete, so a UTF-8 sequence split
/// across reads survives intact.
#[derive(Debug, Default)]
pub struct AnnouncementAssembler {
    pending: Vec<u8>,
}

impl AnnouncementAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes and return every NUL-terminated announcement now complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut pieces = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == 0) {
            let rest = self.pending.split_off(pos + 1);
            let mut piece = std::mem::replace(&mut self.pending, rest);
            piece.pop();
            collect_piece(&mut pieces, &piece);
        }
        pieces
    }

    /// End the current message: whatever is pending is one announcement.
    pub fn finish(&mut self) -> Vec<String> {
        let piece = std::mem::take(&mut self.pending);
        let mut pieces = Vec::new();
        collect_piece(&mut pieces, &piece);
        pieces
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn collect_piece(pieces: &mut Vec<String>, bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if !text.is_empty() {
        pieces.push(text.to_string());
    }
}

/// A message-mode read that stopped because the message is larger than the buffer.
#[cfg(windows)]
fn is_more_data(e: &io::Error) -> bool {
    e.raw_os_error() == Some(windows::Win32::Foundation::ERROR_MORE_DATA.0 as i32)
}

#[cfg(not(windows))]
fn is_more_data(_e: &io::Error) -> bool {
    false
}

/// Hand pieces to `handler`. Returns `true` once the disconnect sentinel is seen.
fn dispatch<F: FnMut(&str)>(pieces: Vec<String>, handler: &mut F) -> bool {
    for piece in pieces {
        if piece.contains(DISCONNECTED_SENTINEL) {
            return true;
        }
        handler(&piece);
    }
    false
}

enum ReadOutcome {
    Data(usize),
    MoreData,
    Idle,
    Closed,
}

async fn read_once<R>(
    reader: &mut R,
    buf: &mut [u8],
    idle_flush: bool,
) -> Result<ReadOutcome, ShimError>
where
    R: AsyncRead + Unpin,
{
    let result = if idle_flush {
        match tokio::time::timeout(IDLE_FLUSH, reader.read(buf)).await {
            Ok(result) => result,
            Err(_) => return Ok(ReadOutcome::Idle),
        }
    } else {
        reader.read(buf).await
    };

    match result {
        Ok(0) => Ok(ReadOutcome::Closed),
        Ok(n) => Ok(ReadOutcome::Data(n)),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(ReadOutcome::Closed),
        Err(e) if is_more_data(&e) => Ok(ReadOutcome::MoreData),
        Err(e) => Err(e.into()),
    }
}

/// Read announcements from one connected client until it disconnects.
pub async fn read_session<R, F>(
    reader: &mut R,
    boundary: Boundary,
    handler: &mut F,
) -> Result<SessionEnd, ShimError>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut assembler = AnnouncementAssembler::new();

    loop {
        let idle_flush = boundary == Boundary::Stream && assembler.has_pending();

        let pieces = match read_once(reader, &mut buf, idle_flush).await? {
            ReadOutcome::Data(n) => {
                debug!("[LISTENER] Read {} bytes", n);
                let mut pieces = assembler.push(&buf[..n]);
                // A message-mode read that does not fill the buffer ends the message.
                if boundary == Boundary::Message && n < buf.len() {
                    pieces.extend(assembler.finish());
                }
                pieces
            }
            ReadOutcome::MoreData => continue,
            ReadOutcome::Idle => assembler.finish(),
            ReadOutcome::Closed => {
                if dispatch(assembler.finish(), handler) {
                    return Ok(SessionEnd::Disconnected);
                }
                return Ok(SessionEnd::Closed);
            }
        };

        if dispatch(pieces, handler) {
            return Ok(SessionEnd::Disconnected);
        }
    }
}

fn log_session_result(result: Result<SessionEnd, ShimError>) {
    match result {
        Ok(SessionEnd::Disconnected) => info!("[LISTENER] Client sent disconnect"),
        Ok(SessionEnd::Closed) => info!("[LISTENER] Client closed the pipe"),
        Err(e) => warn!("[LISTENER] Session aborted: {}", e),
    }
}

/// Serve clients one at a time, forever. Each finished session is followed by
/// a fresh pipe instance.
#[cfg(windows)]
pub async fn serve<F>(endpoint: &str, mut handler: F) -> Result<(), ShimError>
where
    F: FnMut(&str),
{
    use tokio::net::windows::named_pipe::{PipeMode, ServerOptions};

    loop {
        let mut server = ServerOptions::new()
            .access_inbound(true)
            .access_outbound(false)
            .pipe_mode(PipeMode::Message)
            .max_instances(1)
            .in_buffer_size(READ_BUFFER_SIZE as u32)
            .create(endpoint)?;

        info!("[LISTENER] Waiting for client on {}", endpoint);
        server.connect().await?;
        info!("[LISTENER] Client connected");

        log_session_result(read_session(&mut server, Boundary::Message, &mut handler).await);
    }
}

/// Serve clients one at a time, forever, on a Unix domain socket.
#[cfg(unix)]
pub async fn serve<F>(endpoint: &str, mut handler: F) -> Result<(), ShimError>
where
    F: FnMut(&str),
{
    use tokio::net::UnixListener;

    match std::fs::remove_file(endpoint) {
        Ok(()) => debug!("[LISTENER] Removed stale socket {}", endpoint),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let listener = UnixListener::bind(endpoint)?;

    loop {
        info!("[LISTENER] Waiting for client on {}", endpoint);
        let (mut stream, _) = listener.accept().await?;
        info!("[LISTENER] Client connected");

        log_session_result(read_session(&mut stream, Boundary::Stream, &mut handler).await);
    }
}
