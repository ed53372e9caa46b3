//! Best-effort announcement channel to the external listener.
//!
//! The announcer holds at most one pipe handle. A failed write drops the handle
//! and triggers exactly one reconnect; the caller is told the announcement
//! succeeded either way. Only a null text is reported as a failure.

use crate::conversions::{encode_announcement, wide_to_utf8, Framing};
use crate::error::ShimError;
use crate::ipc::Connector;
use log::{debug, warn};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Delivery counters kept for diagnostics. Never reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: u64,
    pub dropped: u64,
    pub reconnects: u64,
    pub failed_connects: u64,
}

pub struct PipeAnnouncer<C: Connector> {
    connector: C,
    pipe: Option<C::Stream>,
    framing: Framing,
    stats: DeliveryStats,
}

impl<C: Connector> PipeAnnouncer<C> {
    /// Create an announcer in the `Disconnected` state.
    pub fn new(connector: C, framing: Framing) -> Self {
        Self {
            connector,
            pipe: None,
            framing,
            stats: DeliveryStats::default(),
        }
    }

    /// Open a fresh handle to the endpoint, replacing any existing one.
    pub fn connect(&mut self) {
        self.pipe = None;

        match self.connector.open() {
            Ok(pipe) => {
                self.pipe = Some(pipe);
                debug!("[PIPE] Connected to {}", self.connector.endpoint());
            }
            Err(e) => {
                self.stats.failed_connects += 1;
                warn!("[PIPE] {}", e);
            }
        }
    }

    /// Announce UTF-8 text. Returns `false` only for `None`.
    pub fn announce(&mut self, text: Option<&str>) -> bool {
        match self.deliver(text) {
            Ok(()) => true,
            Err(ShimError::NullInput) => false,
            Err(e) => {
                self.stats.dropped += 1;
                warn!("[PIPE] Announcement dropped: {}", e);
                self.reconnect();
                true
            }
        }
    }

    /// Announce UTF-16 text as received from the host.
    pub fn announce_wide(&mut self, text: Option<&[u16]>) -> bool {
        let text = text.map(wide_to_utf8);
        self.announce(text.as_deref())
    }

    pub fn is_running(&self) -> bool {
        true
    }

    /// No audio is produced, so there is nothing to stop.
    pub fn stop_audio(&self) -> bool {
        true
    }

    /// No braille display is driven.
    pub fn show_braille(&self, _text: Option<&[u16]>) -> bool {
        true
    }

    pub fn state(&self) -> ConnectionState {
        if self.pipe.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    pub fn endpoint(&self) -> &str {
        self.connector.endpoint()
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    fn deliver(&mut self, text: Option<&str>) -> Result<(), ShimError> {
        let text = text.ok_or(ShimError::NullInput)?;
        let payload = encode_announcement(text, self.framing);

        // A zero-length write would reach a message-mode listener as end of stream.
        if payload.is_empty() {
            return Ok(());
        }

        let pipe = self.pipe.as_mut().ok_or(ShimError::NotConnected)?;
        let written = pipe.write(&payload).map_err(ShimError::WriteFailure)?;
        if written < payload.len() {
            debug!("[PIPE] Short write: {} of {} bytes", written, payload.len());
        }

        self.stats.delivered += 1;
        Ok(())
    }

    fn reconnect(&mut self) {
        self.stats.reconnects += 1;
        self.connect();
    }
}
