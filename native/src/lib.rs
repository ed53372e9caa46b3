pub mod announcer;
pub mod api;
pub mod config;
pub mod conversions;
pub mod error;
pub mod ipc;
pub mod logging;

#[cfg(windows)]
mod dllmain;

use announcer::PipeAnnouncer;
use config::ShimConfig;
use ipc::{Connector, NamedPipeConnector};
use log::{debug, info, warn};

use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

pub use announcer::{ConnectionState, DeliveryStats};
pub use conversions::Framing;
pub use error::ShimError;

/// Sent once the shim has been loaded by the host.
pub const CONNECTED_SENTINEL: &str = "CONNECTED";
/// Sent when the host unloads the shim; ends the listener's session.
pub const DISCONNECTED_SENTINEL: &str = "DISCONNECTED";

pub type ShimAnnouncer = PipeAnnouncer<NamedPipeConnector>;

// Process-wide announcer, installed on attach and removed on detach.
static ANNOUNCER: Mutex<Option<ShimAnnouncer>> = Mutex::new(None);

#[cfg(not(test))]
fn default_connector() -> NamedPipeConnector {
    NamedPipeConnector::new(ShimConfig::default().pipe_name)
}

// Unit tests must never reach a listener running on the developer's machine.
#[cfg(all(test, windows))]
fn default_connector() -> NamedPipeConnector {
    NamedPipeConnector::new(format!(r"\\.\pipe\saapi-absent-{}", std::process::id()))
}

#[cfg(all(test, not(windows)))]
fn default_connector() -> NamedPipeConnector {
    let path = std::env::temp_dir().join(format!("saapi-absent-{}.sock", std::process::id()));
    NamedPipeConnector::new(path.to_string_lossy())
}

fn lock_announcer() -> MutexGuard<'static, Option<ShimAnnouncer>> {
    ANNOUNCER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build, connect and announce a new announcer unless `slot` already holds one.
///
/// Runs under the loader lock when called from `DllMain`, so it only opens the
/// pipe and writes.
fn install<C: Connector>(
    slot: &mut Option<PipeAnnouncer<C>>,
    connector: impl FnOnce() -> C,
) -> &mut PipeAnnouncer<C> {
    slot.get_or_insert_with(|| {
        let mut announcer = PipeAnnouncer::new(connector(), ShimConfig::default().framing);
        debug!("[SAAPI] Attaching to {}", announcer.endpoint());

        announcer.connect();
        announcer.announce(Some(CONNECTED_SENTINEL));
        announcer
    })
}

/// Send the disconnected sentinel and drop the announcer, closing its handle.
fn release<C: Connector>(slot: &mut Option<PipeAnnouncer<C>>) {
    if let Some(mut announcer) = slot.take() {
        announcer.announce(Some(DISCONNECTED_SENTINEL));

        let stats = announcer.stats();
        info!(
            "[SAAPI] Detached - delivered: {}, dropped: {}, reconnects: {}",
            stats.delivered, stats.dropped, stats.reconnects
        );
    }
}

/// Host load hook: connect and send the connected sentinel.
pub fn attach() {
    let mut slot = lock_announcer();
    if slot.is_some() {
        debug!("[SAAPI] Already attached");
        return;
    }
    install(&mut slot, default_connector);
}

/// Host unload hook: send the disconnected sentinel and close the pipe.
///
/// During process termination other threads may have died holding the lock,
/// so it is only tried.
pub fn detach(process_terminating: bool) {
    let mut slot = if process_terminating {
        match ANNOUNCER.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!("[SAAPI] Announcer busy at process exit, skipping disconnect");
                return;
            }
        }
    } else {
        lock_announcer()
    };

    release(&mut slot);
}

/// Run `f` against the process-wide announcer, attaching first if needed.
/// Only called from exported functions, never from `DllMain`.
pub fn with_announcer<R>(f: impl FnOnce(&mut ShimAnnouncer) -> R) -> R {
    logging::init_once();
    let mut slot = lock_announcer();
    f(install(&mut slot, default_connector))
}

/// Run `f` against the process-wide announcer only if one is installed.
pub fn with_installed<R>(f: impl FnOnce(&ShimAnnouncer) -> R) -> Option<R> {
    logging::init_once();
    lock_announcer().as_ref().map(f)
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_is_idempotent_and_detach_removes_announcer() {
        attach();
        attach();
        assert!(with_installed(|announcer| announcer.endpoint().to_string()).is_some());
        assert!(api::delivery_stats().is_some());

        detach(false);
        // Detaching twice is harmless.
        detach(false);
    }

    #[test]
    fn terminating_detach_does_not_wait_for_busy_lock() {
        let held = lock_announcer();
        detach(true);
        drop(held);
    }

    #[test]
    fn lazily_attaches_on_first_announcement() {
        let endpoint = with_announcer(|announcer| {
            assert!(announcer.announce(Some("late caller")));
            announcer.endpoint().to_string()
        });
        assert_eq!(endpoint, default_connector().endpoint());
    }

    #[test]
    fn unit_tests_never_use_the_real_endpoint() {
        assert_ne!(default_connector().endpoint(), ipc::PIPE_NAME);
        assert_eq!(ShimConfig::default().pipe_name, ipc::PIPE_NAME);
    }

    #[test]
    fn release_without_install_is_a_no_op() {
        let mut slot: Option<ShimAnnouncer> = None;
        release(&mut slot);
        assert!(slot.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn attach_and_detach_write_sentinels_then_close() {
        use std::io::Read;
        use std::os::unix::net::UnixListener;
        use std::time::Duration;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("d4lf.sock");
        let listener = UnixListener::bind(&path).expect("bind");

        let mut slot = None;
        let state = install(&mut slot, || NamedPipeConnector::new(path.to_string_lossy())).state();
        assert_eq!(state, ConnectionState::Connected);

        release(&mut slot);
        assert!(slot.is_none());

        let (mut server, _) = listener.accept().expect("accept");
        // A handle left open would time out here instead of reaching EOF.
        server
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("timeout");
        let mut received = Vec::new();
        server.read_to_end(&mut received).expect("read until EOF");
        assert_eq!(received, b"CONNECTEDDISCONNECTED");
    }

    #[cfg(unix)]
    #[test]
    fn attach_and_detach_without_listener_complete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.sock");

        let mut slot = None;
        let stats = install(&mut slot, || NamedPipeConnector::new(path.to_string_lossy())).stats();
        assert_eq!(stats.failed_connects, 2);
        assert_eq!(stats.dropped, 1);

        release(&mut slot);
        assert!(slot.is_none());
    }

    #[test]
    fn sentinels_are_literal() {
        assert_eq!(CONNECTED_SENTINEL, "CONNECTED");
        assert_eq!(DISCONNECTED_SENTINEL, "DISCONNECTED");
    }
}
