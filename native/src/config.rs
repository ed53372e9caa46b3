// Settings for the shim (fixed) and the diagnostic listener (overridable).

use crate::conversions::Framing;
use crate::ipc::PIPE_NAME;
use log::{debug, warn};

/// Listener-only override of the endpoint it creates.
pub const LISTEN_PIPE_VAR: &str = "SAAPI_LISTEN_PIPE";

/// What the DLL connects to. Never read from the host's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    pub pipe_name: String,
    pub framing: Framing,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            pipe_name: PIPE_NAME.to_string(),
            framing: Framing::Raw,
        }
    }
}

/// Settings for `saapi-listen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub pipe_name: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            pipe_name: PIPE_NAME.to_string(),
        }
    }
}

impl ListenerConfig {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(LISTEN_PIPE_VAR) {
            let name = name.trim();
            if name.is_empty() {
                warn!("[CONFIG] {} is empty, using {}", LISTEN_PIPE_VAR, PIPE_NAME);
            } else {
                config.pipe_name = name.to_string();
            }
        }

        debug!("[CONFIG] Listener pipe: {}", config.pipe_name);
        config
    }
}
