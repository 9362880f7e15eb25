//! Simulated chat clients.
//!
//! Runs the production [`Runtime`] against a [`SimHub`], so end-to-end tests
//! exercise the same command and event handling as the real binary.

use pomochat_app::{ChatHandle, Runtime, RuntimeConfig};
use pomochat_core::{ConfigError, SessionConfig, config::DEFAULT_ENDPOINT};

use crate::{SimEnv, SimHub, SimTransport};

/// Spawn a runtime connected to `hub` and return its handle.
///
/// Must be called from within a tokio runtime. The runtime stops when the
/// handle and all its clones are dropped, or on `shutdown`.
pub fn spawn_client(hub: &SimHub, env: SimEnv) -> Result<ChatHandle, ConfigError> {
    let config = SessionConfig::new(DEFAULT_ENDPOINT)?;
    let (runtime, handle) =
        Runtime::new(SimTransport::new(hub.clone()), env, config, RuntimeConfig::default());
    tokio::spawn(runtime.run());
    Ok(handle)
}
