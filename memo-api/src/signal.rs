//! SIGUSR2 snapshot dump.

use std::sync::Arc;

use memo_debug::DebugRegistry;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Installs a SIGUSR2 handler that writes a snapshot of `registry` to stderr
/// on every delivery.
///
/// Must be called from within a tokio runtime. The task runs until the
/// runtime shuts down.
pub fn spawn_signal_dump(registry: Arc<DebugRegistry>) -> std::io::Result<JoinHandle<()>> {
    let mut usr2 = signal(SignalKind::user_defined2())?;
    info!("Cache dump armed on SIGUSR2");

    Ok(tokio::spawn(async move {
        while usr2.recv().await.is_some() {
            if let Err(e) = registry.log() {
                warn!(error = %e, "Failed to dump cache snapshot");
            }
        }
    }))
}
