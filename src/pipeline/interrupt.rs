//! Cooperative shutdown on SIGINT/SIGTERM
//!
//! A signal only cancels the token. The pipeline checks the token between
//! files, so the file in flight always finishes before the final flush.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn a task that cancels `token` whenever an interrupt or termination
/// signal arrives. Must be called from within a tokio runtime.
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = wait_for_signal().await {
                tracing::warn!("Failed to listen for shutdown signals: {}", e);
                return;
            }

            eprintln!("\nReceived interrupt signal, finishing the current file and saving progress...");
            tracing::warn!("Shutdown requested");
            token.cancel();
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
