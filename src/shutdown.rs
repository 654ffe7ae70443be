use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
#[cfg(windows)]
use tokio::signal::windows::{ctrl_break, ctrl_c};

/// Resolve once the process is asked to stop.
///
/// If a handler cannot be installed the error is logged and the future never
/// resolves from that source, so the server keeps running.
#[cfg(unix)]
pub async fn wait_for_signal() {
    // Handle SIGTERM (sent by container runtimes when stopping)
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create SIGTERM signal handler: {}", e);
            return std::future::pending().await;
        }
    };
    // Handle SIGINT (Ctrl+C)
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create SIGINT signal handler: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT signal, initiating graceful shutdown");
        }
    }
}

/// Resolve once the process is asked to stop.
#[cfg(windows)]
pub async fn wait_for_signal() {
    // Handle Ctrl+C
    let mut ctrlc = match ctrl_c() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create Ctrl+C signal handler: {}", e);
            return std::future::pending().await;
        }
    };
    // Handle Ctrl+Break
    let mut ctrlbreak = match ctrl_break() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create Ctrl+Break signal handler: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = ctrlc.recv() => {
            info!("Received Ctrl+C signal, initiating graceful shutdown");
        }
        _ = ctrlbreak.recv() => {
            info!("Received Ctrl+Break signal, initiating graceful shutdown");
        }
    }
}
