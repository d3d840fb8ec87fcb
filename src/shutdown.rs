use crate::error::{other_error, BotResult, Error};
use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
#[cfg(windows)]
use tokio::signal::windows::{ctrl_break, ctrl_c};

/// Wait until the process is asked to terminate
#[cfg(unix)]
pub async fn wait_for_signal() -> BotResult<()> {
    // Handle SIGTERM (sent by Kubernetes when pod is terminating)
    let mut sigterm = signal(SignalKind::terminate()).map_err(signal_error)?;
    // Handle SIGINT (Ctrl+C)
    let mut sigint = signal(SignalKind::interrupt()).map_err(signal_error)?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT signal, initiating graceful shutdown");
        }
    }
    Ok(())
}

/// Wait until the process is asked to terminate
#[cfg(windows)]
pub async fn wait_for_signal() -> BotResult<()> {
    let mut ctrlc = ctrl_c().map_err(signal_error)?;
    let mut ctrlbreak = ctrl_break().map_err(signal_error)?;

    tokio::select! {
        _ = ctrlc.recv() => {
            info!("Received Ctrl+C signal, initiating graceful shutdown");
        }
        _ = ctrlbreak.recv() => {
            info!("Received Ctrl+Break signal, initiating graceful shutdown");
        }
    }
    Ok(())
}

fn signal_error(e: std::io::Error) -> Error {
    other_error(&format!("Failed to install signal handler: {}", e))
}
