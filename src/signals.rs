//! Mapping of OS signals onto the service's stop and shutdown hooks.
//!
//! Unix: SIGINT stops, SIGTERM (sent by the init system on power-down) shuts
//! down. Windows console runs: Ctrl-C / Ctrl-Break stop, console close and
//! system shutdown shut down. Under the service control manager the controls
//! come from `service` instead.

use std::io;
use tracing::info;

use crate::monitor::StopReason;

#[cfg(unix)]
pub struct StopSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl StopSignals {
    /// Install the handlers. Must be called from within a tokio runtime.
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the first stop or shutdown signal.
    pub async fn recv(&mut self) -> StopReason {
        tokio::select! {
            _ = self.sigint.recv() => {
                info!("Received SIGINT");
                StopReason::Stop
            }
            _ = self.sigterm.recv() => {
                info!("Received SIGTERM");
                StopReason::Shutdown
            }
        }
    }
}

#[cfg(windows)]
pub struct StopSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
    ctrl_break: tokio::signal::windows::CtrlBreak,
    ctrl_close: tokio::signal::windows::CtrlClose,
    ctrl_shutdown: tokio::signal::windows::CtrlShutdown,
}

#[cfg(windows)]
impl StopSignals {
    /// Install the handlers. Must be called from within a tokio runtime.
    pub fn register() -> io::Result<Self> {
        use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close, ctrl_shutdown};

        Ok(Self {
            ctrl_c: ctrl_c()?,
            ctrl_break: ctrl_break()?,
            ctrl_close: ctrl_close()?,
            ctrl_shutdown: ctrl_shutdown()?,
        })
    }

    /// Wait for the first stop or shutdown signal.
    pub async fn recv(&mut self) -> StopReason {
        tokio::select! {
            _ = self.ctrl_c.recv() => {
                info!("Received Ctrl-C");
                StopReason::Stop
            }
            _ = self.ctrl_break.recv() => {
                info!("Received Ctrl-Break");
                StopReason::Stop
            }
            _ = self.ctrl_close.recv() => {
                info!("Received console close");
                StopReason::Shutdown
            }
            _ = self.ctrl_shutdown.recv() => {
                info!("Received system shutdown");
                StopReason::Shutdown
            }
        }
    }
}

#[cfg(not(any(unix, windows)))]
pub struct StopSignals;

#[cfg(not(any(unix, windows)))]
impl StopSignals {
    pub fn register() -> io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> StopReason {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        StopReason::Stop
    }
}
