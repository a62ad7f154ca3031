//! idle-sentinel - operator console idle monitor
//!
//! Polls the time since the last keyboard/mouse input and sends one email
//! alert per idle episode, plus a notice when the service stops.

mod config;
mod idle;
mod logging;
mod monitor;
mod notify;
#[cfg(windows)]
mod service;
mod signals;

use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::idle::tracker::IDLE_THRESHOLD;
use crate::idle::PlatformSampler;
use crate::logging::EventLog;
use crate::monitor::{IdleMonitor, StopReason};
use crate::notify::{LogNotifier, SmtpNotifier};
use crate::signals::StopSignals;

/// Application version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    let config = Config::load(config_path.as_deref())?;
    config.validate()?;

    logging::init_tracing(&config.logging.level, config.logging.json)?;

    info!("Starting idle-sentinel v{}", VERSION);
    info!("Idle threshold: {:?}", IDLE_THRESHOLD);

    #[cfg(windows)]
    if service::run_if_service(config.clone())? {
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to build tokio runtime")?;
    runtime.block_on(async {
        let mut signals = StopSignals::register().context("Failed to install signal handlers")?;
        run_monitor(&config, async move { signals.recv().await }).await
    })
}

/// Wire the sampler, event log and notifier together and poll until `shutdown`
/// resolves.
async fn run_monitor(config: &Config, shutdown: impl Future<Output = StopReason>) -> Result<()> {
    let sampler = PlatformSampler::new().context("Idle time cannot be read on this host")?;
    let events = EventLog::new(&config.logging.data_dir, &config.logging.file_name)?;
    info!("Event log: {:?}", events.path());

    let machine = notify::machine_name();

    if config.smtp.is_configured() {
        let notifier =
            SmtpNotifier::new(&config.smtp).context("Failed to initialize SMTP notifier")?;
        IdleMonitor::new(sampler, notifier, events, machine)
            .run(shutdown)
            .await;
    } else {
        warn!("SMTP is not configured; notifications will only be logged");
        IdleMonitor::new(sampler, LogNotifier, events, machine)
            .run(shutdown)
            .await;
    }

    info!("idle-sentinel shutdown complete");
    Ok(())
}
