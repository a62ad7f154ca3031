//! Windows service control manager integration.
//!
//! When started by the SCM the process hands its main thread to the service
//! dispatcher; `Stop` maps onto the stop hook and `Shutdown`/`Preshutdown`
//! onto the shutdown hook. Started from a console, the dispatcher refuses to
//! connect and the caller falls back to console control handlers.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use windows_service::service::{
    ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState, ServiceStatus,
    ServiceType,
};
use windows_service::service_control_handler::{self, ServiceControlHandlerResult};
use windows_service::{define_windows_service, service_dispatcher};

use crate::config::Config;
use crate::monitor::StopReason;

/// Name the service is registered under.
pub const SERVICE_NAME: &str = "IdleSentinel";

/// `ERROR_FAILED_SERVICE_CONTROLLER_CONNECT`: not launched by the SCM.
const NOT_A_SERVICE: i32 = 1063;

static CONFIG: OnceLock<Config> = OnceLock::new();

define_windows_service!(ffi_service_main, service_main);

/// Run under the service dispatcher if the SCM started this process.
///
/// Returns `Ok(false)` when running from a console.
pub fn run_if_service(config: Config) -> Result<bool> {
    let _ = CONFIG.set(config);
    match service_dispatcher::start(SERVICE_NAME, ffi_service_main) {
        Ok(()) => Ok(true),
        Err(windows_service::Error::Winapi(e)) if e.raw_os_error() == Some(NOT_A_SERVICE) => {
            Ok(false)
        }
        Err(e) => Err(e).context("Failed to start service dispatcher"),
    }
}

fn service_main(_arguments: Vec<OsString>) {
    if let Err(e) = run_service() {
        error!("Service failed: {:#}", e);
    }
}

fn run_service() -> Result<()> {
    let config = CONFIG.get().context("Service started without configuration")?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let status_handle = service_control_handler::register(SERVICE_NAME, move |control| {
        let reason = match control {
            ServiceControl::Stop => StopReason::Stop,
            ServiceControl::Shutdown | ServiceControl::Preshutdown => StopReason::Shutdown,
            ServiceControl::Interrogate => return ServiceControlHandlerResult::NoError,
            _ => return ServiceControlHandlerResult::NotImplemented,
        };
        info!("Service control received: {:?}", control);
        let _ = tx.send(reason);
        ServiceControlHandlerResult::NoError
    })
    .context("Failed to register service control handler")?;

    status_handle.set_service_status(status(
        ServiceState::Running,
        ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN,
    ))?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to build tokio runtime")?;
    let result = runtime.block_on(crate::run_monitor(config, async move {
        rx.recv().await.unwrap_or(StopReason::Stop)
    }));

    status_handle.set_service_status(status(
        ServiceState::Stopped,
        ServiceControlAccept::empty(),
    ))?;
    result
}

fn status(state: ServiceState, accepted: ServiceControlAccept) -> ServiceStatus {
    ServiceStatus {
        service_type: ServiceType::OWN_PROCESS,
        current_state: state,
        controls_accepted: accepted,
        exit_code: ServiceExitCode::NO_ERROR,
        checkpoint: 0,
        wait_hint: Duration::default(),
        process_id: None,
    }
}
