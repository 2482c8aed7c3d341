//! Guard for the host's own navigation service. Daemons like spacenavd
//! claim the SpaceMouse exclusively, so the pipeline stops them while it
//! runs and restarts them on shutdown, strictly after the HID reader has
//! released the device.

use std::process::Command;
use std::time::Duration;

use thiserror::Error;

/// Known conflicting navigation daemons: process name to match in procfs
/// and the executable used to restart it
const SERVICES: [(&str, &str); 2] = [
    ("spacenavd", "/usr/bin/spacenavd"),
    ("3dxsrv", "/etc/3DxWare/daemon/3dxsrv"),
];

/// How long to wait for a signaled service to exit
const STOP_TIMEOUT: Duration = Duration::from_secs(3);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unable to inspect processes: {0}")]
    Procfs(#[from] procfs::ProcError),
    #[error("unable to signal '{name}': {err}")]
    Signal {
        name: String,
        err: std::io::Error,
    },
    #[error("service '{0}' did not stop")]
    StopTimeout(String),
    #[error("unable to restart '{name}': {err}")]
    Restart {
        name: String,
        err: std::io::Error,
    },
}

/// Stops a conflicting navigation service for the lifetime of the pipeline.
/// Dropping the guard does nothing; [ServiceGuard::release] must be called
/// as the very last step of shutdown.
#[derive(Debug, Default)]
pub struct ServiceGuard {
    /// Name of the service this guard stopped, if any
    stopped: Option<&'static str>,
}

impl ServiceGuard {
    /// Detect a running conflicting service and stop it. If stopping fails
    /// the error is returned but the pipeline may still attempt to operate;
    /// the service may already have released the device.
    pub fn acquire() -> Result<Self, ServiceError> {
        let Some(name) = find_running()? else {
            log::debug!("No conflicting navigation service is running");
            return Ok(Self::default());
        };
        log::info!("Stopping conflicting navigation service '{name}'");
        stop_service(name)?;
        Ok(Self {
            stopped: Some(name),
        })
    }

    /// Restart the service this guard stopped. Call only after the HID
    /// reader has fully stopped, or the service will race the pipeline for
    /// the device.
    pub fn release(self) -> Result<(), ServiceError> {
        let Some(name) = self.stopped else {
            return Ok(());
        };
        let executable = SERVICES
            .iter()
            .find(|(service, _)| *service == name)
            .map(|(_, executable)| *executable)
            .unwrap_or(name);
        log::info!("Restarting navigation service '{name}'");
        Command::new(executable)
            .spawn()
            .map(|_| ())
            .map_err(|err| ServiceError::Restart {
                name: name.to_string(),
                err,
            })
    }
}

/// Returns the name of the first conflicting service found running
fn find_running() -> Result<Option<&'static str>, ServiceError> {
    let processes = procfs::process::all_processes()?;
    for process in processes.flatten() {
        let Ok(stat) = process.stat() else {
            continue;
        };
        if let Some((name, _)) = SERVICES.iter().find(|(name, _)| *name == stat.comm) {
            return Ok(Some(name));
        }
    }
    Ok(None)
}

/// Signal the named service to stop and wait for it to exit
fn stop_service(name: &'static str) -> Result<(), ServiceError> {
    let status = Command::new("pkill")
        .arg("-x")
        .arg(name)
        .status()
        .map_err(|err| ServiceError::Signal {
            name: name.to_string(),
            err,
        })?;
    if !status.success() {
        log::debug!("pkill exited with {status}; '{name}' may already be gone");
    }

    let deadline = std::time::Instant::now() + STOP_TIMEOUT;
    while std::time::Instant::now() < deadline {
        if find_running()?.is_none() {
            return Ok(());
        }
        std::thread::sleep(STOP_POLL_INTERVAL);
    }
    Err(ServiceError::StopTimeout(name.to_string()))
}
