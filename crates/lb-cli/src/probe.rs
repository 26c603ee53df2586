//! OS probe: foreground window title and system load.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::System;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;

/// The probe could not read the current activity.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    CommandFailed {
        program: &'static str,
        status: String,
    },
    #[error("probe returned no foreground window")]
    NoWindow,
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("load reading unavailable: {0}")]
    Load(String),
}

/// Reads the user's current foreground activity.
#[async_trait]
pub trait ActivityProbe: Send + Sync {
    /// Title (application name) of the foreground window.
    async fn foreground_title(&self) -> Result<String, CaptureError>;

    /// System-wide CPU load in percent.
    async fn load_percent(&self) -> Result<f64, CaptureError>;
}

#[cfg(target_os = "macos")]
const TITLE_COMMAND: (&str, &[&str]) = (
    "osascript",
    &[
        "-e",
        "tell application \"System Events\" to get name of first application process whose frontmost is true",
    ],
);

#[cfg(not(target_os = "macos"))]
const TITLE_COMMAND: (&str, &[&str]) = ("xdotool", &["getactivewindow", "getwindowname"]);

/// Probe backed by `sysinfo` for load and a platform command for the title.
pub struct SystemProbe {
    system: Mutex<System>,
    timeout: Duration,
}

impl SystemProbe {
    pub fn new(timeout: Duration) -> Self {
        let mut system = System::new();
        // CPU usage is a delta between refreshes; establish the baseline now.
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
            timeout,
        }
    }
}

#[async_trait]
impl ActivityProbe for SystemProbe {
    async fn foreground_title(&self) -> Result<String, CaptureError> {
        let (program, args) = TITLE_COMMAND;
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| CaptureError::Timeout(self.timeout))?
            .map_err(|source| CaptureError::Spawn { program, source })?;
        if !output.status.success() {
            return Err(CaptureError::CommandFailed {
                program,
                status: output.status.to_string(),
            });
        }
        parse_title(&output.stdout).ok_or(CaptureError::NoWindow)
    }

    async fn load_percent(&self) -> Result<f64, CaptureError> {
        let mut system = self.system.lock().await;
        system.refresh_cpu_usage();
        let load = f64::from(system.global_cpu_usage());
        if load.is_finite() {
            Ok(load)
        } else {
            Err(CaptureError::Load(format!("non-finite reading {load}")))
        }
    }
}

fn parse_title(stdout: &[u8]) -> Option<String> {
    let title = String::from_utf8_lossy(stdout).trim().to_string();
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_title_trims_output() {
        assert_eq!(parse_title(b"Terminal\n"), Some("Terminal".to_string()));
        assert_eq!(parse_title(b"  \n"), None);
    }

    #[tokio::test]
    async fn system_probe_reads_bounded_load() {
        let probe = SystemProbe::new(Duration::from_secs(1));
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        let load = probe.load_percent().await.unwrap();
        assert!(load.is_finite() && load >= 0.0);
    }
}
