//! Alert delivery for LoopBreak.
//!
//! The analytics decide *that* and *what* to notify; a [`Notifier`] only
//! delivers. Three implementations are provided:
//! - [`LogNotifier`]: writes the alert to the tracing log
//! - [`CommandNotifier`]: desktop notification via `osascript` or `notify-send`
//! - [`WebhookNotifier`]: JSON `POST` to an HTTP endpoint

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

/// Default delivery timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The notification program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The notification program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    /// Delivery did not finish within the timeout.
    #[error("notification timed out after {0:?}")]
    Timeout(Duration),
    /// The webhook URL is not a valid http(s) URL.
    #[error("invalid webhook URL: {0}")]
    InvalidUrl(String),
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The webhook answered with a non-success status.
    #[error("webhook returned {status}: {body}")]
    Http { status: u16, body: String },
}

/// Delivers an alert to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification.
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Which notifier to build, as read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotifierConfig {
    /// Log alerts only.
    #[default]
    Log,
    /// Desktop notification through the platform command.
    Command,
    /// `POST` alerts as JSON to `url`.
    Webhook { url: String },
}

impl NotifierConfig {
    /// Builds the configured notifier.
    pub fn build(&self, timeout: Duration) -> Result<Box<dyn Notifier>, NotifyError> {
        Ok(match self {
            Self::Log => Box::new(LogNotifier),
            Self::Command => Box::new(CommandNotifier::platform_default(timeout)),
            Self::Webhook { url } => Box::new(WebhookNotifier::new(url, timeout)?),
        })
    }
}

/// Writes alerts to the log at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        tracing::info!(title, message, "alert");
        Ok(())
    }
}

/// Shows a desktop notification by running a platform command.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    timeout: Duration,
}

impl CommandNotifier {
    /// Uses `osascript` on macOS and `notify-send` elsewhere.
    pub fn platform_default(timeout: Duration) -> Self {
        let program = if cfg!(target_os = "macos") {
            "osascript"
        } else {
            "notify-send"
        };
        Self::new(program, timeout)
    }

    /// Runs `program` with the title and message as its two arguments.
    ///
    /// `osascript` is special-cased to receive an AppleScript snippet instead.
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn args(&self, title: &str, message: &str) -> Vec<String> {
        if self.program == "osascript" {
            vec![
                "-e".to_string(),
                format!(
                    "display notification \"{}\" with title \"{}\"",
                    applescript_escape(message),
                    applescript_escape(title)
                ),
            ]
        } else {
            vec![title.to_string(), message.to_string()]
        }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let output = Command::new(&self.program)
            .args(self.args(title, message))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| NotifyError::Timeout(self.timeout))?
            .map_err(|source| NotifyError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(NotifyError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Posts alerts as JSON to an HTTP endpoint.
///
/// # Thread Safety
///
/// The notifier is safe to share across tasks; requests share the client's
/// connection pool.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: reqwest::Url,
}

impl fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Webhook URLs often embed a token in the path.
        f.debug_struct("WebhookNotifier")
            .field("host", &self.url.host_str())
            .field("url", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    message: &'a str,
    source: &'static str,
}

impl WebhookNotifier {
    /// Creates a notifier for `url` with the given request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let url = reqwest::Url::parse(url.trim())
            .map_err(|err| NotifyError::InvalidUrl(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NotifyError::InvalidUrl(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NotifyError::ClientBuild)?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            title,
            message,
            source: "loopbreak",
        };
        let response = self
            .http
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
