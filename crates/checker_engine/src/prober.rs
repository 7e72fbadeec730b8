//! Authoritative fallback: run an external media prober (ffprobe) against a URL.
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use checker_core::{FailureKind, MediaProbeResult};
use engine_logging::{engine_debug, engine_info};
use serde::Deserialize;
use tokio::process::Command;

use crate::fetch::BROWSER_USER_AGENT;

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ProberSettings {
    /// Binary name looked up on `PATH`, or an explicit path.
    pub binary: PathBuf,
    /// Hard wall-clock bound on one prober run.
    pub timeout: Duration,
    /// How much of the stream the prober may analyze.
    pub probe_duration: Duration,
    /// Network read/write timeout handed to the prober itself.
    pub io_timeout: Duration,
    pub user_agent: String,
    /// Extra request headers, one `Name: value` per entry.
    pub headers: Vec<String>,
    pub reconnect_delay_max: Duration,
}

impl Default for ProberSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffprobe"),
            timeout: Duration::from_secs(20),
            probe_duration: Duration::from_secs(8),
            io_timeout: Duration::from_secs(15),
            user_agent: BROWSER_USER_AGENT.to_string(),
            headers: Vec::new(),
            reconnect_delay_max: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProberUnavailable {
    #[error("media prober disabled by configuration")]
    Disabled,
    #[error("prober binary {binary:?} not found: {reason}")]
    NotFound { binary: PathBuf, reason: String },
    #[error("prober binary {binary:?} failed its version check: {reason}")]
    VersionCheck { binary: PathBuf, reason: String },
}

#[async_trait::async_trait]
pub trait MediaProber: Send + Sync {
    fn name(&self) -> &'static str;

    /// Never fails: launch errors, timeouts and bad output come back as an
    /// unconfirmed result carrying the failure kind.
    async fn probe(&self, url: &str) -> MediaProbeResult;
}

pub struct FfprobeProber {
    binary: PathBuf,
    settings: ProberSettings,
}

impl FfprobeProber {
    /// Use `binary` as-is, skipping discovery.
    pub fn new(binary: PathBuf, settings: ProberSettings) -> Self {
        Self { binary, settings }
    }

    /// Resolve the configured binary and make sure it actually runs.
    pub async fn discover(settings: ProberSettings) -> Result<Self, ProberUnavailable> {
        let binary =
            which::which(&settings.binary).map_err(|err| ProberUnavailable::NotFound {
                binary: settings.binary.clone(),
                reason: err.to_string(),
            })?;

        let version_check = |reason: String| ProberUnavailable::VersionCheck {
            binary: binary.clone(),
            reason,
        };
        let output = tokio::time::timeout(
            VERSION_CHECK_TIMEOUT,
            Command::new(&binary)
                .arg("-version")
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| version_check("timed out".to_string()))?
        .map_err(|err| version_check(err.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() || !stdout.contains("version") {
            return Err(version_check(format!("exit status {}", output.status)));
        }

        engine_info!(
            "media prober ready: {} ({})",
            binary.display(),
            stdout.lines().next().unwrap_or_default()
        );
        Ok(Self::new(binary, settings))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait::async_trait]
impl MediaProber for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, url: &str) -> MediaProbeResult {
        let mut command = Command::new(&self.binary);
        command
            .args(build_prober_args(&self.settings, url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                engine_debug!("prober launch failed for {}: {}", url, err);
                return MediaProbeResult::failed(FailureKind::ProberLaunch);
            }
        };

        // On timeout the dropped child is killed.
        match tokio::time::timeout(self.settings.timeout, child.wait_with_output()).await {
            Err(_) => MediaProbeResult::failed(FailureKind::ProberTimeout),
            Ok(Err(err)) => {
                engine_debug!("prober wait failed for {}: {}", url, err);
                MediaProbeResult::failed(FailureKind::ProberLaunch)
            }
            Ok(Ok(output)) if !output.status.success() => {
                MediaProbeResult::failed(FailureKind::ProberExit(output.status.code()))
            }
            Ok(Ok(output)) => parse_prober_output(&output.stdout),
        }
    }
}

/// Command-line arguments for one prober run, URL last.
pub fn build_prober_args(settings: &ProberSettings, url: &str) -> Vec<String> {
    let mut args: Vec<String> = [
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push("-rw_timeout".into());
    args.push(settings.io_timeout.as_micros().to_string());
    args.push("-analyzeduration".into());
    args.push(settings.probe_duration.as_micros().to_string());

    args.push("-user_agent".into());
    args.push(settings.user_agent.clone());
    if !settings.headers.is_empty() {
        let joined: String = settings
            .headers
            .iter()
            .map(|h| format!("{}\r\n", h.trim()))
            .collect();
        args.push("-headers".into());
        args.push(joined);
    }

    for (flag, value) in [
        ("-reconnect", "1".to_string()),
        ("-reconnect_at_eof", "1".to_string()),
        ("-reconnect_streamed", "1".to_string()),
        (
            "-reconnect_delay_max",
            settings.reconnect_delay_max.as_secs().to_string(),
        ),
    ] {
        args.push(flag.into());
        args.push(value);
    }

    args.push(url.to_string());
    args
}

#[derive(Debug, Deserialize)]
struct ProberReport {
    #[serde(default)]
    streams: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    format: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Interpret the prober's JSON stdout from a successful run.
pub fn parse_prober_output(stdout: &[u8]) -> MediaProbeResult {
    match serde_json::from_slice::<ProberReport>(stdout) {
        Ok(report) => MediaProbeResult {
            succeeded: true,
            has_streams: report.streams.is_some_and(|s| !s.is_empty()),
            has_format: report.format.is_some_and(|f| !f.is_empty()),
            failure: None,
        },
        Err(err) => {
            engine_debug!("prober output unreadable: {}", err);
            MediaProbeResult::failed(FailureKind::ProberOutput)
        }
    }
}
