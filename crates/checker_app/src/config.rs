use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use checker_core::EscalationRules;
use checker_engine::{
    CourtesyDelay, DispatchSettings, EngineConfig, FetchSettings, ProberSettings,
    BROWSER_USER_AGENT,
};
use engine_logging::engine_info;
use serde::Deserialize;

use crate::cli::Cli;

/// The prober is killed this long after its own I/O timeout at the earliest.
const PROBER_TIMEOUT_MARGIN_SECS: u64 = 5;

/// On-disk settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub dedupe: bool,
    pub workers: usize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub window_bytes: usize,
    pub min_bytes: usize,
    pub user_agent: String,
    pub prober_enabled: bool,
    pub prober_binary: PathBuf,
    pub prober_timeout_secs: u64,
    pub probe_duration_secs: u64,
    pub prober_headers: Vec<String>,
    pub escalation_keywords: Vec<String>,
    pub escalation_case_sensitive: bool,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub progress_interval_ms: u64,
    pub run_deadline_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            dedupe: true,
            workers: 8,
            connect_timeout_secs: 10,
            request_timeout_secs: 15,
            redirect_limit: 10,
            window_bytes: 4096,
            min_bytes: 1,
            user_agent: BROWSER_USER_AGENT.to_string(),
            prober_enabled: true,
            prober_binary: PathBuf::from("ffprobe"),
            prober_timeout_secs: 20,
            probe_duration_secs: 8,
            prober_headers: Vec::new(),
            escalation_keywords: Vec::new(),
            escalation_case_sensitive: false,
            delay_min_ms: 200,
            delay_max_ms: 600,
            progress_interval_ms: 500,
            run_deadline_secs: None,
        }
    }
}

impl AppConfig {
    /// Defaults, or the RON file at `path` layered over them.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_ron(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        engine_info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(output) = &cli.output {
            self.output_dir = output.clone();
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(timeout) = cli.timeout {
            self.request_timeout_secs = timeout;
        }
        if cli.no_prober {
            self.prober_enabled = false;
        }
        if let Some(binary) = &cli.prober {
            self.prober_binary = binary.clone();
        }
        if !cli.escalate.is_empty() {
            self.escalation_keywords.extend(cli.escalate.iter().cloned());
        }
        if cli.no_dedupe {
            self.dedupe = false;
        }
        if let Some(deadline) = cli.deadline {
            self.run_deadline_secs = Some(deadline);
        }
    }

    /// Hard prober timeout, never below the fetch timeout plus a margin.
    fn prober_timeout(&self) -> u64 {
        self.prober_timeout_secs
            .max(self.request_timeout_secs.saturating_add(PROBER_TIMEOUT_MARGIN_SECS))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            fetch: FetchSettings {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                redirect_limit: self.redirect_limit,
                window_bytes: self.window_bytes.max(1),
                user_agent: self.user_agent.clone(),
                accept_invalid_certs: true,
            },
            prober: ProberSettings {
                binary: self.prober_binary.clone(),
                timeout: Duration::from_secs(self.prober_timeout()),
                probe_duration: Duration::from_secs(self.probe_duration_secs),
                io_timeout: Duration::from_secs(self.request_timeout_secs),
                user_agent: self.user_agent.clone(),
                headers: self.prober_headers.clone(),
                ..ProberSettings::default()
            },
            prober_enabled: self.prober_enabled,
            dispatch: DispatchSettings {
                workers: self.workers.max(1),
                delay: CourtesyDelay {
                    min: Duration::from_millis(self.delay_min_ms.min(self.delay_max_ms)),
                    max: Duration::from_millis(self.delay_max_ms),
                },
                run_deadline: self.run_deadline_secs.map(Duration::from_secs),
            },
            escalation: EscalationRules::new(
                self.escalation_keywords.iter().cloned(),
                self.escalation_case_sensitive,
            ),
            min_bytes: self.min_bytes,
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            listen_for_interrupts: true,
        }
    }
}
