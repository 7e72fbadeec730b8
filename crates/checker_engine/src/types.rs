use std::time::Duration;

use checker_core::{FailureKind, Verdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Sample of the shared completed counter.
    Progress(RunProgress),
    /// One item went through the pipeline and was recorded.
    ItemChecked(ItemReport),
    /// The user asked to stop (Ctrl-C) or the run deadline elapsed.
    InterruptRequested,
    /// All workers have stopped.
    RunCompleted(RunSummary),
    /// The run could not start; nothing was checked.
    RunFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunProgress {
    pub completed: usize,
    pub total: usize,
}

/// Per-item diagnostics alongside the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub verdict: Verdict,
    pub http_status: Option<u16>,
    pub bytes_read: usize,
    pub escalated: bool,
    pub prober_invoked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub checked: usize,
    pub live: usize,
    pub dead: usize,
    pub unchecked: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub status: u16,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

/// Startup failures that prevent a run from starting at all.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to build http client: {0}")]
    ClientSetup(FetchError),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
