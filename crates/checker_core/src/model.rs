use std::fmt;

/// One playlist entry waiting to be checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckItem {
    pub group: String,
    pub title: String,
    pub url: String,
}

impl CheckItem {
    pub fn new(group: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transport,
    Protocol,
    ProberUnavailable,
    ProberTimeout,
    ProberFailure,
    Parse,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Connect,
    Timeout,
    RedirectLimitExceeded,
    Network,
    HttpStatus(u16),
    ProberUnavailable,
    ProberLaunch,
    ProberTimeout,
    ProberExit(Option<i32>),
    ProberOutput,
    MalformedEntry,
    Cancelled,
    WorkerFault,
}

impl FailureKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            FailureKind::InvalidUrl
            | FailureKind::Connect
            | FailureKind::Timeout
            | FailureKind::RedirectLimitExceeded
            | FailureKind::Network => ErrorClass::Transport,
            FailureKind::HttpStatus(_) => ErrorClass::Protocol,
            FailureKind::ProberUnavailable => ErrorClass::ProberUnavailable,
            FailureKind::ProberTimeout => ErrorClass::ProberTimeout,
            FailureKind::ProberLaunch | FailureKind::ProberExit(_) | FailureKind::ProberOutput => {
                ErrorClass::ProberFailure
            }
            FailureKind::MalformedEntry => ErrorClass::Parse,
            FailureKind::Cancelled | FailureKind::WorkerFault => ErrorClass::Internal,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Connect => write!(f, "connection failed"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::ProberUnavailable => write!(f, "prober unavailable"),
            FailureKind::ProberLaunch => write!(f, "prober failed to launch"),
            FailureKind::ProberTimeout => write!(f, "prober timeout"),
            FailureKind::ProberExit(Some(code)) => write!(f, "prober exited with code {code}"),
            FailureKind::ProberExit(None) => write!(f, "prober killed by signal"),
            FailureKind::ProberOutput => write!(f, "prober output unreadable"),
            FailureKind::MalformedEntry => write!(f, "malformed playlist entry"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::WorkerFault => write!(f, "worker fault"),
        }
    }
}

/// Outcome of one bounded HTTP probe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeResult {
    pub http_status: Option<u16>,
    pub leading_bytes: Vec<u8>,
    pub error: Option<FailureKind>,
}

impl ProbeResult {
    pub fn fetched(http_status: u16, leading_bytes: Vec<u8>) -> Self {
        Self {
            http_status: Some(http_status),
            leading_bytes,
            error: None,
        }
    }

    pub fn failed(kind: FailureKind) -> Self {
        let http_status = match kind {
            FailureKind::HttpStatus(code) => Some(code),
            _ => None,
        };
        Self {
            http_status,
            leading_bytes: Vec::new(),
            error: Some(kind),
        }
    }

    pub fn byte_count(&self) -> usize {
        self.leading_bytes.len()
    }

    /// True only for an error-free exchange with status exactly 200.
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.http_status == Some(200)
    }

    /// The failure to report when the probe did not succeed.
    pub fn failure(&self) -> Option<FailureKind> {
        match (&self.error, self.http_status) {
            (Some(kind), _) => Some(kind.clone()),
            (None, Some(200)) => None,
            (None, Some(code)) => Some(FailureKind::HttpStatus(code)),
            (None, None) => Some(FailureKind::Network),
        }
    }
}

/// Outcome of one media prober run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaProbeResult {
    pub succeeded: bool,
    pub has_streams: bool,
    pub has_format: bool,
    pub failure: Option<FailureKind>,
}

impl MediaProbeResult {
    pub fn failed(kind: FailureKind) -> Self {
        Self {
            succeeded: false,
            has_streams: false,
            has_format: false,
            failure: Some(kind),
        }
    }

    pub fn confirmed(&self) -> bool {
        self.succeeded && (self.has_streams || self.has_format)
    }
}

/// Which manifest line made the leading window look like a live playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSignal {
    VariantStream,
    SegmentInfo,
    NestedPlaylist,
}

impl fmt::Display for ManifestSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestSignal::VariantStream => write!(f, "variant stream"),
            ManifestSignal::SegmentInfo => write!(f, "segment info"),
            ManifestSignal::NestedPlaylist => write!(f, "nested playlist"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictReason {
    FetchFailed(FailureKind),
    Heuristic(ManifestSignal),
    ProberConfirmed,
    ProberRejected(Option<FailureKind>),
    HeuristicFallback(ManifestSignal),
    Inconclusive,
    Aborted(FailureKind),
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictReason::FetchFailed(kind) => write!(f, "fetch failed: {kind}"),
            VerdictReason::Heuristic(signal) => write!(f, "manifest with {signal}"),
            VerdictReason::ProberConfirmed => write!(f, "confirmed by prober"),
            VerdictReason::ProberRejected(Some(kind)) => write!(f, "not confirmed: {kind}"),
            VerdictReason::ProberRejected(None) => write!(f, "not confirmed: no streams"),
            VerdictReason::HeuristicFallback(signal) => {
                write!(f, "manifest with {signal} (prober unavailable)")
            }
            VerdictReason::Inconclusive => write!(f, "no playable manifest"),
            VerdictReason::Aborted(kind) => write!(f, "aborted: {kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub item: CheckItem,
    pub is_live: bool,
    pub reason: VerdictReason,
}

impl Verdict {
    /// A dead verdict for a check that never reached the policy.
    pub fn aborted(item: CheckItem, kind: FailureKind) -> Self {
        Self {
            item,
            is_live: false,
            reason: VerdictReason::Aborted(kind),
        }
    }
}
