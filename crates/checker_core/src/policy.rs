//! Verdict policy: pure functions from stage outcomes to a liveness decision.
use crate::{ManifestSignal, MediaProbeResult, ProbeResult, VerdictReason};

/// Everything the policy knows about an item before the prober runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInput<'a> {
    pub probe: &'a ProbeResult,
    pub heuristic: Option<ManifestSignal>,
    pub escalate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub is_live: bool,
    pub reason: VerdictReason,
}

impl Decision {
    fn live(reason: VerdictReason) -> Self {
        Self {
            is_live: true,
            reason,
        }
    }

    fn dead(reason: VerdictReason) -> Self {
        Self {
            is_live: false,
            reason,
        }
    }
}

/// Whether the worker should run the media prober for this input.
///
/// Never true for a failed fetch, nor when the prober is absent for the run.
pub fn requires_media_probe(input: &PolicyInput<'_>, prober_available: bool) -> bool {
    if !prober_available || !input.probe.succeeded() {
        return false;
    }
    input.heuristic.is_none() || input.escalate
}

/// Final decision. `media` is `None` when the prober was not run.
pub fn decide(input: &PolicyInput<'_>, media: Option<&MediaProbeResult>) -> Decision {
    if let Some(kind) = input.probe.failure() {
        return Decision::dead(VerdictReason::FetchFailed(kind));
    }

    match (input.heuristic, input.escalate) {
        (Some(signal), false) => Decision::live(VerdictReason::Heuristic(signal)),
        (heuristic, _) => match media {
            Some(result) if result.confirmed() => Decision::live(VerdictReason::ProberConfirmed),
            Some(result) => Decision::dead(VerdictReason::ProberRejected(result.failure.clone())),
            None => match heuristic {
                Some(signal) => Decision::live(VerdictReason::HeuristicFallback(signal)),
                None => Decision::dead(VerdictReason::Inconclusive),
            },
        },
    }
}
