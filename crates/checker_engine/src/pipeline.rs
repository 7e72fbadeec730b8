use std::sync::Arc;

use checker_core::{
    decide, requires_media_probe, CheckItem, EscalationRules, PolicyInput, ProbeResult, Verdict,
};
use engine_logging::{engine_debug, engine_info};

use crate::classify::HeuristicClassifier;
use crate::fetch::Fetcher;
use crate::prober::MediaProber;
use crate::ItemReport;

/// Fetcher -> heuristic classifier -> (maybe) media prober -> verdict policy.
///
/// Stateless across items; shared by all workers.
#[derive(Clone)]
pub struct CheckPipeline {
    classifier: HeuristicClassifier,
    escalation: EscalationRules,
    prober: Option<Arc<dyn MediaProber>>,
}

impl CheckPipeline {
    pub fn new(
        classifier: HeuristicClassifier,
        escalation: EscalationRules,
        prober: Option<Arc<dyn MediaProber>>,
    ) -> Self {
        Self {
            classifier,
            escalation,
            prober,
        }
    }

    pub fn prober_available(&self) -> bool {
        self.prober.is_some()
    }

    pub async fn check(&self, fetcher: &dyn Fetcher, item: CheckItem) -> ItemReport {
        let matched = self.escalation.matched_keyword(&item);
        let escalate = matched.is_some();
        if let Some(keyword) = matched {
            engine_debug!("[forced verification: {}] {}", keyword, item.title);
        }

        let (probe, content_type) = match fetcher.fetch(&item.url).await {
            Ok(output) => (
                ProbeResult::fetched(output.metadata.status, output.bytes),
                output.metadata.content_type,
            ),
            Err(err) => {
                engine_info!("[{}] {}: {}", err.kind, item.title, err.message);
                (ProbeResult::failed(err.kind), None)
            }
        };

        let heuristic = if probe.succeeded() {
            self.classifier
                .classify(&probe.leading_bytes, content_type.as_deref())
        } else {
            None
        };
        let input = PolicyInput {
            probe: &probe,
            heuristic,
            escalate,
        };

        let media = match &self.prober {
            Some(prober) if requires_media_probe(&input, true) => {
                let result = prober.probe(&item.url).await;
                match &result.failure {
                    Some(kind) => engine_info!("[{} {}] {}", prober.name(), kind, item.title),
                    None if result.confirmed() => {
                        engine_info!("[{} confirmed] {}", prober.name(), item.title)
                    }
                    None => engine_info!("[{} found no streams] {}", prober.name(), item.title),
                }
                Some(result)
            }
            _ => None,
        };

        let decision = decide(&input, media.as_ref());
        ItemReport {
            http_status: probe.http_status,
            bytes_read: probe.byte_count(),
            escalated: escalate,
            prober_invoked: media.is_some(),
            verdict: Verdict {
                item,
                is_live: decision.is_live,
                reason: decision.reason,
            },
        }
    }
}
