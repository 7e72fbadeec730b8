use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use checker_core::{CheckItem, FailureKind, ResultStore, Verdict};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use futures_util::FutureExt;
use parking_lot::Mutex;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::fetch::{EventSink, Fetcher, FetcherFactory};
use crate::pipeline::CheckPipeline;
use crate::{EngineError, EngineEvent, ItemReport, RunSummary};

/// Random pause after each check so a run does not hammer one CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourtesyDelay {
    pub min: Duration,
    pub max: Duration,
}

impl CourtesyDelay {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for CourtesyDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(200),
            max: Duration::from_millis(600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Upper bound on concurrent workers; clamped to the item count.
    pub workers: usize,
    pub delay: CourtesyDelay,
    /// Stop intake once this much time has passed. `None` runs to completion.
    pub run_deadline: Option<Duration>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            workers: 8,
            delay: CourtesyDelay::default(),
            run_deadline: None,
        }
    }
}

/// Two-level stop: `intake` ends claiming, `inflight` also abandons running checks.
#[derive(Debug, Clone, Default)]
pub struct StopSignals {
    intake: CancellationToken,
    inflight: CancellationToken,
}

impl StopSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_intake(&self) {
        self.intake.cancel();
    }

    pub fn abort_inflight(&self) {
        self.intake.cancel();
        self.inflight.cancel();
    }

    pub fn is_stopping(&self) -> bool {
        self.intake.is_cancelled()
    }
}

/// Shared depletable work source; each item is handed out at most once.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<CheckItem>>,
}

impl WorkQueue {
    pub fn new(items: Vec<CheckItem>) -> Self {
        Self {
            items: Mutex::new(items.into()),
        }
    }

    pub fn claim(&self) -> Option<CheckItem> {
        self.items.lock().pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.items.lock().len()
    }
}

pub struct Dispatcher {
    settings: DispatchSettings,
    fetchers: Arc<dyn FetcherFactory>,
    pipeline: Arc<CheckPipeline>,
}

impl Dispatcher {
    pub fn new(
        settings: DispatchSettings,
        fetchers: Arc<dyn FetcherFactory>,
        pipeline: Arc<CheckPipeline>,
    ) -> Self {
        Self {
            settings,
            fetchers,
            pipeline,
        }
    }

    /// Check every item with a fixed pool of workers and wait for all of them.
    ///
    /// Only a failure to build the per-worker HTTP clients is an error; every
    /// per-item failure becomes a dead verdict in `store`.
    pub async fn run(
        &self,
        items: Vec<CheckItem>,
        store: Arc<ResultStore>,
        sink: Arc<dyn EventSink>,
        stop: StopSignals,
    ) -> Result<RunSummary, EngineError> {
        let started = Instant::now();
        let total = items.len();
        let worker_count = self.settings.workers.max(1).min(total);

        let fetchers = (0..worker_count)
            .map(|_| self.fetchers.create())
            .collect::<Result<Vec<_>, _>>()
            .map_err(EngineError::ClientSetup)?;

        engine_info!(
            "checking {} items with {} workers (prober {})",
            total,
            worker_count,
            if self.pipeline.prober_available() {
                "enabled"
            } else {
                "disabled"
            }
        );

        let queue = Arc::new(WorkQueue::new(items));
        let deadline = self.settings.run_deadline.map(|limit| {
            let stop = stop.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                engine_warn!("run deadline of {:?} reached; no new checks", limit);
                stop.stop_intake();
            })
        });

        let handles: Vec<_> = fetchers
            .into_iter()
            .enumerate()
            .map(|(worker_id, fetcher)| {
                let worker = Worker {
                    id: worker_id,
                    fetcher,
                    pipeline: self.pipeline.clone(),
                    queue: queue.clone(),
                    store: store.clone(),
                    sink: sink.clone(),
                    delay: self.settings.delay,
                    stop: stop.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        for result in futures_util::future::join_all(handles).await {
            match result {
                Ok(checked) => engine_debug!("worker finished after {} checks", checked),
                Err(err) => engine_error!("worker task failed: {}", err),
            }
        }
        if let Some(handle) = deadline {
            handle.abort();
        }

        let snapshot = store.snapshot();
        Ok(RunSummary {
            total,
            checked: store.completed(),
            live: snapshot.live_count(),
            dead: snapshot.dead_count(),
            unchecked: queue.remaining(),
            elapsed: started.elapsed(),
        })
    }
}

struct Worker {
    id: usize,
    fetcher: Arc<dyn Fetcher>,
    pipeline: Arc<CheckPipeline>,
    queue: Arc<WorkQueue>,
    store: Arc<ResultStore>,
    sink: Arc<dyn EventSink>,
    delay: CourtesyDelay,
    stop: StopSignals,
}

impl Worker {
    async fn run(self) -> usize {
        let mut checked = 0;
        loop {
            if self.stop.intake.is_cancelled() {
                break;
            }
            let Some(item) = self.queue.claim() else {
                break;
            };

            let check = AssertUnwindSafe(self.pipeline.check(self.fetcher.as_ref(), item.clone()))
                .catch_unwind();
            let report = tokio::select! {
                biased;
                _ = self.stop.inflight.cancelled() => aborted(item, FailureKind::Cancelled),
                outcome = check => match outcome {
                    Ok(report) => report,
                    Err(_) => {
                        engine_error!("worker {} panicked while checking {}", self.id, item.url);
                        aborted(item, FailureKind::WorkerFault)
                    }
                },
            };

            // Recording is the single point where an item is counted.
            self.store.record(&report.verdict);
            checked += 1;
            engine_info!(
                "{}: {} ({})",
                if report.verdict.is_live { "live" } else { "dead" },
                report.verdict.item.title,
                report.verdict.reason
            );
            self.sink.emit(EngineEvent::ItemChecked(report));

            let pause = self.delay.sample();
            if !pause.is_zero() {
                tokio::select! {
                    _ = self.stop.intake.cancelled() => {}
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }
        checked
    }
}

fn aborted(item: CheckItem, kind: FailureKind) -> ItemReport {
    ItemReport {
        verdict: Verdict::aborted(item, kind),
        http_status: None,
        bytes_read: 0,
        escalated: false,
        prober_invoked: false,
    }
}
