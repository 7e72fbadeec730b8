use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use checker_core::{CheckItem, EscalationRules, ResultStore};
use engine_logging::{engine_error, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::classify::HeuristicClassifier;
use crate::dispatch::{DispatchSettings, Dispatcher, StopSignals};
use crate::fetch::{ChannelEventSink, EventSink, FetchSettings, FetcherFactory, ReqwestFetcherFactory};
use crate::pipeline::CheckPipeline;
use crate::progress::spawn_progress_reporter;
use crate::prober::{FfprobeProber, MediaProber, ProberSettings, ProberUnavailable};
use crate::{EngineError, EngineEvent};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub fetch: FetchSettings,
    pub prober: ProberSettings,
    pub prober_enabled: bool,
    pub dispatch: DispatchSettings,
    pub escalation: EscalationRules,
    /// Leading windows shorter than this are never judged by the heuristic.
    pub min_bytes: usize,
    pub progress_interval: Duration,
    /// Turn Ctrl-C into [`EngineEvent::InterruptRequested`].
    pub listen_for_interrupts: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            prober: ProberSettings::default(),
            prober_enabled: true,
            dispatch: DispatchSettings::default(),
            escalation: EscalationRules::default(),
            min_bytes: HeuristicClassifier::default().min_bytes,
            progress_interval: Duration::from_millis(500),
            listen_for_interrupts: true,
        }
    }
}

enum EngineCommand {
    Start { items: Vec<CheckItem> },
    Stop { immediate: bool },
}

/// Owns the async runtime on a background thread; the caller talks to it
/// through commands and polls events.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    store: Arc<ResultStore>,
    prober_available: bool,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let factory: Arc<dyn FetcherFactory> =
            Arc::new(ReqwestFetcherFactory::new(config.fetch.clone()));
        Self::with_fetchers(config, factory)
    }

    /// Like [`EngineHandle::new`] with a caller-supplied fetcher source.
    pub fn with_fetchers(
        config: EngineConfig,
        fetchers: Arc<dyn FetcherFactory>,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        // Fail before any work is queued if no client can be built.
        fetchers.create().map_err(EngineError::ClientSetup)?;

        let prober = match runtime.block_on(resolve_prober(&config)) {
            Ok(prober) => Some(prober),
            Err(ProberUnavailable::Disabled) => {
                engine_info!("media prober disabled; heuristic verdicts only");
                None
            }
            Err(reason) => {
                engine_warn!("{}; heuristic verdicts only", reason);
                None
            }
        };
        let prober_available = prober.is_some();

        let pipeline = Arc::new(CheckPipeline::new(
            HeuristicClassifier::new(config.min_bytes),
            config.escalation.clone(),
            prober,
        ));
        let dispatcher = Arc::new(Dispatcher::new(config.dispatch.clone(), fetchers, pipeline));
        let store = Arc::new(ResultStore::new());

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));

        if config.listen_for_interrupts {
            let sink = sink.clone();
            runtime.spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    sink.emit(EngineEvent::InterruptRequested);
                }
            });
        }

        let run_store = store.clone();
        let progress_interval = config.progress_interval;
        thread::spawn(move || {
            let mut current: Option<StopSignals> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Start { items } => {
                        let stop = StopSignals::new();
                        current = Some(stop.clone());
                        runtime.spawn(run_checks(
                            dispatcher.clone(),
                            items,
                            run_store.clone(),
                            sink.clone(),
                            stop,
                            progress_interval,
                        ));
                    }
                    EngineCommand::Stop { immediate } => match &current {
                        Some(stop) if immediate => stop.abort_inflight(),
                        Some(stop) => stop.stop_intake(),
                        None => {}
                    },
                }
            }
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            store,
            prober_available,
        })
    }

    pub fn start(&self, items: Vec<CheckItem>) {
        let _ = self.cmd_tx.send(EngineCommand::Start { items });
    }

    /// Stop claiming new items; with `immediate`, also abandon in-flight checks.
    pub fn stop(&self, immediate: bool) {
        let _ = self.cmd_tx.send(EngineCommand::Stop { immediate });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    pub fn results(&self) -> Arc<ResultStore> {
        self.store.clone()
    }

    pub fn prober_available(&self) -> bool {
        self.prober_available
    }
}

async fn resolve_prober(config: &EngineConfig) -> Result<Arc<dyn MediaProber>, ProberUnavailable> {
    if !config.prober_enabled {
        return Err(ProberUnavailable::Disabled);
    }
    let prober = FfprobeProber::discover(config.prober.clone()).await?;
    Ok(Arc::new(prober))
}

async fn run_checks(
    dispatcher: Arc<Dispatcher>,
    items: Vec<CheckItem>,
    store: Arc<ResultStore>,
    sink: Arc<dyn EventSink>,
    stop: StopSignals,
    progress_interval: Duration,
) {
    let progress_stop = CancellationToken::new();
    let progress = spawn_progress_reporter(
        store.clone(),
        items.len(),
        progress_interval,
        sink.clone(),
        progress_stop.clone(),
    );

    let outcome = dispatcher.run(items, store, sink.clone(), stop).await;
    progress_stop.cancel();
    let _ = progress.await;

    match outcome {
        Ok(summary) => {
            engine_info!(
                "run finished: {} live, {} dead, {} unchecked in {:.1}s",
                summary.live,
                summary.dead,
                summary.unchecked,
                summary.elapsed.as_secs_f64()
            );
            sink.emit(EngineEvent::RunCompleted(summary));
        }
        Err(err) => {
            engine_error!("run failed: {}", err);
            sink.emit(EngineEvent::RunFailed(err.to_string()));
        }
    }
}
