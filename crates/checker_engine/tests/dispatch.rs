use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use checker_core::{
    CheckItem, EscalationRules, FailureKind, MediaProbeResult, ResultStore, VerdictReason,
};
use checker_engine::{
    CheckPipeline, CourtesyDelay, DispatchSettings, Dispatcher, EngineEvent, EventSink,
    FetchError, FetchMetadata, FetchOutput, Fetcher, FetcherFactory, HeuristicClassifier,
    MediaProber, StopSignals,
};
use pretty_assertions::assert_eq;

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(engine_logging::initialize_for_tests);
}

const VARIANT: &str = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nlow.m3u8\n";
const HEADER_ONLY: &str = "#EXTM3U\n#EXT-X-VERSION:3\n";

#[derive(Clone)]
enum Reply {
    Body(&'static str),
    Status(u16),
    Slow(u64),
    Hang,
    Panic,
}

/// Answers from a fixed table; unknown URLs get a 404.
#[derive(Default)]
struct ScriptedFetcher {
    replies: HashMap<String, Reply>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn with(replies: impl IntoIterator<Item = (String, Reply)>) -> Arc<Self> {
        Arc::new(Self {
            replies: replies.into_iter().collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(url).cloned().unwrap_or(Reply::Status(404)) {
            Reply::Body(body) => Ok(FetchOutput {
                bytes: body.as_bytes().to_vec(),
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: url.to_string(),
                    status: 200,
                    redirect_count: 0,
                    content_type: None,
                    byte_len: body.len(),
                },
            }),
            Reply::Status(code) => Err(FetchError::new(
                FailureKind::HttpStatus(code),
                format!("status {code}"),
            )),
            Reply::Slow(millis) => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Err(FetchError::new(FailureKind::HttpStatus(503), "slow"))
            }
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::new(FailureKind::Timeout, "hung"))
            }
            Reply::Panic => panic!("fetcher blew up on {url}"),
        }
    }
}

/// Every worker shares the same scripted fetcher.
struct SharedFactory(Arc<ScriptedFetcher>);

impl FetcherFactory for SharedFactory {
    fn create(&self) -> Result<Arc<dyn Fetcher>, FetchError> {
        Ok(self.0.clone())
    }
}

struct FailingFactory;

impl FetcherFactory for FailingFactory {
    fn create(&self) -> Result<Arc<dyn Fetcher>, FetchError> {
        Err(FetchError::new(FailureKind::Network, "no tls backend"))
    }
}

struct CountingProber {
    confirm: bool,
    calls: AtomicUsize,
}

impl CountingProber {
    fn new(confirm: bool) -> Arc<Self> {
        Arc::new(Self {
            confirm,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MediaProber for CountingProber {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn probe(&self, _url: &str) -> MediaProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.confirm {
            MediaProbeResult {
                succeeded: true,
                has_streams: true,
                has_format: true,
                failure: None,
            }
        } else {
            MediaProbeResult::failed(FailureKind::ProberExit(Some(1)))
        }
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl CollectingSink {
    fn checked(&self) -> Vec<checker_engine::ItemReport> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::ItemChecked(report) => Some(report.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn item(group: &str, title: &str, url: &str) -> CheckItem {
    CheckItem::new(group, title, url)
}

fn settings(workers: usize) -> DispatchSettings {
    DispatchSettings {
        workers,
        delay: CourtesyDelay::none(),
        run_deadline: None,
    }
}

fn dispatcher(
    workers: usize,
    fetcher: Arc<ScriptedFetcher>,
    escalation: EscalationRules,
    prober: Option<Arc<CountingProber>>,
) -> Dispatcher {
    let prober = prober.map(|p| p as Arc<dyn MediaProber>);
    let pipeline = CheckPipeline::new(HeuristicClassifier::default(), escalation, prober);
    Dispatcher::new(
        settings(workers),
        Arc::new(SharedFactory(fetcher)),
        Arc::new(pipeline),
    )
}

async fn run(
    dispatcher: &Dispatcher,
    items: Vec<CheckItem>,
) -> (Arc<ResultStore>, Arc<CollectingSink>, checker_engine::RunSummary) {
    let store = Arc::new(ResultStore::new());
    let sink = Arc::new(CollectingSink::default());
    let summary = dispatcher
        .run(items, store.clone(), sink.clone(), StopSignals::new())
        .await
        .expect("run completes");
    (store, sink, summary)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_item_is_recorded_exactly_once() {
    init_logging();
    for round in 0..20 {
        let items: Vec<_> = (0..50)
            .map(|i| item(&format!("g{}", i % 3), &format!("ch{i}"), &format!("http://h/{i}")))
            .collect();
        let replies = (0..50).map(|i| {
            let reply = if i % 2 == 0 {
                Reply::Body(VARIANT)
            } else {
                Reply::Status(500)
            };
            (format!("http://h/{i}"), reply)
        });
        let fetcher = ScriptedFetcher::with(replies);
        let d = dispatcher(8, fetcher.clone(), EscalationRules::default(), None);

        let (store, sink, summary) = run(&d, items).await;
        let snapshot = store.snapshot();

        let mut seen = HashSet::new();
        for entry in snapshot.live.values().chain(snapshot.dead.values()).flatten() {
            assert!(seen.insert(entry.url.clone()), "round {round}: {} twice", entry.url);
        }
        assert_eq!(seen.len(), 50, "round {round}");
        assert_eq!(snapshot.live_count(), 25);
        assert_eq!(snapshot.dead_count(), 25);
        assert_eq!(store.completed(), 50);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 50);
        assert_eq!(sink.checked().len(), 50);
        assert_eq!(summary.checked, 50);
        assert_eq!(summary.unchecked, 0);
    }
}

#[tokio::test]
async fn plausible_manifest_is_live_without_the_prober() {
    init_logging();
    let fetcher = ScriptedFetcher::with([("http://h/a".to_string(), Reply::Body(VARIANT))]);
    let prober = CountingProber::new(false);
    let d = dispatcher(2, fetcher, EscalationRules::default(), Some(prober.clone()));

    let (_, sink, summary) = run(&d, vec![item("News", "A", "http://h/a")]).await;

    let reports = sink.checked();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].verdict.is_live);
    assert!(!reports[0].prober_invoked);
    assert_eq!(prober.calls(), 0);
    assert_eq!(summary.live, 1);
}

#[tokio::test]
async fn http_error_is_dead_and_never_probed() {
    init_logging();
    let fetcher = ScriptedFetcher::with([("http://h/gone".to_string(), Reply::Status(404))]);
    let prober = CountingProber::new(true);
    let d = dispatcher(1, fetcher, EscalationRules::default(), Some(prober.clone()));

    let (store, sink, _) = run(&d, vec![item("News", "Gone", "http://h/gone")]).await;

    let reports = sink.checked();
    let report = &reports[0];
    assert!(!report.verdict.is_live);
    assert_eq!(
        report.verdict.reason,
        VerdictReason::FetchFailed(FailureKind::HttpStatus(404))
    );
    assert_eq!(report.http_status, Some(404));
    assert_eq!(prober.calls(), 0);
    assert_eq!(store.snapshot().dead["News"][0].title, "Gone");
}

#[tokio::test]
async fn escalated_item_follows_the_prober() {
    init_logging();
    let rules = EscalationRules::new(["flaky"], false);
    let replies = [
        ("http://h/1".to_string(), Reply::Body(VARIANT)),
        ("http://h/2".to_string(), Reply::Body(VARIANT)),
    ];

    let confirming = CountingProber::new(true);
    let d = dispatcher(1, ScriptedFetcher::with(replies.clone()), rules.clone(), Some(confirming.clone()));
    let (_, sink, _) = run(&d, vec![item("G", "FLAKY One", "http://h/1")]).await;
    let reports = sink.checked();
    let report = &reports[0];
    assert!(report.escalated);
    assert!(report.prober_invoked);
    assert!(report.verdict.is_live);
    assert_eq!(report.verdict.reason, VerdictReason::ProberConfirmed);

    let rejecting = CountingProber::new(false);
    let d = dispatcher(1, ScriptedFetcher::with(replies), rules, Some(rejecting.clone()));
    let (_, sink, _) = run(&d, vec![item("G", "flaky two", "http://h/2")]).await;
    let reports = sink.checked();
    let report = &reports[0];
    assert!(!report.verdict.is_live);
    assert_eq!(rejecting.calls(), 1);
}

#[tokio::test]
async fn without_a_prober_escalation_falls_back_to_the_heuristic() {
    init_logging();
    let rules = EscalationRules::new(["flaky"], false);
    let fetcher = ScriptedFetcher::with([
        ("http://flaky/1".to_string(), Reply::Body(VARIANT)),
        ("http://flaky/2".to_string(), Reply::Body(HEADER_ONLY)),
    ]);
    let d = dispatcher(2, fetcher, rules, None);

    let (_, sink, _) = run(
        &d,
        vec![item("G", "one", "http://flaky/1"), item("G", "two", "http://flaky/2")],
    )
    .await;

    let mut reports = sink.checked();
    reports.sort_by(|a, b| a.verdict.item.url.cmp(&b.verdict.item.url));
    assert!(reports.iter().all(|r| r.escalated && !r.prober_invoked));
    assert!(reports[0].verdict.is_live);
    assert!(matches!(reports[0].verdict.reason, VerdictReason::HeuristicFallback(_)));
    assert!(!reports[1].verdict.is_live);
    assert_eq!(reports[1].verdict.reason, VerdictReason::Inconclusive);
}

#[tokio::test]
async fn inconclusive_window_is_escalated_to_the_prober() {
    init_logging();
    let fetcher = ScriptedFetcher::with([("http://h/x".to_string(), Reply::Body(HEADER_ONLY))]);
    let prober = CountingProber::new(true);
    let d = dispatcher(1, fetcher, EscalationRules::default(), Some(prober.clone()));

    let (_, sink, _) = run(&d, vec![item("G", "x", "http://h/x")]).await;
    assert!(sink.checked()[0].verdict.is_live);
    assert_eq!(prober.calls(), 1);
}

#[tokio::test]
async fn panicking_check_is_recorded_dead_and_the_run_continues() {
    init_logging();
    let fetcher = ScriptedFetcher::with([
        ("http://h/boom".to_string(), Reply::Panic),
        ("http://h/ok".to_string(), Reply::Body(VARIANT)),
    ]);
    let d = dispatcher(1, fetcher, EscalationRules::default(), None);

    let (store, _, summary) = run(
        &d,
        vec![item("G", "boom", "http://h/boom"), item("G", "ok", "http://h/ok")],
    )
    .await;

    let snapshot = store.snapshot();
    assert_eq!(snapshot.dead["G"][0].url, "http://h/boom");
    assert_eq!(snapshot.live["G"][0].url, "http://h/ok");
    assert_eq!(summary.checked, 2);
}

#[tokio::test]
async fn stopping_intake_leaves_the_rest_unchecked() {
    init_logging();
    let items: Vec<_> = (0..10)
        .map(|i| item("G", &format!("c{i}"), &format!("http://h/{i}")))
        .collect();
    let fetcher = ScriptedFetcher::with((0..10).map(|i| (format!("http://h/{i}"), Reply::Body(VARIANT))));
    let pipeline = CheckPipeline::new(HeuristicClassifier::default(), EscalationRules::default(), None);
    let d = Dispatcher::new(
        DispatchSettings {
            workers: 1,
            delay: CourtesyDelay {
                min: Duration::from_millis(50),
                max: Duration::from_millis(50),
            },
            run_deadline: None,
        },
        Arc::new(SharedFactory(fetcher)),
        Arc::new(pipeline),
    );

    let store = Arc::new(ResultStore::new());
    let sink = Arc::new(CollectingSink::default());
    let stop = StopSignals::new();
    let stopper = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        stopper.stop_intake();
    });

    let summary = d.run(items, store.clone(), sink, stop).await.unwrap();
    assert!(summary.checked >= 1 && summary.checked < 10, "{summary:?}");
    assert_eq!(summary.checked + summary.unchecked, 10);
    assert_eq!(store.completed(), summary.checked);
}

#[tokio::test]
async fn immediate_stop_records_in_flight_items_as_cancelled() {
    init_logging();
    let fetcher = ScriptedFetcher::with([
        ("http://h/hang1".to_string(), Reply::Hang),
        ("http://h/hang2".to_string(), Reply::Hang),
    ]);
    let d = dispatcher(2, fetcher, EscalationRules::default(), None);
    let items = vec![
        item("G", "h1", "http://h/hang1"),
        item("G", "h2", "http://h/hang2"),
        item("G", "later", "http://h/later"),
    ];

    let store = Arc::new(ResultStore::new());
    let sink = Arc::new(CollectingSink::default());
    let stop = StopSignals::new();
    let stopper = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stopper.abort_inflight();
    });

    let summary = d.run(items, store.clone(), sink.clone(), stop).await.unwrap();
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.unchecked, 1);
    assert_eq!(summary.dead, 2);
    assert!(sink.checked().iter().all(|r| r.verdict.reason
        == VerdictReason::Aborted(FailureKind::Cancelled)));
}

#[tokio::test]
async fn run_deadline_stops_intake() {
    init_logging();
    let fetcher = ScriptedFetcher::with(
        (0..5).map(|i| (format!("http://h/{i}"), Reply::Slow(100))),
    );
    let pipeline = CheckPipeline::new(HeuristicClassifier::default(), EscalationRules::default(), None);
    let d = Dispatcher::new(
        DispatchSettings {
            workers: 1,
            delay: CourtesyDelay::none(),
            run_deadline: Some(Duration::from_millis(150)),
        },
        Arc::new(SharedFactory(fetcher)),
        Arc::new(pipeline),
    );
    let items: Vec<_> = (0..5)
        .map(|i| item("G", &format!("c{i}"), &format!("http://h/{i}")))
        .collect();

    let summary = d
        .run(items, Arc::new(ResultStore::new()), Arc::new(CollectingSink::default()), StopSignals::new())
        .await
        .unwrap();
    assert!(summary.checked >= 1, "{summary:?}");
    assert!(summary.unchecked >= 1, "{summary:?}");
    assert_eq!(summary.checked + summary.unchecked, 5);
}

#[tokio::test]
async fn client_setup_failure_is_fatal() {
    init_logging();
    let pipeline = CheckPipeline::new(HeuristicClassifier::default(), EscalationRules::default(), None);
    let d = Dispatcher::new(settings(4), Arc::new(FailingFactory), Arc::new(pipeline));
    let err = d
        .run(
            vec![item("G", "a", "http://h/a")],
            Arc::new(ResultStore::new()),
            Arc::new(CollectingSink::default()),
            StopSignals::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, checker_engine::EngineError::ClientSetup(_)));
}

#[test]
fn courtesy_delay_stays_within_bounds() {
    let delay = CourtesyDelay::default();
    for _ in 0..200 {
        let pause = delay.sample();
        assert!(pause >= Duration::from_millis(200) && pause <= Duration::from_millis(600));
    }
    assert_eq!(CourtesyDelay::none().sample(), Duration::ZERO);
}
