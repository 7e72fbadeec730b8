use std::sync::Arc;
use std::time::Duration;

use checker_core::ResultStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fetch::EventSink;
use crate::{EngineEvent, RunProgress};

/// Periodically sample the store's completed counter.
///
/// Ends when every item is recorded or `stop` fires, emitting one last sample
/// either way. Nothing else in the run depends on this task.
pub fn spawn_progress_reporter(
    store: Arc<ResultStore>,
    total: usize,
    interval: Duration,
    sink: Arc<dyn EventSink>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(10)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let completed = store.completed();
            if completed >= total {
                break;
            }
            sink.emit(EngineEvent::Progress(RunProgress { completed, total }));
        }
        sink.emit(EngineEvent::Progress(RunProgress {
            completed: store.completed(),
            total,
        }));
    })
}
