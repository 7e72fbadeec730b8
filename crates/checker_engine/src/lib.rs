//! Checker engine: probing pipeline, worker pool and result export.
mod classify;
mod decode;
mod dispatch;
mod engine;
mod export;
mod fetch;
mod filename;
mod persist;
mod pipeline;
mod progress;
mod prober;
mod types;

pub use classify::HeuristicClassifier;
pub use decode::{decode_window, DecodedWindow};
pub use dispatch::{CourtesyDelay, DispatchSettings, Dispatcher, StopSignals, WorkQueue};
pub use engine::{EngineConfig, EngineHandle};
pub use export::{export_results, render_playlist, ExportError, ExportOptions, ExportSummary, GroupFiles};
pub use fetch::{
    ChannelEventSink, EventSink, FetchSettings, Fetcher, FetcherFactory, ReqwestFetcher,
    ReqwestFetcherFactory, BROWSER_USER_AGENT,
};
pub use filename::{assign_stems, group_stem};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::CheckPipeline;
pub use progress::spawn_progress_reporter;
pub use prober::{
    build_prober_args, parse_prober_output, FfprobeProber, MediaProber, ProberSettings,
    ProberUnavailable,
};
pub use types::{
    EngineError, EngineEvent, FetchError, FetchMetadata, FetchOutput, ItemReport, RunProgress,
    RunSummary,
};
