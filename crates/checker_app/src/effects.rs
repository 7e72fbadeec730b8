use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use checker_core::{Effect, Msg, StopPolicy};
use checker_engine::{
    export_results, EngineEvent, EngineHandle, ExportOptions, ExportSummary, RunSummary,
};
use engine_logging::{engine_info, engine_warn};

/// Carries out the effects produced by `update` against the engine and disk.
pub struct EffectRunner {
    engine: EngineHandle,
    output_dir: PathBuf,
    export_options: ExportOptions,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, output_dir: PathBuf) -> Self {
        Self {
            engine,
            output_dir,
            export_options: ExportOptions::default(),
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Returns the export summary once results have been written.
    pub fn apply(&self, effects: Vec<Effect>) -> anyhow::Result<Option<ExportSummary>> {
        let mut exported = None;
        for effect in effects {
            match effect {
                Effect::StartRun { items } => {
                    engine_info!("starting run over {} entries", items.len());
                    self.engine.start(items);
                }
                Effect::StopIntake { policy } => match policy {
                    StopPolicy::Finish => {
                        engine_warn!(
                            "interrupt: finishing in-flight checks (press Ctrl-C again to abort them)"
                        );
                        self.engine.stop(false);
                    }
                    StopPolicy::Immediate => {
                        engine_warn!("interrupt: abandoning in-flight checks");
                        self.engine.stop(true);
                    }
                },
                Effect::WriteResults => {
                    let snapshot = self.engine.results().snapshot();
                    let summary = export_results(
                        &self.output_dir,
                        &snapshot,
                        &self.export_options,
                        &Utc::now().to_rfc3339(),
                    )
                    .with_context(|| {
                        format!("failed to write results to {}", self.output_dir.display())
                    })?;
                    exported = Some(summary);
                }
            }
        }
        Ok(exported)
    }
}

/// Translate an engine event into a session message.
///
/// A completed run leaves its totals in `summary`; a failed run is an error.
pub fn event_to_msg(event: EngineEvent, summary: &mut Option<RunSummary>) -> anyhow::Result<Msg> {
    let msg = match event {
        EngineEvent::Progress(progress) => Msg::ProgressSampled {
            completed: progress.completed,
            total: progress.total,
        },
        EngineEvent::ItemChecked(report) => {
            let item = report.verdict.item;
            Msg::ItemChecked {
                group: item.group,
                title: item.title,
                is_live: report.verdict.is_live,
            }
        }
        EngineEvent::InterruptRequested => Msg::InterruptRequested,
        EngineEvent::RunCompleted(done) => {
            let msg = Msg::RunFinished {
                unchecked: done.unchecked,
            };
            *summary = Some(done);
            msg
        }
        EngineEvent::RunFailed(reason) => bail!("run failed: {reason}"),
    };
    Ok(msg)
}
