use std::time::Duration;

use anyhow::Context;
use checker_core::{update, Msg, RunState, SessionState};
use checker_engine::{ensure_output_dir, EngineHandle, ExportSummary, RunSummary};
use engine_logging::{engine_info, LogDestination};

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::effects::{event_to_msg, EffectRunner};
use crate::inputs::load_inputs;
use crate::render::{summary_text, ProgressRenderer};

const TICK: Duration = Duration::from_millis(75);

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, cli.log_level());

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);

    let inputs = load_inputs(&cli.inputs, config.dedupe)?;
    engine_info!(
        "{} entries from {} file(s) ({} duplicates dropped, {} lines skipped)",
        inputs.items.len(),
        inputs.files,
        inputs.duplicates,
        inputs.skipped_lines
    );

    ensure_output_dir(&config.output_dir)
        .with_context(|| format!("cannot use output directory {}", config.output_dir.display()))?;
    let engine = EngineHandle::new(config.engine_config()).context("failed to start the checker")?;
    let runner = EffectRunner::new(engine, config.output_dir.clone());

    let (summary, export) = drive_session(&runner, Msg::ItemsLoaded(inputs.items))?;
    print!("{}", summary_text(&summary, export.as_ref()));
    Ok(())
}

/// Feed engine events through `update` until the session is finished.
fn drive_session(
    runner: &EffectRunner,
    first: Msg,
) -> anyhow::Result<(RunSummary, Option<ExportSummary>)> {
    let mut renderer = ProgressRenderer::new();
    let mut state = RunState::new();
    let mut summary = None;
    let mut export = None;
    let mut next = Some(first);

    while state.session() != SessionState::Finished {
        let msg = match next.take() {
            Some(msg) => msg,
            None => match runner.engine().recv_timeout(TICK) {
                Some(event) => match event_to_msg(event, &mut summary) {
                    Ok(msg) => msg,
                    Err(err) => {
                        renderer.finish();
                        return Err(err);
                    }
                },
                None => Msg::Tick,
            },
        };

        let (updated, effects) = update(state, msg);
        state = updated;
        if let Some(written) = runner.apply(effects)? {
            export = Some(written);
        }
        if state.consume_dirty() {
            renderer.render(&state.view());
        }
    }
    renderer.finish();

    let summary = summary.context("run finished without a summary")?;
    Ok((summary, export))
}
