//! CLI application wiring: merge flag overrides into the configured run,
//! start the pipeline, and drive the presentation adapter until it ends.
use puzzler_core::api::{AppConfig, CliError, EventSink, RunForm, RunReport, RunState};
use puzzler_plugins::factory;

use crate::commands::cli::Args;
use crate::render::{self, JsonRenderer, Renderer, TerminalRenderer};

#[tracing::instrument(name = "cli.run_app", skip(args, cfg))]
pub async fn run_app_with_config(args: Args, mut cfg: AppConfig) -> Result<i32, CliError> {
    if let Some(path) = args.app_log.as_deref().filter(|s| !s.trim().is_empty()) {
        cfg.pipeline.app_log = path.to_string();
    }
    let mut form = RunForm::from_config(&cfg);
    args.apply(&mut form);

    let renderer: Box<dyn Renderer> = if args.json {
        Box::new(JsonRenderer::new(std::io::stdout()))
    } else {
        Box::new(TerminalRenderer::stdout(args.quiet))
    };

    let orchestrator = factory::build_orchestrator(&cfg);
    let (sink, rx) = EventSink::channel();
    let handle = orchestrator.start_run(&form, sink)?;
    tracing::info!(run_id = handle.run_id(), app_log = %cfg.pipeline.app_log, "run accepted");

    // The sink lives in the run task; the renderer ends when the run does.
    let rendering = tokio::spawn(render::drive(renderer, rx));
    let report = handle.wait().await;
    if let Err(e) = rendering.await {
        tracing::warn!(error = %e, "renderer task failed");
    }

    outcome(report)
}

fn outcome(report: RunReport) -> Result<i32, CliError> {
    if report.state == RunState::Completed {
        return Ok(0);
    }
    let launch = report
        .results
        .iter()
        .filter_map(|r| r.error.as_ref())
        .any(|e| e.is_launch());
    Err(CliError::Pipeline {
        message: report
            .error
            .unwrap_or_else(|| format!("run ended {}", report.state)),
        launch,
    })
}
