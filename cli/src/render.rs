//! Presentation adapter: owns all rendering state and consumes the
//! orchestrator's one-way event stream.
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

use puzzler_core::api::{Channel, PipelineEvent, RunState, StageId};

pub trait Renderer: Send {
    fn on_event(&mut self, ev: &PipelineEvent);

    fn finish(&mut self) {}
}

/// Feeds every event to `renderer` until the orchestrator drops its sink.
pub async fn drive(mut renderer: Box<dyn Renderer>, mut rx: UnboundedReceiver<PipelineEvent>) {
    while let Some(ev) = rx.recv().await {
        renderer.on_event(&ev);
    }
    renderer.finish();
}

/// Human-readable output: one progress bar per stage on a terminal, plain
/// lines otherwise.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    multi: Option<MultiProgress>,
    bars: HashMap<StageId, ProgressBar>,
    quiet: bool,
}

impl TerminalRenderer<std::io::Stdout> {
    pub fn stdout(quiet: bool) -> Self {
        let interactive = atty::is(atty::Stream::Stdout) && atty::is(atty::Stream::Stderr);
        Self::new(std::io::stdout(), interactive, quiet)
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W, interactive: bool, quiet: bool) -> Self {
        Self {
            out,
            multi: interactive.then(MultiProgress::new),
            bars: HashMap::new(),
            quiet,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        match &self.multi {
            Some(multi) => {
                let _ = multi.println(text);
            }
            None => {
                let _ = writeln!(self.out, "{text}");
            }
        }
    }

    fn add_bar(&mut self, stage: StageId) {
        let Some(multi) = &self.multi else {
            return;
        };
        let bar = multi.add(ProgressBar::new(100));
        let style = ProgressStyle::default_bar()
            .template("{prefix:>10} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ");
        bar.set_style(style);
        bar.set_prefix(stage.as_str());
        bar.enable_steady_tick(Duration::from_millis(200));
        self.bars.insert(stage, bar);
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn on_event(&mut self, ev: &PipelineEvent) {
        match ev {
            PipelineEvent::RunStarted { run_id, stages } => {
                let names: Vec<&str> = stages.iter().map(|s| s.as_str()).collect();
                self.line(&format!("Run {run_id}: {}", names.join(" → ")));
            }
            PipelineEvent::StageStarted { stage, .. } => self.add_bar(*stage),
            PipelineEvent::LogLine { channel, text, .. } => {
                if self.quiet && *channel != Channel::Status {
                    return;
                }
                self.line(text);
            }
            PipelineEvent::Progress { stage, percent } => {
                if let Some(bar) = self.bars.get(stage) {
                    bar.set_position(u64::from(*percent));
                }
            }
            PipelineEvent::ItemCount { count } => {
                self.line(&format!("Puzzles: {count}"));
            }
            PipelineEvent::StageFinished { stage, success } => {
                if let Some(bar) = self.bars.remove(stage) {
                    let msg = if *success { "✓" } else { "✗" };
                    if *success {
                        bar.finish_with_message(msg);
                    } else {
                        bar.abandon_with_message(msg);
                    }
                }
            }
            PipelineEvent::RunFinished { state, error } => {
                let text = match (state, error) {
                    (RunState::Completed, _) => "Finished: completed".to_string(),
                    (_, Some(e)) => format!("Finished: {state} ({e})"),
                    (_, None) => format!("Finished: {state}"),
                };
                self.line(&text);
            }
        }
    }

    fn finish(&mut self) {
        for (_, bar) in self.bars.drain() {
            bar.abandon();
        }
        let _ = self.out.flush();
    }
}

/// One JSON object per event, for scripts.
pub struct JsonRenderer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Renderer for JsonRenderer<W> {
    fn on_event(&mut self, ev: &PipelineEvent) {
        match serde_json::to_string(ev) {
            Ok(line) => {
                let _ = writeln!(self.out, "{line}");
            }
            Err(e) => tracing::warn!(error = %e, "event serialization failed"),
        }
    }

    fn finish(&mut self) {
        let _ = self.out.flush();
    }
}
