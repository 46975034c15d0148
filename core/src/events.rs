//! One-way notifications from the orchestrator to a presentation adapter.
//!
//! The adapter owns all rendering state; the orchestrator never reads back.
use serde::Serialize;
use tokio::sync::mpsc;

use crate::pipeline::{RunState, StageId};
use crate::runner::Channel;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        run_id: String,
        stages: Vec<StageId>,
    },
    StageStarted {
        stage: StageId,
        command: String,
    },
    /// A forwarded channel line, banner, or status marker. `stage` is `None`
    /// for run-level messages.
    LogLine {
        stage: Option<StageId>,
        channel: Channel,
        text: String,
    },
    Progress {
        stage: StageId,
        percent: u8,
    },
    ItemCount {
        count: u64,
    },
    StageFinished {
        stage: StageId,
        success: bool,
    },
    /// Fires exactly once per started run, after the orchestrator is idle again.
    RunFinished {
        state: RunState,
        error: Option<String>,
    },
}

#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn new(tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Never blocks; a closed receiver is ignored.
    pub fn emit(&self, ev: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ev);
        }
    }

    pub fn log_line(&self, stage: Option<StageId>, channel: Channel, text: impl Into<String>) {
        self.emit(PipelineEvent::LogLine {
            stage,
            channel,
            text: text.into(),
        });
    }
}
