#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use pretty_assertions::assert_eq;
use puzzler_core::api::{
    AppConfig, EventSink, PipelineEvent, RunForm, RunState, StageError, StageId,
};
use puzzler_plugins::factory::build_orchestrator;

const GENERATOR: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --count) count="$2"; shift 2 ;;
    *) shift ;;
  esac
done
i=1
while [ "$i" -le "$count" ]; do
  echo "position $i"
  echo "$i/$count" >&2
  i=$((i + 1))
done
"#;

const PUZZLER: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    -d) positions="$3"; shift 3 ;;
    *) shift ;;
  esac
done
n=0
while read -r line; do
  n=$((n + 1))
  if [ $((n % 2)) -eq 0 ]; then echo "puzzle from $line"; fi
done < "$positions"
echo "100%" >&2
"#;

const FAILING_PUZZLER: &str = r#"
echo "puzzle before crash"
echo "Traceback (most recent call last):" >&2
echo "EngineTerminatedError" >&2
exit 2
"#;

const PGN: &str = r#"
while read -r line; do echo "[FEN \"$line\"]"; done < "$1"
"#;

fn config(dir: &Path, puzzler: &str) -> AppConfig {
    let write = |name: &str, body: &str| {
        let p = dir.join(name);
        std::fs::write(&p, body).unwrap();
        p.display().to_string()
    };
    let mut cfg = AppConfig::default();
    cfg.workers.interpreter = "sh".into();
    cfg.workers.generator = write("generator.sh", GENERATOR);
    cfg.workers.puzzler = write("puzzler.sh", puzzler);
    cfg.workers.pgn = write("pgn.sh", PGN);
    cfg.pipeline.app_log = dir.join("app.log").display().to_string();
    cfg.engine.path = "/usr/local/bin/fairy-stockfish".into();
    cfg.engine.variant_path = String::new();
    cfg.generator.count = "6".into();
    cfg.generator.output = dir.join("positions.epd").display().to_string();
    cfg.puzzler.output = dir.join("puzzles.epd").display().to_string();
    cfg.pgn.enabled = true;
    cfg
}

async fn run(cfg: &AppConfig) -> (Vec<PipelineEvent>, puzzler_core::api::RunReport) {
    let orch = build_orchestrator(cfg);
    let (sink, mut rx) = EventSink::channel();
    let handle = orch
        .start_run(&RunForm::from_config(cfg), sink)
        .unwrap();
    let report = tokio::time::timeout(Duration::from_secs(60), handle.wait())
        .await
        .expect("pipeline timed out");
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    (events, report)
}

#[tokio::test]
async fn shell_workers_run_all_three_stages() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), PUZZLER);

    let (events, report) = run(&cfg).await;

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.items, Some(3));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("puzzles.epd")).unwrap(),
        "puzzle from position 2\npuzzle from position 4\npuzzle from position 6\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("puzzles.pgn"))
            .unwrap()
            .lines()
            .count(),
        3
    );

    let generator_progress: Vec<u8> = events
        .iter()
        .filter_map(|ev| match ev {
            PipelineEvent::Progress {
                stage: StageId::Generate,
                percent,
            } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(generator_progress, vec![0, 16, 33, 50, 66, 83, 100]);

    let log = std::fs::read_to_string(dir.path().join("app.log")).unwrap();
    assert!(log.contains("--- Running: sh "));
    assert!(log.contains("[puzzler][stdout] puzzle from position 2"));
    assert!(log.contains("✓ Converted to "));
}

#[tokio::test]
async fn non_zero_exit_fails_run_and_skips_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), FAILING_PUZZLER);

    let (events, report) = run(&cfg).await;

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.launched(), vec![StageId::Generate, StageId::Extract]);
    match &report.result(StageId::Extract).unwrap().error {
        Some(StageError::Exit {
            code,
            diagnostic_tail,
        }) => {
            assert_eq!(*code, 2);
            assert!(diagnostic_tail.contains("EngineTerminatedError"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        std::fs::read_to_string(dir.path().join("puzzles.epd")).unwrap(),
        "puzzle before crash\n"
    );
    assert!(!dir.path().join("puzzles.pgn").exists());
    assert!(events.iter().any(|ev| matches!(
        ev,
        PipelineEvent::LogLine { text, .. } if text == "✗ Command failed with code 2"
    )));
}
