//! Planner: turns a validated `RunConfig` plus the `[workers]` section into
//! the concrete stage list: generator → puzzler → optional pgn.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use puzzler_core::api::{
    PipelinePlan, ResultTarget, RunConfig, RunnerError, StageId, StagePlanner, StageSpec,
    WorkerPlugin, WorkerStartArgs, WorkersConfig, WriteMode,
};

pub struct CommandPlanner {
    workers: WorkersConfig,
    plugin: Arc<dyn WorkerPlugin>,
}

impl CommandPlanner {
    pub fn new(workers: WorkersConfig, plugin: Arc<dyn WorkerPlugin>) -> Self {
        Self { workers, plugin }
    }

    /// `<interpreter> <script>`, or the script alone when no interpreter is set.
    fn script(&self, script: &str) -> WorkerStartArgs {
        let interpreter = self.workers.interpreter.trim();
        let mut args = if interpreter.is_empty() {
            WorkerStartArgs::new(script)
        } else {
            WorkerStartArgs::new(interpreter).arg(script)
        };
        args.envs = self.workers.env.clone();
        args
    }

    pub fn generator_args(&self, cfg: &RunConfig) -> WorkerStartArgs {
        self.script(&self.workers.generator)
            .arg("--engine")
            .arg(cfg.engine_path.display().to_string())
            .arg("--variant")
            .arg(cfg.variant.as_str())
            .arg("--count")
            .arg(cfg.count.to_string())
            .args(cfg.engine_options.to_args())
    }

    pub fn puzzler_args(&self, cfg: &RunConfig) -> WorkerStartArgs {
        self.script(&self.workers.puzzler)
            .arg("--engine")
            .arg(cfg.engine_path.display().to_string())
            .arg("--variant")
            .arg(cfg.variant.as_str())
            .arg("-d")
            .arg(cfg.depth.to_string())
            .arg(cfg.positions_file.display().to_string())
            .args(cfg.engine_options.to_args())
    }

    pub fn pgn_args(&self, cfg: &RunConfig) -> WorkerStartArgs {
        let args = self
            .script(&self.workers.pgn)
            .arg(cfg.puzzles_file.display().to_string());
        match &cfg.variant_path {
            Some(p) => args.arg("-p").arg(p.display().to_string()),
            None => args,
        }
    }
}

impl StagePlanner for CommandPlanner {
    fn plan(&self, cfg: &RunConfig) -> Result<PipelinePlan, RunnerError> {
        let generator = StageSpec::new(
            StageId::Generate,
            self.plugin.clone(),
            self.generator_args(cfg),
        )
        .with_result(ResultTarget::new(&cfg.positions_file, WriteMode::Truncate))
        .with_expected_total(u64::from(cfg.count))
        .with_success_message(format!(
            "Positions generated to {}",
            cfg.positions_file.display()
        ));

        let puzzler = StageSpec::new(StageId::Extract, self.plugin.clone(), self.puzzler_args(cfg))
            .with_result(ResultTarget::new(&cfg.puzzles_file, WriteMode::Append))
            .with_success_message(format!(
                "Puzzles extracted to {}",
                cfg.puzzles_file.display()
            ))
            .counting_results();

        let pgn_path = pgn_output_path(&cfg.puzzles_file);
        let pgn = StageSpec::new(StageId::Convert, self.plugin.clone(), self.pgn_args(cfg))
            .with_success_message(format!("Converted to {}", pgn_path.display()))
            .with_result(ResultTarget::new(pgn_path, WriteMode::Truncate));

        Ok(PipelinePlan::new(vec![generator, puzzler]).with_trailing(pgn, cfg.emit_pgn))
    }
}

/// `puzzles.epd` → `puzzles.pgn`; any other name gets `.pgn` appended.
pub fn pgn_output_path(puzzles: &Path) -> PathBuf {
    let s = puzzles.to_string_lossy();
    match s.strip_suffix(".epd") {
        Some(stem) => PathBuf::from(format!("{stem}.pgn")),
        None => PathBuf::from(format!("{s}.pgn")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ProcessWorkerPlugin;
    use pretty_assertions::assert_eq;
    use puzzler_core::api::RunForm;

    fn run_config(emit_pgn: bool) -> RunConfig {
        RunForm {
            engine_path: "/opt/fairy-stockfish".into(),
            eval_file: "nets/atomic-6afb8a4e5e6c.nnue".into(),
            variant_path: "variants.ini".into(),
            count: "50".into(),
            depth: "12".into(),
            threads: "2".into(),
            positions_file: "out/positions.epd".into(),
            puzzles_file: "out/puzzles.epd".into(),
            emit_pgn,
            ..RunForm::default()
        }
        .validate()
        .unwrap()
    }

    fn planner(interpreter: &str) -> CommandPlanner {
        let workers = WorkersConfig {
            interpreter: interpreter.into(),
            ..WorkersConfig::default()
        };
        CommandPlanner::new(workers, Arc::new(ProcessWorkerPlugin::new()))
    }

    #[test]
    fn builds_worker_command_lines() {
        let p = planner("python3");
        let cfg = run_config(true);

        assert_eq!(
            p.generator_args(&cfg).command_line(),
            "python3 ./_internal/generator.py --engine /opt/fairy-stockfish --variant atomic \
             --count 50 -o Threads=2 -o EvalFile=nets/atomic-6afb8a4e5e6c.nnue \
             -o VariantPath=variants.ini"
        );
        assert_eq!(
            p.puzzler_args(&cfg).command_line(),
            "python3 ./_internal/puzzler.py --engine /opt/fairy-stockfish --variant atomic \
             -d 12 out/positions.epd -o Threads=2 -o EvalFile=nets/atomic-6afb8a4e5e6c.nnue \
             -o VariantPath=variants.ini"
        );
        assert_eq!(
            p.pgn_args(&cfg).command_line(),
            "python3 ./_internal/pgn.py out/puzzles.epd -p variants.ini"
        );
    }

    #[test]
    fn empty_interpreter_runs_script_directly() {
        let args = planner("").pgn_args(&run_config(false));
        assert_eq!(args.program, "./_internal/pgn.py");
    }

    #[test]
    fn plan_gates_conversion_and_sets_write_modes() {
        let p = planner("python3");

        let plan = p.plan(&run_config(false)).unwrap();
        assert_eq!(plan.ids(), vec![StageId::Generate, StageId::Extract]);
        assert_eq!(plan.stages[0].result.as_ref().unwrap().mode, WriteMode::Truncate);
        assert_eq!(plan.stages[0].expected_total, Some(50));
        assert_eq!(plan.stages[1].result.as_ref().unwrap().mode, WriteMode::Append);
        assert!(plan.stages[1].count_results);

        let plan = p.plan(&run_config(true)).unwrap();
        let pgn = plan.trailing.as_ref().unwrap();
        assert_eq!(
            pgn.result.as_ref().unwrap().path,
            PathBuf::from("out/puzzles.pgn")
        );
        assert_eq!(pgn.success_message, "Converted to out/puzzles.pgn");
    }

    #[test]
    fn pgn_path_replaces_epd_suffix() {
        assert_eq!(pgn_output_path(Path::new("a/p.epd")), PathBuf::from("a/p.pgn"));
        assert_eq!(pgn_output_path(Path::new("a.epd.txt")), PathBuf::from("a.epd.txt.pgn"));
    }
}
