//! Per-run configuration: the text form a user fills in, and the validated
//! `RunConfig` the orchestrator accepts.
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AppConfig;

const DEFAULT_VARIANT: &str = "chess";

/// Engine options applied uniformly to every stage that talks to the engine.
///
/// Built once per run and read-only afterwards. Keys are UCI option names,
/// kept in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    options: Vec<(String, String)>,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name=value` unless the value is blank. Re-adding a name
    /// replaces its value in place.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return self;
        }
        match self.options.iter_mut().find(|(k, _)| k.as_str() == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.options.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the options as repeated `-o Name=Value` worker arguments.
    pub fn to_args(&self) -> Vec<String> {
        self.iter()
            .flat_map(|(k, v)| ["-o".to_string(), format!("{k}={v}")])
            .collect()
    }
}

/// Validated configuration for one workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub engine_path: PathBuf,
    pub variant: String,
    pub count: u32,
    pub depth: u32,
    pub engine_options: EngineOptions,
    pub positions_file: PathBuf,
    pub puzzles_file: PathBuf,
    pub variant_path: Option<PathBuf>,
    /// Whether the trailing notation conversion stage runs. Read once, at start.
    pub emit_pgn: bool,
}

/// The run form as a user enters it: every field is free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunForm {
    pub engine_path: String,
    pub eval_file: String,
    pub variant_path: String,
    pub variant: String,
    pub count: String,
    pub positions_file: String,
    pub depth: String,
    pub threads: String,
    pub hash_mb: String,
    pub puzzles_file: String,
    pub emit_pgn: bool,
}

impl RunForm {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            engine_path: cfg.engine.path.clone(),
            eval_file: cfg.engine.eval_file.clone(),
            variant_path: cfg.engine.variant_path.clone(),
            variant: cfg.generator.variant.clone(),
            count: cfg.generator.count.clone(),
            positions_file: cfg.generator.output.clone(),
            depth: cfg.puzzler.depth.clone(),
            threads: cfg.engine.threads.clone(),
            hash_mb: cfg.engine.hash_mb.clone(),
            puzzles_file: cfg.puzzler.output.clone(),
            emit_pgn: cfg.pgn.enabled,
        }
    }

    pub fn validate(&self) -> Result<RunConfig, ConfigError> {
        let engine_path = self.engine_path.trim();
        if engine_path.is_empty() {
            return Err(ConfigError::Missing("engine path"));
        }
        let count = parse_positive("count", &self.count)?;
        let depth = parse_positive("depth", &self.depth)?;
        let threads = parse_optional_number("threads", &self.threads)?;
        let hash_mb = parse_optional_number("hash", &self.hash_mb)?;

        let positions_file = required_path("positions file", &self.positions_file)?;
        let puzzles_file = required_path("puzzles file", &self.puzzles_file)?;

        let variant = match self.variant.trim() {
            "" => variant_from_eval_file(&self.eval_file)
                .unwrap_or_else(|| DEFAULT_VARIANT.to_string()),
            v => v.to_string(),
        };

        let engine_options = EngineOptions::new()
            .with("Threads", &threads)
            .with("Hash", &hash_mb)
            .with("EvalFile", &self.eval_file)
            .with("VariantPath", &self.variant_path);

        let variant_path = Some(self.variant_path.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(RunConfig {
            engine_path: PathBuf::from(engine_path),
            variant,
            count,
            depth,
            engine_options,
            positions_file,
            puzzles_file,
            variant_path,
            emit_pgn: self.emit_pgn,
        })
    }
}

/// Derives the variant name from an NNUE file name: `xiangqi-1a2b.nnue` → `xiangqi`.
pub fn variant_from_eval_file(eval_file: &str) -> Option<String> {
    let name = Path::new(eval_file.trim()).file_name()?.to_str()?;
    let stem = name.strip_suffix(".nnue")?;
    let variant = stem.split('-').next().unwrap_or_default();
    (!variant.is_empty()).then(|| variant.to_string())
}

fn parse_positive(field: &'static str, raw: &str) -> Result<u32, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::Missing(field));
    }
    let value: i64 = raw.parse().map_err(|_| ConfigError::NotNumeric {
        field,
        value: raw.to_string(),
    })?;
    if value <= 0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    u32::try_from(value).map_err(|_| ConfigError::NotNumeric {
        field,
        value: raw.to_string(),
    })
}

fn parse_optional_number(field: &'static str, raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(String::new());
    }
    parse_positive(field, raw).map(|v| v.to_string())
}

fn required_path(field: &'static str, raw: &str) -> Result<PathBuf, ConfigError> {
    match raw.trim() {
        "" => Err(ConfigError::Missing(field)),
        p => Ok(PathBuf::from(p)),
    }
}
