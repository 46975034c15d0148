use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub puzzler: PuzzlerConfig,

    #[serde(default)]
    pub pgn: PgnConfig,

    #[serde(default)]
    pub workers: WorkersConfig,
}

/// Numeric form fields are kept as text until validation, but the config
/// file may spell them either way (`count = 100` or `count = "100"`).
fn text_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(d)? {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "puzzler_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    false
}

fn default_logging_file() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Application log shared by every stage of every run (append only).
    #[serde(default = "default_app_log")]
    pub app_log: String,

    // Buffering knobs for the stream drainer and the app log writer.
    #[serde(default = "default_line_channel_capacity")]
    pub line_channel_capacity: usize,

    #[serde(default = "default_log_channel_capacity")]
    pub log_channel_capacity: usize,

    /// Bytes of diagnostic output kept for failure reports.
    #[serde(default = "default_diagnostic_tail_bytes")]
    pub diagnostic_tail_bytes: usize,
}

fn default_app_log() -> String {
    "app.log".to_string()
}

fn default_line_channel_capacity() -> usize {
    1024
}

fn default_log_channel_capacity() -> usize {
    4096
}

fn default_diagnostic_tail_bytes() -> usize {
    4096
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            app_log: default_app_log(),
            line_channel_capacity: default_line_channel_capacity(),
            log_channel_capacity: default_log_channel_capacity(),
            diagnostic_tail_bytes: default_diagnostic_tail_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub path: String,

    #[serde(default = "default_threads", deserialize_with = "text_or_number")]
    pub threads: String,

    #[serde(default = "default_hash_mb", deserialize_with = "text_or_number")]
    pub hash_mb: String,

    /// NNUE evaluation file.
    #[serde(default)]
    pub eval_file: String,

    /// Variant definitions (`variants.ini`).
    #[serde(default = "default_variant_path")]
    pub variant_path: String,
}

fn default_threads() -> String {
    "4".to_string()
}

fn default_hash_mb() -> String {
    "256".to_string()
}

fn default_variant_path() -> String {
    "variants.ini".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            threads: default_threads(),
            hash_mb: default_hash_mb(),
            eval_file: String::new(),
            variant_path: default_variant_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Empty means "infer from the evaluation file, else chess".
    #[serde(default)]
    pub variant: String,

    #[serde(default = "default_count", deserialize_with = "text_or_number")]
    pub count: String,

    #[serde(default = "default_positions_file")]
    pub output: String,
}

fn default_count() -> String {
    "100".to_string()
}

fn default_positions_file() -> String {
    "positions.epd".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            variant: String::new(),
            count: default_count(),
            output: default_positions_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzlerConfig {
    #[serde(default = "default_depth", deserialize_with = "text_or_number")]
    pub depth: String,

    #[serde(default = "default_puzzles_file")]
    pub output: String,
}

fn default_depth() -> String {
    "10".to_string()
}

fn default_puzzles_file() -> String {
    "puzzles.epd".to_string()
}

impl Default for PuzzlerConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            output: default_puzzles_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PgnConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Interpreter used to launch the worker scripts. Empty runs them directly.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    #[serde(default = "default_generator_script")]
    pub generator: String,

    #[serde(default = "default_puzzler_script")]
    pub puzzler: String,

    #[serde(default = "default_pgn_script")]
    pub pgn: String,

    /// Extra environment passed to every worker process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_generator_script() -> String {
    "./_internal/generator.py".to_string()
}

fn default_puzzler_script() -> String {
    "./_internal/puzzler.py".to_string()
}

fn default_pgn_script() -> String {
    "./_internal/pgn.py".to_string()
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            generator: default_generator_script(),
            puzzler: default_puzzler_script(),
            pgn: default_pgn_script(),
            env: BTreeMap::new(),
        }
    }
}
