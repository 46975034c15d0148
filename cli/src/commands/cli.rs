use std::path::PathBuf;

use clap::Parser;

use puzzler_core::api::RunForm;

/// Generate chess variant puzzles: positions → puzzles → optional PGN.
///
/// Every run option defaults to the configuration file; flags override it.
#[derive(Parser, Debug, Default)]
#[command(name = "puzzler", version)]
pub struct Args {
    /// Configuration file (default: ~/.puzzler/config.toml, then ./puzzler.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Chess engine binary (e.g. fairy-stockfish).
    #[arg(long)]
    pub engine: Option<String>,

    /// NNUE evaluation file; also used to infer the variant.
    #[arg(long)]
    pub eval_file: Option<String>,

    /// Variant definitions file (variants.ini).
    #[arg(long)]
    pub variant_path: Option<String>,

    #[arg(long)]
    pub variant: Option<String>,

    /// Number of positions to generate.
    #[arg(long)]
    pub count: Option<String>,

    /// Search depth for puzzle extraction.
    #[arg(long)]
    pub depth: Option<String>,

    #[arg(long)]
    pub threads: Option<String>,

    /// Engine hash size in MB.
    #[arg(long)]
    pub hash: Option<String>,

    #[arg(long)]
    pub positions_file: Option<String>,

    #[arg(long)]
    pub puzzles_file: Option<String>,

    /// Convert the extracted puzzles to PGN.
    #[arg(long, overrides_with = "no_pgn")]
    pub pgn: bool,

    #[arg(long, overrides_with = "pgn")]
    pub no_pgn: bool,

    /// Application log (appended across runs).
    #[arg(long)]
    pub app_log: Option<String>,

    /// Print pipeline events as JSON lines instead of progress bars.
    #[arg(long)]
    pub json: bool,

    /// Only show banners, status markers and progress.
    #[arg(long, short)]
    pub quiet: bool,
}

impl Args {
    /// Applies flag overrides on top of the configured form.
    pub fn apply(&self, form: &mut RunForm) {
        let fields = [
            (&self.engine, &mut form.engine_path),
            (&self.eval_file, &mut form.eval_file),
            (&self.variant_path, &mut form.variant_path),
            (&self.variant, &mut form.variant),
            (&self.count, &mut form.count),
            (&self.depth, &mut form.depth),
            (&self.threads, &mut form.threads),
            (&self.hash, &mut form.hash_mb),
            (&self.positions_file, &mut form.positions_file),
            (&self.puzzles_file, &mut form.puzzles_file),
        ];
        for (flag, field) in fields {
            if let Some(v) = flag {
                *field = v.clone();
            }
        }
        if self.pgn {
            form.emit_pgn = true;
        }
        if self.no_pgn {
            form.emit_pgn = false;
        }
    }
}
