use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AppConfig;

/// Get the default puzzler data directory: ~/.puzzler
pub fn get_puzzler_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".puzzler"))
        .ok_or_else(|| ConfigError::File("cannot determine home directory".into()))
}

/// Loads configuration from `explicit` when given, else from
/// `~/.puzzler/config.toml`, else `./puzzler.toml`, else defaults.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut cfg = match explicit {
        Some(path) => read_config(path)?,
        None => {
            let user_config = get_puzzler_data_dir()
                .map(|d| d.join("config.toml"))
                .ok()
                .filter(|p| p.exists());
            let local_config = Path::new("puzzler.toml");

            if let Some(path) = user_config {
                read_config(&path)?
            } else if local_config.exists() {
                read_config(local_config)?
            } else {
                AppConfig::default()
            }
        }
    };

    apply_env_overrides(&mut cfg);
    expand_paths(&mut cfg);
    Ok(cfg)
}

pub fn load_default() -> Result<AppConfig, ConfigError> {
    load(None)
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))?;
    toml::from_str::<AppConfig>(&s)
        .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("PUZZLER_ENGINE_PATH") {
        if !v.trim().is_empty() {
            cfg.engine.path = v;
        }
    }
    if let Ok(v) = std::env::var("PUZZLER_APP_LOG") {
        if !v.trim().is_empty() {
            cfg.pipeline.app_log = v;
        }
    }
}

fn expand_paths(cfg: &mut AppConfig) {
    for field in [
        &mut cfg.engine.path,
        &mut cfg.engine.eval_file,
        &mut cfg.engine.variant_path,
        &mut cfg.pipeline.app_log,
    ] {
        let expanded = shellexpand::tilde(field.as_str()).into_owned();
        *field = expanded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("puzzler.toml");
        std::fs::write(
            &path,
            "[puzzler]\ndepth = 14\noutput = \"out.epd\"\n[pgn]\nenabled = true\n",
        )
        .unwrap();

        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.puzzler.depth, "14");
        assert_eq!(cfg.puzzler.output, "out.epd");
        assert!(cfg.pgn.enabled);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[engine\npath = 1").unwrap();
        assert!(matches!(load(Some(&path)), Err(ConfigError::File(_))));
    }

    #[test]
    fn missing_explicit_file_is_a_config_error() {
        let err = load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("here.toml"));
    }
}
