//! `dotview.toml` loading.

use std::fs;
use std::path::{Path, PathBuf};

use dv_render::GraphvizConfig;
use dv_term::{CanvasConfig, Rgb, WHITE};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "dotview.toml";

/// Environment variable overriding `graphviz.program`.
pub const PROGRAM_ENV: &str = "DOTVIEW_DOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graphviz: GraphvizConfig,
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Pixels moved per arrow key press.
    pub pan_step: i32,
    /// Image pixels per terminal column.
    pub pixels_per_column: u32,
    /// Canvas background colour.
    pub background: Rgb,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            pan_step: 40,
            pixels_per_column: CanvasConfig::default().pixels_per_column,
            background: WHITE,
        }
    }
}

impl ViewerConfig {
    #[must_use]
    pub fn canvas(&self) -> CanvasConfig {
        CanvasConfig {
            pixels_per_column: self.pixels_per_column.max(1),
            background: self.background,
        }
    }
}

/// Load the explicit config file, else `./dotview.toml` when present, else
/// defaults. `DOTVIEW_DOT` is applied last.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match explicit {
        Some(path) => read_config(path)?,
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.is_file() {
                read_config(fallback)?
            } else {
                Config::default()
            }
        }
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(program) = lookup(PROGRAM_ENV).filter(|value| !value.trim().is_empty()) {
        config.graphviz.program = PathBuf::from(program.trim());
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn parses_full_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dotview.toml");
        fs::write(
            &path,
            "[graphviz]\nprogram = \"/opt/gv/dot\"\nlayout = \"fdp\"\n\n[viewer]\npan_step = 10\npixels_per_column = 2\nbackground = [0, 0, 0]\n",
        )
        .expect("write config");
        let config = read_config(&path).expect("config");
        assert_eq!(config.graphviz.program, PathBuf::from("/opt/gv/dot"));
        assert_eq!(config.graphviz.layout.as_deref(), Some("fdp"));
        assert_eq!(config.viewer.pan_step, 10);
        assert_eq!(config.viewer.canvas().pixels_per_column, 2);
        assert_eq!(config.viewer.canvas().background, [0, 0, 0]);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: Config = toml::from_str("").expect("empty config");
        assert_eq!(config, Config::default());
        assert_eq!(config.viewer.pan_step, 40);
    }

    #[test]
    fn zero_pixels_per_column_is_clamped() {
        let config: Config = toml::from_str("[viewer]\npixels_per_column = 0").expect("config");
        assert_eq!(config.viewer.canvas().pixels_per_column, 1);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[viewer\n").expect("write");
        let err = read_config(&path).expect_err("broken config");
        assert!(err.to_string().contains("broken.toml"));
        assert!(matches!(
            read_config(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn env_overrides_program() {
        let mut config = Config::default();
        apply_env(&mut config, |key| {
            (key == PROGRAM_ENV).then(|| " /usr/local/bin/dot ".to_string())
        });
        assert_eq!(config.graphviz.program, PathBuf::from("/usr/local/bin/dot"));

        let mut config = Config::default();
        apply_env(&mut config, |_| Some("   ".to_string()));
        assert_eq!(config.graphviz.program, PathBuf::from("dot"));
    }
}
