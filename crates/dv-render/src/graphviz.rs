//! The Graphviz command-line engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{LayoutEngine, RenderError};

/// Name of the DOT source written into the work directory.
const SOURCE_FILE: &str = "graph.dot";
/// Name of the raster the engine is asked to produce.
const OUTPUT_FILE: &str = "graph.png";

/// Where and how to invoke Graphviz.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GraphvizConfig {
    /// Executable name or path (`dot` by default).
    pub program: PathBuf,
    /// Layout engine passed as `-K` (e.g. `neato`); the program's own default
    /// when unset.
    pub layout: Option<String>,
    /// Output resolution passed as `-Gdpi`.
    pub dpi: Option<u32>,
    /// Directories probed for a bare `program` name before `PATH`.
    pub search_paths: Vec<PathBuf>,
}

impl Default for GraphvizConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("dot"),
            layout: None,
            dpi: None,
            search_paths: default_search_paths(),
        }
    }
}

#[cfg(windows)]
fn default_search_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(r"C:\Program Files\Graphviz\bin"),
        PathBuf::from(r"C:\Program Files (x86)\Graphviz\bin"),
    ]
}

#[cfg(not(windows))]
fn default_search_paths() -> Vec<PathBuf> {
    Vec::new()
}

impl GraphvizConfig {
    /// The executable to spawn. A bare name is looked up in `search_paths`
    /// first and otherwise left for `PATH` resolution.
    #[must_use]
    pub fn resolve_program(&self) -> PathBuf {
        let is_bare = self.program.components().count() == 1 && !self.program.is_absolute();
        if !is_bare {
            return self.program.clone();
        }
        for dir in &self.search_paths {
            for name in candidate_names(&self.program) {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return candidate;
                }
            }
        }
        self.program.clone()
    }
}

fn candidate_names(program: &Path) -> Vec<PathBuf> {
    let mut names = vec![program.to_path_buf()];
    if cfg!(windows) && program.extension().is_none() {
        names.push(program.with_extension("exe"));
    }
    names
}

#[derive(Debug, Clone, Default)]
pub struct GraphvizEngine {
    config: GraphvizConfig,
}

impl GraphvizEngine {
    #[must_use]
    pub fn new(config: GraphvizConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &GraphvizConfig {
        &self.config
    }

    /// Version banner reported by `dot -V`.
    pub fn version(&self) -> Result<String, RenderError> {
        let program = self.config.resolve_program();
        let output = Command::new(&program)
            .arg("-V")
            .output()
            .map_err(|source| RenderError::Spawn {
                program: program.display().to_string(),
                source,
            })?;
        // Graphviz prints its banner on stderr.
        let banner = if output.stderr.is_empty() {
            output.stdout
        } else {
            output.stderr
        };
        Ok(String::from_utf8_lossy(&banner).trim().to_string())
    }
}

impl LayoutEngine for GraphvizEngine {
    fn name(&self) -> &str {
        "graphviz"
    }

    fn render_png(&self, source: &str, workdir: &Path) -> Result<(), RenderError> {
        let source_path = workdir.join(SOURCE_FILE);
        fs::write(&source_path, source)?;

        let program = self.config.resolve_program();
        let mut command = Command::new(&program);
        if let Some(layout) = &self.config.layout {
            command.arg(format!("-K{layout}"));
        }
        if let Some(dpi) = self.config.dpi {
            command.arg(format!("-Gdpi={dpi}"));
        }
        command
            .arg("-Tpng")
            .arg(&source_path)
            .arg("-o")
            .arg(workdir.join(OUTPUT_FILE));

        debug!("Running {command:?}");
        let output = command.output().map_err(|source| RenderError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(RenderError::Engine {
                program: program.display().to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!("Graphviz: {stderr}");
        }

        // The DOT source is not part of the output.
        fs::remove_file(&source_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::GraphvizConfig;

    #[test]
    fn absolute_and_relative_paths_are_used_as_given() {
        let config = GraphvizConfig {
            program: PathBuf::from("tools/dot"),
            search_paths: vec![PathBuf::from("/nowhere")],
            ..GraphvizConfig::default()
        };
        assert_eq!(config.resolve_program(), PathBuf::from("tools/dot"));
    }

    #[test]
    fn bare_name_prefers_search_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let candidate = dir.path().join("dot");
        fs::write(&candidate, "").expect("write fake dot");
        let config = GraphvizConfig {
            search_paths: vec![PathBuf::from("/definitely/missing"), dir.path().to_path_buf()],
            ..GraphvizConfig::default()
        };
        assert_eq!(config.resolve_program(), candidate);
    }

    #[test]
    fn bare_name_falls_back_to_path_lookup() {
        let config = GraphvizConfig {
            search_paths: vec![PathBuf::from("/definitely/missing")],
            ..GraphvizConfig::default()
        };
        assert_eq!(config.resolve_program(), PathBuf::from("dot"));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: GraphvizConfig =
            toml::from_str("layout = \"neato\"\ndpi = 72").expect("parse config");
        assert_eq!(config.program, PathBuf::from("dot"));
        assert_eq!(config.layout.as_deref(), Some("neato"));
        assert_eq!(config.dpi, Some(72));
    }
}
