#![forbid(unsafe_code)]

//! Rasterization of DOT text through an external layout engine.
//!
//! Every render gets its own temporary work directory. The directory is
//! removed when the render returns, whether it succeeded or not.

mod graphviz;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use thiserror::Error;
use tracing::debug;

pub use graphviz::{GraphvizConfig, GraphvizEngine};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render scale must be a positive number, got {0}")]
    InvalidScale(f64),
    #[error("could not start layout engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("layout engine '{program}' failed ({status}): {stderr}")]
    Engine {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("Graphviz did not produce a PNG image")]
    NoOutput,
    #[error("render I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("could not decode rendered image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Something that lays out DOT text and writes a PNG into a directory.
pub trait LayoutEngine {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Lay out `source` and write at least one `*.png` file into `workdir`.
    fn render_png(&self, source: &str, workdir: &Path) -> Result<(), RenderError>;
}

/// Render `source` with `engine` and resize the result by `scale`.
pub fn render_graph(
    engine: &dyn LayoutEngine,
    source: &str,
    scale: f64,
) -> Result<RgbaImage, RenderError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(RenderError::InvalidScale(scale));
    }

    let workdir = tempfile::Builder::new().prefix("dot_tmp_").tempdir()?;
    debug!(
        "Rendering with {} in {}",
        engine.name(),
        workdir.path().display()
    );
    engine.render_png(source, workdir.path())?;

    let png = first_png(workdir.path())?.ok_or(RenderError::NoOutput)?;
    let image = image::open(&png)?.into_rgba8();
    debug!("Engine produced {}x{} image", image.width(), image.height());
    Ok(scale_image(image, scale))
}

/// Resize by `scale`, keeping each side at least one pixel.
#[must_use]
pub fn scale_image(image: RgbaImage, scale: f64) -> RgbaImage {
    if (scale - 1.0).abs() < f64::EPSILON {
        return image;
    }
    let width = scaled_dimension(image.width(), scale);
    let height = scaled_dimension(image.height(), scale);
    imageops::resize(&image, width, height, FilterType::Lanczos3)
}

fn scaled_dimension(size: u32, scale: f64) -> u32 {
    let scaled = (f64::from(size) * scale).floor();
    if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        (scaled as u32).max(1)
    }
}

fn first_png(dir: &Path) -> Result<Option<PathBuf>, RenderError> {
    let mut pngs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            pngs.push(path);
        }
    }
    pngs.sort();
    Ok(pngs.into_iter().next())
}
