//! Half-block raster canvas.
//!
//! Each terminal cell shows two stacked pixels with `▀`: the upper one as the
//! foreground colour, the lower one as the background colour. One canvas
//! pixel stands for a square block of `pixels_per_column` image pixels, so a
//! cell covers `k × 2k` image pixels.

use image::RgbaImage;
use serde::Deserialize;

/// Upper half block.
pub const HALF_BLOCK: char = '▀';

pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];

/// Canvas sampling options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Image pixels per terminal column (and per half row).
    pub pixels_per_column: u32,
    /// Colour behind transparent pixels and outside the image.
    pub background: Rgb,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            pixels_per_column: 4,
            background: WHITE,
        }
    }
}

impl CanvasConfig {
    fn block(&self) -> i64 {
        i64::from(self.pixels_per_column.max(1))
    }

    /// Image pixels covered by a cursor move of `(cols, rows)` cells.
    #[must_use]
    pub fn cells_to_pixels(&self, cols: i32, rows: i32) -> (i32, i32) {
        let block = i32::try_from(self.pixels_per_column.max(1)).unwrap_or(i32::MAX);
        (
            cols.saturating_mul(block),
            rows.saturating_mul(block).saturating_mul(2),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub top: Rgb,
    pub bottom: Rgb,
}

/// A `cols × rows` grid of half-block cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFrame {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl CellFrame {
    #[must_use]
    pub fn filled(cols: usize, rows: usize, color: Rgb) -> Self {
        Self {
            cols,
            rows,
            cells: vec![
                Cell {
                    top: color,
                    bottom: color,
                };
                cols.saturating_mul(rows)
            ],
        }
    }

    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    #[must_use]
    pub fn get(&self, col: usize, row: usize) -> Option<Cell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells.get(row * self.cols + col).copied()
    }

    /// Cells of one row, left to right.
    #[must_use]
    pub fn row(&self, row: usize) -> &[Cell] {
        if row >= self.rows {
            return &[];
        }
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }
}

/// Sample `image`, placed with its top-left corner at `(offset_x, offset_y)`
/// canvas pixels, into a `cols × rows` cell grid.
#[must_use]
pub fn rasterize(
    image: &RgbaImage,
    offset_x: i32,
    offset_y: i32,
    cols: usize,
    rows: usize,
    config: &CanvasConfig,
) -> CellFrame {
    let mut frame = CellFrame::filled(cols, rows, config.background);
    let block = config.block();
    for row in 0..rows {
        for col in 0..cols {
            let x = col as i64 * block - i64::from(offset_x);
            let top_y = (row as i64 * 2) * block - i64::from(offset_y);
            frame.cells[row * cols + col] = Cell {
                top: sample_block(image, x, top_y, block, config.background),
                bottom: sample_block(image, x, top_y + block, block, config.background),
            };
        }
    }
    frame
}

/// Mean colour of the `block × block` square at image coordinates `(x, y)`,
/// alpha-blended over `background`. Pixels outside the image count as
/// background.
fn sample_block(image: &RgbaImage, x: i64, y: i64, block: i64, background: Rgb) -> Rgb {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    if x >= width || y >= height || x + block <= 0 || y + block <= 0 {
        return background;
    }

    let mut sum = [0_u64; 3];
    for py in y..y + block {
        for px in x..x + block {
            let color = if px < 0 || py < 0 || px >= width || py >= height {
                background
            } else {
                blend(image.get_pixel(px as u32, py as u32).0, background)
            };
            for channel in 0..3 {
                sum[channel] += u64::from(color[channel]);
            }
        }
    }
    let count = (block * block) as u64;
    sum.map(|total| ((total + count / 2) / count) as u8)
}

fn blend(pixel: [u8; 4], background: Rgb) -> Rgb {
    let alpha = u32::from(pixel[3]);
    let mut out = [0_u8; 3];
    for channel in 0..3 {
        let fg = u32::from(pixel[channel]);
        let bg = u32::from(background[channel]);
        out[channel] = ((fg * alpha + bg * (255 - alpha) + 127) / 255) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use proptest::prelude::*;

    use super::*;

    const RED: Rgb = [255, 0, 0];

    fn unit_config() -> CanvasConfig {
        CanvasConfig {
            pixels_per_column: 1,
            background: WHITE,
        }
    }

    #[test]
    fn each_cell_holds_two_stacked_pixels() {
        let mut image = RgbaImage::from_pixel(1, 2, Rgba([255, 255, 255, 255]));
        image.put_pixel(0, 1, Rgba([255, 0, 0, 255]));
        let frame = rasterize(&image, 0, 0, 1, 1, &unit_config());
        let cell = frame.get(0, 0).expect("cell");
        assert_eq!(cell.top, WHITE);
        assert_eq!(cell.bottom, RED);
    }

    #[test]
    fn offsets_shift_the_image() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let frame = rasterize(&image, 2, 2, 3, 2, &unit_config());
        assert_eq!(frame.get(2, 1).expect("cell").top, RED);
        assert_eq!(frame.get(0, 0).expect("cell").top, WHITE);
        assert_eq!(frame.get(2, 1).expect("cell").bottom, WHITE);
    }

    #[test]
    fn transparent_pixels_show_background() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let frame = rasterize(&image, 0, 0, 2, 1, &unit_config());
        assert!(frame.row(0).iter().all(|cell| cell.top == WHITE));
    }

    #[test]
    fn blocks_are_averaged() {
        let mut image = RgbaImage::from_pixel(2, 4, Rgba([0, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        image.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        let config = CanvasConfig {
            pixels_per_column: 2,
            background: WHITE,
        };
        let frame = rasterize(&image, 0, 0, 1, 1, &config);
        let cell = frame.get(0, 0).expect("cell");
        assert_eq!(cell.top, [128, 128, 128]);
        assert_eq!(cell.bottom, [0, 0, 0]);
    }

    #[test]
    fn cursor_cells_convert_to_pixels() {
        let config = CanvasConfig::default();
        assert_eq!(config.cells_to_pixels(3, -2), (12, -16));

        let huge = CanvasConfig {
            pixels_per_column: u32::MAX,
            ..CanvasConfig::default()
        };
        assert_eq!(huge.cells_to_pixels(1, -1), (i32::MAX, i32::MIN));
    }

    #[test]
    fn out_of_range_lookups_are_empty() {
        let frame = CellFrame::filled(2, 1, WHITE);
        assert_eq!(frame.get(2, 0), None);
        assert!(frame.row(1).is_empty());
    }

    proptest! {
        #[test]
        fn frame_always_matches_requested_size(
            offset_x in -50_i32..50,
            offset_y in -50_i32..50,
            cols in 0_usize..20,
            rows in 0_usize..10,
        ) {
            let image = RgbaImage::from_pixel(7, 5, Rgba([10, 20, 30, 255]));
            let frame = rasterize(&image, offset_x, offset_y, cols, rows, &CanvasConfig::default());
            prop_assert_eq!(frame.dimensions(), (cols, rows));
        }
    }
}
