#![forbid(unsafe_code)]

//! Terminal presentation of rendered graph bitmaps.

mod canvas;

use std::fmt::Write as _;

pub use canvas::{CanvasConfig, Cell, CellFrame, HALF_BLOCK, Rgb, WHITE, rasterize};

/// Encode a frame as 24-bit ANSI colour text, one line per cell row.
#[must_use]
pub fn to_ansi(frame: &CellFrame) -> String {
    let (cols, rows) = frame.dimensions();
    let mut out = String::with_capacity(cols * rows * 40);
    for row in 0..rows {
        let mut previous: Option<Cell> = None;
        for cell in frame.row(row) {
            if previous != Some(*cell) {
                let [fr, fg, fb] = cell.top;
                let [br, bg, bb] = cell.bottom;
                let _ = write!(out, "\x1b[38;2;{fr};{fg};{fb}m\x1b[48;2;{br};{bg};{bb}m");
                previous = Some(*cell);
            }
            out.push(HALF_BLOCK);
        }
        out.push_str("\x1b[0m\n");
    }
    out
}
