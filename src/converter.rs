use crate::decoder::RawFrame;
use crate::{BlockcastError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Upper half block: foreground paints the top half, background the bottom
pub const HALF_BLOCK: char = '▀';

const RESET: &str = "\x1b[0m";

/// A truecolor pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PixelColor {
    pub const BLACK: PixelColor = PixelColor { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// The two sub-pixels drawn by one terminal cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    /// Foreground, upper half of the cell
    pub top: PixelColor,
    /// Background, lower half of the cell
    pub bottom: PixelColor,
}

/// Row-major grid of cells for one frame
pub type PixelGrid = Vec<Vec<ColorPair>>;

/// Printable text for one frame, one line per grid row
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderedFrame(String);

impl RenderedFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Number of printable lines
    pub fn line_count(&self) -> usize {
        self.0.lines().count()
    }

    /// Width of the frame in terminal cells
    pub fn cell_width(&self) -> usize {
        self.0
            .lines()
            .next()
            .map(|line| line.matches(HALF_BLOCK).count())
            .unwrap_or(0)
    }

    /// The first `lines` lines, joined without a trailing line break so the
    /// terminal does not scroll when the last line sits on the bottom row
    pub fn head(&self, lines: usize) -> String {
        self.0.lines().take(lines).collect::<Vec<_>>().join("\n")
    }
}

/// Per-channel mean of the pixels in `[x0, x1) x [y0, y1)`, truncated
///
/// The region must be non-empty and inside the frame.
pub fn average_tile(frame: &RawFrame, x0: u32, y0: u32, x1: u32, y1: u32) -> PixelColor {
    debug_assert!(x0 < x1 && y0 < y1, "tile region must be non-empty");

    let mut sums = [0u64; 3];
    for y in y0..y1 {
        let row_start = (y as usize * frame.width as usize + x0 as usize) * 3;
        let row_end = row_start + (x1 - x0) as usize * 3;
        for pixel in frame.data[row_start..row_end].chunks_exact(3) {
            sums[0] += u64::from(pixel[0]);
            sums[1] += u64::from(pixel[1]);
            sums[2] += u64::from(pixel[2]);
        }
    }

    let count = u64::from(x1 - x0) * u64::from(y1 - y0);
    PixelColor::new(
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8,
    )
}

/// Edge length in source pixels of the square tile behind each half cell
pub fn tile_size(frame_width: u32, columns: u32) -> Result<u32> {
    if columns == 0 || columns > frame_width {
        return Err(BlockcastError::Encoding(format!(
            "column count {} must be between 1 and the frame width {}",
            columns, frame_width
        )));
    }
    Ok(frame_width / columns)
}

/// Reduce a frame to a grid of color pairs `columns` cells wide
///
/// Each cell covers two vertically stacked tiles. A trailing partial tile
/// column is dropped; a bottom tile band that does not fit inside the frame
/// is black.
pub fn pixelate(frame: &RawFrame, columns: u32) -> Result<PixelGrid> {
    frame.check_layout()?;
    let tile = tile_size(frame.width, columns)?;
    let cells_wide = frame.width / tile;

    let mut grid = Vec::with_capacity(frame.height.div_ceil(tile * 2) as usize);
    for top_y in (0..frame.height).step_by((tile * 2) as usize) {
        let top_end = (top_y + tile).min(frame.height);
        let bottom_end = top_end + tile;
        let has_bottom = bottom_end <= frame.height;

        let mut row = Vec::with_capacity(cells_wide as usize);
        for cell in 0..cells_wide {
            let x0 = cell * tile;
            let x1 = x0 + tile;
            let top = average_tile(frame, x0, top_y, x1, top_end);
            let bottom = if has_bottom {
                average_tile(frame, x0, top_end, x1, bottom_end)
            } else {
                PixelColor::BLACK
            };
            row.push(ColorPair { top, bottom });
        }
        grid.push(row);
    }

    debug!(
        "Pixelated {}x{} frame with tile size {} into {}x{} cells",
        frame.width,
        frame.height,
        tile,
        cells_wide,
        grid.len()
    );
    Ok(grid)
}

/// Render a grid as truecolor escape sequences, one line per row
pub fn render_grid(grid: &PixelGrid) -> RenderedFrame {
    // bg + fg escapes are at most 19 bytes each, glyph 3, reset 4
    let cells: usize = grid.iter().map(Vec::len).sum();
    let mut text = String::with_capacity(cells * 45 + grid.len());

    for row in grid {
        for pair in row {
            let ColorPair { top, bottom } = pair;
            let _ = write!(
                text,
                "\x1b[48;2;{};{};{}m\x1b[38;2;{};{};{}m{}{}",
                bottom.r, bottom.g, bottom.b, top.r, top.g, top.b, HALF_BLOCK, RESET
            );
        }
        text.push('\n');
    }

    RenderedFrame(text)
}

/// Pixelate and render one frame, consuming its buffer
pub fn encode_frame(frame: RawFrame, columns: u32) -> Result<RenderedFrame> {
    let grid = pixelate(&frame, columns)?;
    Ok(render_grid(&grid))
}
