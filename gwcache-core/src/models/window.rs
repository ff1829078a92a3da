use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Represent a window from [start, end)
/// Inclusive start, exclusive of end
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Window {
    pub start: u64,
    pub end: u64,
}

impl Window {
    pub fn new(start: u64, end: u64) -> Self {
        Window { start, end }
    }

    pub fn width(&self) -> u64 {
        self.end - self.start
    }

    /// Midpoint of the window, rounded down: `start + width / 2`.
    pub fn mid_point(&self) -> u64 {
        self.start + self.width() / 2
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

///
/// The windows covering one chromosome at one resolution and overlap.
///
/// Windows start at 0 and advance by `resolution - overlap`. Every window is
/// `resolution` wide except the last one, which is clipped to the chromosome
/// length rather than dropped. A `Tiling` is a plain value: iterating it
/// always starts again from the first window.
///
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Tiling {
    chrom_length: u64,
    resolution: u64,
    overlap: u64,
}

///
/// Tile a chromosome into windows.
///
/// # Arguments
/// - chrom_length: chromosome length in bases
/// - resolution: window width in bases
/// - overlap: bases shared by consecutive windows, must be smaller than `resolution`
///
pub fn tile(chrom_length: u64, resolution: u64, overlap: u64) -> Result<Tiling, ConfigError> {
    if resolution == 0 {
        return Err(ConfigError::ZeroResolution);
    }
    if overlap >= resolution {
        return Err(ConfigError::OverlapTooLarge {
            overlap,
            resolution,
        });
    }
    Ok(Tiling {
        chrom_length,
        resolution,
        overlap,
    })
}

impl Tiling {
    pub fn chrom_length(&self) -> u64 {
        self.chrom_length
    }

    pub fn resolution(&self) -> u64 {
        self.resolution
    }

    pub fn overlap(&self) -> u64 {
        self.overlap
    }

    /// Distance between consecutive window starts.
    pub fn step(&self) -> u64 {
        self.resolution - self.overlap
    }

    /// Number of windows: `ceil(chrom_length / step)`.
    pub fn len(&self) -> usize {
        self.chrom_length.div_ceil(self.step()) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.chrom_length == 0
    }

    /// The `i`-th window, if it exists.
    pub fn window(&self, i: usize) -> Option<Window> {
        let start = (i as u64).checked_mul(self.step())?;
        if start >= self.chrom_length {
            return None;
        }
        Some(Window {
            start,
            end: (start + self.resolution).min(self.chrom_length),
        })
    }

    /// Index of the last window starting at or before `position`.
    pub fn row_at(&self, position: u64) -> usize {
        let row = (position / self.step()) as usize;
        row.min(self.len().saturating_sub(1))
    }

    /// Rows whose windows start inside `[start, end)`.
    pub fn rows_within(&self, start: u64, end: u64) -> std::ops::Range<usize> {
        let n = self.len();
        let first = (start.div_ceil(self.step()) as usize).min(n);
        let last = (end.div_ceil(self.step()) as usize).min(n);
        first..last.max(first)
    }

    pub fn iter(&self) -> Windows {
        Windows {
            tiling: *self,
            next: 0,
        }
    }
}

impl IntoIterator for Tiling {
    type Item = Window;
    type IntoIter = Windows;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &Tiling {
    type Item = Window;
    type IntoIter = Windows;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over the windows of a [`Tiling`].
#[derive(Debug, Clone)]
pub struct Windows {
    tiling: Tiling,
    next: usize,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        let window = self.tiling.window(self.next)?;
        self.next += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.tiling.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows {}
