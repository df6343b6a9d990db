//! Cell traits and types for pixel detector modules.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Channel position of a cell on its module.
///
/// Ordering is column-major: `channel0` first, then `channel1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelPos {
    /// Column index.
    pub channel0: u32,
    /// Row index.
    pub channel1: u32,
}

impl ChannelPos {
    /// Creates a new channel position.
    #[inline]
    #[must_use]
    pub fn new(channel0: u32, channel1: u32) -> Self {
        Self { channel0, channel1 }
    }

    /// Checks if this position is adjacent to another (8-connectivity).
    ///
    /// A position is never adjacent to itself.
    #[inline]
    #[must_use]
    pub fn is_adjacent(&self, other: &Self) -> bool {
        let dx = self.channel0.abs_diff(other.channel0);
        let dy = self.channel1.abs_diff(other.channel1);
        dx <= 1 && dy <= 1 && (dx != 0 || dy != 0)
    }
}

impl From<(u32, u32)> for ChannelPos {
    fn from((channel0, channel1): (u32, u32)) -> Self {
        Self::new(channel0, channel1)
    }
}

/// One fired pixel on a detector module.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cell {
    /// Column index.
    pub channel0: u32,
    /// Row index.
    pub channel1: u32,
    /// Signal amplitude.
    pub activation: f32,
    /// Time of the activation.
    pub time: f32,
}

impl Cell {
    /// Creates a new cell.
    #[inline]
    #[must_use]
    pub fn new(channel0: u32, channel1: u32, activation: f32, time: f32) -> Self {
        Self {
            channel0,
            channel1,
            activation,
            time,
        }
    }

    /// Creates a cell with unit activation at time zero.
    #[inline]
    #[must_use]
    pub fn at(channel0: u32, channel1: u32) -> Self {
        Self::new(channel0, channel1, 1.0, 0.0)
    }
}

/// Trait for cells that can be labeled.
///
/// Labeling only looks at channel positions, so any per-detector cell
/// representation can be clustered by exposing its two channels.
pub trait PixelCell: Send + Sync {
    /// Returns the column index.
    fn channel0(&self) -> u32;

    /// Returns the row index.
    fn channel1(&self) -> u32;

    /// Returns the channel position.
    #[inline]
    fn pos(&self) -> ChannelPos {
        ChannelPos::new(self.channel0(), self.channel1())
    }
}

impl PixelCell for Cell {
    #[inline]
    fn channel0(&self) -> u32 {
        self.channel0
    }

    #[inline]
    fn channel1(&self) -> u32 {
        self.channel1
    }
}

impl PixelCell for ChannelPos {
    #[inline]
    fn channel0(&self) -> u32 {
        self.channel0
    }

    #[inline]
    fn channel1(&self) -> u32 {
        self.channel1
    }

    #[inline]
    fn pos(&self) -> ChannelPos {
        *self
    }
}

/// Finds the first position where `cells` breaks strict column-major order.
///
/// Returns the index of the offending cell, or `None` if the slice is sorted
/// by `(channel0, channel1)` with no repeated position.
#[must_use]
pub fn first_order_violation<C: PixelCell>(cells: &[C]) -> Option<usize> {
    cells
        .windows(2)
        .position(|pair| pair[0].pos() >= pair[1].pos())
        .map(|i| i + 1)
}

/// Sorts cells into column-major order in place.
pub fn sort_column_major<C: PixelCell>(cells: &mut [C]) {
    cells.sort_unstable_by_key(PixelCell::pos);
}

/// Dimensions of a module's channel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleExtent {
    /// Number of columns (`channel0` range).
    pub width: u32,
    /// Number of rows (`channel1` range).
    pub height: u32,
}

impl ModuleExtent {
    /// Creates a new extent.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if the position lies inside the extent.
    #[inline]
    #[must_use]
    pub fn contains(&self, pos: ChannelPos) -> bool {
        pos.channel0 < self.width && pos.channel1 < self.height
    }

    /// Total number of channels.
    #[must_use]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for ModuleExtent {
    /// Pixel module size of the TrackML detector.
    fn default() -> Self {
        Self {
            width: 336,
            height: 1280,
        }
    }
}
