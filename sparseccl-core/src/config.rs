//! Labeling configuration types.

use crate::cell::ModuleExtent;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// When to verify the column-major precondition before labeling.
///
/// Unsorted input does not fail on its own; it silently yields a wrong
/// clustering. The check is linear in the cell count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OrderCheck {
    /// Check every module.
    Always,
    /// Check only in builds with debug assertions.
    #[default]
    DebugOnly,
    /// Trust the caller.
    Never,
}

impl OrderCheck {
    /// Returns true if the check runs in the current build.
    #[must_use]
    pub fn enabled(self) -> bool {
        match self {
            Self::Always => true,
            Self::DebugOnly => cfg!(debug_assertions),
            Self::Never => false,
        }
    }
}

/// Configuration for sequential labeling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CclConfig {
    /// Input order verification.
    pub order_check: OrderCheck,
}

impl CclConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the order check mode.
    #[must_use]
    pub fn with_order_check(mut self, order_check: OrderCheck) -> Self {
        self.order_check = order_check;
        self
    }
}

/// Sizing of the per-task scratch label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScratchPolicy {
    /// Size scratch from each module's descriptor count.
    #[default]
    PerModule,
    /// Cap every module at a fixed number of cells.
    ///
    /// Batches containing a larger module are rejected before any task runs.
    Bounded(usize),
}

impl ScratchPolicy {
    /// Returns the cap, if any.
    #[must_use]
    pub fn capacity(self) -> Option<usize> {
        match self {
            Self::PerModule => None,
            Self::Bounded(cap) => Some(cap),
        }
    }
}

/// Configuration for batch (per-module parallel) labeling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParallelConfig {
    /// Per-module labeling options.
    pub ccl: CclConfig,
    /// Scratch table sizing.
    pub scratch: ScratchPolicy,
    /// Worker threads; `None` uses the global rayon pool.
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-module labeling options.
    #[must_use]
    pub fn with_ccl(mut self, ccl: CclConfig) -> Self {
        self.ccl = ccl;
        self
    }

    /// Sets the scratch sizing policy.
    #[must_use]
    pub fn with_scratch(mut self, scratch: ScratchPolicy) -> Self {
        self.scratch = scratch;
        self
    }

    /// Uses a dedicated pool with `threads` workers.
    #[must_use]
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Checks the configuration for values that cannot run.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for a zero scratch bound or thread count.
    pub fn validate(&self) -> Result<()> {
        if self.scratch == ScratchPolicy::Bounded(0) {
            return Err(Error::ConfigError(
                "scratch bound must hold at least one cell".to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(Error::ConfigError(
                "thread count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the reference validator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidatorConfig {
    /// Module grid dimensions.
    pub extent: ModuleExtent,
    /// Draw the labeled grid in mismatch dumps.
    pub draw_grid: bool,
    /// Append the cell list to mismatch dumps.
    pub dump_cells: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            extent: ModuleExtent::default(),
            draw_grid: true,
            dump_cells: false,
        }
    }
}

impl ValidatorConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the module extent.
    #[must_use]
    pub fn with_extent(mut self, extent: ModuleExtent) -> Self {
        self.extent = extent;
        self
    }

    /// Enables or disables the grid drawing.
    #[must_use]
    pub fn with_draw_grid(mut self, draw_grid: bool) -> Self {
        self.draw_grid = draw_grid;
        self
    }

    /// Enables or disables the cell list.
    #[must_use]
    pub fn with_dump_cells(mut self, dump_cells: bool) -> Self {
        self.dump_cells = dump_cells;
        self
    }

    /// Checks the configuration for values that cannot run.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for an empty extent.
    pub fn validate(&self) -> Result<()> {
        if self.extent.width == 0 || self.extent.height == 0 {
            return Err(Error::ConfigError(format!(
                "module extent {}x{} is empty",
                self.extent.width, self.extent.height
            )));
        }
        Ok(())
    }
}
