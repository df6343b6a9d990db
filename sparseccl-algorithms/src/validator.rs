//! Flood-fill reference for checking labeling results.
//!
//! The validator shares no code with the union-find labeling: it marks cells
//! on a dense presence grid covering the whole module and flood-fills every
//! 8-connected component from scratch. That makes it slow (proportional to
//! the module area, not the cell count) and suitable only for testing.
#![allow(clippy::cast_possible_truncation)]

use log::{debug, warn};
use sparseccl_core::{
    ChannelPos, Error, ModuleExtent, ModuleLabels, PixelCell, Result, ValidatorConfig,
};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Result of comparing a claimed cluster count against the flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The claim agrees with the flood fill.
    Match {
        /// Agreed cluster count.
        clusters: u32,
    },
    /// The flood fill found a different number of clusters.
    CountMismatch {
        /// Count under test.
        claimed: u32,
        /// Count from the flood fill.
        found: u32,
    },
    /// No cells, yet a non-zero cluster count was claimed.
    TrivialInputError {
        /// Count under test.
        claimed: u32,
    },
}

impl ValidationOutcome {
    /// Returns true for [`ValidationOutcome::Match`].
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Scoped diagnostics context for a run of validations.
///
/// Counts checks and mismatches, and optionally writes a dump of every
/// mismatching module to a sink. A failing sink is dropped with a warning;
/// it never changes a validation outcome.
#[derive(Default)]
pub struct ValidationSession {
    sink: Option<Box<dyn Write + Send>>,
    checked: usize,
    mismatches: usize,
}

impl std::fmt::Debug for ValidationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationSession")
            .field("has_sink", &self.sink.is_some())
            .field("checked", &self.checked)
            .field("mismatches", &self.mismatches)
            .finish()
    }
}

impl ValidationSession {
    /// A session that only counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that writes mismatch dumps to `sink`.
    #[must_use]
    pub fn with_sink<W: Write + Send + 'static>(sink: W) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            ..Self::default()
        }
    }

    /// A session that writes mismatch dumps to a new file at `path`.
    ///
    /// # Errors
    /// Returns any error from creating the file.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_sink(BufWriter::new(file)))
    }

    /// Number of validations run in this session.
    #[must_use]
    pub fn checked(&self) -> usize {
        self.checked
    }

    /// Number of validations that did not match.
    #[must_use]
    pub fn mismatches(&self) -> usize {
        self.mismatches
    }

    /// Returns true while a dump sink is attached.
    #[must_use]
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Flushes the sink and ends the session.
    ///
    /// # Errors
    /// Returns any error from flushing the sink.
    pub fn finish(mut self) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    fn record(&mut self, outcome: ValidationOutcome) {
        self.checked += 1;
        if !outcome.is_match() {
            self.mismatches += 1;
        }
    }

    fn dump(&mut self, report: &str) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(e) = sink.write_all(report.as_bytes()) {
            warn!("dropping validation dump sink: {e}");
            self.sink = None;
        }
    }
}

/// Dense presence grid with per-channel flood labels.
///
/// Indexed column-major, `channel0 * height + channel1`, so a linear scan
/// visits channels in the same order as sorted cells.
struct Grid {
    extent: ModuleExtent,
    present: Vec<bool>,
    labels: Vec<u32>,
}

impl Grid {
    fn new(extent: ModuleExtent) -> Self {
        Self {
            extent,
            present: vec![false; extent.area()],
            labels: vec![0; extent.area()],
        }
    }

    #[inline]
    fn index(&self, pos: ChannelPos) -> usize {
        pos.channel0 as usize * self.extent.height as usize + pos.channel1 as usize
    }

    fn mark<C: PixelCell>(&mut self, cells: &[C]) -> Result<()> {
        for cell in cells {
            let pos = cell.pos();
            if !self.extent.contains(pos) {
                return Err(Error::CellOutOfExtent {
                    channel0: pos.channel0,
                    channel1: pos.channel1,
                    width: self.extent.width,
                    height: self.extent.height,
                });
            }
            let idx = self.index(pos);
            self.present[idx] = true;
        }
        Ok(())
    }

    /// Labels every component and returns how many there are.
    fn fill_all(&mut self) -> u32 {
        let mut components = 0u32;
        let mut stack = Vec::new();
        for channel0 in 0..self.extent.width {
            for channel1 in 0..self.extent.height {
                let idx = self.index(ChannelPos::new(channel0, channel1));
                if self.present[idx] && self.labels[idx] == 0 {
                    components += 1;
                    self.fill(ChannelPos::new(channel0, channel1), components, &mut stack);
                }
            }
        }
        components
    }

    /// Explicit-stack flood fill over the 8-neighbourhood.
    fn fill(&mut self, seed: ChannelPos, label: u32, stack: &mut Vec<ChannelPos>) {
        stack.clear();
        let idx = self.index(seed);
        self.labels[idx] = label;
        stack.push(seed);

        while let Some(pos) = stack.pop() {
            let c0_lo = pos.channel0.saturating_sub(1);
            let c0_hi = (pos.channel0 + 1).min(self.extent.width - 1);
            let c1_lo = pos.channel1.saturating_sub(1);
            let c1_hi = (pos.channel1 + 1).min(self.extent.height - 1);
            for channel0 in c0_lo..=c0_hi {
                for channel1 in c1_lo..=c1_hi {
                    let next = ChannelPos::new(channel0, channel1);
                    let idx = self.index(next);
                    if self.present[idx] && self.labels[idx] == 0 {
                        self.labels[idx] = label;
                        stack.push(next);
                    }
                }
            }
        }
    }

    fn label_at(&self, pos: ChannelPos) -> u32 {
        self.labels[self.index(pos)]
    }

    /// Draws the bounding box of the present cells, one row per `channel1`.
    fn draw<C: PixelCell>(&self, cells: &[C], out: &mut String) {
        let (Some(c0_min), Some(c0_max)) = (
            cells.iter().map(PixelCell::channel0).min(),
            cells.iter().map(PixelCell::channel0).max(),
        ) else {
            return;
        };
        let c1_min = cells.iter().map(PixelCell::channel1).min().unwrap_or(0);
        let c1_max = cells.iter().map(PixelCell::channel1).max().unwrap_or(0);

        let _ = writeln!(out, "origin ({c0_min}, {c1_min})");
        for channel1 in c1_min..=c1_max {
            for channel0 in c0_min..=c0_max {
                let pos = ChannelPos::new(channel0, channel1);
                let glyph = if self.present[self.index(pos)] {
                    char::from_digit(self.label_at(pos), 36).unwrap_or('#')
                } else {
                    ' '
                };
                out.push(glyph);
            }
            out.push('\n');
        }
    }
}

/// Independent cluster counter for labeling results.
#[derive(Debug, Clone, Default)]
pub struct ReferenceValidator {
    config: ValidatorConfig,
}

impl ReferenceValidator {
    /// Create with custom configuration.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for an empty module extent.
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create for a module extent with default dump settings.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for an empty module extent.
    pub fn with_extent(extent: ModuleExtent) -> Result<Self> {
        Self::new(ValidatorConfig::new().with_extent(extent))
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Counts the 8-connected components of `cells` by flood fill.
    ///
    /// Cell order does not matter.
    ///
    /// # Errors
    /// Returns [`Error::CellOutOfExtent`] if a cell lies outside the module.
    pub fn count_components<C: PixelCell>(&self, cells: &[C]) -> Result<u32> {
        let mut grid = Grid::new(self.config.extent);
        grid.mark(cells)?;
        Ok(grid.fill_all())
    }

    /// Flood-fill labels for `cells`.
    ///
    /// Components are numbered in column-major scan order, so for sorted
    /// input the ids ascend with each component's first cell.
    ///
    /// # Errors
    /// Returns [`Error::CellOutOfExtent`] if a cell lies outside the module.
    pub fn reference_labels<C: PixelCell>(&self, cells: &[C]) -> Result<ModuleLabels> {
        let mut grid = Grid::new(self.config.extent);
        grid.mark(cells)?;
        let components = grid.fill_all();
        let labels = cells.iter().map(|cell| grid.label_at(cell.pos())).collect();
        ModuleLabels::from_table(labels, components)
    }

    /// Checks a claimed cluster count for one module.
    ///
    /// # Errors
    /// Returns [`Error::CellOutOfExtent`] if a cell lies outside the module.
    pub fn validate<C: PixelCell>(
        &self,
        cells: &[C],
        claimed: u32,
        session: &mut ValidationSession,
    ) -> Result<ValidationOutcome> {
        if cells.is_empty() {
            let outcome = if claimed == 0 {
                ValidationOutcome::Match { clusters: 0 }
            } else {
                warn!("empty module claimed {claimed} clusters");
                ValidationOutcome::TrivialInputError { claimed }
            };
            session.record(outcome);
            return Ok(outcome);
        }

        let mut grid = Grid::new(self.config.extent);
        grid.mark(cells)?;
        let found = grid.fill_all();

        let outcome = if found == claimed {
            ValidationOutcome::Match { clusters: found }
        } else {
            ValidationOutcome::CountMismatch { claimed, found }
        };
        session.record(outcome);

        if outcome.is_match() {
            debug!("validated {} cells, {} clusters", cells.len(), found);
        } else {
            warn!(
                "cluster count mismatch: claimed {claimed}, flood fill found {found} ({} cells)",
                cells.len()
            );
            if session.has_sink() {
                let report = self.mismatch_report(&grid, cells, claimed, found);
                session.dump(&report);
            }
        }
        Ok(outcome)
    }

    fn mismatch_report<C: PixelCell>(
        &self,
        grid: &Grid,
        cells: &[C],
        claimed: u32,
        found: u32,
    ) -> String {
        let banner_width = self.config.extent.width.clamp(8, 120) as usize;
        let mut report = String::new();
        let _ = writeln!(report, "BEGIN{}", "v".repeat(banner_width));
        let _ = writeln!(
            report,
            "ERROR labeling found {claimed} clusters, flood fill found {found}. Cell count = {}",
            cells.len()
        );
        if self.config.draw_grid {
            grid.draw(cells, &mut report);
        }
        if self.config.dump_cells {
            for cell in cells {
                let _ = write!(report, "({}, {}) ", cell.channel0(), cell.channel1());
            }
            report.push('\n');
        }
        let _ = writeln!(report, "END{}\n", "^".repeat(banner_width + 2));
        report
    }
}
