//! SparseCCL: single-pass connected-component labeling of sorted cells.
//!
//! Key characteristics:
//! - Requires cells in column-major order (`channel0`, then `channel1`)
//! - Pass 1 links each cell to the roots of its already-scanned neighbours,
//!   scanning back only as far as the previous column
//! - Pass 2 turns roots into contiguous 1-based cluster ids
//! - Cost is bounded by local density rather than the square of the cell count
#![allow(clippy::cast_possible_truncation)]

use crate::adjacency::{is_adjacent, is_far_enough};
use crate::compactor::compact_labels;
use crate::label_table::{find_root, make_union};
use log::trace;
use sparseccl_core::{first_order_violation, CclConfig, Error, ModuleLabels, PixelCell, Result};

/// First pass: builds the union-find forest for one module.
///
/// On return every entry points at a strictly smaller index or at itself.
///
/// # Errors
/// Returns [`Error::LabelBufferMismatch`] if `labels` and `cells` differ in
/// length.
pub fn associate<C: PixelCell>(cells: &[C], labels: &mut [u32]) -> Result<()> {
    check_buffer(cells.len(), labels.len())?;
    associate_unchecked(cells, labels);
    Ok(())
}

fn associate_unchecked<C: PixelCell>(cells: &[C], labels: &mut [u32]) {
    let mut start_j = 0usize;
    for i in 0..cells.len() {
        labels[i] = i as u32;
        let mut ai = i as u32;
        for j in start_j..i {
            if is_adjacent(&cells[i], &cells[j]) {
                ai = make_union(labels, ai, find_root(labels, j as u32));
            } else if is_far_enough(&cells[i], &cells[j]) {
                // Stale columns form a prefix of the window.
                start_j += 1;
            }
        }
    }
}

/// Labels one module in place and returns its cluster count.
///
/// Runs both passes without checking input order.
///
/// # Errors
/// Returns [`Error::LabelBufferMismatch`] if `labels` and `cells` differ in
/// length.
pub fn sparse_ccl<C: PixelCell>(cells: &[C], labels: &mut [u32]) -> Result<u32> {
    check_buffer(cells.len(), labels.len())?;
    Ok(label_cells(cells, labels))
}

/// Both passes over a label table already sized to `cells`.
pub(crate) fn label_cells<C: PixelCell>(cells: &[C], labels: &mut [u32]) -> u32 {
    debug_assert_eq!(cells.len(), labels.len());
    associate_unchecked(cells, labels);
    compact_labels(labels)
}

fn check_buffer(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LabelBufferMismatch { expected, actual })
    }
}

/// Returns an error if `cells` is not in strict column-major order.
///
/// # Errors
/// Returns [`Error::InputOrderViolation`] naming the first offending cell.
pub fn check_order<C: PixelCell>(cells: &[C]) -> Result<()> {
    match first_order_violation(cells) {
        None => Ok(()),
        Some(index) => Err(Error::InputOrderViolation {
            module: None,
            index,
            previous: cells[index - 1].pos(),
            current: cells[index].pos(),
        }),
    }
}

/// Returns an error if a module is too large for 32-bit labels.
pub(crate) fn check_label_range(module: usize, cell_count: usize) -> Result<()> {
    if cell_count > u32::MAX as usize {
        return Err(Error::CapacityExceeded {
            module,
            cell_count,
            capacity: u32::MAX as usize,
        });
    }
    Ok(())
}

/// Sequential labeling of one module.
#[derive(Debug, Clone, Default)]
pub struct SparseCcl {
    config: CclConfig,
}

impl SparseCcl {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: CclConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &CclConfig {
        &self.config
    }

    /// Labels `cells` into a caller-owned table and returns the cluster count.
    ///
    /// # Errors
    /// Returns [`Error::LabelBufferMismatch`] if `labels` and `cells` differ in
    /// length, or [`Error::InputOrderViolation`] when the order check is
    /// enabled and fails.
    pub fn label_into<C: PixelCell>(&self, cells: &[C], labels: &mut [u32]) -> Result<u32> {
        check_buffer(cells.len(), labels.len())?;
        check_label_range(0, cells.len())?;
        if self.config.order_check.enabled() {
            check_order(cells)?;
        }

        let clusters = label_cells(cells, labels);
        trace!("labeled {} cells into {} clusters", cells.len(), clusters);
        Ok(clusters)
    }

    /// Labels `cells` and returns the cluster assignment.
    ///
    /// # Errors
    /// Returns [`Error::InputOrderViolation`] when the order check is enabled
    /// and fails.
    pub fn label_module<C: PixelCell>(&self, cells: &[C]) -> Result<ModuleLabels> {
        let mut labels = vec![0u32; cells.len()];
        let clusters = self.label_into(cells, &mut labels)?;
        ModuleLabels::from_table(labels, clusters)
    }
}
