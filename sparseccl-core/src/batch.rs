//! Flattened multi-module cell buffers.
//!
//! A [`ModuleBatch`] packs the variable-length cell lists of many modules
//! into one contiguous buffer plus one [`ModuleDescriptor`] per module. The
//! descriptors partition the buffer exactly, so every module owns a disjoint
//! slice and can be labeled independently of all others.

use crate::cell::Cell;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Location of one module's cells inside a flattened buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleDescriptor {
    /// Index of the module's first cell in the flattened buffer.
    pub offset: usize,
    /// Number of cells in the module.
    pub count: usize,
}

impl ModuleDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(offset: usize, count: usize) -> Self {
        Self { offset, count }
    }

    /// One past the module's last cell.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.count
    }

    /// The module's range in the flattened buffer.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.end()
    }
}

/// Cells of many modules in one contiguous buffer.
///
/// The layout is validated on construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleBatch<C = Cell> {
    cells: Vec<C>,
    descriptors: Vec<ModuleDescriptor>,
    layout: Vec<usize>,
}

impl<C> Default for ModuleBatch<C> {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            descriptors: Vec::new(),
            layout: Vec::new(),
        }
    }
}

impl<C> ModuleBatch<C> {
    /// Creates an empty batch with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(modules: usize, cells: usize) -> Self {
        Self {
            cells: Vec::with_capacity(cells),
            descriptors: Vec::with_capacity(modules),
            layout: Vec::with_capacity(modules),
        }
    }

    /// Flattens per-module cell lists, in module order.
    pub fn from_modules<I, M>(modules: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: IntoIterator<Item = C>,
    {
        let mut batch = Self::default();
        for module in modules {
            batch.push_module(module);
        }
        batch
    }

    /// Builds a batch from an externally flattened buffer.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayout`] if the descriptors overlap, leave a
    /// gap, or do not cover the buffer exactly.
    pub fn from_parts(cells: Vec<C>, descriptors: Vec<ModuleDescriptor>) -> Result<Self> {
        let layout = partition_layout(cells.len(), &descriptors)?;
        Ok(Self {
            cells,
            descriptors,
            layout,
        })
    }

    /// Appends one module and returns its index.
    pub fn push_module<M: IntoIterator<Item = C>>(&mut self, cells: M) -> usize {
        let offset = self.cells.len();
        self.cells.extend(cells);
        let index = self.descriptors.len();
        self.descriptors
            .push(ModuleDescriptor::new(offset, self.cells.len() - offset));
        self.layout.push(index);
        index
    }

    /// The flattened cell buffer.
    #[must_use]
    pub fn cells(&self) -> &[C] {
        &self.cells
    }

    /// One descriptor per module, in module order.
    #[must_use]
    pub fn descriptors(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    /// Module indices ordered by ascending offset.
    ///
    /// Walking the buffer front to back visits modules in this order.
    #[must_use]
    pub fn layout(&self) -> &[usize] {
        &self.layout
    }

    /// Number of modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Number of cells across all modules.
    #[must_use]
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the batch holds no modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Cells of one module.
    #[must_use]
    pub fn module(&self, index: usize) -> Option<&[C]> {
        self.descriptors
            .get(index)
            .map(|descriptor| &self.cells[descriptor.range()])
    }

    /// Iterates over module cell slices in module order.
    pub fn modules(&self) -> impl Iterator<Item = &[C]> {
        self.descriptors
            .iter()
            .map(move |descriptor| &self.cells[descriptor.range()])
    }

    /// Cell count of the largest module.
    #[must_use]
    pub fn max_module_len(&self) -> usize {
        self.descriptors.iter().map(|d| d.count).max().unwrap_or(0)
    }

    /// Splits the batch back into its flattened buffer and descriptors.
    #[must_use]
    pub fn into_parts(self) -> (Vec<C>, Vec<ModuleDescriptor>) {
        (self.cells, self.descriptors)
    }
}

/// Checks that `descriptors` tile `0..total` and returns them in buffer order.
fn partition_layout(total: usize, descriptors: &[ModuleDescriptor]) -> Result<Vec<usize>> {
    let mut layout: Vec<usize> = (0..descriptors.len()).collect();
    // Empty modules sort ahead of a non-empty one at the same offset.
    layout.sort_by_key(|&i| (descriptors[i].offset, descriptors[i].count));

    let mut expected = 0usize;
    for &index in &layout {
        let descriptor = descriptors[index];
        if descriptor.offset != expected {
            let kind = if descriptor.offset < expected {
                "overlaps the previous module"
            } else {
                "leaves a gap after the previous module"
            };
            return Err(Error::InvalidLayout(format!(
                "module {index} at offset {} {kind} (expected offset {expected})",
                descriptor.offset
            )));
        }
        expected = descriptor.offset.checked_add(descriptor.count).ok_or_else(|| {
            Error::InvalidLayout(format!("module {index} extends past usize::MAX"))
        })?;
    }

    if expected != total {
        return Err(Error::InvalidLayout(format!(
            "descriptors cover {expected} cells but the buffer holds {total}"
        )));
    }
    Ok(layout)
}
