//! Per-module parallel labeling of a flattened batch.
//!
//! Modules never interact, so every module is labeled by its own rayon task.
//! The output label buffer is split along the batch layout into disjoint
//! sub-slices before dispatch; each task sees only its module's cells and its
//! own sub-slice, and indexes both module-locally. No locks are needed.
//!
//! A batch either succeeds as a whole or fails with a single error: capacity
//! violations are rejected before any task starts, and a task that panics
//! aborts the batch with [`Error::DeviceExecutionFault`].

use crate::sparse_ccl::{check_label_range, check_order, label_cells};
use log::{debug, trace, warn};
use rayon::prelude::*;
use sparseccl_core::{
    BatchLabels, Error, ModuleBatch, ModuleDescriptor, ParallelConfig, PixelCell, Result,
    ScratchPolicy,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Batch labeling with one independent task per module.
#[derive(Debug)]
pub struct ParallelCcl {
    config: ParallelConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Default for ParallelCcl {
    fn default() -> Self {
        Self {
            config: ParallelConfig::default(),
            pool: None,
        }
    }
}

impl ParallelCcl {
    /// Create with custom configuration.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the configuration is invalid or the
    /// dedicated thread pool cannot be built.
    pub fn new(config: ParallelConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.num_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("sparseccl-{i}"))
                    .build()
                    .map_err(|e| Error::ConfigError(format!("thread pool: {e}")))?,
            ),
            None => None,
        };
        Ok(Self { config, pool })
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Labels every module of `batch`.
    ///
    /// Labels are written at the same offsets as the cells they belong to and
    /// numbered per module from 1.
    ///
    /// # Errors
    /// Returns [`Error::CapacityExceeded`] if any module is larger than the
    /// scratch bound, [`Error::InputOrderViolation`] if the order check is
    /// enabled and a module is unsorted, and [`Error::DeviceExecutionFault`]
    /// if any task faults. No partial result is returned in either case.
    pub fn label_batch<C: PixelCell>(&self, batch: &ModuleBatch<C>) -> Result<BatchLabels> {
        let descriptors = batch.descriptors();
        self.check_capacity(descriptors)?;

        let mut labels = vec![0u32; batch.total_cells()];
        let slots = split_by_layout(&mut labels, descriptors, batch.layout());
        let cells = batch.cells();

        let run = || {
            slots
                .into_par_iter()
                .map_init(Vec::new, |scratch, (module, out)| {
                    self.label_module(scratch, module, descriptors[module], cells, out)
                })
                .collect::<Result<Vec<(usize, u32)>>>()
        };
        let counts = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }?;

        let mut cluster_counts = vec![0u32; descriptors.len()];
        for (module, count) in counts {
            cluster_counts[module] = count;
        }

        let result = BatchLabels::new(labels, cluster_counts, descriptors.to_vec())?;
        debug!(
            "labeled batch: {} modules, {} cells, {} clusters",
            result.module_count(),
            batch.total_cells(),
            result.total_clusters()
        );
        Ok(result)
    }

    fn check_capacity(&self, descriptors: &[ModuleDescriptor]) -> Result<()> {
        for (module, descriptor) in descriptors.iter().enumerate() {
            check_label_range(module, descriptor.count)?;
            if let ScratchPolicy::Bounded(capacity) = self.config.scratch {
                if descriptor.count > capacity {
                    return Err(Error::CapacityExceeded {
                        module,
                        cell_count: descriptor.count,
                        capacity,
                    });
                }
            }
        }
        Ok(())
    }

    /// Runs both passes for one module inside its task.
    fn label_module<C: PixelCell>(
        &self,
        scratch: &mut Vec<u32>,
        module: usize,
        descriptor: ModuleDescriptor,
        cells: &[C],
        out: &mut [u32],
    ) -> Result<(usize, u32)> {
        let module_cells = &cells[descriptor.range()];
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<u32> {
            if self.config.ccl.order_check.enabled() {
                check_order(module_cells)
                    .map_err(|e| e.in_module(module))
                    .inspect_err(|e| warn!("{e}"))?;
            }
            let table = scratch_table(scratch, self.config.scratch, module_cells.len());
            let clusters = label_cells(module_cells, table);
            out.copy_from_slice(table);
            Ok(clusters)
        }));

        match outcome {
            Ok(result) => result.map(|clusters| (module, clusters)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("module {module} faulted: {message}");
                Err(Error::DeviceExecutionFault {
                    module,
                    offset: descriptor.offset,
                    count: descriptor.count,
                    message,
                })
            }
        }
    }
}

/// Carves `labels` into one mutable sub-slice per module.
///
/// `layout` lists modules by ascending offset; the batch guarantees their
/// descriptors tile the buffer.
fn split_by_layout<'a>(
    labels: &'a mut [u32],
    descriptors: &[ModuleDescriptor],
    layout: &[usize],
) -> Vec<(usize, &'a mut [u32])> {
    let mut slots = Vec::with_capacity(layout.len());
    let mut rest = labels;
    for &module in layout {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(descriptors[module].count);
        slots.push((module, head));
        rest = tail;
    }
    debug_assert!(rest.is_empty());
    slots
}

/// Returns the task's scratch table, growing it as the policy allows.
fn scratch_table(scratch: &mut Vec<u32>, policy: ScratchPolicy, len: usize) -> &mut [u32] {
    let size = policy.capacity().unwrap_or(len);
    if scratch.len() < size {
        trace!("growing scratch table {} -> {}", scratch.len(), size);
        scratch.resize(size, 0);
    }
    &mut scratch[..len]
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparseccl_core::Cell;

    fn module(positions: &[(u32, u32)]) -> Vec<Cell> {
        positions.iter().map(|&(c0, c1)| Cell::at(c0, c1)).collect()
    }

    #[test]
    fn test_split_by_layout_out_of_order() {
        let mut labels = vec![0u32; 5];
        let descriptors = [ModuleDescriptor::new(2, 3), ModuleDescriptor::new(0, 2)];
        let slots = split_by_layout(&mut labels, &descriptors, &[1, 0]);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].0, 1);
        assert_eq!(slots[0].1.len(), 2);
        assert_eq!(slots[1].0, 0);
        assert_eq!(slots[1].1.len(), 3);
    }

    #[test]
    fn test_scratch_table_bounded() {
        let mut scratch = Vec::new();
        assert_eq!(scratch_table(&mut scratch, ScratchPolicy::Bounded(8), 3).len(), 3);
        assert_eq!(scratch.len(), 8);
        assert_eq!(scratch_table(&mut scratch, ScratchPolicy::PerModule, 12).len(), 12);
        assert_eq!(scratch.len(), 12);
    }

    #[test]
    fn test_label_small_batch() {
        let batch = ModuleBatch::from_modules(vec![
            module(&[(0, 0), (0, 1), (1, 0), (5, 5)]),
            Vec::new(),
            module(&[(2, 2)]),
        ]);
        let result = ParallelCcl::default().label_batch(&batch).unwrap();

        assert_eq!(result.cluster_counts(), &[2, 0, 1]);
        assert_eq!(result.labels(), &[1, 1, 1, 2, 1]);
        assert_eq!(result.total_clusters(), 3);
    }

    #[test]
    fn test_empty_batch() {
        let batch: ModuleBatch<Cell> = ModuleBatch::default();
        let result = ParallelCcl::default().label_batch(&batch).unwrap();
        assert_eq!(result.module_count(), 0);
        assert!(result.labels().is_empty());
    }

    #[test]
    fn test_capacity_exceeded_fails_batch() {
        let batch = ModuleBatch::from_modules(vec![
            module(&[(0, 0)]),
            module(&[(0, 0), (0, 2), (0, 4)]),
        ]);
        let ccl =
            ParallelCcl::new(ParallelConfig::new().with_scratch(ScratchPolicy::Bounded(2))).unwrap();

        assert_eq!(
            ccl.label_batch(&batch).unwrap_err(),
            Error::CapacityExceeded {
                module: 1,
                cell_count: 3,
                capacity: 2,
            }
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ParallelCcl::new(ParallelConfig::new().with_num_threads(0)).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
