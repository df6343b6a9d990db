//! sparseccl-algorithms: Connected-component labeling of detector cells.
//!
//! This crate provides:
//! - **SparseCCL** - single-pass union-find labeling of one column-major
//!   sorted module, followed by a compaction pass to ids `1..=k`
//! - **Parallel module CCL** - the same two passes run as one rayon task per
//!   module over a flattened [`ModuleBatch`](sparseccl_core::ModuleBatch)
//! - **Reference validator** - dense-grid flood fill used to check results
//! - **Synthetic data and density sweeps** for exercising both
//!
#![warn(missing_docs)]

pub mod adjacency;
pub mod compactor;
pub mod label_table;
mod parallel;
mod sparse_ccl;
pub mod sweep;
pub mod synth;
mod validator;

pub use adjacency::{is_adjacent, is_far_enough};
pub use compactor::compact_labels;
pub use label_table::{find_root, make_union};
pub use parallel::ParallelCcl;
pub use sparse_ccl::{associate, check_order, sparse_ccl, SparseCcl};
pub use sweep::{DensitySweep, SweepConfig, SweepReport};
pub use synth::Pattern;
pub use validator::{ReferenceValidator, ValidationOutcome, ValidationSession};

// Re-export core labeling types
pub use sparseccl_core::{
    BatchLabels, CclConfig, Cell, Error, ModuleBatch, ModuleDescriptor, ModuleExtent,
    ModuleLabels, OrderCheck, ParallelConfig, PixelCell, Result, ScratchPolicy, ValidatorConfig,
};
