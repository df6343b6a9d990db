//! sparseccl-core: Core types for sparse connected-component labeling.
//!
//! This crate provides the cell model, the flattened multi-module batch
//! layout, labeling results, configuration and error types shared by the
//! labeling algorithms.
//!

pub mod batch;
pub mod cell;
pub mod config;
pub mod error;
pub mod labels;

pub use batch::{ModuleBatch, ModuleDescriptor};
pub use cell::{
    first_order_violation, sort_column_major, Cell, ChannelPos, ModuleExtent, PixelCell,
};
pub use config::{CclConfig, OrderCheck, ParallelConfig, ScratchPolicy, ValidatorConfig};
pub use error::{Error, Result};
pub use labels::{BatchLabels, ModuleLabels};
