//! Error types for sparseccl-core.

use crate::cell::ChannelPos;
use thiserror::Error;

/// Result type alias for sparseccl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for labeling operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Cells are not in strict column-major order.
    ///
    /// `index` is local to the module; `module` is set when the module was
    /// labeled as part of a batch.
    #[error(
        "cells not in column-major order{} at index {index}: {current:?} follows {previous:?}",
        module_context(.module)
    )]
    InputOrderViolation {
        module: Option<usize>,
        index: usize,
        previous: ChannelPos,
        current: ChannelPos,
    },

    /// A module holds more cells than the configured scratch capacity.
    #[error("module {module} has {cell_count} cells, exceeding scratch capacity {capacity}")]
    CapacityExceeded {
        module: usize,
        cell_count: usize,
        capacity: usize,
    },

    /// A task failed while the batch was executing; the whole batch is aborted.
    #[error("batch aborted: module {module} (offset {offset}, {count} cells) faulted: {message}")]
    DeviceExecutionFault {
        module: usize,
        offset: usize,
        count: usize,
        message: String,
    },

    /// Module descriptors do not partition the flattened buffer.
    #[error("invalid batch layout: {0}")]
    InvalidLayout(String),

    /// A caller-provided label buffer has the wrong length.
    #[error("label buffer holds {actual} entries, expected {expected}")]
    LabelBufferMismatch { expected: usize, actual: usize },

    /// A cell lies outside the module extent.
    #[error("cell ({channel0}, {channel1}) outside module extent {width}x{height}")]
    CellOutOfExtent {
        channel0: u32,
        channel1: u32,
        width: u32,
        height: u32,
    },

    /// A label table does not hold contiguous 1-based cluster ids.
    #[error("invalid label table: {0}")]
    InvalidLabels(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Tags a module-level error with the batch module it came from.
    #[must_use]
    pub fn in_module(self, module: usize) -> Self {
        match self {
            Self::InputOrderViolation {
                index,
                previous,
                current,
                ..
            } => Self::InputOrderViolation {
                module: Some(module),
                index,
                previous,
                current,
            },
            other => other,
        }
    }
}

#[allow(clippy::ref_option)]
fn module_context(module: &Option<usize>) -> String {
    module.map_or_else(String::new, |m| format!(" in module {m}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation() -> Error {
        Error::InputOrderViolation {
            module: None,
            index: 3,
            previous: ChannelPos::new(2, 0),
            current: ChannelPos::new(1, 5),
        }
    }

    #[test]
    fn test_order_violation_message_names_module() {
        let standalone = violation().to_string();
        assert!(standalone.starts_with("cells not in column-major order at index 3"));

        let batched = violation().in_module(7);
        assert!(matches!(
            batched,
            Error::InputOrderViolation {
                module: Some(7),
                index: 3,
                ..
            }
        ));
        assert!(batched
            .to_string()
            .starts_with("cells not in column-major order in module 7 at index 3"));
    }

    #[test]
    fn test_in_module_keeps_other_errors() {
        let err = Error::ConfigError("bad".into());
        assert_eq!(err.clone().in_module(2), err);
    }
}
