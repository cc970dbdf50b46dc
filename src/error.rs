//! Structured error types for layergrid.
//!
//! Queries never fail (they return `Option`); only caller mistakes on
//! mutating operations and malformed configuration surface as errors.

use crate::coordinate::{Axis, Position};

/// All errors that can occur while manipulating a layer stack.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A source position does not exist in the layer.
    #[error("{axis} position {position} out of range (count {count})")]
    PositionOutOfRange {
        axis: Axis,
        position: Position,
        count: usize,
    },

    /// A reorder target lies beyond `count` (the end slot).
    #[error("{axis} reorder target {target} out of range (count {count})")]
    TargetOutOfRange {
        axis: Axis,
        target: Position,
        count: usize,
    },

    /// Persisted state could not be applied.
    #[error("Invalid persisted state for {key}: {reason}")]
    InvalidState { key: String, reason: String },

    /// Configuration could not be deserialized.
    #[error("Configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

impl GridError {
    pub(crate) fn invalid_state(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
