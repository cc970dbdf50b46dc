//! Column and row reordering.
//!
//! This module handles:
//! - The [`IndexOrder`] permutation and its move algorithms
//! - [`ReorderLayer`], which exposes an axis of its underlying layer in that order
//! - Remapping the order when indices are added or removed below it

mod layer;
mod permutation;

pub use layer::ReorderLayer;
pub use permutation::IndexOrder;
