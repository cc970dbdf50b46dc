//! Composition of child layers into one grid.
//!
//! This module handles:
//! - Placing child layers on a columns x rows layout
//! - Deriving each child's client area from the composite's
//! - Routing commands to the child that owns the target positions
//! - Region labels and region-qualified persistence keys
//! - [`DefaultGrid`], the standard corner / header / body wiring

mod grid;
mod layer;

pub use grid::{DefaultGrid, BODY, COLUMN_HEADER, CORNER, ROW_HEADER};
pub use layer::{ChildSpec, CompositeLayer};
