//! Virtualized viewport over a (possibly huge) underlying layer.
//!
//! This module handles:
//! - Origin tracking in pixel and position space, per axis
//! - Visible position count and pixel geometry for the client area
//! - Step/page/position scrolling with boundary snapping
//! - Keeping the origin stable when rows/columns are added or removed
//! - Two-way synchronization with an abstract [`Scrollbar`]

mod layer;
mod scrollbar;

pub use layer::ViewportLayer;
pub use scrollbar::{HeadlessScrollbar, Scrollbar};
