//! Data sources and the data layer at the bottom of every stack.
//!
//! This module handles:
//! - Cell values and the [`DataProvider`] abstraction
//! - In-memory and header label providers
//! - Per-index sizes with default and overrides
//! - [`DataLayer`], where position and index coincide

mod layer;
mod provider;
mod size_config;
mod value;

pub use layer::{ColumnLabelAccumulator, DataLayer, LabelAccumulator, COLUMN_LABEL_PREFIX};
pub use provider::{
    column_letter, ColumnHeaderDataProvider, CornerDataProvider, DataProvider,
    RowHeaderDataProvider, VecDataProvider,
};
pub use size_config::SizeConfig;
pub use value::CellValue;
