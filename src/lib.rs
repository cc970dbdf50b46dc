//! layergrid - headless layered grid model
//!
//! A grid is a stack of layers, each remapping column/row indices to
//! positions and computing pixel geometry:
//! - Data layers over an abstract [`data::DataProvider`]
//! - Column and row reordering with persisted permutations
//! - Cell selection that follows reordered data
//! - A virtualized viewport with step/page scrolling and scrollbar sync
//! - Headers that borrow one dimension from the body
//! - A composite grid of corner, headers and body
//!
//! Commands travel down the stack and events travel up. Nothing is drawn;
//! a renderer queries positions, pixels and cell labels from the top layer.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use layergrid::data::VecDataProvider;
//! use layergrid::{Axis, DefaultGrid, GridConfig, Layer};
//!
//! let provider = Rc::new(VecDataProvider::with_coordinates(20, 100));
//! let grid = DefaultGrid::new(provider, &GridConfig::default());
//! grid.resize(440, 220);
//!
//! // Row header plus four 100px body columns
//! assert_eq!(grid.layer().borrow().position_count(Axis::Column), 5);
//! // Column header plus ten 20px body rows
//! assert_eq!(grid.layer().borrow().position_count(Axis::Row), 11);
//! ```

pub mod command;
pub mod composite;
pub mod config;
pub mod coordinate;
pub mod data;
pub mod dimension;
pub mod error;
pub mod event;
pub mod layer;
pub mod persistence;
pub mod reorder;
pub mod selection;
pub mod viewport;

pub use command::LayerCommand;
pub use composite::{CompositeLayer, DefaultGrid};
pub use config::GridConfig;
pub use coordinate::{Axis, Index, Pixel, Position, Range, Rectangle};
pub use error::{GridError, Result};
pub use event::LayerEvent;
pub use layer::{execute, flush_events, Layer, LayerCell, SharedLayer};
pub use persistence::Properties;
