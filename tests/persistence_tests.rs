//! Persisted state tests
//!
//! Tests for saving and restoring orders and sizes, and for rejecting
//! persisted state that does not fit the current data.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::cell::RefCell;
use std::rc::Rc;

use layergrid::data::{DataLayer, DataProvider, VecDataProvider};
use layergrid::persistence::{from_json, to_json};
use layergrid::reorder::ReorderLayer;
use layergrid::{Axis, DefaultGrid, GridConfig, Layer, LayerCommand, Properties, SharedLayer};
use test_case::test_case;

fn column_reorder(columns: usize) -> Rc<RefCell<ReorderLayer>> {
    let provider = Rc::new(VecDataProvider::with_coordinates(columns, 2));
    let data: SharedLayer = Rc::new(RefCell::new(DataLayer::new(provider, 10, 10)));
    ReorderLayer::columns(data)
}

fn indices_by_position(layer: &ReorderLayer) -> Vec<Option<usize>> {
    (0..=layer.column_count())
        .map(|position| layer.column_index_by_position(position))
        .collect()
}

fn properties(entries: &[(&str, &str)]) -> Properties {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect()
}

// =============================================================================
// Reorder layer state
// =============================================================================

#[test]
fn test_order_round_trip() {
    let reorder = column_reorder(5);
    reorder.borrow_mut().move_multiple(&[3, 4], 0).unwrap();
    reorder.borrow_mut().move_single(4, 1).unwrap();
    let saved_order = reorder.borrow().order().to_vec();

    let mut saved = Properties::new();
    reorder.borrow().save_state("table", &mut saved);
    assert_eq!(
        saved.get("table.columnIndexOrder").map(String::as_str),
        Some("3,2,4,0,1")
    );

    reorder.borrow_mut().reset();
    assert_eq!(reorder.borrow().order(), &[0, 1, 2, 3, 4]);
    reorder.borrow_mut().load_state("table", &saved);
    assert_eq!(reorder.borrow().order(), saved_order.as_slice());
}

#[test]
fn test_trailing_comma_is_accepted() {
    let reorder = column_reorder(3);
    reorder
        .borrow_mut()
        .load_state("t", &properties(&[("t.columnIndexOrder", "2,0,1,")]));
    assert_eq!(reorder.borrow().order(), &[2, 0, 1]);
}

#[test_case("0,1,2" ; "too short")]
#[test_case("0,1,2,3,4" ; "too long")]
#[test_case("0,1,1,3" ; "duplicate index")]
#[test_case("0,1,2,9" ; "index out of range")]
#[test_case("0,x,2,3" ; "not a number")]
#[test_case("0,-1,2,3" ; "negative")]
#[test_case("" ; "empty")]
fn test_invalid_order_is_rejected(value: &str) {
    let reorder = column_reorder(4);
    reorder.borrow_mut().move_single(3, 0).unwrap();
    let before = indices_by_position(&reorder.borrow());

    reorder
        .borrow_mut()
        .load_state("t", &properties(&[("t.columnIndexOrder", value)]));

    assert_eq!(indices_by_position(&reorder.borrow()), before);
    assert_eq!(reorder.borrow().order(), &[3, 0, 1, 2]);
}

#[test]
fn test_missing_key_keeps_order() {
    let reorder = column_reorder(3);
    reorder.borrow_mut().move_single(0, 3).unwrap();
    reorder
        .borrow_mut()
        .load_state("t", &properties(&[("other.columnIndexOrder", "0,1,2")]));
    assert_eq!(reorder.borrow().order(), &[1, 2, 0]);
}

#[test]
fn test_order_saved_for_other_shape_is_rejected() {
    let small = column_reorder(3);
    small.borrow_mut().move_single(2, 0).unwrap();
    let mut saved = Properties::new();
    small.borrow().save_state("t", &mut saved);

    let large = column_reorder(4);
    large.borrow_mut().load_state("t", &saved);
    assert_eq!(large.borrow().order(), &[0, 1, 2, 3]);
}

// =============================================================================
// Grid state
// =============================================================================

#[test]
fn test_grid_state_round_trip() {
    let provider = Rc::new(VecDataProvider::with_coordinates(6, 8));
    let grid = DefaultGrid::new(Rc::clone(&provider) as Rc<dyn DataProvider>, &GridConfig::default());
    grid.resize(800, 400);
    grid.execute(&LayerCommand::Reorder {
        axis: Axis::Column,
        from: 1,
        to: 4,
    });
    grid.execute(&LayerCommand::MultiReorder {
        axis: Axis::Row,
        from: vec![1, 2],
        to: 5,
    });
    grid.execute(&LayerCommand::Resize {
        axis: Axis::Column,
        position: 2,
        size: 55,
    });
    let saved = grid.save_state("grid");

    assert_eq!(saved.get("grid.columnIndexOrder").map(String::as_str), Some("1,2,0,3,4,5"));
    assert_eq!(saved.get("grid.rowIndexOrder").map(String::as_str), Some("2,3,0,1,4,5,6,7"));
    assert_eq!(saved.get("grid.columnWidths").map(String::as_str), Some("2:55"));
    assert_eq!(saved.get("grid.columnWidths.default").map(String::as_str), Some("100"));
    assert!(saved.contains_key("grid.COLUMN_HEADER.rowHeights"));
    assert!(saved.contains_key("grid.ROW_HEADER.columnWidths"));

    let json = to_json(&saved).unwrap();
    let restored = DefaultGrid::new(provider, &GridConfig::default());
    restored.resize(800, 400);
    restored.load_state("grid", &from_json(&json).unwrap());

    assert_eq!(
        restored.column_reorder().borrow().order(),
        grid.column_reorder().borrow().order()
    );
    assert_eq!(
        restored.row_reorder().borrow().order(),
        grid.row_reorder().borrow().order()
    );
    let layer = restored.layer();
    let layer = layer.borrow();
    assert_eq!(layer.column_width_by_position(2), 55);
    assert_eq!(layer.data_value_by_position(1, 1), Some("1,2".into()));
}

#[test]
fn test_grid_rejects_bad_body_order_and_keeps_headers() {
    let provider = Rc::new(VecDataProvider::with_coordinates(3, 3));
    let grid = DefaultGrid::new(provider, &GridConfig::default());
    grid.resize(800, 400);
    grid.execute(&LayerCommand::Reorder {
        axis: Axis::Column,
        from: 3,
        to: 1,
    });

    grid.load_state(
        "grid",
        &properties(&[
            ("grid.columnIndexOrder", "0,0,1"),
            ("grid.rowIndexOrder", "2,1,0"),
        ]),
    );

    assert_eq!(grid.column_reorder().borrow().order(), &[2, 0, 1]);
    assert_eq!(grid.row_reorder().borrow().order(), &[2, 1, 0]);
    assert_eq!(
        grid.layer().borrow().data_value_by_position(1, 0),
        Some("C".into())
    );
}
