//! Cell selection.
//!
//! Selected cells are remembered by data index, so the selection follows
//! reordered rows and columns. Adding or removing rows/columns clears it.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use log::debug;

use crate::command::{LayerCommand, SelectionModifier};
use crate::coordinate::{Axis, Index, Pixel, Position};
use crate::event::{CellSelectionEvent, LayerEvent, VisualChangeEvent};
use crate::layer::{attach, Layer, LayerCell, LayerCore, LayerId, SharedLayer};

/// Label carried by selected cells.
pub const SELECTED_LABEL: &str = "SELECTED";

/// Pass-through layer that tracks and labels selected cells.
pub struct SelectionLayer {
    core: LayerCore,
    underlying: SharedLayer,
    selected: BTreeSet<(Index, Index)>,
    all_selected: bool,
    anchor: Option<(Index, Index)>,
}

impl SelectionLayer {
    pub fn new(underlying: SharedLayer) -> Rc<RefCell<Self>> {
        let layer = Self {
            core: LayerCore::new(),
            underlying: SharedLayer::clone(&underlying),
            selected: BTreeSet::new(),
            all_selected: false,
            anchor: None,
        };
        attach(layer, &[&underlying])
    }

    /// Select the cell at the given positions; returns false outside the layer.
    pub fn select_cell(
        &mut self,
        column: Position,
        row: Position,
        modifier: SelectionModifier,
    ) -> bool {
        let (column_index, row_index) = {
            let underlying = self.underlying.borrow();
            match (
                underlying.index_by_position(Axis::Column, column),
                underlying.index_by_position(Axis::Row, row),
            ) {
                (Some(c), Some(r)) => (c, r),
                _ => return false,
            }
        };
        let cell = (column_index, row_index);

        match modifier {
            SelectionModifier::Replace => {
                self.clear_cells();
                self.selected.insert(cell);
                self.anchor = Some(cell);
            }
            SelectionModifier::Toggle => {
                if self.all_selected {
                    self.expand_all();
                }
                if !self.selected.remove(&cell) {
                    self.selected.insert(cell);
                }
                self.anchor = Some(cell);
            }
            SelectionModifier::Extend => {
                let anchor = self.anchor.unwrap_or(cell);
                let cells = self.rectangle(anchor, (column, row));
                self.selected.extend(cells);
                self.anchor = Some(anchor);
            }
        }
        debug!("selected cell {cell:?} ({modifier:?}), {} selected", self.selected.len());

        self.fire_layer_event(LayerEvent::CellSelection(CellSelectionEvent {
            column: Some(column),
            row: Some(row),
            reveal: true,
        }));
        true
    }

    pub fn select_all(&mut self) {
        self.selected.clear();
        self.all_selected = true;
        self.anchor = None;
        self.fire_layer_event(LayerEvent::Visual(VisualChangeEvent::all()));
    }

    pub fn clear(&mut self) {
        self.clear_cells();
        self.fire_layer_event(LayerEvent::Visual(VisualChangeEvent::all()));
    }

    fn clear_cells(&mut self) {
        self.selected.clear();
        self.all_selected = false;
        self.anchor = None;
    }

    /// Replace "everything selected" by the explicit set of current cells.
    fn expand_all(&mut self) {
        self.all_selected = false;
        let underlying = self.underlying.borrow();
        let columns: Vec<Index> = (0..underlying.position_count(Axis::Column))
            .filter_map(|p| underlying.index_by_position(Axis::Column, p))
            .collect();
        let rows: Vec<Index> = (0..underlying.position_count(Axis::Row))
            .filter_map(|p| underlying.index_by_position(Axis::Row, p))
            .collect();
        for &row in &rows {
            self.selected.extend(columns.iter().map(|&column| (column, row)));
        }
    }

    /// Cells between the anchor and `corner`, both inclusive, as indices.
    fn rectangle(
        &self,
        anchor: (Index, Index),
        corner: (Position, Position),
    ) -> Vec<(Index, Index)> {
        let underlying = self.underlying.borrow();
        let (Some(anchor_column), Some(anchor_row)) = (
            underlying.position_by_index(Axis::Column, anchor.0),
            underlying.position_by_index(Axis::Row, anchor.1),
        ) else {
            return Vec::new();
        };
        let columns = anchor_column.min(corner.0)..=anchor_column.max(corner.0);
        let rows = anchor_row.min(corner.1)..=anchor_row.max(corner.1);
        let mut cells = Vec::new();
        for row in rows {
            let Some(row_index) = underlying.index_by_position(Axis::Row, row) else {
                continue;
            };
            cells.extend(columns.clone().filter_map(|column| {
                underlying
                    .index_by_position(Axis::Column, column)
                    .map(|column_index| (column_index, row_index))
            }));
        }
        cells
    }

    pub fn is_cell_selected(&self, column: Position, row: Position) -> bool {
        let underlying = self.underlying.borrow();
        match (
            underlying.index_by_position(Axis::Column, column),
            underlying.index_by_position(Axis::Row, row),
        ) {
            (Some(c), Some(r)) => self.all_selected || self.selected.contains(&(c, r)),
            _ => false,
        }
    }

    /// Explicitly selected cells as `(column index, row index)`.
    pub fn selected_cells(&self) -> Vec<(Index, Index)> {
        self.selected.iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        !self.all_selected && self.selected.is_empty()
    }
}

impl Layer for SelectionLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn position_count(&self, axis: Axis) -> usize {
        self.underlying.borrow().position_count(axis)
    }

    fn index_by_position(&self, axis: Axis, position: Position) -> Option<Index> {
        self.underlying.borrow().index_by_position(axis, position)
    }

    fn position_by_index(&self, axis: Axis, index: Index) -> Option<Position> {
        self.underlying.borrow().position_by_index(axis, index)
    }

    fn local_to_underlying_position(&self, axis: Axis, position: Position) -> Option<Position> {
        (position < self.position_count(axis)).then_some(position)
    }

    fn underlying_to_local_position(
        &self,
        axis: Axis,
        _: LayerId,
        position: Position,
    ) -> Option<Position> {
        (position < self.position_count(axis)).then_some(position)
    }

    fn pixel_size(&self, axis: Axis) -> Pixel {
        self.underlying.borrow().pixel_size(axis)
    }

    fn size_by_position(&self, axis: Axis, position: Position) -> Pixel {
        self.underlying.borrow().size_by_position(axis, position)
    }

    fn start_pixel_of_position(&self, axis: Axis, position: Position) -> Option<Pixel> {
        self.underlying.borrow().start_pixel_of_position(axis, position)
    }

    fn position_by_pixel(&self, axis: Axis, pixel: Pixel) -> Option<Position> {
        self.underlying.borrow().position_by_pixel(axis, pixel)
    }

    fn cell_by_position(&self, column: Position, row: Position) -> Option<LayerCell> {
        let mut cell = self.underlying.borrow().cell_by_position(column, row)?;
        if self.all_selected || self.selected.contains(&(cell.column_index, cell.row_index)) {
            cell.add_label(SELECTED_LABEL);
        }
        Some(cell)
    }

    fn underlying_layers(&self) -> Vec<SharedLayer> {
        vec![SharedLayer::clone(&self.underlying)]
    }

    fn do_command(&mut self, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::SelectCell {
                column,
                row,
                modifier,
            } => self.select_cell(*column, *row, *modifier),
            LayerCommand::SelectAll => {
                self.select_all();
                true
            }
            LayerCommand::ClearSelection => {
                self.clear();
                true
            }
            _ => self.underlying.borrow_mut().do_command(command),
        }
    }

    fn handle_layer_event(&mut self, _source: LayerId, event: &LayerEvent) {
        if let LayerEvent::Structural(structural) = event {
            let resized = Axis::ALL
                .iter()
                .any(|&axis| structural.has_add_or_delete(axis));
            if resized && !self.is_empty() {
                debug!("rows/columns added or removed, clearing selection");
                self.clear_cells();
            }
        }
        self.fire_layer_event(event.clone());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::data::{DataLayer, VecDataProvider};
    use crate::layer::flush_events;
    use crate::reorder::ReorderLayer;

    fn selection_over_reorder() -> (
        Rc<RefCell<DataLayer>>,
        Rc<RefCell<ReorderLayer>>,
        Rc<RefCell<SelectionLayer>>,
    ) {
        let provider = Rc::new(VecDataProvider::with_coordinates(4, 4));
        let data = Rc::new(RefCell::new(DataLayer::new(provider, 10, 10)));
        let reorder = ReorderLayer::columns(Rc::clone(&data) as SharedLayer);
        let selection = SelectionLayer::new(Rc::clone(&reorder) as SharedLayer);
        (data, reorder, selection)
    }

    #[test]
    fn test_selected_label_follows_reorder() {
        let (_data, reorder, selection) = selection_over_reorder();
        assert!(selection.borrow_mut().select_cell(1, 2, SelectionModifier::Replace));
        reorder.borrow_mut().move_single(1, 4).unwrap();
        let layer = selection.borrow();
        assert!(layer.is_cell_selected(3, 2));
        assert!(!layer.is_cell_selected(1, 2));
        assert!(layer.cell_by_position(3, 2).unwrap().has_label(SELECTED_LABEL));
    }

    #[test]
    fn test_extend_selects_rectangle() {
        let (_data, _reorder, selection) = selection_over_reorder();
        let mut layer = selection.borrow_mut();
        layer.select_cell(1, 1, SelectionModifier::Replace);
        layer.select_cell(2, 3, SelectionModifier::Extend);
        assert_eq!(layer.selected_cells().len(), 6);
        assert!(layer.is_cell_selected(2, 2));
        assert!(!layer.is_cell_selected(0, 1));
    }

    #[test]
    fn test_toggle() {
        let (_data, _reorder, selection) = selection_over_reorder();
        let mut layer = selection.borrow_mut();
        layer.select_cell(0, 0, SelectionModifier::Replace);
        layer.select_cell(1, 0, SelectionModifier::Toggle);
        layer.select_cell(0, 0, SelectionModifier::Toggle);
        assert_eq!(layer.selected_cells(), vec![(1, 0)]);
    }

    #[test]
    fn test_select_all_then_toggle() {
        let (_data, _reorder, selection) = selection_over_reorder();
        let mut layer = selection.borrow_mut();
        layer.select_all();
        assert!(layer.is_cell_selected(3, 3));
        layer.select_cell(3, 3, SelectionModifier::Toggle);
        assert!(!layer.is_cell_selected(3, 3));
        assert_eq!(layer.selected_cells().len(), 15);
    }

    #[test]
    fn test_structural_delete_clears_selection() {
        let (data, _reorder, selection) = selection_over_reorder();
        selection.borrow_mut().select_cell(0, 0, SelectionModifier::Replace);
        data.borrow_mut()
            .notify_deleted(Axis::Row, &[crate::coordinate::Range::single(3)]);
        let root: SharedLayer = Rc::clone(&selection) as SharedLayer;
        flush_events(&root);
        assert!(selection.borrow().is_empty());
    }
}
