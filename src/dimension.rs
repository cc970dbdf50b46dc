//! Layers that borrow their dimensions from other layers.
//!
//! A column header takes its columns from the body viewport and its single
//! row from its own data; a row header does the opposite. Values always come
//! from the wrapped base layer, looked up by index.

use std::cell::RefCell;
use std::rc::Rc;

use crate::command::LayerCommand;
use crate::coordinate::{Axis, Index, Pixel, Position};
use crate::event::LayerEvent;
use crate::layer::{
    attach, convert_underlying_event, ClientAreaProvider, Layer, LayerCell, LayerCore, LayerId,
    SharedLayer,
};

/// Column dimension from `horizontal`, row dimension from `vertical`, values from `base`.
pub struct DimensionallyDependentLayer {
    core: LayerCore,
    base: SharedLayer,
    horizontal: SharedLayer,
    vertical: SharedLayer,
    base_id: LayerId,
    horizontal_id: LayerId,
    vertical_id: LayerId,
}

impl DimensionallyDependentLayer {
    pub fn new(
        base: SharedLayer,
        horizontal: SharedLayer,
        vertical: SharedLayer,
    ) -> Rc<RefCell<Self>> {
        let base_id = base.borrow().id();
        let horizontal_id = horizontal.borrow().id();
        let vertical_id = vertical.borrow().id();
        let layer = Self {
            core: LayerCore::new(),
            base: SharedLayer::clone(&base),
            horizontal: SharedLayer::clone(&horizontal),
            vertical: SharedLayer::clone(&vertical),
            base_id,
            horizontal_id,
            vertical_id,
        };
        attach(layer, &[&base, &horizontal, &vertical])
    }

    pub fn base(&self) -> &SharedLayer {
        &self.base
    }

    fn dependency(&self, axis: Axis) -> &SharedLayer {
        match axis {
            Axis::Column => &self.horizontal,
            Axis::Row => &self.vertical,
        }
    }

    fn dependency_id(&self, axis: Axis) -> LayerId {
        match axis {
            Axis::Column => self.horizontal_id,
            Axis::Row => self.vertical_id,
        }
    }

    /// Base position showing the element at our `position`.
    fn base_position(&self, axis: Axis, position: Position) -> Option<Position> {
        let index = self.index_by_position(axis, position)?;
        self.base.borrow().position_by_index(axis, index)
    }
}

impl Layer for DimensionallyDependentLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn position_count(&self, axis: Axis) -> usize {
        self.dependency(axis).borrow().position_count(axis)
    }

    fn preferred_position_count(&self, axis: Axis) -> usize {
        self.dependency(axis).borrow().preferred_position_count(axis)
    }

    fn preferred_pixel_size(&self, axis: Axis) -> Pixel {
        self.dependency(axis).borrow().preferred_pixel_size(axis)
    }

    fn index_by_position(&self, axis: Axis, position: Position) -> Option<Index> {
        self.dependency(axis).borrow().index_by_position(axis, position)
    }

    fn position_by_index(&self, axis: Axis, index: Index) -> Option<Position> {
        self.dependency(axis).borrow().position_by_index(axis, index)
    }

    fn local_to_underlying_position(&self, axis: Axis, position: Position) -> Option<Position> {
        self.base_position(axis, position)
    }

    fn underlying_to_local_position(
        &self,
        axis: Axis,
        source: LayerId,
        position: Position,
    ) -> Option<Position> {
        if source == self.dependency_id(axis) {
            return (position < self.position_count(axis)).then_some(position);
        }
        let index = self.base.borrow().index_by_position(axis, position)?;
        self.position_by_index(axis, index)
    }

    fn pixel_size(&self, axis: Axis) -> Pixel {
        self.dependency(axis).borrow().pixel_size(axis)
    }

    fn size_by_position(&self, axis: Axis, position: Position) -> Pixel {
        self.dependency(axis).borrow().size_by_position(axis, position)
    }

    fn start_pixel_of_position(&self, axis: Axis, position: Position) -> Option<Pixel> {
        self.dependency(axis)
            .borrow()
            .start_pixel_of_position(axis, position)
    }

    fn position_by_pixel(&self, axis: Axis, pixel: Pixel) -> Option<Position> {
        self.dependency(axis).borrow().position_by_pixel(axis, pixel)
    }

    fn cell_by_position(&self, column: Position, row: Position) -> Option<LayerCell> {
        let base_column = self.base_position(Axis::Column, column)?;
        let base_row = self.base_position(Axis::Row, row)?;
        let cell = self.base.borrow().cell_by_position(base_column, base_row)?;
        Some(cell.at(column, row))
    }

    fn underlying_layers(&self) -> Vec<SharedLayer> {
        vec![SharedLayer::clone(&self.base)]
    }

    /// Dependencies get their client area from their own parents.
    fn set_client_area_provider(&mut self, provider: Rc<dyn ClientAreaProvider>) {
        self.core_mut().set_client_area_provider(provider);
    }

    fn do_command(&mut self, command: &LayerCommand) -> bool {
        if command.is_broadcast() {
            return self.base.borrow_mut().do_command(command);
        }

        let along =
            |kept: Axis| move |axis: Axis, position: Position| (axis == kept).then_some(position);
        if let Some(converted) = command.convert(along(Axis::Column)) {
            if self.horizontal.borrow_mut().do_command(&converted) {
                return true;
            }
        }
        if let Some(converted) = command.convert(along(Axis::Row)) {
            if self.vertical.borrow_mut().do_command(&converted) {
                return true;
            }
        }
        match command.convert(|axis, position| self.base_position(axis, position)) {
            Some(converted) => self.base.borrow_mut().do_command(&converted),
            None => false,
        }
    }

    fn handle_layer_event(&mut self, source: LayerId, event: &LayerEvent) {
        let from_horizontal = source == self.horizontal_id;
        let from_vertical = source == self.vertical_id;
        let local = match (from_horizontal, from_vertical) {
            (true, true) => Some(event.clone()),
            (true, false) => event.restrict_to(Axis::Column),
            (false, true) => event.restrict_to(Axis::Row),
            (false, false) if source == self.base_id => {
                convert_underlying_event(self, source, event)
            }
            (false, false) => None,
        };
        if let Some(local) = local {
            self.fire_layer_event(local);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::data::{
        CellValue, ColumnHeaderDataProvider, DataLayer, DataProvider, VecDataProvider,
    };
    use crate::reorder::ReorderLayer;

    #[test]
    fn test_column_header_follows_body_order() {
        let body_data: Rc<dyn DataProvider> = Rc::new(VecDataProvider::with_coordinates(3, 10));
        let body: SharedLayer =
            Rc::new(RefCell::new(DataLayer::new(Rc::clone(&body_data), 50, 20)));
        let reorder = ReorderLayer::columns(body);
        let header_data: SharedLayer = Rc::new(RefCell::new(DataLayer::new(
            Rc::new(ColumnHeaderDataProvider::letters(body_data)),
            50,
            25,
        )));
        let reorder_shared: SharedLayer = Rc::clone(&reorder) as SharedLayer;
        let header = DimensionallyDependentLayer::new(
            Rc::clone(&header_data),
            Rc::clone(&reorder_shared),
            header_data,
        );

        reorder.borrow_mut().move_single(2, 0).unwrap();
        let header = header.borrow();
        assert_eq!(header.column_count(), 3);
        assert_eq!(header.row_count(), 1);
        assert_eq!(header.height(), 25);
        assert_eq!(header.data_value_by_position(0, 0), Some(CellValue::from("C")));
        assert_eq!(header.data_value_by_position(1, 0), Some(CellValue::from("A")));
        assert_eq!(header.data_value_by_position(0, 1), None);
    }
}
