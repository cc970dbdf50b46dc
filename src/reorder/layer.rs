use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use log::{debug, warn};

use super::IndexOrder;
use crate::command::LayerCommand;
use crate::coordinate::{
    group_contiguous, merge_ranges, position_by_pixel, Axis, Index, Pixel, Position, Range,
};
use crate::error::Result;
use crate::event::{
    DiffType, LayerEvent, ReorderEvent, StructuralChangeEvent, StructuralDiff, StructureChange,
};
use crate::layer::{
    attach, convert_underlying_event, Layer, LayerCell, LayerCore, LayerId, SharedLayer,
};
use crate::persistence::{format_index_list, parse_index_list, property_key, Properties};

/// Keeps a mutable order of one axis of its underlying layer.
///
/// The other axis passes through unchanged.
pub struct ReorderLayer {
    core: LayerCore,
    axis: Axis,
    underlying: SharedLayer,
    order: IndexOrder,
    start_pixels: OnceCell<Vec<Pixel>>,
}

impl ReorderLayer {
    /// Reorder layer for `axis` with the identity order, subscribed to `underlying`.
    pub fn new(axis: Axis, underlying: SharedLayer) -> Rc<RefCell<Self>> {
        let count = underlying.borrow().position_count(axis);
        let layer = Self {
            core: LayerCore::new(),
            axis,
            underlying: SharedLayer::clone(&underlying),
            order: IndexOrder::identity(axis, count),
            start_pixels: OnceCell::new(),
        };
        attach(layer, &[&underlying])
    }

    pub fn columns(underlying: SharedLayer) -> Rc<RefCell<Self>> {
        Self::new(Axis::Column, underlying)
    }

    pub fn rows(underlying: SharedLayer) -> Rc<RefCell<Self>> {
        Self::new(Axis::Row, underlying)
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Current order: `order()[position] == index`.
    pub fn order(&self) -> &[Index] {
        self.order.as_slice()
    }

    pub fn index_at(&self, position: Position) -> Option<Index> {
        self.order.index_at(position)
    }

    pub fn position_of(&self, index: Index) -> Option<Position> {
        self.order.position_of(index)
    }

    /// Move one position to the insertion slot `to` (`count` = end).
    ///
    /// # Errors
    /// Out-of-range arguments are rejected and the order is left untouched.
    pub fn move_single(&mut self, from: Position, to: Position) -> Result<()> {
        if self.order.move_single(from, to)? {
            debug!(
                "{} reorder: moved {from} -> {to}, order {:?}",
                self.axis,
                self.order.as_slice()
            );
            self.reordered(&[from], to);
        }
        Ok(())
    }

    /// Move several positions as one block to the insertion slot `to`.
    ///
    /// # Errors
    /// Out-of-range arguments are rejected and the order is left untouched.
    pub fn move_multiple(&mut self, from: &[Position], to: Position) -> Result<()> {
        if self.order.move_multiple(from, to)? {
            debug!(
                "{} reorder: moved {from:?} -> {to}, order {:?}",
                self.axis,
                self.order.as_slice()
            );
            self.reordered(from, to);
        }
        Ok(())
    }

    /// Restore the identity order of the current underlying count.
    pub fn reset(&mut self) {
        let count = self.underlying_count();
        self.order.reset(count);
        debug!("{} reorder: reset to identity of {count}", self.axis);
        self.invalidate();
        self.fire_layer_event(LayerEvent::Structural(StructuralChangeEvent::axis_refresh(
            self.axis,
        )));
    }

    fn reordered(&mut self, from: &[Position], to: Position) {
        self.invalidate();
        let event = ReorderEvent::new(self.axis, from, to);
        debug!("{} reorder: positions {} changed", self.axis, event.changed_range());
        self.fire_layer_event(LayerEvent::Reorder(event));
    }

    fn invalidate(&mut self) {
        self.start_pixels = OnceCell::new();
    }

    fn underlying_count(&self) -> usize {
        self.underlying.borrow().position_count(self.axis)
    }

    fn start_pixels(&self) -> &[Pixel] {
        self.start_pixels.get_or_init(|| {
            let underlying = self.underlying.borrow();
            let mut starts = Vec::with_capacity(self.order.len() + 1);
            let mut start: Pixel = 0;
            starts.push(start);
            for &index in self.order.as_slice() {
                let size = underlying
                    .position_by_index(self.axis, index)
                    .map_or(0, |p| underlying.size_by_position(self.axis, p));
                start = start.saturating_add(size);
                starts.push(start);
            }
            starts
        })
    }

    fn persistence_key(&self, prefix: &str) -> String {
        let name = match self.axis {
            Axis::Column => "columnIndexOrder",
            Axis::Row => "rowIndexOrder",
        };
        property_key(prefix, name)
    }

    /// Apply an underlying structural change of the reordered axis.
    ///
    /// Only add/delete diffs remap the order. Returns the local change to fire.
    fn sync_structure(&mut self, source: LayerId, change: &StructureChange) -> StructureChange {
        let count = self.underlying_count();
        let diffs = match change {
            StructureChange::Refresh => {
                if !self.order.is_permutation_of(count) {
                    debug!("{} reorder: refresh with {count} elements, resetting order", self.axis);
                    self.order.reset(count);
                }
                return StructureChange::Refresh;
            }
            StructureChange::Diffs(diffs) => diffs,
        };

        if !diffs.iter().any(StructuralDiff::is_add_or_delete) {
            let local = diffs
                .iter()
                .filter(|diff| diff.diff_type == DiffType::Change)
                .flat_map(|diff| self.underlying_to_local_ranges(self.axis, source, diff.after))
                .collect::<Vec<_>>();
            return StructureChange::Diffs(
                merge_ranges(local)
                    .into_iter()
                    .map(StructuralDiff::change)
                    .collect(),
            );
        }

        let original_len = self.order.len();
        let deleted: Vec<Range> = diffs
            .iter()
            .filter(|diff| diff.diff_type == DiffType::Delete && !diff.before.is_empty())
            .map(|diff| diff.before)
            .collect();
        let removed_positions = self.order.remove_indices(&deleted);

        let mut added: Vec<Range> = diffs
            .iter()
            .filter(|diff| diff.diff_type == DiffType::Add)
            .filter_map(|diff| diff.after.intersection(&Range::new(0, count)))
            .collect();
        added.sort_by_key(|range| range.start);
        let len_after_delete = self.order.len();
        for range in &added {
            self.order.insert_indices(*range);
        }

        if self.order.reconcile(count) {
            warn!(
                "{} reorder: order out of sync with {count} underlying elements, reconciled",
                self.axis
            );
            return StructureChange::Refresh;
        }
        debug!(
            "{} reorder: removed {} and appended {} indices, order {:?}",
            self.axis,
            removed_positions.len(),
            self.order.len() - len_after_delete,
            self.order.as_slice()
        );

        let mut local = StructuralChangeEvent::deleted(
            self.axis,
            &group_contiguous(removed_positions.iter().copied()),
        )
        .diffs(self.axis)
        .map(<[StructuralDiff]>::to_vec)
        .unwrap_or_default();
        if self.order.len() > len_after_delete {
            local.push(StructuralDiff::add(
                original_len,
                Range::new(len_after_delete, self.order.len()),
            ));
        }
        StructureChange::Diffs(local)
    }
}

impl Layer for ReorderLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn position_count(&self, axis: Axis) -> usize {
        if axis == self.axis {
            self.order.len()
        } else {
            self.underlying.borrow().position_count(axis)
        }
    }

    fn index_by_position(&self, axis: Axis, position: Position) -> Option<Index> {
        if axis == self.axis {
            self.order.index_at(position)
        } else {
            self.underlying.borrow().index_by_position(axis, position)
        }
    }

    fn position_by_index(&self, axis: Axis, index: Index) -> Option<Position> {
        if axis == self.axis {
            self.order.position_of(index)
        } else {
            self.underlying.borrow().position_by_index(axis, index)
        }
    }

    fn local_to_underlying_position(&self, axis: Axis, position: Position) -> Option<Position> {
        let underlying = self.underlying.borrow();
        if axis == self.axis {
            underlying.position_by_index(axis, self.order.index_at(position)?)
        } else {
            (position < underlying.position_count(axis)).then_some(position)
        }
    }

    fn underlying_to_local_position(
        &self,
        axis: Axis,
        _source: LayerId,
        position: Position,
    ) -> Option<Position> {
        let underlying = self.underlying.borrow();
        if axis == self.axis {
            self.order
                .position_of(underlying.index_by_position(axis, position)?)
        } else {
            (position < underlying.position_count(axis)).then_some(position)
        }
    }

    fn pixel_size(&self, axis: Axis) -> Pixel {
        if axis == self.axis {
            self.start_pixels().last().copied().unwrap_or(0)
        } else {
            self.underlying.borrow().pixel_size(axis)
        }
    }

    fn size_by_position(&self, axis: Axis, position: Position) -> Pixel {
        if axis == self.axis {
            let starts = self.start_pixels();
            match (starts.get(position), starts.get(position + 1)) {
                (Some(start), Some(end)) => end - start,
                _ => 0,
            }
        } else {
            self.underlying.borrow().size_by_position(axis, position)
        }
    }

    fn start_pixel_of_position(&self, axis: Axis, position: Position) -> Option<Pixel> {
        if axis == self.axis {
            self.start_pixels().get(position).copied()
        } else {
            self.underlying.borrow().start_pixel_of_position(axis, position)
        }
    }

    fn position_by_pixel(&self, axis: Axis, pixel: Pixel) -> Option<Position> {
        if axis == self.axis {
            let starts = self.start_pixels();
            position_by_pixel(pixel, self.order.len(), |p| {
                starts.get(p).copied().unwrap_or(Pixel::MAX)
            })
        } else {
            self.underlying.borrow().position_by_pixel(axis, pixel)
        }
    }

    fn cell_by_position(&self, column: Position, row: Position) -> Option<LayerCell> {
        let underlying_column = self.local_to_underlying_position(Axis::Column, column)?;
        let underlying_row = self.local_to_underlying_position(Axis::Row, row)?;
        let cell = self
            .underlying
            .borrow()
            .cell_by_position(underlying_column, underlying_row)?;
        Some(cell.at(column, row))
    }

    fn underlying_layers(&self) -> Vec<SharedLayer> {
        vec![SharedLayer::clone(&self.underlying)]
    }

    fn do_command(&mut self, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::Reorder { axis, from, to } if *axis == self.axis => {
                match self.move_single(*from, *to) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("reorder command rejected: {e}");
                        false
                    }
                }
            }
            LayerCommand::MultiReorder { axis, from, to } if *axis == self.axis => {
                match self.move_multiple(from, *to) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("multi-reorder command rejected: {e}");
                        false
                    }
                }
            }
            LayerCommand::ResetReorder { axis } if *axis == self.axis => {
                self.reset();
                true
            }
            _ => match command.convert(|axis, p| self.local_to_underlying_position(axis, p)) {
                Some(converted) => self.underlying.borrow_mut().do_command(&converted),
                None => false,
            },
        }
    }

    fn handle_layer_event(&mut self, source: LayerId, event: &LayerEvent) {
        let local = match event {
            LayerEvent::Structural(structural) => {
                let mut local = StructuralChangeEvent::default();
                let other = self.axis.other();
                if let Some(change) = structural.change(self.axis) {
                    let change = self.sync_structure(source, change);
                    local.set_change(self.axis, Some(change));
                }
                local.set_change(other, structural.change(other).cloned());
                Some(LayerEvent::Structural(local))
            }
            // Underlying positions moved but indices did not
            LayerEvent::Reorder(reorder) if reorder.axis == self.axis => Some(
                LayerEvent::Structural(StructuralChangeEvent::axis_refresh(self.axis)),
            ),
            _ => convert_underlying_event(self, source, event),
        };
        if event.is_structure_changed(self.axis) {
            self.invalidate();
        }
        if let Some(local) = local {
            self.fire_layer_event(local);
        }
    }

    fn save_own_state(&self, prefix: &str, properties: &mut Properties) {
        properties.insert(
            self.persistence_key(prefix),
            format_index_list(self.order.as_slice()),
        );
    }

    fn load_own_state(&mut self, prefix: &str, properties: &Properties) {
        let key = self.persistence_key(prefix);
        let Some(value) = properties.get(&key) else {
            return;
        };
        let count = self.underlying_count();
        let restored = parse_index_list(&key, value)
            .and_then(|indices| IndexOrder::from_order(self.axis, indices, count, &key));
        match restored {
            Ok(order) => {
                debug!("{} reorder: restored order {:?}", self.axis, order.as_slice());
                self.order = order;
                self.invalidate();
                self.fire_layer_event(LayerEvent::Structural(StructuralChangeEvent::axis_refresh(
                    self.axis,
                )));
            }
            Err(e) => warn!("ignoring persisted {} order: {e}", self.axis),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::data::{DataLayer, VecDataProvider};
    use crate::layer::flush_events;

    fn stack(columns: usize) -> (Rc<RefCell<DataLayer>>, Rc<RefCell<ReorderLayer>>) {
        let provider = Rc::new(VecDataProvider::with_coordinates(columns, 2));
        let data = Rc::new(RefCell::new(DataLayer::new(provider, 10, 5)));
        let reorder = ReorderLayer::columns(data.clone());
        (data, reorder)
    }

    #[test]
    fn test_pixel_geometry_follows_order() {
        let (data, reorder) = stack(3);
        data.borrow_mut().set_size(Axis::Column, 2, 30);
        reorder.borrow_mut().move_single(2, 0).unwrap();
        let layer = reorder.borrow();
        assert_eq!(layer.column_width_by_position(0), 30);
        assert_eq!(layer.start_x_of_column_position(1), Some(30));
        assert_eq!(layer.column_position_by_x(35), Some(1));
        assert_eq!(layer.width(), 50);
    }

    #[test]
    fn test_cells_are_relocated() {
        let (_data, reorder) = stack(3);
        reorder.borrow_mut().move_single(0, 3).unwrap();
        let cell = reorder.borrow().cell_by_position(2, 1).unwrap();
        assert_eq!(cell.column_index, 0);
        assert_eq!(cell.column_position, 2);
        assert_eq!(cell.value, "0,1".into());
    }

    #[test]
    fn test_resize_is_forwarded_through_order() {
        let (data, reorder) = stack(3);
        reorder.borrow_mut().move_single(2, 0).unwrap();
        let handled = reorder.borrow_mut().do_command(&LayerCommand::Resize {
            axis: Axis::Column,
            position: 0,
            size: 44,
        });
        assert!(handled);
        assert_eq!(data.borrow().column_width_by_position(2), 44);
        let root: SharedLayer = reorder.clone();
        flush_events(&root);
        assert_eq!(reorder.borrow().column_width_by_position(0), 44);
    }

    #[test]
    fn test_rejected_move_is_not_handled() {
        let (_data, reorder) = stack(3);
        let handled = reorder.borrow_mut().do_command(&LayerCommand::Reorder {
            axis: Axis::Column,
            from: 5,
            to: 0,
        });
        assert!(!handled);
        assert_eq!(reorder.borrow().order(), &[0, 1, 2]);
    }

    #[test]
    fn test_reorder_of_other_axis_is_forwarded() {
        let (_data, reorder) = stack(3);
        let handled = reorder.borrow_mut().do_command(&LayerCommand::Reorder {
            axis: Axis::Row,
            from: 0,
            to: 2,
        });
        assert!(!handled, "data layer does not reorder");
    }
}
