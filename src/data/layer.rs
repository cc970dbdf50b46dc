use std::rc::Rc;

use log::{debug, warn};

use super::{CellValue, DataProvider, SizeConfig};
use crate::command::LayerCommand;
use crate::coordinate::{position_by_pixel, Axis, Index, Pixel, Position, Range};
use crate::event::{LayerEvent, StructuralChangeEvent};
use crate::layer::{Layer, LayerCell, LayerCore, LayerId, SharedLayer};
use crate::persistence::Properties;

/// Adds labels to cells of a data layer.
pub trait LabelAccumulator {
    fn accumulate_labels(&self, labels: &mut Vec<String>, column: Index, row: Index);
}

/// Labels every cell with `COLUMN_<column index>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnLabelAccumulator;

/// Prefix of the labels added by [`ColumnLabelAccumulator`].
pub const COLUMN_LABEL_PREFIX: &str = "COLUMN_";

impl LabelAccumulator for ColumnLabelAccumulator {
    fn accumulate_labels(&self, labels: &mut Vec<String>, column: Index, _row: Index) {
        labels.push(format!("{COLUMN_LABEL_PREFIX}{column}"));
    }
}

/// Bottom of every stack: exposes a [`DataProvider`] with position == index.
pub struct DataLayer {
    core: LayerCore,
    provider: Rc<dyn DataProvider>,
    column_widths: SizeConfig,
    row_heights: SizeConfig,
    label_accumulator: Option<Box<dyn LabelAccumulator>>,
}

impl DataLayer {
    pub fn new(
        provider: Rc<dyn DataProvider>,
        default_width: Pixel,
        default_height: Pixel,
    ) -> Self {
        Self {
            core: LayerCore::new(),
            provider,
            column_widths: SizeConfig::new(default_width),
            row_heights: SizeConfig::new(default_height),
            label_accumulator: None,
        }
    }

    #[must_use]
    pub fn with_label_accumulator(mut self, accumulator: Box<dyn LabelAccumulator>) -> Self {
        self.label_accumulator = Some(accumulator);
        self
    }

    pub fn provider(&self) -> &Rc<dyn DataProvider> {
        &self.provider
    }

    fn sizes(&self, axis: Axis) -> &SizeConfig {
        match axis {
            Axis::Column => &self.column_widths,
            Axis::Row => &self.row_heights,
        }
    }

    fn sizes_mut(&mut self, axis: Axis) -> &mut SizeConfig {
        match axis {
            Axis::Column => &mut self.column_widths,
            Axis::Row => &mut self.row_heights,
        }
    }

    /// Set the size of an index without a command round trip.
    pub fn set_size(&mut self, axis: Axis, index: Index, size: Pixel) {
        if index >= self.position_count(axis) {
            return;
        }
        self.sizes_mut(axis).set_size(index, size);
        self.fire_layer_event(LayerEvent::Structural(StructuralChangeEvent::resized(
            axis,
            &[Range::single(index)],
        )));
    }

    /// Announce that the provider gained the indices in `range`.
    ///
    /// The range is clipped to the current count.
    pub fn notify_inserted(&mut self, axis: Axis, range: Range) {
        let Some(range) = range.intersection(&Range::new(0, self.position_count(axis))) else {
            return;
        };
        debug!("data layer {:?}: {axis}s inserted at {range}", self.id());
        self.sizes_mut(axis).insert(range);
        self.fire_layer_event(LayerEvent::Structural(StructuralChangeEvent::inserted(
            axis,
            &[range],
        )));
    }

    /// Announce that the provider lost the indices in `ranges` (pre-delete indices).
    pub fn notify_deleted(&mut self, axis: Axis, ranges: &[Range]) {
        debug!("data layer {:?}: {axis}s deleted {ranges:?}", self.id());
        let mut descending: Vec<Range> = ranges.to_vec();
        descending.sort_by(|a, b| b.start.cmp(&a.start));
        for range in descending {
            self.sizes_mut(axis).delete(range);
        }
        self.fire_layer_event(LayerEvent::Structural(StructuralChangeEvent::deleted(
            axis, ranges,
        )));
    }

    /// Announce that anything in the provider may have changed.
    pub fn notify_refresh(&mut self) {
        self.fire_layer_event(LayerEvent::Structural(StructuralChangeEvent::refresh()));
    }
}

impl Layer for DataLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn position_count(&self, axis: Axis) -> usize {
        self.provider.count(axis)
    }

    fn index_by_position(&self, axis: Axis, position: Position) -> Option<Index> {
        (position < self.position_count(axis)).then_some(position)
    }

    fn position_by_index(&self, axis: Axis, index: Index) -> Option<Position> {
        (index < self.position_count(axis)).then_some(index)
    }

    fn local_to_underlying_position(&self, axis: Axis, position: Position) -> Option<Position> {
        self.index_by_position(axis, position)
    }

    fn underlying_to_local_position(&self, _: Axis, _: LayerId, _: Position) -> Option<Position> {
        None
    }

    fn pixel_size(&self, axis: Axis) -> Pixel {
        self.sizes(axis).aggregate_size(self.position_count(axis))
    }

    fn size_by_position(&self, axis: Axis, position: Position) -> Pixel {
        if position < self.position_count(axis) {
            self.sizes(axis).size(position)
        } else {
            0
        }
    }

    fn start_pixel_of_position(&self, axis: Axis, position: Position) -> Option<Pixel> {
        (position <= self.position_count(axis)).then(|| self.sizes(axis).aggregate_size(position))
    }

    fn position_by_pixel(&self, axis: Axis, pixel: Pixel) -> Option<Position> {
        let sizes = self.sizes(axis);
        position_by_pixel(pixel, self.position_count(axis), |p| sizes.aggregate_size(p))
    }

    fn cell_by_position(&self, column: Position, row: Position) -> Option<LayerCell> {
        let column_index = self.index_by_position(Axis::Column, column)?;
        let row_index = self.index_by_position(Axis::Row, row)?;
        let mut labels = Vec::new();
        if let Some(accumulator) = &self.label_accumulator {
            accumulator.accumulate_labels(&mut labels, column_index, row_index);
        }
        Some(LayerCell {
            column_position: column,
            row_position: row,
            column_index,
            row_index,
            value: self.provider.data_value(column_index, row_index),
            labels,
        })
    }

    fn data_value_by_position(&self, column: Position, row: Position) -> Option<CellValue> {
        let column = self.index_by_position(Axis::Column, column)?;
        let row = self.index_by_position(Axis::Row, row)?;
        Some(self.provider.data_value(column, row))
    }

    fn underlying_layers(&self) -> Vec<SharedLayer> {
        Vec::new()
    }

    fn do_command(&mut self, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::Resize {
                axis,
                position,
                size,
            } => {
                if *position >= self.position_count(*axis) {
                    warn!("resize of {axis} {position} rejected: out of range");
                    return false;
                }
                self.set_size(*axis, *position, *size);
                true
            }
            LayerCommand::StructuralRefresh => {
                self.notify_refresh();
                true
            }
            _ => false,
        }
    }

    fn handle_layer_event(&mut self, _source: LayerId, _event: &LayerEvent) {}

    fn save_own_state(&self, prefix: &str, properties: &mut Properties) {
        self.column_widths.save(prefix, "columnWidths", properties);
        self.row_heights.save(prefix, "rowHeights", properties);
    }

    fn load_own_state(&mut self, prefix: &str, properties: &Properties) {
        if let Err(e) = self.column_widths.load(prefix, "columnWidths", properties) {
            warn!("column widths not restored: {e}");
        }
        if let Err(e) = self.row_heights.load(prefix, "rowHeights", properties) {
            warn!("row heights not restored: {e}");
        }
        self.notify_refresh();
    }
}
