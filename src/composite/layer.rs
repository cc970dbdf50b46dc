use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::trace;

use crate::command::LayerCommand;
use crate::coordinate::{Axis, Index, Pixel, Position, Range, Rectangle};
use crate::event::LayerEvent;
use crate::layer::{attach, ClientAreaProvider, Layer, LayerCell, LayerCore, LayerId, SharedLayer};
use crate::persistence::{property_key, Properties};

type ProviderSlot = Rc<RefCell<Option<Rc<dyn ClientAreaProvider>>>>;

struct Child {
    layer: SharedLayer,
    id: LayerId,
    region: String,
}

/// A child placed in a composite layout.
pub struct ChildSpec {
    pub column: usize,
    pub row: usize,
    pub region: String,
    pub layer: SharedLayer,
}

impl ChildSpec {
    pub fn new(column: usize, row: usize, region: &str, layer: SharedLayer) -> Self {
        Self {
            column,
            row,
            region: region.to_string(),
            layer,
        }
    }
}

/// Arranges child layers on a `columns x rows` layout.
///
/// Column geometry of layout column `x` comes from child `(x, 0)`, row
/// geometry of layout row `y` from child `(0, y)`.
pub struct CompositeLayer {
    core: LayerCore,
    layout_columns: usize,
    layout_rows: usize,
    /// Row-major, `x + y * layout_columns`
    children: Vec<Option<Child>>,
    command_order: Vec<(usize, usize)>,
    provider: ProviderSlot,
    /// Region persisted under the plain prefix instead of `<prefix>.<region>`
    primary_region: Option<String>,
}

impl CompositeLayer {
    /// Build a composite; every child gets a derived client area and is listened to.
    ///
    /// `command_order` lists layout cells in the order commands are offered;
    /// children missing from it come last, row-major.
    pub fn new(
        layout_columns: usize,
        layout_rows: usize,
        specs: Vec<ChildSpec>,
        command_order: &[(usize, usize)],
    ) -> Rc<RefCell<Self>> {
        let mut children: Vec<Option<Child>> =
            (0..layout_columns * layout_rows).map(|_| None).collect();
        let mut shared: Vec<SharedLayer> = Vec::new();
        for spec in specs {
            if spec.column >= layout_columns || spec.row >= layout_rows {
                continue;
            }
            let id = spec.layer.borrow().id();
            shared.push(SharedLayer::clone(&spec.layer));
            if let Some(slot) = children.get_mut(spec.column + spec.row * layout_columns) {
                *slot = Some(Child {
                    layer: spec.layer,
                    id,
                    region: spec.region,
                });
            }
        }

        let mut order: Vec<(usize, usize)> = command_order
            .iter()
            .copied()
            .filter(|&(x, y)| x < layout_columns && y < layout_rows)
            .collect();
        for y in 0..layout_rows {
            for x in 0..layout_columns {
                if !order.contains(&(x, y)) {
                    order.push((x, y));
                }
            }
        }

        let layer = Self {
            core: LayerCore::new(),
            layout_columns,
            layout_rows,
            children,
            command_order: order,
            provider: Rc::new(RefCell::new(None)),
            primary_region: None,
        };
        layer.install_child_client_areas();
        let underlying: Vec<&SharedLayer> = shared.iter().collect();
        attach(layer, &underlying)
    }

    /// Persist `region` under the plain prefix.
    pub fn set_primary_region(&mut self, region: &str) {
        self.primary_region = Some(region.to_string());
    }

    pub fn child(&self, x: usize, y: usize) -> Option<&SharedLayer> {
        self.child_entry(x, y).map(|child| &child.layer)
    }

    fn child_entry(&self, x: usize, y: usize) -> Option<&Child> {
        if x >= self.layout_columns || y >= self.layout_rows {
            return None;
        }
        self.children.get(x + y * self.layout_columns)?.as_ref()
    }

    /// Layout cell holding the child with `id`.
    fn layout_of(&self, id: LayerId) -> Option<(usize, usize)> {
        let slot = self
            .children
            .iter()
            .position(|child| child.as_ref().is_some_and(|c| c.id == id))?;
        Some((slot % self.layout_columns, slot / self.layout_columns))
    }

    /// Child providing the geometry of layout slot `layout` along `axis`.
    fn geometry_child(&self, axis: Axis, layout: usize) -> Option<&SharedLayer> {
        match axis {
            Axis::Column => self.child(layout, 0),
            Axis::Row => self.child(0, layout),
        }
    }

    fn layout_count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.layout_columns,
            Axis::Row => self.layout_rows,
        }
    }

    fn child_count(&self, axis: Axis, layout: usize) -> usize {
        self.geometry_child(axis, layout)
            .map_or(0, |child| child.borrow().position_count(axis))
    }

    fn child_pixel_size(&self, axis: Axis, layout: usize) -> Pixel {
        self.geometry_child(axis, layout)
            .map_or(0, |child| child.borrow().pixel_size(axis))
    }

    /// Composite position of the first position of layout slot `layout`.
    fn position_offset(&self, axis: Axis, layout: usize) -> Position {
        (0..layout).map(|l| self.child_count(axis, l)).sum()
    }

    fn pixel_offset(&self, axis: Axis, layout: usize) -> Pixel {
        (0..layout).map(|l| self.child_pixel_size(axis, l)).sum()
    }

    /// Split a composite position into layout slot and child position.
    fn locate(&self, axis: Axis, position: Position) -> Option<(usize, Position)> {
        let mut offset = 0;
        for layout in 0..self.layout_count(axis) {
            let count = self.child_count(axis, layout);
            if position < offset + count {
                return Some((layout, position - offset));
            }
            offset += count;
        }
        None
    }

    fn install_child_client_areas(&self) {
        for y in 0..self.layout_rows {
            for x in 0..self.layout_columns {
                let Some(child) = self.child(x, y) else {
                    continue;
                };
                let siblings = |cells: Vec<(usize, usize)>| {
                    cells
                        .into_iter()
                        .filter_map(|(sx, sy)| self.child(sx, sy))
                        .map(|layer| (Rc::downgrade(layer), Cell::new(0)))
                        .collect::<Vec<_>>()
                };
                let provider = ChildClientArea {
                    parent: Rc::clone(&self.provider),
                    preceding_columns: siblings((0..x).map(|sx| (sx, y)).collect()),
                    preceding_rows: siblings((0..y).map(|sy| (x, sy)).collect()),
                };
                child
                    .borrow_mut()
                    .set_client_area_provider(Rc::new(provider));
            }
        }
    }
}

/// Client area of a child: what is left of the parent's area after the
/// preferred sizes of the siblings before it in its layout row and column.
struct ChildClientArea {
    parent: ProviderSlot,
    preceding_columns: Vec<(Weak<RefCell<dyn Layer>>, Cell<Pixel>)>,
    preceding_rows: Vec<(Weak<RefCell<dyn Layer>>, Cell<Pixel>)>,
}

impl ChildClientArea {
    /// Sum of preferred sizes; a sibling busy with a command reports its last known size.
    fn offset(axis: Axis, preceding: &[(Weak<RefCell<dyn Layer>>, Cell<Pixel>)]) -> Pixel {
        preceding
            .iter()
            .map(|(layer, cached)| {
                if let Some(layer) = layer.upgrade() {
                    if let Ok(layer) = layer.try_borrow() {
                        cached.set(layer.preferred_pixel_size(axis));
                    }
                }
                cached.get()
            })
            .sum()
    }
}

impl ClientAreaProvider for ChildClientArea {
    fn client_area(&self) -> Rectangle {
        let parent = self
            .parent
            .borrow()
            .as_ref()
            .map(|provider| provider.client_area())
            .unwrap_or_default();
        let x = Self::offset(Axis::Column, &self.preceding_columns);
        let y = Self::offset(Axis::Row, &self.preceding_rows);
        Rectangle::new(
            parent.x + x,
            parent.y + y,
            (parent.width - x).max(0),
            (parent.height - y).max(0),
        )
    }
}

impl Layer for CompositeLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn position_count(&self, axis: Axis) -> usize {
        (0..self.layout_count(axis))
            .map(|layout| self.child_count(axis, layout))
            .sum()
    }

    fn preferred_pixel_size(&self, axis: Axis) -> Pixel {
        (0..self.layout_count(axis))
            .filter_map(|layout| self.geometry_child(axis, layout))
            .map(|child| child.borrow().preferred_pixel_size(axis))
            .sum()
    }

    fn index_by_position(&self, axis: Axis, position: Position) -> Option<Index> {
        let (layout, child_position) = self.locate(axis, position)?;
        self.geometry_child(axis, layout)?
            .borrow()
            .index_by_position(axis, child_position)
    }

    /// Indices are not unique across regions.
    fn position_by_index(&self, _axis: Axis, _index: Index) -> Option<Position> {
        None
    }

    fn local_to_underlying_position(&self, axis: Axis, position: Position) -> Option<Position> {
        self.locate(axis, position).map(|(_, child_position)| child_position)
    }

    fn underlying_to_local_position(
        &self,
        axis: Axis,
        source: LayerId,
        position: Position,
    ) -> Option<Position> {
        let (x, y) = self.layout_of(source)?;
        let layout = match axis {
            Axis::Column => x,
            Axis::Row => y,
        };
        (position < self.child_count(axis, layout))
            .then(|| self.position_offset(axis, layout) + position)
    }

    fn pixel_size(&self, axis: Axis) -> Pixel {
        (0..self.layout_count(axis))
            .map(|layout| self.child_pixel_size(axis, layout))
            .sum()
    }

    fn size_by_position(&self, axis: Axis, position: Position) -> Pixel {
        self.locate(axis, position)
            .and_then(|(layout, child_position)| {
                self.geometry_child(axis, layout)
                    .map(|child| child.borrow().size_by_position(axis, child_position))
            })
            .unwrap_or(0)
    }

    fn start_pixel_of_position(&self, axis: Axis, position: Position) -> Option<Pixel> {
        if position == self.position_count(axis) {
            return Some(self.pixel_size(axis));
        }
        let (layout, child_position) = self.locate(axis, position)?;
        let start = self
            .geometry_child(axis, layout)?
            .borrow()
            .start_pixel_of_position(axis, child_position)?;
        Some(self.pixel_offset(axis, layout) + start)
    }

    fn position_by_pixel(&self, axis: Axis, pixel: Pixel) -> Option<Position> {
        if pixel < 0 {
            return None;
        }
        let mut pixel_offset = 0;
        let mut position_offset = 0;
        for layout in 0..self.layout_count(axis) {
            let size = self.child_pixel_size(axis, layout);
            if pixel < pixel_offset + size {
                let child_position = self
                    .geometry_child(axis, layout)?
                    .borrow()
                    .position_by_pixel(axis, pixel - pixel_offset)?;
                return Some(position_offset + child_position);
            }
            pixel_offset += size;
            position_offset += self.child_count(axis, layout);
        }
        None
    }

    fn cell_by_position(&self, column: Position, row: Position) -> Option<LayerCell> {
        let (x, child_column) = self.locate(Axis::Column, column)?;
        let (y, child_row) = self.locate(Axis::Row, row)?;
        let child = self.child_entry(x, y)?;
        let mut cell = child
            .layer
            .borrow()
            .cell_by_position(child_column, child_row)?
            .at(column, row);
        cell.add_label(&child.region);
        Some(cell)
    }

    fn underlying_layers(&self) -> Vec<SharedLayer> {
        self.children
            .iter()
            .flatten()
            .map(|child| SharedLayer::clone(&child.layer))
            .collect()
    }

    /// Children get derived areas, so only the shared slot is updated.
    fn set_client_area_provider(&mut self, provider: Rc<dyn ClientAreaProvider>) {
        *self.provider.borrow_mut() = Some(Rc::clone(&provider));
        self.core_mut().set_client_area_provider(provider);
    }

    fn do_command(&mut self, command: &LayerCommand) -> bool {
        if command.is_broadcast() {
            let mut handled = false;
            for child in self.children.iter().flatten() {
                handled |= child.layer.borrow_mut().do_command(command);
            }
            return handled;
        }

        for &(x, y) in &self.command_order {
            let Some(child) = self.child_entry(x, y) else {
                continue;
            };
            let converted = command.convert(|axis, position| {
                let target = match axis {
                    Axis::Column => x,
                    Axis::Row => y,
                };
                self.locate(axis, position)
                    .and_then(|(layout, child_position)| {
                        (layout == target).then_some(child_position)
                    })
            });
            let Some(converted) = converted else {
                continue;
            };
            if child.layer.borrow_mut().do_command(&converted) {
                trace!("command handled by region {}", child.region);
                return true;
            }
        }
        false
    }

    fn handle_layer_event(&mut self, source: LayerId, event: &LayerEvent) {
        let Some((x, y)) = self.layout_of(source) else {
            return;
        };
        let column_offset = self.position_offset(Axis::Column, x);
        let row_offset = self.position_offset(Axis::Row, y);
        let local = event.map_ranges(|axis, range: Range| {
            Some(match axis {
                Axis::Column => range.offset(column_offset),
                Axis::Row => range.offset(row_offset),
            })
        });
        if let Some(local) = local {
            self.fire_layer_event(local);
        }
    }

    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        for child in self.children.iter().flatten() {
            let child_prefix = self.child_prefix(prefix, &child.region);
            child.layer.borrow().save_state(&child_prefix, properties);
        }
    }

    fn load_state(&mut self, prefix: &str, properties: &Properties) {
        for child in self.children.iter().flatten() {
            let child_prefix = self.child_prefix(prefix, &child.region);
            child.layer.borrow_mut().load_state(&child_prefix, properties);
        }
    }
}

impl CompositeLayer {
    fn child_prefix(&self, prefix: &str, region: &str) -> String {
        if self.primary_region.as_deref() == Some(region) {
            prefix.to_string()
        } else {
            property_key(prefix, region)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::data::{DataLayer, VecDataProvider};
    use crate::event::StructuralChangeEvent;
    use crate::layer::{execute, LayerListener};

    fn side_by_side() -> (Rc<RefCell<DataLayer>>, Rc<RefCell<CompositeLayer>>) {
        let left: SharedLayer = Rc::new(RefCell::new(DataLayer::new(
            Rc::new(VecDataProvider::with_coordinates(2, 4)),
            10,
            10,
        )));
        let right = Rc::new(RefCell::new(DataLayer::new(
            Rc::new(VecDataProvider::with_coordinates(3, 4)),
            20,
            10,
        )));
        let composite = CompositeLayer::new(
            2,
            1,
            vec![
                ChildSpec::new(0, 0, "LEFT", left),
                ChildSpec::new(1, 0, "RIGHT", Rc::clone(&right) as SharedLayer),
            ],
            &[],
        );
        (right, composite)
    }

    #[test]
    fn test_geometry_spans_children() {
        let (_right, composite) = side_by_side();
        let layer = composite.borrow();
        assert_eq!(layer.column_count(), 5);
        assert_eq!(layer.row_count(), 4);
        assert_eq!(layer.width(), 80);
        assert_eq!(layer.start_x_of_column_position(3), Some(40));
        assert_eq!(layer.column_position_by_x(45), Some(3));
        assert_eq!(layer.column_index_by_position(3), Some(1));

        let cell = layer.cell_by_position(3, 2).unwrap();
        assert!(cell.has_label("RIGHT"));
        assert_eq!(cell.value, "1,2".into());
        assert_eq!(cell.column_position, 3);
    }

    #[test]
    fn test_command_routed_to_owning_child_and_event_offset() {
        let (right, composite) = side_by_side();
        let seen: Rc<RefCell<Vec<LayerEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        composite
            .borrow_mut()
            .add_layer_listener(LayerListener::Observer(Rc::new(move |event: &LayerEvent| {
                sink.borrow_mut().push(event.clone());
            })));

        let root: SharedLayer = Rc::clone(&composite) as SharedLayer;
        assert!(execute(
            &root,
            &LayerCommand::Resize {
                axis: Axis::Column,
                position: 3,
                size: 33,
            },
        ));
        assert_eq!(right.borrow().column_width_by_position(1), 33);

        let events = seen.borrow();
        assert_eq!(events.len(), 1);
        let LayerEvent::Structural(structural) = &events[0] else {
            panic!("expected a structural event, got {:?}", events[0]);
        };
        let expected = StructuralChangeEvent::resized(Axis::Column, &[Range::single(3)]);
        assert_eq!(structural.diffs(Axis::Column), expected.diffs(Axis::Column));
    }

    #[test]
    fn test_child_state_keys_are_region_qualified() {
        let (_right, composite) = side_by_side();
        composite.borrow_mut().set_primary_region("LEFT");
        let mut properties = Properties::new();
        composite.borrow().save_state("p", &mut properties);
        assert!(properties.contains_key("p.columnWidths"));
        assert!(properties.contains_key("p.RIGHT.columnWidths"));
    }
}
