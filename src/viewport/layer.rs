use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;

use super::Scrollbar;
use crate::command::{LayerCommand, ScrollAmount, ScrollDirection};
use crate::config::DEFAULT_SCROLL_INTERSECTION;
use crate::coordinate::{Axis, Index, Pixel, Position, Range};
use crate::event::{
    CellSelectionEvent, DiffType, LayerEvent, ScrollEvent, StructuralChangeEvent, StructuralDiff,
};
use crate::layer::{
    attach, convert_underlying_event, Layer, LayerCell, LayerCore, LayerId, SharedLayer,
};

/// Scroll state of one axis.
///
/// Query methods revalidate lazily through `&self`, hence the cells.
#[derive(Default)]
struct AxisState {
    /// Underlying pixel at which the window starts
    origin: Cell<Pixel>,
    /// Underlying position containing `origin`
    origin_position: Cell<Position>,
    minimum_origin: Cell<Pixel>,
    minimum_origin_position: Cell<Position>,
    /// Visible position count, `None` when stale
    count: Cell<Option<usize>>,
    /// Client size the state was last validated against
    client_size: Cell<Option<Pixel>>,
    scrollbar: Option<Rc<dyn Scrollbar>>,
}

impl AxisState {
    fn invalidate(&self) {
        self.count.set(None);
    }
}

/// Scrollable window over an underlying layer.
///
/// Local positions always start at 0 at the origin. The first visible
/// element may start at a negative local pixel when it is partially
/// scrolled out.
pub struct ViewportLayer {
    core: LayerCore,
    underlying: SharedLayer,
    columns: AxisState,
    rows: AxisState,
    viewport_off: bool,
    scroll_intersection: Pixel,
}

impl ViewportLayer {
    pub fn new(underlying: SharedLayer) -> Rc<RefCell<Self>> {
        Self::with_scroll_intersection(underlying, DEFAULT_SCROLL_INTERSECTION)
    }

    pub fn with_scroll_intersection(
        underlying: SharedLayer,
        scroll_intersection: Pixel,
    ) -> Rc<RefCell<Self>> {
        let layer = Self {
            core: LayerCore::new(),
            underlying: SharedLayer::clone(&underlying),
            columns: AxisState::default(),
            rows: AxisState::default(),
            viewport_off: false,
            scroll_intersection: scroll_intersection.max(0),
        };
        attach(layer, &[&underlying])
    }

    fn state(&self, axis: Axis) -> &AxisState {
        match axis {
            Axis::Column => &self.columns,
            Axis::Row => &self.rows,
        }
    }

    fn state_mut(&mut self, axis: Axis) -> &mut AxisState {
        match axis {
            Axis::Column => &mut self.columns,
            Axis::Row => &mut self.rows,
        }
    }

    // Underlying geometry

    fn underlying_count(&self, axis: Axis) -> usize {
        self.underlying.borrow().position_count(axis)
    }

    fn underlying_total(&self, axis: Axis) -> Pixel {
        self.underlying.borrow().pixel_size(axis)
    }

    /// Start pixel of an underlying position; positions past the end map to the total.
    fn underlying_start(&self, axis: Axis, position: Position) -> Pixel {
        let underlying = self.underlying.borrow();
        underlying
            .start_pixel_of_position(axis, position)
            .unwrap_or_else(|| underlying.pixel_size(axis))
    }

    fn underlying_position_at(&self, axis: Axis, pixel: Pixel) -> Position {
        let underlying = self.underlying.borrow();
        underlying.position_by_pixel(axis, pixel).unwrap_or_else(|| {
            if pixel >= underlying.pixel_size(axis) {
                underlying.position_count(axis)
            } else {
                0
            }
        })
    }

    fn client_size(&self, axis: Axis) -> Pixel {
        self.client_area().extent(axis).max(0)
    }

    // Lazy validation

    /// Re-adjust the origin when the client area changed since the last query.
    fn validate(&self, axis: Axis) {
        let client = self.client_size(axis);
        let state = self.state(axis);
        if state.client_size.get() == Some(client) {
            return;
        }
        state.client_size.set(Some(client));
        state.invalidate();
        let adjusted = self.adjust_origin(axis, state.origin.get());
        if adjusted != state.origin.get() {
            debug!("viewport {axis} origin re-adjusted to {adjusted} for client size {client}");
        }
        state.origin.set(adjusted);
        self.recompute_origin_position(axis);
    }

    fn recompute_origin_position(&self, axis: Axis) {
        let state = self.state(axis);
        state
            .origin_position
            .set(self.underlying_position_at(axis, state.origin.get()));
        state.invalidate();
    }

    /// Clamp a proposed origin so the window stays inside the content.
    fn adjust_origin(&self, axis: Axis, pixel: Pixel) -> Pixel {
        let minimum = self.state(axis).minimum_origin.get();
        if self.underlying_count(axis) == 0 {
            return minimum;
        }
        let total = self.underlying_total(axis);
        let mut origin = pixel.clamp(minimum, total.max(minimum));
        let client = self.client_size(axis);
        if total - origin < client {
            origin = total - client;
        }
        origin.max(minimum)
    }

    // Public state

    pub fn is_viewport_off(&self) -> bool {
        self.viewport_off
    }

    /// Origin pixel in underlying coordinates.
    pub fn origin_pixel(&self, axis: Axis) -> Pixel {
        if self.viewport_off {
            return self.state(axis).minimum_origin.get();
        }
        self.validate(axis);
        self.state(axis).origin.get()
    }

    /// Underlying position at which the window starts.
    pub fn origin_position(&self, axis: Axis) -> Position {
        if self.viewport_off {
            return self.state(axis).minimum_origin_position.get();
        }
        self.validate(axis);
        self.state(axis).origin_position.get()
    }

    pub fn minimum_origin_pixel(&self, axis: Axis) -> Pixel {
        self.state(axis).minimum_origin.get()
    }

    pub fn minimum_origin_position(&self, axis: Axis) -> Position {
        self.state(axis).minimum_origin_position.get()
    }

    /// Move the origin; the value is clamped to the content and the client area.
    pub fn set_origin_pixel(&mut self, axis: Axis, pixel: Pixel) {
        self.validate(axis);
        let adjusted = self.adjust_origin(axis, pixel);
        let state = self.state(axis);
        if adjusted == state.origin.get() {
            return;
        }
        debug!("viewport {axis} origin {} -> {adjusted}", state.origin.get());
        state.origin.set(adjusted);
        self.recompute_origin_position(axis);
        self.sync_scrollbar(axis);
        self.fire_layer_event(LayerEvent::Scroll(ScrollEvent { axis }));
    }

    /// Freeze everything before `pixel`; the origin moves by the same delta.
    pub fn set_minimum_origin_pixel(&mut self, axis: Axis, pixel: Pixel) {
        let position = self.underlying_position_at(axis, pixel);
        self.apply_minimum_origin(axis, position, pixel.max(0));
    }

    /// Freeze every position before `position`.
    pub fn set_minimum_origin_position(&mut self, axis: Axis, position: Position) {
        let position = position.min(self.underlying_count(axis));
        let pixel = self.underlying_start(axis, position);
        self.apply_minimum_origin(axis, position, pixel);
    }

    fn apply_minimum_origin(&mut self, axis: Axis, position: Position, pixel: Pixel) {
        self.validate(axis);
        let state = self.state(axis);
        let delta = pixel - state.minimum_origin.get();
        state.minimum_origin.set(pixel);
        state.minimum_origin_position.set(position);
        let origin = self.adjust_origin(axis, state.origin.get() + delta);
        state.origin.set(origin);
        self.recompute_origin_position(axis);
        debug!("viewport {axis} minimum origin {pixel} (position {position}), origin {origin}");
        self.sync_scrollbar(axis);
        self.fire_layer_event(LayerEvent::Scroll(ScrollEvent { axis }));
    }

    /// Expose every position from the minimum origin instead of a window.
    pub fn set_viewport_off(&mut self, off: bool) {
        if self.viewport_off == off {
            return;
        }
        self.viewport_off = off;
        for axis in Axis::ALL {
            self.state(axis).invalidate();
        }
        self.fire_layer_event(LayerEvent::Structural(StructuralChangeEvent::refresh()));
    }

    // Scrolling

    /// Scroll by `amount` in `direction`; no-op when empty or turned off.
    pub fn scroll(&mut self, axis: Axis, direction: ScrollDirection, amount: ScrollAmount) {
        if self.viewport_off || self.underlying_count(axis) == 0 {
            return;
        }
        self.validate(axis);
        let target = self.scroll_target(axis, direction, amount);
        self.set_origin_pixel(axis, target);
    }

    fn scroll_target(&self, axis: Axis, direction: ScrollDirection, amount: ScrollAmount) -> Pixel {
        let state = self.state(axis);
        let origin = state.origin.get();
        let origin_position = state.origin_position.get();
        let minimum = state.minimum_origin.get();
        let client = self.client_size(axis);
        let total = self.underlying_total(axis);

        let distance = match amount {
            ScrollAmount::All => {
                return match direction {
                    ScrollDirection::Forward => total,
                    ScrollDirection::Backward => minimum,
                };
            }
            ScrollAmount::Position => {
                return match direction {
                    ScrollDirection::Forward => self.underlying_start(axis, origin_position + 1),
                    ScrollDirection::Backward => {
                        let start = self.underlying_start(axis, origin_position);
                        if origin > start || origin_position == 0 {
                            start
                        } else {
                            self.underlying_start(axis, origin_position - 1)
                        }
                    }
                };
            }
            ScrollAmount::Step => (client / 4 - self.scroll_intersection).max(1),
            ScrollAmount::Page => (client - self.scroll_intersection / 2).max(1),
        };

        match direction {
            ScrollDirection::Forward => {
                let bound = (total - client).max(minimum);
                let raw = origin + distance.min((bound - origin).max(0));
                if raw == bound {
                    return bound;
                }
                // Furthest element boundary in (origin, raw]
                let boundary = self.underlying_start(axis, self.underlying_position_at(axis, raw));
                if boundary > origin {
                    boundary
                } else {
                    raw
                }
            }
            ScrollDirection::Backward => {
                let raw = origin - distance.min((origin - minimum).max(0));
                // Closest-to-raw element boundary in [raw, origin)
                let position = self.underlying_position_at(axis, raw);
                let start = self.underlying_start(axis, position);
                if start == raw {
                    return raw;
                }
                let next = self.underlying_start(axis, position + 1);
                if next < origin {
                    next
                } else {
                    raw
                }
            }
        }
    }

    /// Scroll the minimum distance needed to show an underlying position.
    pub fn move_position_into_viewport(&mut self, axis: Axis, underlying_position: Position) {
        if self.viewport_off || underlying_position >= self.underlying_count(axis) {
            return;
        }
        if underlying_position < self.state(axis).minimum_origin_position.get() {
            return;
        }
        self.validate(axis);
        let start = self.underlying_start(axis, underlying_position);
        if underlying_position <= self.state(axis).origin_position.get() {
            self.set_origin_pixel(axis, start);
            return;
        }
        let size = self
            .underlying
            .borrow()
            .size_by_position(axis, underlying_position);
        let end = start + size;
        let client = self.client_size(axis);
        if self.state(axis).origin.get() + client < end {
            self.set_origin_pixel(axis, (end - client).min(start));
        }
    }

    // Scrollbar collaboration

    pub fn set_scrollbar(&mut self, axis: Axis, scrollbar: Rc<dyn Scrollbar>) {
        self.state_mut(axis).scrollbar = Some(scrollbar);
        self.sync_scrollbar(axis);
    }

    /// Push the current origin and extents into the attached scrollbar.
    pub fn sync_scrollbar(&self, axis: Axis) {
        let state = self.state(axis);
        let Some(scrollbar) = &state.scrollbar else {
            return;
        };
        let minimum = state.minimum_origin.get();
        let maximum = (self.underlying_total(axis) - minimum).max(0);
        let client = self.client_size(axis);
        scrollbar.set_maximum(maximum);
        scrollbar.set_thumb(client.min(maximum));
        scrollbar.set_increments(
            (client / 4 - self.scroll_intersection).max(1),
            (client - self.scroll_intersection / 2).max(1),
        );
        scrollbar.set_selection(state.origin.get() - minimum);
        scrollbar.set_visible(!self.viewport_off && maximum > client);
    }

    /// Pull the scrollbar's selection back into the origin.
    pub fn apply_scrollbar_selection(&mut self, axis: Axis) {
        let state = self.state(axis);
        let Some(scrollbar) = &state.scrollbar else {
            return;
        };
        let target = state.minimum_origin.get() + scrollbar.selection();
        self.set_origin_pixel(axis, target);
        // A clamped origin must be reflected back
        self.sync_scrollbar(axis);
    }

    // Underlying changes

    /// Shift the minimum origin and origin positions across add/delete diffs.
    fn handle_structural_diffs(&mut self, axis: Axis, diffs: &[StructuralDiff]) {
        let state = self.state(axis);
        let mut minimum_position = state.minimum_origin_position.get();
        let mut origin_position = state.origin_position.get();
        let bounds = Range::new(0, self.underlying_count(axis));
        for diff in diffs.iter().filter(|diff| diff.is_add_or_delete()) {
            match diff.diff_type {
                DiffType::Add => {
                    let added = diff.after.intersection(&bounds).map_or(0, |r| r.len());
                    for reference in [&mut minimum_position, &mut origin_position] {
                        if diff.after.start < *reference {
                            *reference += added;
                        }
                    }
                }
                DiffType::Delete => {
                    for reference in [&mut minimum_position, &mut origin_position] {
                        if diff.before.start < *reference {
                            *reference -= diff.before.end.min(*reference) - diff.before.start;
                        }
                    }
                }
                DiffType::Change => {}
            }
        }

        let count = self.underlying_count(axis);
        let minimum_position = minimum_position.min(count);
        let origin_position = origin_position.min(count).max(minimum_position);
        let minimum = self.underlying_start(axis, minimum_position);
        let origin = self.underlying_start(axis, origin_position);

        let state = self.state(axis);
        state.minimum_origin_position.set(minimum_position);
        state.minimum_origin.set(minimum);
        let adjusted = self.adjust_origin(axis, origin);
        state.origin.set(adjusted);
        self.recompute_origin_position(axis);
        debug!(
            "viewport {axis} remapped: minimum position {minimum_position}, origin {adjusted}"
        );
    }

    /// Geometry may have changed without positions moving.
    fn revalidate_geometry(&mut self, axis: Axis) {
        let state = self.state(axis);
        let minimum_position = state.minimum_origin_position.get().min(self.underlying_count(axis));
        state.minimum_origin_position.set(minimum_position);
        state.minimum_origin.set(self.underlying_start(axis, minimum_position));
        let adjusted = self.adjust_origin(axis, state.origin.get());
        state.origin.set(adjusted);
        self.recompute_origin_position(axis);
    }
}

impl Layer for ViewportLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn position_count(&self, axis: Axis) -> usize {
        let underlying_count = self.underlying_count(axis);
        if self.viewport_off {
            return underlying_count.saturating_sub(self.state(axis).minimum_origin_position.get());
        }
        self.validate(axis);
        let state = self.state(axis);
        if let Some(count) = state.count.get() {
            return count;
        }

        let end = state.origin.get() + self.client_size(axis);
        let first = state.origin_position.get();
        let underlying = self.underlying.borrow();
        let mut position = first;
        while position < underlying_count
            && underlying
                .start_pixel_of_position(axis, position)
                .is_some_and(|start| start < end)
        {
            position += 1;
        }
        let count = position - first.min(position);
        state.count.set(Some(count));
        count
    }

    fn preferred_position_count(&self, axis: Axis) -> usize {
        self.underlying_count(axis)
    }

    fn preferred_pixel_size(&self, axis: Axis) -> Pixel {
        self.underlying_total(axis)
    }

    fn index_by_position(&self, axis: Axis, position: Position) -> Option<Index> {
        let underlying_position = self.local_to_underlying_position(axis, position)?;
        self.underlying
            .borrow()
            .index_by_position(axis, underlying_position)
    }

    fn position_by_index(&self, axis: Axis, index: Index) -> Option<Position> {
        let underlying_position = self.underlying.borrow().position_by_index(axis, index)?;
        self.underlying_to_local_position(axis, self.underlying.borrow().id(), underlying_position)
    }

    fn local_to_underlying_position(&self, axis: Axis, position: Position) -> Option<Position> {
        (position < self.position_count(axis)).then(|| self.origin_position(axis) + position)
    }

    fn underlying_to_local_position(
        &self,
        axis: Axis,
        _source: LayerId,
        position: Position,
    ) -> Option<Position> {
        let local = position.checked_sub(self.origin_position(axis))?;
        (local < self.position_count(axis)).then_some(local)
    }

    fn pixel_size(&self, axis: Axis) -> Pixel {
        let total = self.underlying_total(axis);
        if self.viewport_off {
            return (total - self.state(axis).minimum_origin.get()).max(0);
        }
        let origin = self.origin_pixel(axis);
        self.client_size(axis).min(total - origin).max(0)
    }

    fn size_by_position(&self, axis: Axis, position: Position) -> Pixel {
        self.local_to_underlying_position(axis, position)
            .map_or(0, |p| self.underlying.borrow().size_by_position(axis, p))
    }

    fn start_pixel_of_position(&self, axis: Axis, position: Position) -> Option<Pixel> {
        if position > self.position_count(axis) {
            return None;
        }
        let underlying_position = self.origin_position(axis) + position;
        Some(self.underlying_start(axis, underlying_position) - self.origin_pixel(axis))
    }

    fn position_by_pixel(&self, axis: Axis, pixel: Pixel) -> Option<Position> {
        if pixel < 0 || pixel >= self.pixel_size(axis) {
            return None;
        }
        let underlying_position = self
            .underlying
            .borrow()
            .position_by_pixel(axis, pixel + self.origin_pixel(axis))?;
        self.underlying_to_local_position(axis, self.underlying.borrow().id(), underlying_position)
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
            LayerCommand::Scroll {
                axis,
                direction,
                amount,
            } => {
                self.scroll(*axis, *direction, *amount);
                true
            }
            LayerCommand::ShowInViewport { axis, index } => {
                let position = self.underlying.borrow().position_by_index(*axis, *index);
                match position {
                    Some(position) => {
                        self.move_position_into_viewport(*axis, position);
                        true
                    }
                    None => false,
                }
            }
            LayerCommand::SetViewportOff(off) => {
                self.set_viewport_off(*off);
                true
            }
            LayerCommand::ClientAreaResize => {
                for axis in Axis::ALL {
                    self.state(axis).client_size.set(None);
                    self.validate(axis);
                    self.sync_scrollbar(axis);
                }
                self.fire_layer_event(LayerEvent::ClientAreaResize);
                true
            }
            _ => match command.convert(|axis, p| self.local_to_underlying_position(axis, p)) {
                Some(converted) => self.underlying.borrow_mut().do_command(&converted),
                None => false,
            },
        }
    }

    fn handle_layer_event(&mut self, source: LayerId, event: &LayerEvent) {
        match event {
            // Positions moved but none were added or removed
            _ if event.is_reorder() => {
                for axis in Axis::ALL {
                    if event.is_structure_changed(axis) {
                        self.revalidate_geometry(axis);
                    }
                }
            }
            LayerEvent::Structural(structural) => {
                for axis in Axis::ALL {
                    match structural.diffs(axis) {
                        Some(diffs) if structural.has_add_or_delete(axis) => {
                            self.handle_structural_diffs(axis, diffs);
                        }
                        _ if structural.is_structure_changed(axis) => {
                            self.revalidate_geometry(axis);
                        }
                        _ => {}
                    }
                }
            }
            LayerEvent::CellSelection(CellSelectionEvent {
                column,
                row,
                reveal: true,
            }) => {
                if let Some(column) = column {
                    self.move_position_into_viewport(Axis::Column, *column);
                }
                if let Some(row) = row {
                    self.move_position_into_viewport(Axis::Row, *row);
                }
            }
            _ => {}
        }
        if let Some(local) = convert_underlying_event(self, source, event) {
            self.fire_layer_event(local);
        }
        for axis in Axis::ALL {
            if event.is_structure_changed(axis) {
                self.sync_scrollbar(axis);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::coordinate::Rectangle;
    use crate::data::{DataLayer, VecDataProvider};
    use crate::layer::FixedClientArea;

    fn viewport(columns: usize, width: Pixel, client_width: Pixel) -> Rc<RefCell<ViewportLayer>> {
        let provider = Rc::new(VecDataProvider::with_coordinates(columns, 1));
        let data: SharedLayer = Rc::new(RefCell::new(DataLayer::new(provider, width, 10)));
        let viewport = ViewportLayer::new(data);
        viewport
            .borrow_mut()
            .set_client_area_provider(Rc::new(FixedClientArea::new(Rectangle::new(
                0,
                0,
                client_width,
                10,
            ))));
        viewport
    }

    #[test]
    fn test_partial_trailing_element_counts() {
        let vp = viewport(20, 10, 45);
        assert_eq!(vp.borrow().column_count(), 5);
        assert_eq!(vp.borrow().width(), 45);
    }

    #[test]
    fn test_adjust_pulls_origin_back_near_end() {
        let vp = viewport(20, 10, 45);
        vp.borrow_mut().set_origin_pixel(Axis::Column, 190);
        assert_eq!(vp.borrow().origin_pixel(Axis::Column), 155);
        assert_eq!(vp.borrow().origin_position(Axis::Column), 15);
        assert_eq!(vp.borrow().start_x_of_column_position(0), Some(-5));
    }

    #[test]
    fn test_content_smaller_than_client_stays_at_minimum() {
        let vp = viewport(3, 10, 45);
        vp.borrow_mut().set_origin_pixel(Axis::Column, 20);
        assert_eq!(vp.borrow().origin_pixel(Axis::Column), 0);
        assert_eq!(vp.borrow().column_count(), 3);
        assert_eq!(vp.borrow().width(), 30);
    }

    #[test]
    fn test_scroll_position_steps_one_element() {
        let vp = viewport(20, 10, 45);
        vp.borrow_mut()
            .scroll(Axis::Column, ScrollDirection::Forward, ScrollAmount::Position);
        assert_eq!(vp.borrow().origin_pixel(Axis::Column), 10);
        vp.borrow_mut().set_origin_pixel(Axis::Column, 25);
        vp.borrow_mut()
            .scroll(Axis::Column, ScrollDirection::Backward, ScrollAmount::Position);
        assert_eq!(vp.borrow().origin_pixel(Axis::Column), 20);
    }

    #[test]
    fn test_scrollbar_is_synchronized() {
        let vp = viewport(20, 10, 45);
        let scrollbar = Rc::new(super::super::HeadlessScrollbar::new());
        vp.borrow_mut()
            .set_scrollbar(Axis::Column, Rc::clone(&scrollbar) as Rc<dyn Scrollbar>);
        assert_eq!(scrollbar.maximum(), 200);
        assert_eq!(scrollbar.thumb(), 45);
        assert!(scrollbar.is_visible());

        vp.borrow_mut()
            .scroll(Axis::Column, ScrollDirection::Forward, ScrollAmount::Page);
        assert_eq!(scrollbar.selection(), 40);

        scrollbar.set_selection(500);
        vp.borrow_mut().apply_scrollbar_selection(Axis::Column);
        assert_eq!(vp.borrow().origin_pixel(Axis::Column), 155);
        assert_eq!(scrollbar.selection(), 155);
    }
}
