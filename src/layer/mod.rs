//! The layer abstraction shared by every grid layer.
//!
//! This module handles:
//! - The [`Layer`] capability trait (per-axis coordinate mapping and geometry)
//! - [`LayerCore`], the identity/listener/event-queue state each layer owns
//! - Event dispatch through [`flush_events`] and [`execute`]
//! - Client area providers and layer cells

mod cell;
mod client_area;
mod dispatch;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

pub use cell::LayerCell;
pub use client_area::{ClientAreaProvider, FixedClientArea};
pub use dispatch::{execute, flush_events};

use crate::command::LayerCommand;
use crate::coordinate::{
    bounding_range, group_contiguous, Axis, Index, Pixel, Position, Range, Rectangle,
};
use crate::data::CellValue;
use crate::event::LayerEvent;
use crate::persistence::Properties;

/// Shared, mutable handle to any layer.
pub type SharedLayer = Rc<RefCell<dyn Layer>>;

/// Process-unique identity of a layer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

impl LayerId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Global firing order of queued events.
static NEXT_EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Receiver of a layer's events.
#[derive(Clone)]
pub enum LayerListener {
    /// An upper layer; converts the event and may re-fire
    Layer(Weak<RefCell<dyn Layer>>),
    /// An external consumer such as a renderer
    Observer(Rc<dyn Fn(&LayerEvent)>),
}

impl LayerListener {
    fn same_as(&self, other: &LayerListener) -> bool {
        match (self, other) {
            (Self::Layer(a), Self::Layer(b)) => a.as_ptr().cast::<()>() == b.as_ptr().cast::<()>(),
            (Self::Observer(a), Self::Observer(b)) => {
                Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for LayerListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Layer(_) => f.write_str("LayerListener::Layer"),
            Self::Observer(_) => f.write_str("LayerListener::Observer"),
        }
    }
}

/// State every layer owns: identity, listeners, pending events, client area.
pub struct LayerCore {
    id: LayerId,
    listeners: Vec<LayerListener>,
    pending: VecDeque<(u64, LayerEvent)>,
    client_area_provider: Option<Rc<dyn ClientAreaProvider>>,
}

impl Default for LayerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerCore {
    pub fn new() -> Self {
        Self {
            id: LayerId::next(),
            listeners: Vec::new(),
            pending: VecDeque::new(),
            client_area_provider: None,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Append a listener; registering the same listener twice is ignored.
    pub fn add_listener(&mut self, listener: LayerListener) {
        if !self.listeners.iter().any(|l| l.same_as(&listener)) {
            self.listeners.push(listener);
        }
    }

    pub fn listeners(&self) -> &[LayerListener] {
        &self.listeners
    }

    /// Queue an event for delivery by the next [`flush_events`].
    pub fn fire(&mut self, event: LayerEvent) {
        let seq = NEXT_EVENT_SEQ.fetch_add(1, Ordering::Relaxed);
        self.pending.push_back((seq, event));
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    fn next_pending_seq(&self) -> Option<u64> {
        self.pending.front().map(|(seq, _)| *seq)
    }

    fn pop_pending(&mut self) -> Option<LayerEvent> {
        self.pending.pop_front().map(|(_, event)| event)
    }

    pub fn client_area_provider(&self) -> Option<&Rc<dyn ClientAreaProvider>> {
        self.client_area_provider.as_ref()
    }

    pub fn set_client_area_provider(&mut self, provider: Rc<dyn ClientAreaProvider>) {
        self.client_area_provider = Some(provider);
    }
}

/// Capability trait implemented by every grid layer.
///
/// Positions are local to the layer; indices identify data rows/columns and
/// are the same at every level of a stack. Lookups outside the layer return
/// `None` rather than panicking.
pub trait Layer {
    fn core(&self) -> &LayerCore;
    fn core_mut(&mut self) -> &mut LayerCore;

    fn position_count(&self, axis: Axis) -> usize;
    fn index_by_position(&self, axis: Axis, position: Position) -> Option<Index>;
    fn position_by_index(&self, axis: Axis, index: Index) -> Option<Position>;

    /// Convert a local position into the position of the underlying layer.
    fn local_to_underlying_position(&self, axis: Axis, position: Position) -> Option<Position>;

    /// Convert a position of the underlying layer `source` into a local one.
    fn underlying_to_local_position(
        &self,
        axis: Axis,
        source: LayerId,
        position: Position,
    ) -> Option<Position>;

    /// Total pixel extent along `axis`.
    fn pixel_size(&self, axis: Axis) -> Pixel;

    /// Size of one position; 0 when out of range.
    fn size_by_position(&self, axis: Axis, position: Position) -> Pixel;

    /// Start pixel of a position; `position == count` yields the end pixel.
    fn start_pixel_of_position(&self, axis: Axis, position: Position) -> Option<Pixel>;

    fn position_by_pixel(&self, axis: Axis, pixel: Pixel) -> Option<Position>;

    fn cell_by_position(&self, column: Position, row: Position) -> Option<LayerCell>;

    fn underlying_layers(&self) -> Vec<SharedLayer>;

    /// Handle or forward a command; returns whether some layer handled it.
    fn do_command(&mut self, command: &LayerCommand) -> bool;

    /// React to an event fired by the layer `source`.
    fn handle_layer_event(&mut self, source: LayerId, event: &LayerEvent);

    fn id(&self) -> LayerId {
        self.core().id()
    }

    fn preferred_position_count(&self, axis: Axis) -> usize {
        self.position_count(axis)
    }

    fn preferred_pixel_size(&self, axis: Axis) -> Pixel {
        self.pixel_size(axis)
    }

    /// Current count of the underlying layer `source` along `axis`.
    ///
    /// `None` when `source` is not reachable through `underlying_layers` or
    /// is borrowed mutably.
    fn underlying_count(&self, axis: Axis, source: LayerId) -> Option<usize> {
        self.underlying_layers().iter().find_map(|layer| {
            let layer = layer.try_borrow().ok()?;
            (layer.id() == source).then(|| layer.position_count(axis))
        })
    }

    /// Local ranges covering the visible part of an underlying range.
    ///
    /// The range is clipped to the source's current count first; positions
    /// past it have no local counterpart.
    fn underlying_to_local_ranges(&self, axis: Axis, source: LayerId, range: Range) -> Vec<Range> {
        let clipped = match self.underlying_count(axis, source) {
            Some(count) => range.intersection(&Range::new(0, count)),
            None => Some(range),
        };
        clipped.map_or_else(Vec::new, |range| {
            group_contiguous(
                range
                    .iter()
                    .filter_map(|p| self.underlying_to_local_position(axis, source, p)),
            )
        })
    }

    fn bounds_by_position(&self, column: Position, row: Position) -> Option<Rectangle> {
        if column >= self.position_count(Axis::Column) || row >= self.position_count(Axis::Row) {
            return None;
        }
        Some(Rectangle::new(
            self.start_pixel_of_position(Axis::Column, column)?,
            self.start_pixel_of_position(Axis::Row, row)?,
            self.size_by_position(Axis::Column, column),
            self.size_by_position(Axis::Row, row),
        ))
    }

    fn data_value_by_position(&self, column: Position, row: Position) -> Option<CellValue> {
        self.cell_by_position(column, row).map(|cell| cell.value)
    }

    fn labels_by_position(&self, column: Position, row: Position) -> Vec<String> {
        self.cell_by_position(column, row)
            .map(|cell| cell.labels)
            .unwrap_or_default()
    }

    /// Pixel area available to the layer; empty when no provider is set.
    fn client_area(&self) -> Rectangle {
        self.core()
            .client_area_provider()
            .map(|provider| provider.client_area())
            .unwrap_or_default()
    }

    /// Set the provider here and on every underlying layer.
    fn set_client_area_provider(&mut self, provider: Rc<dyn ClientAreaProvider>) {
        for underlying in self.underlying_layers() {
            underlying
                .borrow_mut()
                .set_client_area_provider(Rc::clone(&provider));
        }
        self.core_mut().set_client_area_provider(provider);
    }

    fn add_layer_listener(&mut self, listener: LayerListener) {
        self.core_mut().add_listener(listener);
    }

    fn fire_layer_event(&mut self, event: LayerEvent) {
        self.core_mut().fire(event);
    }

    /// Save the state of the underlying layers, then this layer's own.
    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        for underlying in self.underlying_layers() {
            underlying.borrow().save_state(prefix, properties);
        }
        self.save_own_state(prefix, properties);
    }

    /// Restore the underlying layers first, then this layer's own state.
    fn load_state(&mut self, prefix: &str, properties: &Properties) {
        for underlying in self.underlying_layers() {
            underlying.borrow_mut().load_state(prefix, properties);
        }
        self.load_own_state(prefix, properties);
    }

    fn save_own_state(&self, _prefix: &str, _properties: &mut Properties) {}

    fn load_own_state(&mut self, _prefix: &str, _properties: &Properties) {}

    // Column/row conveniences

    fn column_count(&self) -> usize {
        self.position_count(Axis::Column)
    }

    fn row_count(&self) -> usize {
        self.position_count(Axis::Row)
    }

    fn width(&self) -> Pixel {
        self.pixel_size(Axis::Column)
    }

    fn height(&self) -> Pixel {
        self.pixel_size(Axis::Row)
    }

    fn column_index_by_position(&self, column: Position) -> Option<Index> {
        self.index_by_position(Axis::Column, column)
    }

    fn row_index_by_position(&self, row: Position) -> Option<Index> {
        self.index_by_position(Axis::Row, row)
    }

    fn column_position_by_index(&self, index: Index) -> Option<Position> {
        self.position_by_index(Axis::Column, index)
    }

    fn row_position_by_index(&self, index: Index) -> Option<Position> {
        self.position_by_index(Axis::Row, index)
    }

    fn column_width_by_position(&self, column: Position) -> Pixel {
        self.size_by_position(Axis::Column, column)
    }

    fn row_height_by_position(&self, row: Position) -> Pixel {
        self.size_by_position(Axis::Row, row)
    }

    fn start_x_of_column_position(&self, column: Position) -> Option<Pixel> {
        self.start_pixel_of_position(Axis::Column, column)
    }

    fn start_y_of_row_position(&self, row: Position) -> Option<Pixel> {
        self.start_pixel_of_position(Axis::Row, row)
    }

    fn column_position_by_x(&self, x: Pixel) -> Option<Position> {
        self.position_by_pixel(Axis::Column, x)
    }

    fn row_position_by_y(&self, y: Pixel) -> Option<Position> {
        self.position_by_pixel(Axis::Row, y)
    }
}

/// Wrap a layer in a shared handle and subscribe it to `underlying` layers.
pub fn attach<L: Layer + 'static>(layer: L, underlying: &[&SharedLayer]) -> Rc<RefCell<L>> {
    let handle = Rc::new(RefCell::new(layer));
    let shared: SharedLayer = Rc::clone(&handle) as SharedLayer;
    for layer in underlying {
        register_listener(layer, &shared);
    }
    handle
}

/// Subscribe `listener` to the events of `underlying`.
pub fn register_listener(underlying: &SharedLayer, listener: &SharedLayer) {
    let weak: Weak<RefCell<dyn Layer>> = Rc::downgrade(listener);
    underlying
        .borrow_mut()
        .add_layer_listener(LayerListener::Layer(weak));
}

/// Whether two handles point to the same layer.
pub fn same_layer(a: &SharedLayer, b: &SharedLayer) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// Map a range of the underlying layer `source` into `layer`'s positions.
///
/// Empty ranges are insertion points and stay empty: when the point itself
/// has no local position the slot after the previous position is used.
/// Non-empty ranges map to the smallest range covering their visible part.
pub fn map_underlying_range<L: Layer + ?Sized>(
    layer: &L,
    axis: Axis,
    source: LayerId,
    range: Range,
) -> Option<Range> {
    if range.is_empty() {
        let start = layer
            .underlying_to_local_position(axis, source, range.start)
            .or_else(|| {
                range
                    .start
                    .checked_sub(1)
                    .and_then(|previous| layer.underlying_to_local_position(axis, source, previous))
                    .map(|p| p + 1)
            })
            .or_else(|| (range.start == 0).then_some(0))?;
        return Some(Range::empty_at(start));
    }
    bounding_range(&layer.underlying_to_local_ranges(axis, source, range))
}

/// Convert an event fired by `source` into `layer`'s positions.
pub fn convert_underlying_event<L: Layer + ?Sized>(
    layer: &L,
    source: LayerId,
    event: &LayerEvent,
) -> Option<LayerEvent> {
    event.map_ranges(|axis, range| map_underlying_range(layer, axis, source, range))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_ids_are_unique() {
        let a = LayerCore::new();
        let b = LayerCore::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_duplicate_observer_is_ignored() {
        let mut core = LayerCore::new();
        let observer: Rc<dyn Fn(&LayerEvent)> = Rc::new(|_| {});
        core.add_listener(LayerListener::Observer(Rc::clone(&observer)));
        core.add_listener(LayerListener::Observer(observer));
        core.add_listener(LayerListener::Observer(Rc::new(|_| {})));
        assert_eq!(core.listeners().len(), 2);
    }

    #[test]
    fn test_fire_queues_in_order() {
        let mut core = LayerCore::new();
        core.fire(LayerEvent::ClientAreaResize);
        let first = core.next_pending_seq().unwrap();
        core.fire(LayerEvent::ClientAreaResize);
        assert!(core.has_pending_events());
        assert_eq!(core.next_pending_seq(), Some(first));
        assert!(core.pop_pending().is_some());
        assert!(core.next_pending_seq().unwrap() > first);
    }
}
