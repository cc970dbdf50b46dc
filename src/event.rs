//! Events propagated upward through a layer stack.
//!
//! Events are a closed sum type. Each layer that receives an event from an
//! underlying layer converts the carried positions into its own coordinates
//! (see [`LayerEvent::map_ranges`]) before re-firing it to its listeners.

use crate::coordinate::{group_contiguous, Axis, Position, Range};

/// Kind of a structural diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffType {
    /// Positions were inserted
    Add,
    /// Positions were removed
    Delete,
    /// Positions kept their identity but changed size
    Change,
}

/// One contiguous structural change, expressed in before/after positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuralDiff {
    pub diff_type: DiffType,
    pub before: Range,
    pub after: Range,
}

impl StructuralDiff {
    /// Insertion of `after` at the insertion point `before_position`.
    pub fn add(before_position: Position, after: Range) -> Self {
        Self {
            diff_type: DiffType::Add,
            before: Range::empty_at(before_position),
            after,
        }
    }

    /// Removal of `before`, collapsing to `after_position`.
    pub fn delete(before: Range, after_position: Position) -> Self {
        Self {
            diff_type: DiffType::Delete,
            before,
            after: Range::empty_at(after_position),
        }
    }

    /// Size change of `range` (identity kept).
    pub fn change(range: Range) -> Self {
        Self {
            diff_type: DiffType::Change,
            before: range,
            after: range,
        }
    }

    /// A diff that touches no position at all.
    pub fn is_noop(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// True for add/delete diffs that actually move indices.
    pub fn is_add_or_delete(&self) -> bool {
        !self.is_noop() && matches!(self.diff_type, DiffType::Add | DiffType::Delete)
    }
}

/// How one axis of a layer changed structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureChange {
    /// Anything may have changed; no diffs available
    Refresh,
    /// Ordered diffs describing the change
    Diffs(Vec<StructuralDiff>),
}

/// Rows and/or columns were added, removed, resized or refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructuralChangeEvent {
    columns: Option<StructureChange>,
    rows: Option<StructureChange>,
}

impl StructuralChangeEvent {
    /// Both axes refreshed without diffs.
    pub fn refresh() -> Self {
        Self {
            columns: Some(StructureChange::Refresh),
            rows: Some(StructureChange::Refresh),
        }
    }

    /// One axis refreshed without diffs.
    pub fn axis_refresh(axis: Axis) -> Self {
        let mut event = Self::default();
        event.set_change(axis, Some(StructureChange::Refresh));
        event
    }

    /// One axis changed as described by `diffs`.
    pub fn with_diffs(axis: Axis, diffs: Vec<StructuralDiff>) -> Self {
        let mut event = Self::default();
        event.set_change(axis, Some(StructureChange::Diffs(diffs)));
        event
    }

    /// Positions inserted; `ranges` are given in after-insert coordinates.
    pub fn inserted(axis: Axis, ranges: &[Range]) -> Self {
        let mut inserted_before = 0;
        let diffs = sorted_non_empty(ranges)
            .into_iter()
            .map(|range| {
                let diff = StructuralDiff::add(range.start - inserted_before, range);
                inserted_before += range.len();
                diff
            })
            .collect();
        Self::with_diffs(axis, diffs)
    }

    /// Positions removed; `ranges` are given in before-delete coordinates.
    pub fn deleted(axis: Axis, ranges: &[Range]) -> Self {
        let mut deleted_before = 0;
        let diffs = sorted_non_empty(ranges)
            .into_iter()
            .map(|range| {
                let diff = StructuralDiff::delete(range, range.start - deleted_before);
                deleted_before += range.len();
                diff
            })
            .collect();
        Self::with_diffs(axis, diffs)
    }

    /// Positions resized in place.
    pub fn resized(axis: Axis, ranges: &[Range]) -> Self {
        let diffs = sorted_non_empty(ranges)
            .into_iter()
            .map(StructuralDiff::change)
            .collect();
        Self::with_diffs(axis, diffs)
    }

    pub fn change(&self, axis: Axis) -> Option<&StructureChange> {
        match axis {
            Axis::Column => self.columns.as_ref(),
            Axis::Row => self.rows.as_ref(),
        }
    }

    pub fn set_change(&mut self, axis: Axis, change: Option<StructureChange>) {
        match axis {
            Axis::Column => self.columns = change,
            Axis::Row => self.rows = change,
        }
    }

    pub fn is_structure_changed(&self, axis: Axis) -> bool {
        self.change(axis).is_some()
    }

    /// Diffs for `axis`; `None` when the axis is unchanged or refreshed.
    pub fn diffs(&self, axis: Axis) -> Option<&[StructuralDiff]> {
        match self.change(axis) {
            Some(StructureChange::Diffs(diffs)) => Some(diffs),
            _ => None,
        }
    }

    /// True when at least one diff on `axis` adds or deletes positions.
    pub fn has_add_or_delete(&self, axis: Axis) -> bool {
        self.diffs(axis)
            .is_some_and(|diffs| diffs.iter().any(StructuralDiff::is_add_or_delete))
    }
}

fn sorted_non_empty(ranges: &[Range]) -> Vec<Range> {
    let mut sorted: Vec<Range> = ranges.iter().copied().filter(|r| !r.is_empty()).collect();
    sorted.sort_by_key(|r| r.start);
    sorted
}

/// Positions were moved within one axis; no index was added or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderEvent {
    pub axis: Axis,
    /// Moved positions, before the move, grouped and ascending
    pub from_ranges: Vec<Range>,
    /// Insertion slot before the move (`count` = end)
    pub to: Position,
}

impl ReorderEvent {
    pub fn new(axis: Axis, from_positions: &[Position], to: Position) -> Self {
        Self {
            axis,
            from_ranges: group_contiguous(from_positions.iter().copied()),
            to,
        }
    }

    /// Smallest range spanning every moved position and the target.
    pub fn changed_range(&self) -> Range {
        let start = self
            .from_ranges
            .iter()
            .map(|r| r.start)
            .min()
            .map_or(self.to, |s| s.min(self.to));
        let end = self
            .from_ranges
            .iter()
            .map(|r| r.end)
            .max()
            .map_or(self.to, |e| e.max(self.to.saturating_add(1)));
        Range::new(start, end)
    }
}

/// The viewport origin moved along `axis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollEvent {
    pub axis: Axis,
}

/// A cell was selected; `None` coordinates are outside the firing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSelectionEvent {
    pub column: Option<Position>,
    pub row: Option<Position>,
    /// Ask viewports to scroll the cell into view
    pub reveal: bool,
}

/// Only rendering is affected. `None` means the whole axis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisualChangeEvent {
    pub column_ranges: Option<Vec<Range>>,
    pub row_ranges: Option<Vec<Range>>,
}

impl VisualChangeEvent {
    /// Everything needs a redraw.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn ranges(&self, axis: Axis) -> Option<&[Range]> {
        match axis {
            Axis::Column => self.column_ranges.as_deref(),
            Axis::Row => self.row_ranges.as_deref(),
        }
    }
}

/// Every event a layer can fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEvent {
    Structural(StructuralChangeEvent),
    Reorder(ReorderEvent),
    Scroll(ScrollEvent),
    CellSelection(CellSelectionEvent),
    Visual(VisualChangeEvent),
    ClientAreaResize,
}

impl LayerEvent {
    /// Whether positions along `axis` may now denote different elements.
    pub fn is_structure_changed(&self, axis: Axis) -> bool {
        match self {
            Self::Structural(e) => e.is_structure_changed(axis),
            Self::Reorder(e) => e.axis == axis,
            Self::Scroll(e) => e.axis == axis,
            Self::CellSelection(_) | Self::Visual(_) | Self::ClientAreaResize => false,
        }
    }

    /// True for reorder-only events, including structural events whose diffs
    /// are all no-ops.
    pub fn is_reorder(&self) -> bool {
        match self {
            Self::Reorder(_) => true,
            Self::Structural(e) => Axis::ALL.iter().all(|&axis| {
                e.diffs(axis)
                    .is_some_and(|diffs| diffs.iter().all(StructuralDiff::is_noop))
                    || !e.is_structure_changed(axis)
            }),
            _ => false,
        }
    }

    /// Keep only the part of the event concerning `axis`.
    ///
    /// Used by layers that borrow a single dimension from a dependency.
    pub fn restrict_to(&self, axis: Axis) -> Option<LayerEvent> {
        match self {
            Self::Structural(e) => {
                let change = e.change(axis)?.clone();
                let mut restricted = StructuralChangeEvent::default();
                restricted.set_change(axis, Some(change));
                Some(Self::Structural(restricted))
            }
            Self::Reorder(e) => (e.axis == axis).then(|| self.clone()),
            Self::Scroll(e) => (e.axis == axis).then(|| self.clone()),
            Self::CellSelection(e) => {
                let mut restricted = *e;
                match axis {
                    Axis::Column => restricted.row = None,
                    Axis::Row => restricted.column = None,
                }
                Some(Self::CellSelection(restricted))
            }
            Self::Visual(e) => {
                let mut restricted = VisualChangeEvent::all();
                match axis {
                    Axis::Column => restricted.column_ranges.clone_from(&e.column_ranges),
                    Axis::Row => restricted.row_ranges.clone_from(&e.row_ranges),
                }
                Some(Self::Visual(restricted))
            }
            Self::ClientAreaResize => Some(Self::ClientAreaResize),
        }
    }

    /// Convert every carried position range with `map`.
    ///
    /// `map` receives empty ranges for insertion points and single-position
    /// ranges for cell coordinates. Diffs whose ranges cannot be mapped are
    /// dropped; a reorder whose ranges cannot be mapped degrades to a
    /// refresh of its axis. Returns `None` when nothing of the event remains.
    pub fn map_ranges(&self, map: impl Fn(Axis, Range) -> Option<Range>) -> Option<LayerEvent> {
        match self {
            Self::Structural(e) => {
                let mut mapped = StructuralChangeEvent::default();
                for axis in Axis::ALL {
                    let change = match e.change(axis) {
                        None => None,
                        Some(StructureChange::Refresh) => Some(StructureChange::Refresh),
                        Some(StructureChange::Diffs(diffs)) => Some(StructureChange::Diffs(
                            diffs
                                .iter()
                                .filter_map(|diff| {
                                    Some(StructuralDiff {
                                        diff_type: diff.diff_type,
                                        before: map(axis, diff.before)?,
                                        after: map(axis, diff.after)?,
                                    })
                                })
                                .collect(),
                        )),
                    };
                    mapped.set_change(axis, change);
                }
                Some(Self::Structural(mapped))
            }
            Self::Reorder(e) => {
                let from_ranges: Vec<Range> = e
                    .from_ranges
                    .iter()
                    .filter_map(|r| map(e.axis, *r))
                    .collect();
                let to = map(e.axis, Range::empty_at(e.to)).map(|r| r.start);
                match to {
                    Some(to) if !from_ranges.is_empty() => Some(Self::Reorder(ReorderEvent {
                        axis: e.axis,
                        from_ranges,
                        to,
                    })),
                    _ => Some(Self::Structural(StructuralChangeEvent::axis_refresh(e.axis))),
                }
            }
            Self::Scroll(e) => Some(Self::Scroll(*e)),
            Self::CellSelection(e) => {
                let map_single =
                    |axis, position: Option<Position>| -> Option<Position> {
                        position
                            .and_then(|p| map(axis, Range::single(p)))
                            .filter(|r| !r.is_empty())
                            .map(|r| r.start)
                    };
                Some(Self::CellSelection(CellSelectionEvent {
                    column: map_single(Axis::Column, e.column),
                    row: map_single(Axis::Row, e.row),
                    reveal: e.reveal,
                }))
            }
            Self::Visual(e) => {
                let map_all = |axis, ranges: &Option<Vec<Range>>| {
                    ranges
                        .as_ref()
                        .map(|rs| rs.iter().filter_map(|r| map(axis, *r)).collect::<Vec<_>>())
                };
                let column_ranges = map_all(Axis::Column, &e.column_ranges);
                let row_ranges = map_all(Axis::Row, &e.row_ranges);
                let vanished =
                    |ranges: &Option<Vec<Range>>| ranges.as_ref().is_some_and(Vec::is_empty);
                if vanished(&column_ranges) || vanished(&row_ranges) {
                    return None;
                }
                Some(Self::Visual(VisualChangeEvent {
                    column_ranges,
                    row_ranges,
                }))
            }
            Self::ClientAreaResize => Some(Self::ClientAreaResize),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_diffs_use_before_positions() {
        let event =
            StructuralChangeEvent::inserted(Axis::Row, &[Range::new(5, 7), Range::new(2, 3)]);
        let diffs = event.diffs(Axis::Row).unwrap();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0], StructuralDiff::add(2, Range::new(2, 3)));
        // one row inserted before, so the second insertion point was 4 before the change
        assert_eq!(diffs[1], StructuralDiff::add(4, Range::new(5, 7)));
        assert!(event.has_add_or_delete(Axis::Row));
        assert!(!event.is_structure_changed(Axis::Column));
    }

    #[test]
    fn test_deleted_diffs_collapse_after_positions() {
        let event =
            StructuralChangeEvent::deleted(Axis::Column, &[Range::new(1, 3), Range::new(6, 7)]);
        let diffs = event.diffs(Axis::Column).unwrap();
        assert_eq!(diffs[0], StructuralDiff::delete(Range::new(1, 3), 1));
        assert_eq!(diffs[1], StructuralDiff::delete(Range::new(6, 7), 4));
    }

    #[test]
    fn test_resize_is_not_add_or_delete() {
        let event = StructuralChangeEvent::resized(Axis::Column, &[Range::single(3)]);
        assert!(event.is_structure_changed(Axis::Column));
        assert!(!event.has_add_or_delete(Axis::Column));
    }

    #[test]
    fn test_noop_structural_event_counts_as_reorder() {
        let event = LayerEvent::Structural(StructuralChangeEvent::with_diffs(
            Axis::Column,
            vec![StructuralDiff::add(3, Range::empty_at(3))],
        ));
        assert!(event.is_reorder());
        let real = LayerEvent::Structural(StructuralChangeEvent::deleted(
            Axis::Column,
            &[Range::single(0)],
        ));
        assert!(!real.is_reorder());
    }

    #[test]
    fn test_reorder_changed_range() {
        let forward = ReorderEvent::new(Axis::Column, &[1], 4);
        assert_eq!(forward.changed_range(), Range::new(1, 5));
        let backward = ReorderEvent::new(Axis::Column, &[5, 6], 2);
        assert_eq!(backward.changed_range(), Range::new(2, 7));
    }

    #[test]
    fn test_restrict_structural_to_axis() {
        let event = LayerEvent::Structural(StructuralChangeEvent::refresh());
        let restricted = event.restrict_to(Axis::Row).unwrap();
        assert!(restricted.is_structure_changed(Axis::Row));
        assert!(!restricted.is_structure_changed(Axis::Column));

        let scroll = LayerEvent::Scroll(ScrollEvent { axis: Axis::Column });
        assert!(scroll.restrict_to(Axis::Row).is_none());
    }

    #[test]
    fn test_map_ranges_drops_unmappable_diffs() {
        let event = LayerEvent::Structural(StructuralChangeEvent::deleted(
            Axis::Row,
            &[Range::new(0, 2), Range::new(10, 12)],
        ));
        // Only positions >= 10 are visible, shifted down by 10
        let mapped = event
            .map_ranges(|_, r| {
                if r.start >= 10 {
                    Some(Range::new(r.start - 10, r.end - 10))
                } else {
                    None
                }
            })
            .unwrap();
        let LayerEvent::Structural(mapped) = mapped else {
            panic!("expected structural event");
        };
        let diffs = mapped.diffs(Axis::Row).unwrap();
        assert_eq!(diffs.len(), 0, "after position 8 < 10 makes the second diff unmappable too");
    }

    #[test]
    fn test_unmappable_reorder_degrades_to_refresh() {
        let event = LayerEvent::Reorder(ReorderEvent::new(Axis::Column, &[1], 3));
        let mapped = event.map_ranges(|_, _| None).unwrap();
        assert_eq!(
            mapped,
            LayerEvent::Structural(StructuralChangeEvent::axis_refresh(Axis::Column))
        );
    }
}
