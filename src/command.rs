//! Commands routed downward through a layer stack.

use crate::coordinate::{Axis, Index, Pixel, Position};

/// Direction of a scroll along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Towards position 0 (left / up)
    Backward,
    /// Towards the last position (right / down)
    Forward,
}

/// How far a scroll moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAmount {
    /// One element
    Position,
    /// A quarter of the client area, minus the scroll intersection
    Step,
    /// The client area, minus half the scroll intersection
    Page,
    /// All the way to the bound
    All,
}

/// How a cell selection combines with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionModifier {
    /// Drop the current selection first
    #[default]
    Replace,
    /// Flip the cell's membership
    Toggle,
    /// Select the rectangle from the anchor to the cell
    Extend,
}

/// Every command a layer can receive.
///
/// Positions are expressed in the receiving layer's coordinates. A layer that
/// does not handle a command forwards a copy converted with [`LayerCommand::convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerCommand {
    /// Move one position to the insertion slot `to`
    Reorder {
        axis: Axis,
        from: Position,
        to: Position,
    },
    /// Move several positions as a block to the insertion slot `to`
    MultiReorder {
        axis: Axis,
        from: Vec<Position>,
        to: Position,
    },
    /// Restore the identity order
    ResetReorder { axis: Axis },
    /// Set the size of one position
    Resize {
        axis: Axis,
        position: Position,
        size: Pixel,
    },
    Scroll {
        axis: Axis,
        direction: ScrollDirection,
        amount: ScrollAmount,
    },
    /// Scroll the element with the given underlying index into view
    ShowInViewport { axis: Axis, index: Index },
    SetViewportOff(bool),
    SelectCell {
        column: Position,
        row: Position,
        modifier: SelectionModifier,
    },
    SelectAll,
    ClearSelection,
    /// The client area changed size
    ClientAreaResize,
    /// Re-read everything
    StructuralRefresh,
}

impl LayerCommand {
    /// Commands that composite layers deliver to every child.
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self,
            Self::ClientAreaResize | Self::StructuralRefresh | Self::SetViewportOff(_)
        )
    }

    /// Convert carried positions with `map` (local -> target layer).
    ///
    /// Insertion slots may equal the layer's count; when the slot itself has
    /// no mapping the slot after the previous position is used. Returns
    /// `None` when a required position cannot be converted.
    pub fn convert(&self, map: impl Fn(Axis, Position) -> Option<Position>) -> Option<Self> {
        let map_slot = |axis: Axis, to: Position| {
            map(axis, to).or_else(|| {
                to.checked_sub(1)
                    .and_then(|previous| map(axis, previous))
                    .map(|p| p + 1)
            })
        };
        let converted = match self {
            Self::Reorder { axis, from, to } => Self::Reorder {
                axis: *axis,
                from: map(*axis, *from)?,
                to: map_slot(*axis, *to)?,
            },
            Self::MultiReorder { axis, from, to } => Self::MultiReorder {
                axis: *axis,
                from: from
                    .iter()
                    .map(|p| map(*axis, *p))
                    .collect::<Option<Vec<_>>>()?,
                to: map_slot(*axis, *to)?,
            },
            Self::Resize {
                axis,
                position,
                size,
            } => Self::Resize {
                axis: *axis,
                position: map(*axis, *position)?,
                size: *size,
            },
            Self::SelectCell {
                column,
                row,
                modifier,
            } => Self::SelectCell {
                column: map(Axis::Column, *column)?,
                row: map(Axis::Row, *row)?,
                modifier: *modifier,
            },
            Self::ResetReorder { .. }
            | Self::Scroll { .. }
            | Self::ShowInViewport { .. }
            | Self::SetViewportOff(_)
            | Self::SelectAll
            | Self::ClearSelection
            | Self::ClientAreaResize
            | Self::StructuralRefresh => self.clone(),
        };
        Some(converted)
    }

    /// Whether the command carries positions along `axis`.
    pub fn uses_positions(&self, axis: Axis) -> bool {
        match self {
            Self::Reorder { axis: a, .. }
            | Self::MultiReorder { axis: a, .. }
            | Self::Resize { axis: a, .. } => *a == axis,
            Self::SelectCell { .. } => true,
            _ => false,
        }
    }
}
