use crate::coordinate::{merge_ranges, Axis, Index, Position, Range};
use crate::error::{GridError, Result};

/// Mutable permutation between visible positions and stable indices.
///
/// `order[position] == index`; `positions` is the dense inverse and is
/// rebuilt in one pass after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOrder {
    axis: Axis,
    order: Vec<Index>,
    positions: Vec<Option<Position>>,
}

impl IndexOrder {
    pub fn identity(axis: Axis, count: usize) -> Self {
        let mut order = Self {
            axis,
            order: (0..count).collect(),
            positions: Vec::new(),
        };
        order.rebuild_positions();
        order
    }

    /// Build from an explicit order after checking it is a permutation of `0..count`.
    ///
    /// # Errors
    /// Returns [`GridError::InvalidState`] naming `key` when the length
    /// differs from `count`, an index is out of range, or an index repeats.
    pub fn from_order(axis: Axis, order: Vec<Index>, count: usize, key: &str) -> Result<Self> {
        if order.len() != count {
            return Err(GridError::invalid_state(
                key,
                format!("{} indices for {count} {axis}s", order.len()),
            ));
        }
        let mut seen = vec![false; count];
        for &index in &order {
            match seen.get_mut(index) {
                None => {
                    return Err(GridError::invalid_state(
                        key,
                        format!("index {index} out of range (count {count})"),
                    ))
                }
                Some(true) => {
                    return Err(GridError::invalid_state(key, format!("index {index} repeats")))
                }
                Some(slot) => *slot = true,
            }
        }
        let mut order = Self {
            axis,
            order,
            positions: Vec::new(),
        };
        order.rebuild_positions();
        Ok(order)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[Index] {
        &self.order
    }

    pub fn index_at(&self, position: Position) -> Option<Index> {
        self.order.get(position).copied()
    }

    pub fn position_of(&self, index: Index) -> Option<Position> {
        self.positions.get(index).copied().flatten()
    }

    pub fn is_identity(&self) -> bool {
        self.order.iter().enumerate().all(|(p, &i)| p == i)
    }

    fn rebuild_positions(&mut self) {
        let size = self.order.iter().max().map_or(0, |max| max + 1);
        self.positions = vec![None; size];
        for (position, &index) in self.order.iter().enumerate() {
            if let Some(slot) = self.positions.get_mut(index) {
                *slot = Some(position);
            }
        }
    }

    fn check_source(&self, position: Position) -> Result<()> {
        if position >= self.order.len() {
            return Err(GridError::PositionOutOfRange {
                axis: self.axis,
                position,
                count: self.order.len(),
            });
        }
        Ok(())
    }

    fn check_target(&self, target: Position) -> Result<()> {
        if target > self.order.len() {
            return Err(GridError::TargetOutOfRange {
                axis: self.axis,
                target,
                count: self.order.len(),
            });
        }
        Ok(())
    }

    /// Move the element at `from` to the insertion slot `to` (`len` = end).
    ///
    /// Returns whether the order changed.
    ///
    /// # Errors
    /// Returns an out-of-range error and leaves the order untouched when
    /// `from >= len` or `to > len`.
    pub fn move_single(&mut self, from: Position, to: Position) -> Result<bool> {
        self.check_source(from)?;
        self.check_target(to)?;
        if to == from || to == from + 1 {
            return Ok(false);
        }
        let index = self.order.remove(from);
        let insert_at = if to > from { to - 1 } else { to };
        self.order.insert(insert_at, index);
        self.rebuild_positions();
        Ok(true)
    }

    /// Move several elements as one block to the insertion slot `to`.
    ///
    /// `from` is sorted and de-duplicated first, so its order is irrelevant.
    /// Moved elements keep their relative order. Returns whether the order
    /// changed.
    ///
    /// # Errors
    /// Returns an out-of-range error and leaves the order untouched when any
    /// source is `>= len` or `to > len`.
    pub fn move_multiple(&mut self, from: &[Position], to: Position) -> Result<bool> {
        let mut sources = from.to_vec();
        sources.sort_unstable();
        sources.dedup();
        for &source in &sources {
            self.check_source(source)?;
        }
        self.check_target(to)?;
        if sources.is_empty() {
            return Ok(false);
        }

        let mut moved = Vec::with_capacity(sources.len());
        let mut remainder = Vec::with_capacity(self.order.len() - sources.len());
        let mut next_source = sources.iter().peekable();
        for (position, &index) in self.order.iter().enumerate() {
            if next_source.peek() == Some(&&position) {
                next_source.next();
                moved.push(index);
            } else {
                remainder.push(index);
            }
        }

        let moved_before_target = sources.partition_point(|&p| p < to);
        let insert_at = to - moved_before_target;
        let mut order = remainder;
        let tail = order.split_off(insert_at);
        order.extend(moved);
        order.extend(tail);

        let changed = order != self.order;
        self.order = order;
        self.rebuild_positions();
        Ok(changed)
    }

    /// Replace the order with the identity of `count` elements.
    pub fn reset(&mut self, count: usize) {
        self.order = (0..count).collect();
        self.rebuild_positions();
    }

    /// Whether the order is exactly a permutation of `0..count`.
    pub fn is_permutation_of(&self, count: usize) -> bool {
        self.order.len() == count && (0..count).all(|index| self.position_of(index).is_some())
    }

    /// Remove the indices in `ranges`, shifting survivors down.
    ///
    /// Ranges are clipped to the indices present. Returns the positions the
    /// removed indices held, ascending.
    pub fn remove_indices(&mut self, ranges: &[Range]) -> Vec<Position> {
        let present = Range::new(0, self.order.len());
        let removed = merge_ranges(ranges.iter().filter_map(|r| r.intersection(&present)));
        if removed.is_empty() {
            return Vec::new();
        }
        // removed_before[k]: indices removed by the ranges preceding removed[k]
        let removed_before: Vec<usize> = removed
            .iter()
            .scan(0, |total, range| {
                let before = *total;
                *total += range.len();
                Some(before)
            })
            .collect();
        let removed_total: usize = removed.iter().map(Range::len).sum();

        let mut old_positions = Vec::new();
        let mut order = Vec::with_capacity(self.order.len().saturating_sub(removed_total));
        for (position, &index) in self.order.iter().enumerate() {
            let next = removed.partition_point(|r| r.end <= index);
            match removed.get(next) {
                Some(range) if range.contains(index) => old_positions.push(position),
                _ => {
                    let below = removed_before.get(next).copied().unwrap_or(removed_total);
                    order.push(index - below);
                }
            }
        }
        self.order = order;
        self.rebuild_positions();
        old_positions
    }

    /// Make room for the new indices in `range` and append them at the end.
    ///
    /// Returns the positions of the appended indices.
    pub fn insert_indices(&mut self, range: Range) -> Range {
        let first_new = self.order.len();
        if range.is_empty() {
            return Range::empty_at(first_new);
        }
        for index in &mut self.order {
            if *index >= range.start {
                *index += range.len();
            }
        }
        self.order.extend(range.iter());
        self.rebuild_positions();
        Range::new(first_new, self.order.len())
    }

    /// Drop indices `>= count` and repeats, then append missing indices.
    ///
    /// Returns whether anything changed.
    pub fn reconcile(&mut self, count: usize) -> bool {
        if self.is_permutation_of(count) {
            return false;
        }
        let mut seen = vec![false; count];
        let mut order = Vec::with_capacity(count);
        for &index in &self.order {
            if let Some(slot) = seen.get_mut(index) {
                if !*slot {
                    *slot = true;
                    order.push(index);
                }
            }
        }
        order.extend(
            seen.iter()
                .enumerate()
                .filter(|(_, present)| !**present)
                .map(|(index, _)| index),
        );
        self.order = order;
        self.rebuild_positions();
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn order_of(indices: &[Index]) -> IndexOrder {
        IndexOrder::from_order(Axis::Column, indices.to_vec(), indices.len(), "test").unwrap()
    }

    fn assert_inverse(order: &IndexOrder) {
        for position in 0..order.len() {
            let index = order.index_at(position).unwrap();
            assert_eq!(order.position_of(index), Some(position));
        }
    }

    #[test_case(0, 3, &[1, 2, 0, 3] ; "forward")]
    #[test_case(3, 0, &[3, 0, 1, 2] ; "backward")]
    #[test_case(1, 4, &[0, 2, 3, 1] ; "to end")]
    #[test_case(2, 2, &[0, 1, 2, 3] ; "onto itself")]
    #[test_case(2, 3, &[0, 1, 2, 3] ; "slot after itself")]
    fn test_move_single(from: Position, to: Position, expected: &[Index]) {
        let mut order = IndexOrder::identity(Axis::Column, 4);
        order.move_single(from, to).unwrap();
        assert_eq!(order.as_slice(), expected);
        assert_inverse(&order);
    }

    #[test_case(&[0, 1], 3, &[2, 0, 1, 3] ; "block forward")]
    #[test_case(&[0, 1], 4, &[2, 3, 0, 1] ; "block to end")]
    #[test_case(&[3, 1], 0, &[1, 3, 0, 2] ; "scattered backward")]
    #[test_case(&[1, 2], 2, &[0, 1, 2, 3] ; "inside own footprint")]
    #[test_case(&[2, 0, 2], 4, &[1, 3, 0, 2] ; "unsorted with duplicate")]
    fn test_move_multiple(from: &[Position], to: Position, expected: &[Index]) {
        let mut order = IndexOrder::identity(Axis::Column, 4);
        order.move_multiple(from, to).unwrap();
        assert_eq!(order.as_slice(), expected);
        assert_inverse(&order);
    }

    #[test]
    fn test_invalid_moves_leave_order_untouched() {
        let mut order = order_of(&[1, 2, 3, 0]);
        assert!(matches!(
            order.move_single(4, 0),
            Err(GridError::PositionOutOfRange { position: 4, .. })
        ));
        assert!(matches!(
            order.move_single(0, 5),
            Err(GridError::TargetOutOfRange { target: 5, .. })
        ));
        assert!(order.move_multiple(&[0, 9], 1).is_err());
        assert!(order.move_multiple(&[0], 7).is_err());
        assert_eq!(order.as_slice(), &[1, 2, 3, 0]);
    }

    #[test]
    fn test_remove_indices() {
        let mut order = order_of(&[1, 2, 3, 0]);
        let old_positions = order.remove_indices(&[Range::single(2)]);
        assert_eq!(old_positions, vec![1]);
        assert_eq!(order.as_slice(), &[1, 2, 0]);
        assert_inverse(&order);
    }

    #[test]
    fn test_remove_several_ranges() {
        let mut order = order_of(&[5, 0, 3, 1, 4, 2]);
        let old_positions = order.remove_indices(&[Range::new(0, 2), Range::single(4)]);
        assert_eq!(old_positions, vec![1, 3, 4]);
        assert_eq!(order.as_slice(), &[2, 1, 0]);
    }

    #[test]
    fn test_remove_clips_ranges_past_the_end() {
        let mut order = order_of(&[3, 1, 0, 2]);
        let old_positions =
            order.remove_indices(&[Range::new(2, usize::MAX), Range::new(1_000, 2_000)]);
        assert_eq!(old_positions, vec![0, 3]);
        assert_eq!(order.as_slice(), &[1, 0]);
        assert_inverse(&order);

        assert!(order.remove_indices(&[Range::new(5, 9)]).is_empty());
        assert_eq!(order.as_slice(), &[1, 0]);
    }

    #[test]
    fn test_insert_indices() {
        let mut order = IndexOrder::identity(Axis::Row, 4);
        let appended = order.insert_indices(Range::single(2));
        assert_eq!(order.as_slice(), &[0, 1, 3, 4, 2]);
        assert_eq!(appended, Range::new(4, 5));
        assert_inverse(&order);
    }

    #[test]
    fn test_reconcile() {
        let mut order = order_of(&[2, 0, 1]);
        assert!(!order.reconcile(3));
        assert!(order.reconcile(2));
        assert_eq!(order.as_slice(), &[0, 1]);
        assert!(order.reconcile(4));
        assert_eq!(order.as_slice(), &[0, 1, 2, 3]);
    }

    #[test_case(&[0, 1, 1], 3 ; "duplicate")]
    #[test_case(&[0, 1, 3], 3 ; "out of range")]
    #[test_case(&[0, 1], 3 ; "too short")]
    fn test_from_order_rejects(indices: &[Index], count: usize) {
        assert!(IndexOrder::from_order(Axis::Column, indices.to_vec(), count, "k").is_err());
    }

    #[test]
    fn test_reset_law() {
        let mut order = order_of(&[3, 1, 0, 2]);
        order.reset(4);
        assert!(order.is_identity());
        for position in 0..4 {
            assert_eq!(order.index_at(position), Some(position));
        }
        assert_eq!(order.index_at(4), None);
        assert_eq!(order.position_of(4), None);
    }
}
