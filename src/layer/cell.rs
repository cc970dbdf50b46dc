use crate::coordinate::{Index, Position};
use crate::data::CellValue;

/// A cell as seen by one layer: local positions, stable indices, value and
/// the labels accumulated on the way up the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCell {
    pub column_position: Position,
    pub row_position: Position,
    pub column_index: Index,
    pub row_index: Index,
    pub value: CellValue,
    pub labels: Vec<String>,
}

impl LayerCell {
    /// Same cell relocated to another layer's positions.
    #[must_use]
    pub fn at(mut self, column_position: Position, row_position: Position) -> Self {
        self.column_position = column_position;
        self.row_position = row_position;
        self
    }

    /// Add a label unless it is already present.
    pub fn add_label(&mut self, label: &str) {
        if !self.has_label(label) {
            self.labels.push(label.to_string());
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}
