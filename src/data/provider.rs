use std::cell::RefCell;
use std::rc::Rc;

use super::CellValue;
use crate::coordinate::{Axis, Index, Range};
use crate::error::{GridError, Result};

/// Source of cell values addressed by data indices.
pub trait DataProvider {
    fn column_count(&self) -> usize;
    fn row_count(&self) -> usize;

    /// Value at `(column, row)`; `Empty` outside the table.
    fn data_value(&self, column: Index, row: Index) -> CellValue;

    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.column_count(),
            Axis::Row => self.row_count(),
        }
    }
}

/// Row-major in-memory table.
///
/// Mutations go through `&self` so the provider can be shared with the data
/// layer; announce shape changes with
/// [`DataLayer::notify_inserted`](super::DataLayer::notify_inserted) and
/// friends afterwards.
#[derive(Debug, Default)]
pub struct VecDataProvider {
    table: RefCell<Table>,
}

#[derive(Debug, Default)]
struct Table {
    columns: usize,
    rows: Vec<Vec<CellValue>>,
}

impl VecDataProvider {
    /// Empty table of the given shape.
    pub fn new(column_count: usize, row_count: usize) -> Self {
        Self {
            table: RefCell::new(Table {
                columns: column_count,
                rows: vec![vec![CellValue::Empty; column_count]; row_count],
            }),
        }
    }

    /// Table from rows; short rows are padded with empty cells.
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns, CellValue::Empty);
                row
            })
            .collect();
        Self {
            table: RefCell::new(Table { columns, rows }),
        }
    }

    /// Table whose cells are `"<column>,<row>"` strings.
    pub fn with_coordinates(column_count: usize, row_count: usize) -> Self {
        let rows = (0..row_count)
            .map(|row| {
                (0..column_count)
                    .map(|column| CellValue::Text(format!("{column},{row}")))
                    .collect()
            })
            .collect();
        Self::from_rows(rows)
    }

    /// # Errors
    /// Returns [`GridError::PositionOutOfRange`] outside the table.
    pub fn set_value(&self, column: Index, row: Index, value: CellValue) -> Result<()> {
        let mut table = self.table.borrow_mut();
        let columns = table.columns;
        let row_count = table.rows.len();
        let cells = table.rows.get_mut(row).ok_or(GridError::PositionOutOfRange {
            axis: Axis::Row,
            position: row,
            count: row_count,
        })?;
        let cell = cells.get_mut(column).ok_or(GridError::PositionOutOfRange {
            axis: Axis::Column,
            position: column,
            count: columns,
        })?;
        *cell = value;
        Ok(())
    }

    /// Insert `count` empty rows before `at`; returns the inserted range.
    ///
    /// # Errors
    /// Returns [`GridError::TargetOutOfRange`] when `at` is beyond the end.
    pub fn insert_rows(&self, at: Index, count: usize) -> Result<Range> {
        let mut table = self.table.borrow_mut();
        check_slot(Axis::Row, at, table.rows.len())?;
        let blank = vec![CellValue::Empty; table.columns];
        for _ in 0..count {
            table.rows.insert(at, blank.clone());
        }
        Ok(Range::new(at, at + count))
    }

    /// # Errors
    /// Returns [`GridError::PositionOutOfRange`] when the range exceeds the table.
    pub fn remove_rows(&self, range: Range) -> Result<()> {
        let mut table = self.table.borrow_mut();
        check_range(Axis::Row, range, table.rows.len())?;
        table.rows.drain(range.iter());
        Ok(())
    }

    /// Insert `count` empty columns before `at`; returns the inserted range.
    ///
    /// # Errors
    /// Returns [`GridError::TargetOutOfRange`] when `at` is beyond the end.
    pub fn insert_columns(&self, at: Index, count: usize) -> Result<Range> {
        let mut table = self.table.borrow_mut();
        check_slot(Axis::Column, at, table.columns)?;
        for row in &mut table.rows {
            for _ in 0..count {
                row.insert(at, CellValue::Empty);
            }
        }
        table.columns += count;
        Ok(Range::new(at, at + count))
    }

    /// # Errors
    /// Returns [`GridError::PositionOutOfRange`] when the range exceeds the table.
    pub fn remove_columns(&self, range: Range) -> Result<()> {
        let mut table = self.table.borrow_mut();
        check_range(Axis::Column, range, table.columns)?;
        for row in &mut table.rows {
            row.drain(range.iter());
        }
        table.columns -= range.len();
        Ok(())
    }
}

fn check_slot(axis: Axis, at: Index, count: usize) -> Result<()> {
    if at > count {
        return Err(GridError::TargetOutOfRange {
            axis,
            target: at,
            count,
        });
    }
    Ok(())
}

fn check_range(axis: Axis, range: Range, count: usize) -> Result<()> {
    if range.end > count {
        return Err(GridError::PositionOutOfRange {
            axis,
            position: range.end - 1,
            count,
        });
    }
    Ok(())
}

impl DataProvider for VecDataProvider {
    fn column_count(&self) -> usize {
        self.table.borrow().columns
    }

    fn row_count(&self) -> usize {
        self.table.borrow().rows.len()
    }

    fn data_value(&self, column: Index, row: Index) -> CellValue {
        self.table
            .borrow()
            .rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .cloned()
            .unwrap_or_default()
    }
}

/// Convert a 0-based column index to spreadsheet letters (A, B, ..., Z, AA, AB, ...)
pub fn column_letter(column: Index) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        n -= 1;
        letters.push(LETTERS.get(n % 26).copied().unwrap_or('?'));
        n /= 26;
    }
    letters.iter().rev().collect()
}

const LETTERS: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

enum HeaderLabels {
    Fixed(Vec<String>),
    Letters(Rc<dyn DataProvider>),
}

/// Single-row provider of column header labels.
pub struct ColumnHeaderDataProvider {
    labels: HeaderLabels,
}

impl ColumnHeaderDataProvider {
    /// Fixed labels, one per body column index.
    pub fn with_labels(labels: Vec<String>) -> Self {
        Self {
            labels: HeaderLabels::Fixed(labels),
        }
    }

    /// Spreadsheet letters following the body's column count.
    pub fn letters(body: Rc<dyn DataProvider>) -> Self {
        Self {
            labels: HeaderLabels::Letters(body),
        }
    }
}

impl DataProvider for ColumnHeaderDataProvider {
    fn column_count(&self) -> usize {
        match &self.labels {
            HeaderLabels::Fixed(labels) => labels.len(),
            HeaderLabels::Letters(body) => body.column_count(),
        }
    }

    fn row_count(&self) -> usize {
        1
    }

    fn data_value(&self, column: Index, row: Index) -> CellValue {
        if row != 0 || column >= self.column_count() {
            return CellValue::Empty;
        }
        match &self.labels {
            HeaderLabels::Fixed(labels) => labels
                .get(column)
                .map_or(CellValue::Empty, |label| CellValue::Text(label.clone())),
            HeaderLabels::Letters(_) => CellValue::Text(column_letter(column)),
        }
    }
}

/// Single-column provider of 1-based row numbers.
pub struct RowHeaderDataProvider {
    body: Rc<dyn DataProvider>,
}

impl RowHeaderDataProvider {
    pub fn new(body: Rc<dyn DataProvider>) -> Self {
        Self { body }
    }
}

impl DataProvider for RowHeaderDataProvider {
    fn column_count(&self) -> usize {
        1
    }

    fn row_count(&self) -> usize {
        self.body.row_count()
    }

    fn data_value(&self, column: Index, row: Index) -> CellValue {
        if column != 0 || row >= self.row_count() {
            return CellValue::Empty;
        }
        CellValue::Text((row + 1).to_string())
    }
}

/// Empty block filling the corner between the headers.
#[derive(Debug, Clone, Copy)]
pub struct CornerDataProvider {
    columns: usize,
    rows: usize,
}

impl CornerDataProvider {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self { columns, rows }
    }
}

impl DataProvider for CornerDataProvider {
    fn column_count(&self) -> usize {
        self.columns
    }

    fn row_count(&self) -> usize {
        self.rows
    }

    fn data_value(&self, _column: Index, _row: Index) -> CellValue {
        CellValue::Empty
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, "A")]
    #[test_case(25, "Z")]
    #[test_case(26, "AA")]
    #[test_case(701, "ZZ")]
    #[test_case(702, "AAA")]
    fn test_column_letter(column: Index, expected: &str) {
        assert_eq!(column_letter(column), expected);
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let provider = VecDataProvider::from_rows(vec![
            vec!["a".into(), "b".into()],
            vec!["c".into()],
        ]);
        assert_eq!(provider.column_count(), 2);
        assert_eq!(provider.data_value(1, 1), CellValue::Empty);
        assert_eq!(provider.data_value(9, 9), CellValue::Empty);
    }

    #[test]
    fn test_insert_and_remove_rows() {
        let provider = VecDataProvider::with_coordinates(2, 3);
        let inserted = provider.insert_rows(1, 2).unwrap();
        assert_eq!(inserted, Range::new(1, 3));
        assert_eq!(provider.row_count(), 5);
        assert_eq!(provider.data_value(0, 3), CellValue::from("0,1"));

        provider.remove_rows(Range::new(0, 3)).unwrap();
        assert_eq!(provider.row_count(), 2);
        assert_eq!(provider.data_value(1, 0), CellValue::from("1,1"));
        assert!(provider.remove_rows(Range::new(1, 5)).is_err());
        assert!(provider.insert_rows(3, 1).is_err());
    }

    #[test]
    fn test_insert_and_remove_columns() {
        let provider = VecDataProvider::with_coordinates(3, 1);
        provider.insert_columns(3, 1).unwrap();
        assert_eq!(provider.column_count(), 4);
        assert_eq!(provider.data_value(3, 0), CellValue::Empty);
        provider.remove_columns(Range::new(0, 1)).unwrap();
        assert_eq!(provider.data_value(0, 0), CellValue::from("1,0"));
        assert_eq!(provider.column_count(), 3);
    }

    #[test]
    fn test_set_value_out_of_range() {
        let provider = VecDataProvider::new(2, 2);
        provider.set_value(1, 1, 4.5.into()).unwrap();
        assert_eq!(provider.data_value(1, 1), CellValue::Number(4.5));
        assert!(provider.set_value(2, 0, true.into()).is_err());
    }

    #[test]
    fn test_header_providers_follow_body() {
        let body: Rc<VecDataProvider> = Rc::new(VecDataProvider::new(3, 4));
        let shared: Rc<dyn DataProvider> = Rc::clone(&body) as Rc<dyn DataProvider>;
        let columns = ColumnHeaderDataProvider::letters(Rc::clone(&shared));
        let rows = RowHeaderDataProvider::new(shared);
        assert_eq!(columns.data_value(2, 0), CellValue::from("C"));
        assert_eq!(rows.data_value(0, 3), CellValue::from("4"));

        body.insert_columns(0, 1).unwrap();
        assert_eq!(columns.column_count(), 4);
        assert_eq!(columns.data_value(3, 0), CellValue::from("D"));
    }
}
