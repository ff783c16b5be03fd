use crate::spreadsheet::cell::Cell;
use std::collections::HashMap;

/// Represents a worksheet read from a workbook, with its cells and drawing reference.
#[derive(Debug)]
pub struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Path of the worksheet part inside the container
    pub(crate) path: String,
    /// All non-empty cells in document order
    pub(crate) cells: Vec<Cell>,
    /// Relationship id of the drawing part attached to this sheet
    pub(crate) drawing_id: Option<String>,
    /// Position of each cell in `cells`, keyed by (row, col)
    positions: HashMap<(usize, usize), usize>,
}

impl Sheet {
    /// Creates an empty sheet.
    pub(crate) fn new(file_name: &str, name: &str, path: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            path: path.to_owned(),
            cells: Vec::new(),
            drawing_id: None,
            positions: HashMap::new(),
        }
    }

    /// Sheet name as shown in the workbook.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a cell to the sheet; a later cell at the same position replaces the earlier one.
    pub(crate) fn push(&mut self, cell: Cell) {
        match self.positions.get(&(cell.row, cell.col)) {
            Some(&index) => self.cells[index] = cell,
            None => {
                self.positions.insert((cell.row, cell.col), self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    /// Looks up the cell at zero-based (row, col).
    pub(crate) fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.positions.get(&(row, col)).map(|&index| &self.cells[index])
    }

    /// Finds the first column, scanning left to right, whose header cell (first row)
    /// equals `title` exactly. Returns the zero-based column index.
    pub fn find_header_column(&self, title: &str) -> Option<usize> {
        self.cells.iter()
            .filter(|cell| cell.row == 0)
            .filter(|cell| cell.to_string() == title)
            .map(|cell| cell.col)
            .min()
    }

    /// Returns the display text of the cell at zero-based (row, col), if present and non-empty.
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.cell(row, col)
            .map(|cell| cell.to_string())
            .filter(|text| !text.is_empty())
    }
}
