use serde::{Deserialize, Serialize};

/// One tab of a workbook: an ordered list of rows of string cells.
///
/// Addressing is 1-indexed like a spreadsheet. Rows may have different
/// lengths; a cell past the end of its row reads as absent.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new() -> Self {
        Table { rows: Vec::new() }
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Table { rows }
    }

    /// A table holding only the given header row.
    pub fn with_header(header: &[String]) -> Self {
        Table {
            rows: vec![header.to_vec()],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        if row == 0 || col == 0 {
            return None;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .map(String::as_str)
    }

    /// Absent or whitespace-only.
    pub fn is_blank(&self, row: usize, col: usize) -> bool {
        cell_is_blank(self.rows.get(row.wrapping_sub(1)).map(Vec::as_slice), col)
    }

    /// Sets a cell, padding missing rows and cells with empty strings.
    /// Row and column 0 are ignored.
    pub fn set_cell(&mut self, row: usize, col: usize, value: &str) {
        if row == 0 || col == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value.to_string();
    }

    /// Widest row, in cells.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn col_to_letter(col: usize) -> String {
        let mut col = col;
        let mut result = String::new();
        while col > 0 {
            col -= 1;
            result.push(((col % 26) as u8 + b'A') as char);
            col /= 26;
        }
        result.chars().rev().collect()
    }

    pub fn cell_name(row: usize, col: usize) -> String {
        format!("{}{}", Self::col_to_letter(col), row)
    }
}

/// Blank check on a raw row slice; `None` (missing row) counts as blank.
pub fn cell_is_blank(row: Option<&[String]>, col: usize) -> bool {
    if col == 0 {
        return true;
    }
    match row.and_then(|r| r.get(col - 1)) {
        Some(value) => value.trim().is_empty(),
        None => true,
    }
}
