//! Tabular storage backends the entry writer reads from and writes to.
//!
//! A backend addresses one named tab inside a named document and exposes
//! two operations: read every row, and write a value at a 1-indexed
//! (row, column) position.

use log::{debug, info};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::loader;
use crate::saving::{self, Workbook};
use crate::table::Table;

pub trait TableStore {
    /// Every row of the tab, in order, header first.
    fn read_all(&mut self) -> Result<Vec<Vec<String>>, StorageError>;

    fn write_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), StorageError>;

    /// Writes several cells of one row. Backends that can apply the batch
    /// in a single step should override this.
    fn write_cells(&mut self, row: usize, cells: &[(usize, &str)]) -> Result<(), StorageError> {
        for (col, value) in cells {
            self.write_cell(row, *col, value)?;
        }
        Ok(())
    }

    /// Human readable location, for logs.
    fn name(&self) -> String;
}

/// Rows and columns start at 1; anything else is rejected rather than
/// silently dropped.
fn check_address(row: usize, col: usize) -> Result<(), StorageError> {
    if row == 0 || col == 0 {
        return Err(StorageError::InvalidAddress { row, col });
    }
    Ok(())
}

impl<T: TableStore + ?Sized> TableStore for Box<T> {
    fn read_all(&mut self) -> Result<Vec<Vec<String>>, StorageError> {
        (**self).read_all()
    }

    fn write_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), StorageError> {
        (**self).write_cell(row, col, value)
    }

    fn write_cells(&mut self, row: usize, cells: &[(usize, &str)]) -> Result<(), StorageError> {
        (**self).write_cells(row, cells)
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

/// A table kept in process memory. Lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Table,
}

impl MemoryStore {
    pub fn new(table: Table) -> Self {
        MemoryStore { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}

impl TableStore for MemoryStore {
    fn read_all(&mut self) -> Result<Vec<Vec<String>>, StorageError> {
        Ok(self.table.rows.clone())
    }

    fn write_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), StorageError> {
        check_address(row, col)?;
        self.table.set_cell(row, col, value);
        Ok(())
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}

/// A tab inside a gzip-compressed bincode workbook on disk.
///
/// The document is reloaded for every read and every write, so edits made
/// to the file by other tools between submissions are picked up.
#[derive(Debug, Clone)]
pub struct FileStore {
    document: PathBuf,
    tab: String,
}

impl FileStore {
    /// Opens `tab` in `document`, creating the document and the tab with
    /// `header` as row 1 when either is missing.
    pub fn open(document: impl AsRef<Path>, tab: &str, header: &[String]) -> Result<Self, StorageError> {
        Self::open_with_seed(document, tab, header, None)
    }

    /// Like [`FileStore::open`], but a brand new tab is filled from the
    /// CSV file at `seed_csv` (header row included) instead of `header`.
    pub fn open_with_seed(
        document: impl AsRef<Path>,
        tab: &str,
        header: &[String],
        seed_csv: Option<&Path>,
    ) -> Result<Self, StorageError> {
        let document = document.as_ref().to_path_buf();
        if let Some(parent) = document.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent)?;
            }
        }

        let mut workbook = if document.exists() {
            saving::load_workbook(&document)?
        } else {
            Workbook::default()
        };

        if !workbook.tabs.contains_key(tab) {
            let table = match seed_csv {
                Some(csv) => {
                    info!("Seeding tab '{}' from {}", tab, csv.display());
                    loader::from_csv(csv)?
                }
                None => Table::with_header(header),
            };
            workbook.tabs.insert(tab.to_string(), table);
            saving::save_workbook(&workbook, &document)?;
            info!("Created tab '{}' in {}", tab, document.display());
        }

        Ok(FileStore {
            document,
            tab: tab.to_string(),
        })
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    pub fn tab(&self) -> &str {
        &self.tab
    }

    fn load(&self) -> Result<Workbook, StorageError> {
        saving::load_workbook(&self.document)
    }
}

impl TableStore for FileStore {
    fn read_all(&mut self) -> Result<Vec<Vec<String>>, StorageError> {
        let workbook = self.load()?;
        Ok(workbook.tab(&self.tab)?.rows.clone())
    }

    fn write_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), StorageError> {
        self.write_cells(row, &[(col, value)])
    }

    fn write_cells(&mut self, row: usize, cells: &[(usize, &str)]) -> Result<(), StorageError> {
        for (col, _) in cells {
            check_address(row, *col)?;
        }
        let mut workbook = self.load()?;
        let table = workbook.tab_mut(&self.tab)?;
        for (col, value) in cells {
            table.set_cell(row, *col, value);
        }
        saving::save_workbook(&workbook, &self.document)?;
        debug!("Wrote {} cells to row {} of {}", cells.len(), row, self.name());
        Ok(())
    }

    fn name(&self) -> String {
        format!("{}#{}", self.document.display(), self.tab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        ["", "Name", "Email"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn open_creates_document_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("book.bin.gz");

        let mut store = FileStore::open(&path, "Outreach Data", &header()).unwrap();
        assert!(path.exists());
        assert_eq!(store.read_all().unwrap(), vec![header()]);
    }

    #[test]
    fn batch_write_is_visible_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.bin.gz");

        let mut store = FileStore::open(&path, "Outreach Data", &header()).unwrap();
        store.write_cells(2, &[(2, "Ann"), (3, "ann@example.com")]).unwrap();

        let mut reopened = FileStore::open(&path, "Outreach Data", &[]).unwrap();
        let rows = reopened.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["", "Ann", "ann@example.com"]);
    }

    #[test]
    fn second_tab_leaves_first_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.bin.gz");

        let mut first = FileStore::open(&path, "One", &header()).unwrap();
        first.write_cell(2, 2, "kept").unwrap();
        let mut second = FileStore::open(&path, "Two", &header()).unwrap();
        second.write_cell(2, 2, "other").unwrap();

        assert_eq!(first.read_all().unwrap()[1][1], "kept");
        assert_eq!(second.read_all().unwrap()[1][1], "other");
    }

    #[test]
    fn seed_csv_fills_a_new_tab() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("seed.csv");
        std::fs::write(&csv, ",Name,Email\n,Bo,bo@example.com\n").unwrap();
        let path = dir.path().join("book.bin.gz");

        let mut store = FileStore::open_with_seed(&path, "Seeded", &header(), Some(&csv)).unwrap();
        let rows = store.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][2], "bo@example.com");
    }

    #[test]
    fn memory_store_writes_in_place() {
        let mut store = MemoryStore::new(Table::with_header(&header()));
        store.write_cells(3, &[(1, "x")]).unwrap();
        assert_eq!(store.table().row_count(), 3);
        assert_eq!(store.table().cell(3, 1), Some("x"));
    }

    #[test]
    fn column_zero_is_an_error_not_a_no_op() {
        let mut memory = MemoryStore::new(Table::with_header(&header()));
        assert!(matches!(
            memory.write_cell(2, 0, "lost"),
            Err(StorageError::InvalidAddress { row: 2, col: 0 })
        ));
        assert_eq!(memory.table().row_count(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.bin.gz");
        let mut file = FileStore::open(&path, "Outreach Data", &header()).unwrap();
        let err = file.write_cells(2, &[(2, "Ann"), (0, "lost")]).unwrap_err();
        assert!(matches!(err, StorageError::InvalidAddress { row: 2, col: 0 }));
        assert_eq!(file.read_all().unwrap(), vec![header()]);
    }
}
