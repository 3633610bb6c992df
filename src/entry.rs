//! Row assignment and email deduplication for new outreach entries.
//!
//! A submission is rejected when its email already appears below the
//! header. Otherwise it goes into the first row whose name, email and
//! reference cells are all blank, or a fresh row after the last one.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{LayoutError, StorageError, SubmitError};
use crate::store::TableStore;
use crate::table::{Table, cell_is_blank};

/// Number of header rows at the top of the table. Never written to.
pub const HEADER_ROWS: usize = 1;

/// The 1-indexed columns a record occupies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordLayout {
    pub name_column: usize,
    pub email_column: usize,
    pub reference_column: usize,
}

impl Default for RecordLayout {
    /// Columns B, C and F.
    fn default() -> Self {
        RecordLayout {
            name_column: 2,
            email_column: 3,
            reference_column: 6,
        }
    }
}

impl RecordLayout {
    /// Columns must be 1-indexed and pairwise distinct.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let cols = self.columns();
        if cols.contains(&0) {
            return Err(LayoutError::ZeroColumn);
        }
        if cols[0] == cols[1] || cols[0] == cols[2] || cols[1] == cols[2] {
            return Err(LayoutError::Overlapping {
                name: cols[0],
                email: cols[1],
                reference: cols[2],
            });
        }
        Ok(())
    }

    fn columns(&self) -> [usize; 3] {
        [self.name_column, self.email_column, self.reference_column]
    }
}

/// Trimmed, lower-cased form used for duplicate checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalized emails of every data row (header excluded).
pub fn existing_emails(rows: &[Vec<String>], layout: &RecordLayout) -> HashSet<String> {
    rows.iter()
        .skip(HEADER_ROWS)
        .filter_map(|row| row.get(layout.email_column.wrapping_sub(1)))
        .map(|email| normalize_email(email))
        .collect()
}

/// 1-indexed row the next record should be written to.
///
/// The first data row with all three record cells blank wins; otherwise
/// the row right after the last one. Row 1 is never returned.
pub fn find_target_row(rows: &[Vec<String>], layout: &RecordLayout) -> usize {
    for (i, row) in rows.iter().enumerate().skip(HEADER_ROWS) {
        if layout
            .columns()
            .iter()
            .all(|&col| cell_is_blank(Some(row.as_slice()), col))
        {
            return i + 1;
        }
    }
    rows.len().max(HEADER_ROWS) + 1
}

/// Writes outreach records into a table, one submission at a time.
///
/// The store sits behind a mutex held for the whole read, check and write
/// sequence, so concurrent callers in this process cannot both claim the
/// same empty row or both slip past the duplicate check.
pub struct EntryWriter<S> {
    store: Mutex<S>,
    layout: RecordLayout,
}

impl<S: TableStore> EntryWriter<S> {
    /// Fails when the layout has a zero column or two fields sharing a
    /// column; either would drop or overwrite part of every record.
    pub fn new(store: S, layout: RecordLayout) -> Result<Self, LayoutError> {
        layout.validate()?;
        Ok(EntryWriter {
            store: Mutex::new(store),
            layout,
        })
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Appends a record and returns the 1-indexed row it landed in.
    ///
    /// Inputs are expected to be trimmed and non-empty; that is checked by
    /// the caller. On any error the table is left untouched, except that a
    /// storage failure in the middle of a backend's per-cell writes cannot
    /// be rolled back.
    pub fn submit(&self, name: &str, email: &str, reference: &str) -> Result<usize, SubmitError> {
        let mut store = self.store.lock().map_err(|_| StorageError::Poisoned)?;
        let location = store.name();

        let rows = store.read_all().map_err(|e| {
            error!("Failed to read {}: {}", location, e);
            e
        })?;

        let wanted = normalize_email(email);
        if existing_emails(&rows, &self.layout).contains(&wanted) {
            warn!("Rejected duplicate email '{}' for {}", wanted, location);
            return Err(SubmitError::DuplicateEmail {
                email: email.trim().to_string(),
            });
        }

        let row = find_target_row(&rows, &self.layout);
        debug!("Scanned {} rows of {}, target row {}", rows.len(), location, row);

        let cells = [
            (self.layout.name_column, name),
            (self.layout.email_column, email),
            (self.layout.reference_column, reference),
        ];
        store.write_cells(row, &cells).map_err(|e| {
            error!("Failed to write row {} of {}: {}", row, location, e);
            e
        })?;

        info!(
            "Recorded entry for '{}' at {} in {}",
            name,
            Table::cell_name(row, self.layout.name_column),
            location
        );
        Ok(row)
    }

    /// Current contents of the table.
    pub fn snapshot(&self) -> Result<Table, StorageError> {
        let mut store = self.store.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(Table::from_rows(store.read_all()?))
    }

    pub fn into_store(self) -> Result<S, StorageError> {
        self.store.into_inner().map_err(|_| StorageError::Poisoned)
    }
}
