use thiserror::Error;

/// Failures raised by a [`TableStore`](crate::store::TableStore) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook could not be decoded: {0}")]
    Codec(#[from] bincode::Error),

    #[error("malformed CSV at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("tab '{0}' does not exist in the workbook")]
    MissingTab(String),

    #[error("table lock was poisoned by a panicked writer")]
    Poisoned,

    #[error("cell address row {row}, column {col} is outside the sheet (1-indexed)")]
    InvalidAddress { row: usize, col: usize },
}

/// A record layout that would lose or overwrite data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("record columns are 1-indexed; 0 is not a column")]
    ZeroColumn,

    #[error("record columns must be distinct (name={name}, email={email}, reference={reference})")]
    Overlapping {
        name: usize,
        email: usize,
        reference: usize,
    },
}

/// Outcome of a rejected or failed submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The email is already present in the table. Nothing was written.
    #[error("email '{email}' already exists in the sheet")]
    DuplicateEmail { email: String },

    /// The table could not be read or written. Not retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
}

impl SubmitError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, SubmitError::DuplicateEmail { .. })
    }
}
