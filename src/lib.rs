/*!
# Outreach Submission Form

A small web form that records outreach entries (submitter name, client
email, reference message) as rows of a shared table.

## Overview

Each submission is appended to one tab of a workbook. An email that is
already in the table is rejected. Rows left blank by manual edits are
reused before the table grows, so the sheet stays compact.

## Architecture

### Core
- **Entry Writer** - duplicate check and row placement for new entries
- **Table** - rows of string cells with 1-indexed addressing
- **Storage** - `TableStore` backends: in-memory, or a gzip + bincode
  workbook on disk

### Collaborators
- **Name memory** - remembers the last submitter name (query string,
  file, process-wide value or per-session cookie)
- **Form** - axum routes rendering the form and accepting submissions
  (feature `web`)
- **CSV** - seeding a tab from CSV and exporting it

## Record layout

By default a record occupies columns B (name), C (email) and F
(reference). Row 1 is the header and is never written.

## Routes

- `GET /` - the form, prefilled with the remembered name
- `POST /submit` - record an entry and redirect back with the outcome
- `GET /export.csv` - download the tab as CSV
*/

pub mod config;
pub mod downloader;
pub mod entry;
pub mod error;
pub mod loader;
pub mod memory;
pub mod saving;
pub mod store;
pub mod table;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the types most callers need
pub use config::Config;
pub use entry::{EntryWriter, RecordLayout};
pub use error::{LayoutError, StorageError, SubmitError};
pub use memory::NameMemory;
pub use store::{FileStore, MemoryStore, TableStore};
pub use table::Table;
