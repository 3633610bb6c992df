use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::table::Table;

/// On-disk document: named tabs, each holding one table.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Workbook {
    pub tabs: BTreeMap<String, Table>,
}

impl Workbook {
    pub fn tab(&self, name: &str) -> Result<&Table, StorageError> {
        self.tabs
            .get(name)
            .ok_or_else(|| StorageError::MissingTab(name.to_string()))
    }

    pub fn tab_mut(&mut self, name: &str) -> Result<&mut Table, StorageError> {
        self.tabs
            .get_mut(name)
            .ok_or_else(|| StorageError::MissingTab(name.to_string()))
    }
}

/// Writes the workbook as gzip-compressed bincode.
///
/// The bytes go to a temporary file next to `path` which then replaces
/// `path`, so readers never observe a half-written document.
pub fn save_workbook(workbook: &Workbook, path: &Path) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let encoder = GzEncoder::new(tmp.as_file_mut(), Compression::default());
        let mut writer = std::io::BufWriter::new(encoder);
        serialize_into(&mut writer, workbook)?;
        let encoder = writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))?;
        encoder.finish()?.flush()?;
    }
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

pub fn load_workbook(path: &Path) -> Result<Workbook, StorageError> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut reader = std::io::BufReader::new(decoder);

    let workbook: Workbook = deserialize_from(&mut reader)?;
    Ok(workbook)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.bin.gz");

        let mut table = Table::new();
        table.set_cell(1, 2, "Name");
        table.set_cell(2, 2, "Ann");
        let mut workbook = Workbook::default();
        workbook.tabs.insert("Outreach Data".to_string(), table.clone());

        save_workbook(&workbook, &path).unwrap();
        let loaded = load_workbook(&path).unwrap();
        assert_eq!(loaded.tab("Outreach Data").unwrap(), &table);
    }

    #[test]
    fn missing_tab_is_reported() {
        let workbook = Workbook::default();
        match workbook.tab("nope") {
            Err(StorageError::MissingTab(name)) => assert_eq!(name, "nope"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn garbage_file_is_a_codec_or_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.bin.gz");
        std::fs::write(&path, b"definitely not gzip").unwrap();
        assert!(load_workbook(&path).is_err());
    }
}
