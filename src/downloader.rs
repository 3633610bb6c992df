use crate::table::Table;

/// Convert a table to CSV format
///
/// Rows are written as they are stored, header included. Short rows are
/// not padded. Fields containing a comma, quote or line break are quoted
/// and their quotes doubled.
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use outreach::table::Table;
/// use outreach::downloader::to_csv;
///
/// let mut table = Table::new();
/// table.set_cell(1, 1, "Name");
/// table.set_cell(1, 2, "Note, with comma");
/// assert_eq!(to_csv(&table), "Name,\"Note, with comma\"\n");
/// ```
pub fn to_csv(table: &Table) -> String {
    let mut csv_content = String::new();

    for row in &table.rows {
        for (c, value) in row.iter().enumerate() {
            if c > 0 {
                csv_content.push(',');
            }
            if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
                let escaped = value.replace('"', "\"\"");
                csv_content.push_str(&format!("\"{}\"", escaped));
            } else {
                csv_content.push_str(value);
            }
        }
        csv_content.push('\n');
    }

    csv_content
}
