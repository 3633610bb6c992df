use crate::error::StorageError;
use crate::table::Table;
use std::fs;
use std::path::Path;

/// Load a table from a CSV file
///
/// Every line becomes a row, including the first (which is expected to
/// be the header). Quoted fields may contain commas, doubled quotes and
/// line breaks.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `Result<Table, StorageError>` - The loaded table or an error
///
/// # Examples
/// ```no_run
/// use outreach::loader::from_csv;
///
/// match from_csv("seed.csv") {
///     Ok(table) => println!("Loaded {} rows", table.row_count()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Table, StorageError> {
    let contents = fs::read_to_string(filepath)?;
    parse_csv(&contents)
}

/// Parse CSV text into a table.
pub fn parse_csv(contents: &str) -> Result<Table, StorageError> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            '"' => {
                return Err(StorageError::Csv {
                    line,
                    message: "unexpected quote inside an unquoted field".to_string(),
                });
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(StorageError::Csv {
            line,
            message: "unterminated quoted field".to_string(),
        });
    }

    // Last line without a trailing newline
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    Ok(Table::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_rows() {
        let table = parse_csv("a,b,c\n1,2,3\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(2, 3), Some("3"));
    }

    #[test]
    fn parses_quoted_fields() {
        let table = parse_csv("h\r\n\"x, y\",\"say \"\"hi\"\"\",\"two\nlines\"").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(2, 1), Some("x, y"));
        assert_eq!(table.cell(2, 2), Some("say \"hi\""));
        assert_eq!(table.cell(2, 3), Some("two\nlines"));
    }

    #[test]
    fn keeps_empty_cells_and_blank_lines() {
        let table = parse_csv("h1,h2\n,,\n\nx,y\n").unwrap();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.rows[1], vec!["", "", ""]);
        assert_eq!(table.rows[2], vec![""]);
    }

    #[test]
    fn rejects_unterminated_quote() {
        match parse_csv("a\n\"open") {
            Err(StorageError::Csv { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
