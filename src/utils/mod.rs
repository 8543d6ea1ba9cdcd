//! Utility functions and helpers.

pub mod http;
pub mod log;

/// Spreadsheet column letter for a 1-based column index (`1 -> A`, `27 -> AA`).
pub fn column_letter(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = ((index - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 notation covering a whole grid, e.g. `A1:J1000`.
pub fn a1_range(columns: u32, rows: u32) -> String {
    format!("A1:{}{}", column_letter(columns.max(1)), rows.max(1))
}

/// Quote a worksheet title for use inside an A1 range.
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}
