// 📄 Card Register Parser - positional CSV export of the regional card sheet
//
// Layout (first two rows are header + sub-header):
//   0: entrepreneur name (or blank)
//   1: region (only on the first row of a regional block)
//   2: corporate card mask     3: personal card mask
//   4: corporate status        5: personal status

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Header and sub-header rows skipped before data
pub const HEADER_ROWS: usize = 2;

// ============================================================================
// CORE TYPES
// ============================================================================

/// One data row of the sheet, cells trimmed, missing cells empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    /// 1-based line in the source file
    pub line_number: usize,

    pub name: String,
    pub region: String,
    pub corp_mask: String,
    pub personal_mask: String,
    pub corp_status: String,
    pub personal_status: String,
}

impl SheetRow {
    /// Build from positional cells (line number 0 until placed in a file)
    pub fn new(cells: [&str; 6]) -> Self {
        SheetRow {
            line_number: 0,
            name: cells[0].trim().to_string(),
            region: cells[1].trim().to_string(),
            corp_mask: cells[2].trim().to_string(),
            personal_mask: cells[3].trim().to_string(),
            corp_status: cells[4].trim().to_string(),
            personal_status: cells[5].trim().to_string(),
        }
    }

    /// Builder: set the source line
    pub fn at_line(mut self, line_number: usize) -> Self {
        self.line_number = line_number;
        self
    }

    pub fn from_record(line_number: usize, record: &StringRecord) -> Self {
        let cell = |i: usize| record.get(i).unwrap_or("");
        SheetRow::new([cell(0), cell(1), cell(2), cell(3), cell(4), cell(5)]).at_line(line_number)
    }
}

/// A row the reader could not decode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        RowError {
            row,
            message: message.into(),
        }
    }
}

// ============================================================================
// READERS
// ============================================================================

/// Read every data row from `reader`. Undecodable records come back as
/// `Err(RowError)` in place so the caller can continue past them.
pub fn read_rows<R: Read>(reader: R) -> Vec<Result<SheetRow, RowError>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();

    for (index, result) in csv_reader.records().enumerate() {
        let fallback_line = index + 1;

        match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line);
                if index < HEADER_ROWS {
                    continue;
                }
                rows.push(Ok(SheetRow::from_record(line, &record)));
            }
            Err(err) => {
                let line = err
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line);
                if index < HEADER_ROWS {
                    continue;
                }
                rows.push(Err(RowError::new(line, format!("unreadable row: {}", err))));
            }
        }
    }

    rows
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
ИП / РЕГИОН,Регион,Корп. карта,Карта ФЛ,Октябрь 2025,
,,,,корп,ФЛ
ИП Ш,Region1,*1111,*2222,status-A,status-B
ИП Т,,*3333,-,status-C,
";

    #[test]
    fn test_skips_two_header_rows() {
        let rows: Vec<SheetRow> = read_rows(SHEET.as_bytes())
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "ИП Ш");
        assert_eq!(rows[0].region, "Region1");
        assert_eq!(rows[0].corp_mask, "*1111");
        assert_eq!(rows[0].personal_status, "status-B");
        assert_eq!(rows[0].line_number, 3);
        assert_eq!(rows[1].line_number, 4);
        assert_eq!(rows[1].personal_mask, "-");
    }

    #[test]
    fn test_ragged_rows_pad_with_empty_cells() {
        let data = "h\nsub\nИП А, Region9 \n\n,,\n";
        let rows: Vec<SheetRow> = read_rows(data.as_bytes())
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(rows[0].name, "ИП А");
        assert_eq!(rows[0].region, "Region9");
        assert_eq!(rows[0].corp_mask, "");
        assert_eq!(rows[0].personal_status, "");
        assert!(rows.iter().skip(1).all(|r| r.name.is_empty()));
    }

    #[test]
    fn test_invalid_utf8_row_is_reported_not_fatal() {
        let mut data = b"h\nsub\n".to_vec();
        data.extend_from_slice(b"\xff\xfe,Region1,*1,,,\n");
        data.extend_from_slice("ИП Б,,*2,,,\n".as_bytes());

        let rows = read_rows(data.as_slice());
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_err());
        assert_eq!(rows[1].as_ref().unwrap().name, "ИП Б");
    }
}
