use std::io::Cursor;

use calamine::{Data, Reader};
use chrono::NaiveDateTime;

use crate::error::DentiError;
use crate::model::{Cell, RawRow};
use crate::parsing::values::serial_to_datetime;

/// Read the first worksheet of an xls/xlsx workbook into positional rows.
///
/// Row and column indexes are absolute: a sheet whose used range starts at
/// C3 still yields column C at index 2 and row 3 at index 2.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<RawRow>, DentiError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| DentiError::SpreadsheetRead(format!("failed to open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DentiError::SpreadsheetRead("workbook has no sheets".into()))?
        .map_err(|e| DentiError::SpreadsheetRead(format!("failed to read first sheet: {e}")))?;

    let Some((start_row, start_col)) = range.start() else {
        return Ok(Vec::new());
    };

    let mut rows: Vec<RawRow> = (0..start_row).map(|_| RawRow::default()).collect();
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(to_cell));
        rows.push(RawRow::new(cells));
    }

    tracing::debug!(rows = rows.len(), "read first sheet");
    Ok(rows)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => Cell::Number(dt.as_f64()),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso(s).map(Cell::Date).unwrap_or_else(|| Cell::text(s.as_str())),
        Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(_) => Cell::Empty,
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn xlsx_with(cells: &[(u32, u16, &str)]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for &(r, c, text) in cells {
            sheet.write_string(r, c, text).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_offset_range_keeps_absolute_positions() {
        let bytes = xlsx_with(&[(2, 2, "DR. X"), (3, 3, "ANA RUIZ")]);
        let rows = read_first_sheet(&bytes).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_blank());
        assert_eq!(rows[2].cell(2).text_form(), "DR. X");
        assert_eq!(rows[3].cell(3).text_form(), "ANA RUIZ");
    }

    #[test]
    fn test_numbers_and_dates() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let fmt = rust_xlsxwriter::Format::new().set_num_format("dd/mm/yyyy");
        let date = rust_xlsxwriter::ExcelDateTime::from_ymd(2023, 1, 5).unwrap();
        sheet.write_datetime_with_format(0, 0, &date, &fmt).unwrap();
        sheet.write_number(0, 1, 3001234567.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = read_first_sheet(&bytes).unwrap();
        assert_eq!(rows[0].cell(0).text_form(), "05/01/2023");
        assert_eq!(rows[0].cell(1), &Cell::Number(3001234567.0));
    }

    #[test]
    fn test_garbage_is_an_error() {
        let err = read_first_sheet(b"not a workbook").unwrap_err();
        assert!(matches!(err, DentiError::SpreadsheetRead(_)));
    }
}
