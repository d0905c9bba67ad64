use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use crate::error::DentiError;
use crate::model::OutputValue;
use crate::report::ReportSheet;

pub const MIN_COLUMN_WIDTH: usize = 10;
pub const MAX_COLUMN_WIDTH: usize = 60;

/// Render one sheet to xlsx bytes.
pub fn write_report(sheet: &ReportSheet) -> Result<Vec<u8>, DentiError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(&sheet.name))?;

    let bold = Format::new().set_bold();
    let date_format = Format::new().set_num_format("dd/mm/yyyy");

    let mut row: u32 = 0;
    if let Some(banner) = &sheet.banner {
        worksheet.write_string_with_format(row, 0, banner, &bold)?;
        row += 1;
    }

    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(row, col as u16, header, &bold)?;
    }
    row += 1;

    for values in &sheet.rows {
        for (col, value) in values.iter().enumerate() {
            write_value(worksheet, row, col as u16, value, &date_format)?;
        }
        row += 1;
    }

    for (col, width) in column_widths(sheet).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    tracing::debug!(sheet = %sheet.name, rows = sheet.rows.len(), "wrote report");
    Ok(workbook.save_to_buffer()?)
}

fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &OutputValue,
    date_format: &Format,
) -> Result<(), DentiError> {
    match value {
        OutputValue::Blank => {}
        OutputValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        OutputValue::Number(d) => match d.to_f64() {
            Some(n) => {
                worksheet.write_number(row, col, n)?;
            }
            None => {
                worksheet.write_string(row, col, d.to_string())?;
            }
        },
        OutputValue::Integer(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        OutputValue::Date(d) => {
            let excel = ExcelDateTime::from_ymd(d.year() as u16, d.month() as u8, d.day() as u8)?;
            worksheet.write_datetime_with_format(row, col, &excel, date_format)?;
        }
    }
    Ok(())
}

/// `clamp(longest text + 2, 10, 60)` per column, over the header and data
/// rows. The banner spans columns and does not count.
pub fn column_widths(sheet: &ReportSheet) -> Vec<usize> {
    let columns = sheet
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(sheet.headers.len()))
        .max()
        .unwrap_or(0);

    (0..columns)
        .map(|col| {
            let header_len = sheet.headers.get(col).map_or(0, |h| h.chars().count());
            let longest = sheet
                .rows
                .iter()
                .filter_map(|r| r.get(col))
                .map(|v| v.to_string().chars().count())
                .fold(header_len, usize::max);
            (longest + 2).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Excel sheet names: at most 31 characters, none of `[]:*?/\`.
fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Hoja1".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn read_back(bytes: Vec<u8>) -> calamine::Range<Data> {
        let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        workbook.worksheet_range_at(0).unwrap().unwrap()
    }

    fn sample() -> ReportSheet {
        let mut sheet = ReportSheet::new("Citas", &["Conse", "Paciente", "Fecha cita"]);
        sheet.rows.push(vec![
            OutputValue::Integer(1),
            OutputValue::text("ANA RUIZ"),
            OutputValue::Date(NaiveDate::from_ymd_opt(2023, 1, 5).unwrap()),
        ]);
        sheet.rows.push(vec![
            OutputValue::Integer(2),
            OutputValue::Number(dec!(1234.56)),
            OutputValue::Blank,
        ]);
        sheet
    }

    #[test]
    fn test_header_then_rows() {
        let range = read_back(write_report(&sample()).unwrap());
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Conse".into())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(1.0)));
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("ANA RUIZ".into())));
        assert_eq!(range.get_value((2, 1)), Some(&Data::Float(1234.56)));
        match range.get_value((1, 2)) {
            Some(Data::DateTime(dt)) => assert_eq!(dt.as_f64(), 44931.0),
            other => panic!("expected a date cell, got {other:?}"),
        }
    }

    #[test]
    fn test_banner_shifts_header_down() {
        let mut sheet = sample();
        sheet.banner = Some("REPORTE DE CITAS CANCELADAS".into());
        let range = read_back(write_report(&sheet).unwrap());
        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String("REPORTE DE CITAS CANCELADAS".into()))
        );
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("Paciente".into())));
        assert_eq!(range.get_value((2, 1)), Some(&Data::String("ANA RUIZ".into())));
    }

    #[test]
    fn test_column_widths_are_clamped() {
        let mut sheet = ReportSheet::new("x", &["A", "Observaciones"]);
        sheet.rows.push(vec![OutputValue::Blank, OutputValue::text("x".repeat(80))]);
        sheet.banner = Some("y".repeat(100));
        assert_eq!(column_widths(&sheet), vec![10, 60]);

        let short = ReportSheet::new("x", &["Observaciones"]);
        assert_eq!(column_widths(&short), vec![15]);
    }

    #[test]
    fn test_sheet_name_sanitized() {
        assert_eq!(sheet_name("a/b?"), "a_b_");
        assert_eq!(sheet_name(""), "Hoja1");
        assert_eq!(sheet_name(&"z".repeat(40)).len(), 31);
    }
}
