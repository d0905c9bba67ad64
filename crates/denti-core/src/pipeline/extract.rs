use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::extraction::table::{find_tables, line_to_row};
use crate::extraction::{OcrEngine, PdfExtractor};
use crate::model::{Cell, DocumentIdentity, InputFile, OutputValue, ParseOutcome, RawRow};
use crate::parsing::identity::{advance, IdentityState, IdentityStep};
use crate::parsing::values::{looks_numeric, parse_number};
use crate::report::ReportSheet;

pub const PDF_EXTENSION: &str = ".pdf";
pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".tif", ".tiff"];

/// The sheet always has at least `Col1..Col5`.
pub const MIN_DATA_COLUMNS: usize = 5;

pub const SHEET_NAME: &str = "Datos de PDF";

/// One accepted data row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedRecord {
    pub conse: u64,
    pub identity: Option<DocumentIdentity>,
    pub cells: Vec<OutputValue>,
    pub source_file: String,
}

/// One output line of the extraction sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExtractRow {
    Record(ExtractedRecord),
    /// A per-file problem or note, shown in the first data column.
    Marker { source_file: String, message: String },
    /// Blank row after each source table.
    Separator,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractSummary {
    /// Files whose content could be read (PDF text or OCR).
    pub files_processed: usize,
    pub files_failed: usize,
    pub files_unsupported: usize,
    pub tables_found: usize,
    pub rows_added: usize,
}

/// Run every input file through extraction and the identity fold, in input
/// order. Problems with a single file become marker rows; nothing here fails
/// the batch.
pub fn extract_rows(
    files: &[InputFile],
    extractor: &dyn PdfExtractor,
    ocr: &dyn OcrEngine,
) -> (Vec<ExtractRow>, ExtractSummary) {
    let mut out = Vec::new();
    let mut summary = ExtractSummary::default();
    let mut conse = 0u64;

    for file in files {
        let ext = file.extension();
        let tables: Vec<Vec<RawRow>> = if ext == PDF_EXTENSION {
            match extractor.extract_pages(&file.bytes) {
                Ok(pages) => find_tables(&pages).into_iter().map(|t| t.rows).collect(),
                Err(e) => {
                    warn!(file = %file.name, backend = extractor.backend_name(), error = %e, "PDF could not be read");
                    summary.files_failed += 1;
                    out.push(marker(file, format!("ERROR PDF: {e}")));
                    continue;
                }
            }
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            match ocr.recognize(&file.bytes, &ext) {
                Ok(text) => vec![text.lines().map(line_to_row).collect::<Vec<_>>()],
                Err(e) => {
                    warn!(file = %file.name, backend = ocr.backend_name(), error = %e, "OCR failed");
                    summary.files_failed += 1;
                    out.push(marker(file, format!("ERROR OCR: {e}")));
                    continue;
                }
            }
        } else {
            warn!(file = %file.name, extension = %ext, "unsupported file type");
            summary.files_unsupported += 1;
            out.push(marker(file, format!("Formato no soportado: {ext}")));
            continue;
        };

        summary.files_processed += 1;
        summary.tables_found += tables.len();

        let before = summary.rows_added;
        let mut state = IdentityState::default();
        for table in tables {
            for row in table {
                if row.is_blank() {
                    continue;
                }
                let (next, step) = advance(state, &row);
                state = next;
                match step {
                    IdentityStep::Header => {
                        debug!(file = %file.name, identity = ?state.current, "identity line");
                    }
                    IdentityStep::Data(identity) => {
                        conse += 1;
                        summary.rows_added += 1;
                        out.push(ExtractRow::Record(ExtractedRecord {
                            conse,
                            identity,
                            cells: normalize_row(&row),
                            source_file: file.name.clone(),
                        }));
                    }
                }
            }
            out.push(ExtractRow::Separator);
        }

        let added = summary.rows_added - before;
        if added == 0 {
            out.push(marker(file, format!("Sin resultados: {}", file.name)));
        }
        info!(file = %file.name, rows = added, "file extracted");
    }

    info!(
        processed = summary.files_processed,
        failed = summary.files_failed,
        unsupported = summary.files_unsupported,
        rows = summary.rows_added,
        "extraction complete"
    );
    (out, summary)
}

fn marker(file: &InputFile, message: String) -> ExtractRow {
    ExtractRow::Marker {
        source_file: file.name.clone(),
        message,
    }
}

/// Numeric-looking text becomes a number; everything else stays as text.
pub fn normalize_cell(cell: &Cell) -> OutputValue {
    match cell {
        Cell::Empty => OutputValue::Blank,
        Cell::Text(s) if looks_numeric(s) => match parse_number(s) {
            ParseOutcome::Parsed(d) => OutputValue::Number(d),
            _ => OutputValue::text(s.trim()),
        },
        Cell::Number(n) => Decimal::try_from(*n)
            .map(OutputValue::Number)
            .unwrap_or_else(|_| OutputValue::text(cell.text_form())),
        Cell::Date(dt) => OutputValue::Date(dt.date()),
        _ => OutputValue::text(cell.text_form()),
    }
}

fn normalize_row(row: &RawRow) -> Vec<OutputValue> {
    row.cells().iter().map(normalize_cell).collect()
}

/// Lay the extracted rows out as `Conse, TipoDoc, NumDoc, Nombre,
/// Col1..ColN, ArchivoOrigen`, with N wide enough for the longest row.
pub fn build_sheet(rows: &[ExtractRow]) -> ReportSheet {
    let data_columns = rows
        .iter()
        .filter_map(|r| match r {
            ExtractRow::Record(rec) => Some(rec.cells.len()),
            _ => None,
        })
        .max()
        .unwrap_or(0)
        .max(MIN_DATA_COLUMNS);

    let mut headers: Vec<String> = ["Conse", "TipoDoc", "NumDoc", "Nombre"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    headers.extend((1..=data_columns).map(|i| format!("Col{i}")));
    headers.push("ArchivoOrigen".to_string());

    let width = headers.len();
    let sheet_rows = rows
        .iter()
        .map(|row| match row {
            ExtractRow::Record(rec) => {
                let (type_code, number, name) = match &rec.identity {
                    Some(id) => (
                        OutputValue::text(id.type_code.to_string()),
                        OutputValue::text(id.number.clone()),
                        OutputValue::text(id.name.clone()),
                    ),
                    None => (OutputValue::Blank, OutputValue::Blank, OutputValue::Blank),
                };
                let mut line = vec![OutputValue::Integer(rec.conse), type_code, number, name];
                line.extend(rec.cells.iter().cloned());
                line.resize(width - 1, OutputValue::Blank);
                line.push(OutputValue::text(rec.source_file.clone()));
                line
            }
            ExtractRow::Marker {
                source_file,
                message,
            } => {
                let mut line = vec![OutputValue::Blank; 4];
                line.push(OutputValue::text(message.clone()));
                line.resize(width - 1, OutputValue::Blank);
                line.push(OutputValue::text(source_file.clone()));
                line
            }
            ExtractRow::Separator => Vec::new(),
        })
        .collect();

    ReportSheet {
        name: SHEET_NAME.to_string(),
        banner: None,
        headers,
        rows: sheet_rows,
    }
}
