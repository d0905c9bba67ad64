//! End-to-end tests for the four pipelines.
//!
//! PDF text, OCR and text search are served by mocks, so these tests run
//! without poppler-utils or tesseract installed. Output workbooks are read
//! back with calamine and archives with the zip crate.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use calamine::{Data, Reader, Xlsx};
use denti_core::config::{PipelineConfig, SignatureConfig};
use denti_core::error::DentiError;
use denti_core::extraction::{BBox, OcrEngine, PageContent, PdfExtractor, TextLocator};
use denti_core::model::InputFile;
use denti_core::pipeline::extract::{extract_rows, ExtractRow};
use denti_core::signing::Placement;
use denti_core::{
    cancelled_appointments_report, extract_to_xlsx, missed_appointments_report, sign_pdfs_to_zip,
};
use lopdf::{dictionary, Document, Object, Stream};
use rust_decimal_macros::dec;

struct MockExtractor {
    pages: HashMap<Vec<u8>, Vec<PageContent>>,
}

impl PdfExtractor for MockExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, DentiError> {
        self.pages
            .get(pdf_bytes)
            .cloned()
            .ok_or_else(|| DentiError::PdftotextFailed {
                code: 1,
                stderr: "Syntax Error: Couldn't find trailer dictionary".into(),
            })
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

struct MockOcr {
    text: Result<String, String>,
}

impl OcrEngine for MockOcr {
    fn recognize(&self, _image_bytes: &[u8], _extension: &str) -> Result<String, DentiError> {
        self.text.clone().map_err(DentiError::Extraction)
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

struct MockLocator {
    hits: Result<Vec<BBox>, String>,
}

impl TextLocator for MockLocator {
    fn find_text(&self, _pdf: &[u8], _page: usize, _needle: &str) -> Result<Vec<BBox>, DentiError> {
        self.hits.clone().map_err(DentiError::Extraction)
    }
}

fn page(number: usize, lines: &[&str]) -> PageContent {
    PageContent {
        page_number: number,
        lines: lines.iter().map(|s| s.to_string()).collect(),
    }
}

fn read_sheet(bytes: Vec<u8>) -> calamine::Range<Data> {
    let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    workbook.worksheet_range_at(0).unwrap().unwrap()
}

fn text(range: &calamine::Range<Data>, row: u32, col: u32) -> String {
    range
        .get_value((row, col))
        .map(|d| d.to_string())
        .unwrap_or_default()
}

fn invoice_pages() -> Vec<PageContent> {
    vec![page(
        1,
        &[
            "CLINICA DENTAL SONRISAS",
            "",
            "  CC 1.020.304.050    ANA MARIA RUIZ",
            "  Consulta general        1        $ 45.000",
            "  Resina                  2        1.234,56",
            "",
            "  TI 87654321   LUIS PEREZ",
            "  Limpieza                1        30.000",
        ],
    )]
}

fn extractor() -> MockExtractor {
    let mut pages = HashMap::new();
    pages.insert(b"invoice".to_vec(), invoice_pages());
    pages.insert(b"empty".to_vec(), vec![page(1, &["just a title"])]);
    MockExtractor { pages }
}

// ---------------------------------------------------------------------------
// PDF / image extraction
// ---------------------------------------------------------------------------

#[test]
fn extract_mixed_batch_to_xlsx() {
    let files = vec![
        InputFile::new("factura.pdf", b"invoice".to_vec()),
        InputFile::new("dañado.pdf", b"corrupt".to_vec()),
        InputFile::new("notas.docx", b"whatever".to_vec()),
        InputFile::new("vacio.PDF", b"empty".to_vec()),
        InputFile::new("scan.png", b"png".to_vec()),
    ];
    let ocr = MockOcr {
        text: Ok("RC 99887766  BEBE GOMEZ\nControl    1    20.000\n\n".into()),
    };

    let output = extract_to_xlsx(&files, &extractor(), &ocr).unwrap();
    assert_eq!(output.summary.files_processed, 3);
    assert_eq!(output.summary.files_failed, 1);
    assert_eq!(output.summary.files_unsupported, 1);
    assert_eq!(output.summary.rows_added, 4);

    let range = read_sheet(output.bytes);
    let header: Vec<String> = (0..10).map(|c| text(&range, 0, c)).collect();
    assert_eq!(
        header,
        vec!["Conse", "TipoDoc", "NumDoc", "Nombre", "Col1", "Col2", "Col3", "Col4", "Col5", "ArchivoOrigen"]
    );

    // factura.pdf: identity carried across its two tables
    assert_eq!(range.get_value((1, 0)), Some(&Data::Float(1.0)));
    assert_eq!(text(&range, 1, 1), "CC");
    assert_eq!(text(&range, 1, 2), "1020304050");
    assert_eq!(text(&range, 1, 3), "ANA MARIA RUIZ");
    assert_eq!(text(&range, 1, 4), "Consulta general");
    assert_eq!(range.get_value((1, 6)), Some(&Data::Float(45000.0)));
    assert_eq!(text(&range, 1, 9), "factura.pdf");
    assert_eq!(range.get_value((2, 6)), Some(&Data::Float(1234.56)));
    // blank separator between the two source tables
    assert_eq!(text(&range, 3, 0), "");
    assert_eq!(text(&range, 4, 1), "TI");
    assert_eq!(text(&range, 4, 3), "LUIS PEREZ");
    assert_eq!(range.get_value((4, 0)), Some(&Data::Float(3.0)));

    // per-file markers
    let all_rows: Vec<String> = range
        .rows()
        .map(|r| r.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("|"))
        .collect();
    assert!(all_rows.iter().any(|r| r.contains("ERROR PDF: ") && r.contains("dañado.pdf")));
    assert!(all_rows.iter().any(|r| r.contains("Formato no soportado: .docx")));
    assert!(all_rows.iter().any(|r| r.contains("Sin resultados: vacio.PDF")));

    // the OCR'd image carries its own identity
    let scan = all_rows
        .iter()
        .find(|r| r.ends_with("scan.png") && r.starts_with('4'))
        .expect("scan row");
    assert!(scan.contains("RC|99887766|BEBE GOMEZ|Control"));
}

#[test]
fn extraction_is_deterministic() {
    let files = vec![InputFile::new("factura.pdf", b"invoice".to_vec())];
    let ocr = MockOcr { text: Ok(String::new()) };
    let (first, _) = extract_rows(&files, &extractor(), &ocr);
    let (second, _) = extract_rows(&files, &extractor(), &ocr);
    assert_eq!(first, second);

    let conses: Vec<u64> = first
        .iter()
        .filter_map(|r| match r {
            ExtractRow::Record(rec) => Some(rec.conse),
            _ => None,
        })
        .collect();
    assert_eq!(conses, vec![1, 2, 3]);

    match &first[1] {
        ExtractRow::Record(rec) => {
            assert_eq!(rec.cells[2], denti_core::model::OutputValue::Number(dec!(1234.56)));
        }
        other => panic!("expected a record, got {other:?}"),
    }
}

#[test]
fn ocr_failure_becomes_marker() {
    let files = vec![InputFile::new("foto.jpg", b"jpg".to_vec())];
    let ocr = MockOcr {
        text: Err("tesseract exploded".into()),
    };
    let (rows, summary) = extract_rows(&files, &extractor(), &ocr);
    assert_eq!(summary.files_failed, 1);
    assert!(matches!(
        &rows[0],
        ExtractRow::Marker { message, .. } if message.starts_with("ERROR OCR: ")
    ));
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

fn simple_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for i in 0..pages {
        let content = format!("BT /F1 12 Tf 72 100 Td (Firma Prestador {i}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn signature_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(20, 8, image::Rgba([0, 0, 128, 200]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn zip_entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            (file.name().to_string(), content)
        })
        .collect()
}

#[test]
fn sign_batch_with_one_corrupt_pdf() {
    let pdfs: Vec<InputFile> = (1..=5)
        .map(|i| {
            let bytes = if i == 3 {
                b"%PDF-1.4 this is not a pdf".to_vec()
            } else {
                simple_pdf(2)
            };
            InputFile::new(format!("Paciente {i}.pdf"), bytes)
        })
        .collect();
    let locator = MockLocator {
        hits: Ok(vec![BBox {
            x_min: 100.0,
            y_min: 200.0,
            x_max: 220.0,
            y_max: 215.0,
        }]),
    };

    let output =
        sign_pdfs_to_zip(&pdfs, &signature_png(), &locator, &SignatureConfig::default()).unwrap();
    assert_eq!(output.summary.signed.len(), 4);
    assert_eq!(output.summary.failed.len(), 1);
    assert!(output
        .summary
        .signed
        .iter()
        .all(|s| s.placement == Placement::Anchored));

    let entries = zip_entries(output.bytes);
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Paciente_1.pdf",
            "Paciente_2.pdf",
            "Paciente_3.pdf.error.txt",
            "Paciente_4.pdf",
            "Paciente_5.pdf"
        ]
    );
    assert!(!entries[2].1.is_empty());

    let signed = Document::load_mem(&entries[0].1).unwrap();
    let pages = signed.get_pages();
    assert_eq!(pages.len(), 2);
    let last = *pages.values().next_back().unwrap();
    let first = *pages.values().next().unwrap();
    let last_content = String::from_utf8_lossy(&signed.get_page_content(last).unwrap()).into_owned();
    let first_content = String::from_utf8_lossy(&signed.get_page_content(first).unwrap()).into_owned();
    assert!(last_content.contains("Do"));
    assert!(!first_content.contains("Do"));
}

#[test]
fn failed_search_falls_back_to_fixed_position() {
    let pdfs = vec![InputFile::new("a.pdf", simple_pdf(1))];
    let locator = MockLocator {
        hits: Err("pdftotext not installed".into()),
    };
    let output =
        sign_pdfs_to_zip(&pdfs, &signature_png(), &locator, &SignatureConfig::default()).unwrap();
    assert_eq!(output.summary.signed[0].placement, Placement::Fallback);

    let none_found = MockLocator { hits: Ok(vec![]) };
    let output =
        sign_pdfs_to_zip(&pdfs, &signature_png(), &none_found, &SignatureConfig::default()).unwrap();
    assert_eq!(output.summary.signed[0].placement, Placement::Fallback);
}

#[test]
fn entry_names_collapse_unsafe_runs() {
    let pdfs = vec![InputFile::new("Juan/Pérez? #1.pdf", simple_pdf(1))];
    let locator = MockLocator { hits: Ok(vec![]) };
    let output =
        sign_pdfs_to_zip(&pdfs, &signature_png(), &locator, &SignatureConfig::default()).unwrap();
    assert_eq!(output.summary.signed[0].entry, "Juan_P_rez_1.pdf");

    let entries = zip_entries(output.bytes);
    assert_eq!(entries[0].0, "Juan_P_rez_1.pdf");
}

#[test]
fn undecodable_signature_fails_every_file() {
    let pdfs = vec![
        InputFile::new("a.pdf", simple_pdf(1)),
        InputFile::new("b.pdf", simple_pdf(1)),
    ];
    let locator = MockLocator { hits: Ok(vec![]) };
    let output =
        sign_pdfs_to_zip(&pdfs, b"not an image", &locator, &SignatureConfig::default()).unwrap();
    assert!(output.summary.signed.is_empty());
    let names: Vec<String> = zip_entries(output.bytes).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a.pdf.error.txt", "b.pdf.error.txt"]);
}

// ---------------------------------------------------------------------------
// Appointment reports
// ---------------------------------------------------------------------------

fn workbook(rows: &[Vec<&str>]) -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

#[test]
fn cancelled_report_end_to_end() {
    let rows = vec![
        vec!["", "REPORTE DE CITAS CANCELADAS"],
        vec!["", "DR. X"],
        vec!["", "", "05/01/2023", "", "", "ANA RUIZ", "3001234567", "", "", "", "Paciente", "Viaje", "Llamar"],
        vec!["", "", "06/01/2023", "", "", "LUIS PEREZ", "3007654321", "", "20/01/2023", "", "Clinica", "Agenda", ""],
        vec!["", "DRA. ROJAS"],
        vec!["", "", "07/01/2023", "", "", "MARTA GOMEZ", "3011112222", "", "02/01/2023", "", "Paciente", "Salud", ""],
    ];
    let source = InputFile::new("canceladas.xlsx", workbook(&rows));

    let output = cancelled_appointments_report(&source, &PipelineConfig::default()).unwrap();
    assert_eq!(output.summary.candidates, 3);
    assert_eq!(output.summary.accepted, 2);
    assert_eq!(output.summary.rejected_rescheduled, 1);

    let range = read_sheet(output.bytes);
    assert_eq!(text(&range, 0, 0), "REPORTE DE CITAS CANCELADAS");
    assert_eq!(text(&range, 1, 0), "Conse");
    assert_eq!(text(&range, 1, 8), "Observaciones");

    assert_eq!(range.get_value((2, 0)), Some(&Data::Float(1.0)));
    assert_eq!(text(&range, 2, 1), "DR. X");
    assert_eq!(text(&range, 2, 3), "ANA RUIZ");
    assert_eq!(text(&range, 2, 4), "3001234567");
    assert_eq!(text(&range, 2, 8), "Llamar");

    assert_eq!(range.get_value((3, 0)), Some(&Data::Float(2.0)));
    assert_eq!(text(&range, 3, 1), "DRA. ROJAS");
    assert_eq!(text(&range, 3, 3), "MARTA GOMEZ");
    match (range.get_value((3, 2)), range.get_value((3, 5))) {
        (Some(Data::DateTime(original)), Some(Data::DateTime(moved))) => {
            assert!(moved.as_f64() <= original.as_f64());
        }
        other => panic!("expected two dates, got {other:?}"),
    }
    assert_eq!(range.get_value((4, 0)), None);
}

#[test]
fn typo_years_do_not_abort_the_report() {
    let rows = vec![
        vec!["", "DR. X"],
        vec!["", "", "05/01/2023", "", "", "ANA RUIZ", "3001234567", "", "01/01/1899"],
        vec!["", "", "06/01/0023", "", "", "LUIS PEREZ", "3007654321"],
        vec!["", "", "07/01/2023", "", "", "MARTA GOMEZ", "3011112222", "", "08/01/2023"],
    ];
    let source = InputFile::new("canceladas.xlsx", workbook(&rows));

    let output = cancelled_appointments_report(&source, &PipelineConfig::default()).unwrap();
    assert_eq!(output.summary.candidates, 2);
    assert_eq!(output.summary.accepted, 1);
    assert_eq!(output.summary.rejected_rescheduled, 1);

    let range = read_sheet(output.bytes);
    assert_eq!(text(&range, 1, 3), "ANA RUIZ");
    assert!(matches!(range.get_value((1, 2)), Some(Data::DateTime(_))));
    assert_eq!(text(&range, 1, 5), "");
    assert_eq!(range.get_value((2, 0)), None);
}

#[test]
fn missed_report_reads_serial_dates() {
    let mut wb = rust_xlsxwriter::Workbook::new();
    let sheet = wb.add_worksheet();
    sheet.write_string(0, 0, "CITAS INCUMPLIDAS").unwrap();
    sheet.write_string(1, 0, "DR. X").unwrap();
    for (r, (serial, id, name, phone)) in [
        (44931.0, 1020304050.0, "ANA RUIZ", 3001234567.0),
        (44932.0, 1020304051.0, "LUIS PEREZ", 3007654321.0),
    ]
    .into_iter()
    .enumerate()
    {
        let r = r as u32 + 2;
        sheet.write_number(r, 0, serial).unwrap();
        sheet.write_number(r, 2, id).unwrap();
        sheet.write_string(r, 3, name).unwrap();
        sheet.write_number(r, 4, phone).unwrap();
    }
    let source = InputFile::new("incumplidas.xlsx", wb.save_to_buffer().unwrap());

    let output = missed_appointments_report(&source, &PipelineConfig::default()).unwrap();
    assert_eq!(output.summary.accepted, 2);
    assert_eq!(output.summary.columns.date, Some(0));
    assert_eq!(output.summary.columns.phone, Some(4));

    let range = read_sheet(output.bytes);
    assert_eq!(text(&range, 0, 0), "CITAS INCUMPLIDAS");
    assert_eq!(text(&range, 1, 3), "Identificacion");
    assert_eq!(text(&range, 2, 1), "DR. X");
    assert_eq!(text(&range, 2, 3), "1020304050");
    assert_eq!(text(&range, 3, 4), "LUIS PEREZ");
    match range.get_value((2, 2)) {
        Some(Data::DateTime(dt)) => assert_eq!(dt.as_f64(), 44931.0),
        other => panic!("expected a date, got {other:?}"),
    }
}

#[test]
fn unreadable_workbook_is_an_error() {
    let source = InputFile::new("roto.xls", b"definitely not a workbook".to_vec());
    let err = missed_appointments_report(&source, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, DentiError::SpreadsheetRead(_)));
}
