pub mod config;
pub mod error;
pub mod extraction;
pub mod model;
pub mod naming;
pub mod parsing;
pub mod pipeline;
pub mod report;
pub mod signing;

use config::{PipelineConfig, SignatureConfig};
use error::DentiError;
use extraction::spreadsheet::read_first_sheet;
use extraction::{OcrEngine, PdfExtractor, TextLocator};
use model::InputFile;
use pipeline::appointments::{build_appointments, AppointmentKind, AppointmentSummary};
use pipeline::extract::{extract_rows, ExtractSummary};
use report::xlsx::write_report;
use signing::SignSummary;

/// The bytes of one output file plus what happened while producing it.
#[derive(Debug, Clone)]
pub struct PipelineOutput<S> {
    pub bytes: Vec<u8>,
    pub summary: S,
}

/// PDF tables and OCR'd images into one spreadsheet.
///
/// Per-file problems (unreadable PDF, failed OCR, unsupported type) become
/// marker rows; only writing the workbook can fail.
pub fn extract_to_xlsx(
    files: &[InputFile],
    extractor: &dyn PdfExtractor,
    ocr: &dyn OcrEngine,
) -> Result<PipelineOutput<ExtractSummary>, DentiError> {
    let (rows, summary) = extract_rows(files, extractor, ocr);
    let sheet = pipeline::extract::build_sheet(&rows);
    let bytes = write_report(&sheet)?;
    Ok(PipelineOutput { bytes, summary })
}

/// Stamp a signature onto the last page of every PDF, zipped.
pub fn sign_pdfs_to_zip(
    pdfs: &[InputFile],
    signature: &[u8],
    locator: &dyn TextLocator,
    cfg: &SignatureConfig,
) -> Result<PipelineOutput<SignSummary>, DentiError> {
    let (bytes, summary) = signing::sign_pdfs(pdfs, signature, locator, cfg)?;
    Ok(PipelineOutput { bytes, summary })
}

/// Cancelled appointments that were not moved to a later date.
pub fn cancelled_appointments_report(
    source: &InputFile,
    cfg: &PipelineConfig,
) -> Result<PipelineOutput<AppointmentSummary>, DentiError> {
    appointments_report(source, AppointmentKind::Cancelled, cfg)
}

/// Missed appointments that were not moved to a later date.
pub fn missed_appointments_report(
    source: &InputFile,
    cfg: &PipelineConfig,
) -> Result<PipelineOutput<AppointmentSummary>, DentiError> {
    appointments_report(source, AppointmentKind::Missed, cfg)
}

fn appointments_report(
    source: &InputFile,
    kind: AppointmentKind,
    cfg: &PipelineConfig,
) -> Result<PipelineOutput<AppointmentSummary>, DentiError> {
    let layout = match kind {
        AppointmentKind::Cancelled => &cfg.cancelled,
        AppointmentKind::Missed => &cfg.missed,
    };

    let rows = read_first_sheet(&source.bytes)?;
    let report = build_appointments(&rows, kind, layout, &cfg.doctor);
    let bytes = write_report(&pipeline::appointments::build_sheet(&report))?;

    Ok(PipelineOutput {
        bytes,
        summary: report.summary,
    })
}
