use denti_core::error::DentiError;
use denti_core::extraction::pdftotext::PdftotextExtractor;
use denti_core::extraction::tesseract::TesseractOcr;
use denti_core::naming::EXTRACT_PREFIX;
use std::path::PathBuf;

use super::{config, read_input, write_output};
use crate::output;
use crate::CommonArgs;

pub fn run(files: &[PathBuf], common: &CommonArgs) -> Result<(), DentiError> {
    let cfg = config(common)?;
    let inputs = files
        .iter()
        .map(|p| read_input(p))
        .collect::<Result<Vec<_>, _>>()?;

    let extractor = PdftotextExtractor::with_binary(&cfg.tools.pdftotext);
    let ocr = TesseractOcr::new(&cfg.tools.tesseract, &cfg.tools.ocr_language);
    let result = denti_core::extract_to_xlsx(&inputs, &extractor, &ocr)?;
    let path = write_output(common, EXTRACT_PREFIX, "xlsx", &result.bytes)?;

    match common.output.as_str() {
        "json" => output::json::print(&result.summary)?,
        _ => output::table::print_extract(&result.summary, &path),
    }
    Ok(())
}
