use denti_core::error::DentiError;
use denti_core::extraction::pdftotext::PdftotextExtractor;
use denti_core::naming::SIGNED_PREFIX;
use std::path::{Path, PathBuf};

use super::{config, read_input, write_output};
use crate::output;
use crate::CommonArgs;

pub fn run(
    signature: &Path,
    text: Option<String>,
    pdfs: &[PathBuf],
    common: &CommonArgs,
) -> Result<(), DentiError> {
    let mut cfg = config(common)?;
    if let Some(text) = text {
        cfg.signature.reference_text = text;
    }

    let signature = std::fs::read(signature)?;
    let inputs = pdfs
        .iter()
        .map(|p| read_input(p))
        .collect::<Result<Vec<_>, _>>()?;

    let locator = PdftotextExtractor::with_binary(&cfg.tools.pdftotext);
    let result = denti_core::sign_pdfs_to_zip(&inputs, &signature, &locator, &cfg.signature)?;
    let path = write_output(common, SIGNED_PREFIX, "zip", &result.bytes)?;

    match common.output.as_str() {
        "json" => output::json::print(&result.summary)?,
        _ => output::table::print_sign(&result.summary, &path),
    }
    Ok(())
}
