pub mod placement;
pub mod stamp;

use std::collections::HashSet;
use std::io::{Cursor, Write};

use serde::Serialize;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::SignatureConfig;
use crate::error::DentiError;
use crate::extraction::{BBox, TextLocator};
use crate::model::InputFile;
use crate::naming::safe_filename;
use placement::{fit_image, stamp_rect, to_pdf_space};
use stamp::{SignatureImage, StampTarget};

/// How the stamp position was decided for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Anchored to the reference text.
    Anchored,
    /// Reference text absent, search disabled, or the search failed.
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedFile {
    pub source: String,
    pub entry: String,
    pub placement: Placement,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignFailure {
    pub source: String,
    pub entry: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SignSummary {
    pub signed: Vec<SignedFile>,
    pub failed: Vec<SignFailure>,
}

/// Stamp `signature` onto the last page of every PDF and pack the results
/// into one deflated zip. A file that cannot be signed becomes a
/// `<name>.error.txt` entry holding the reason; the batch always continues.
pub fn sign_pdfs(
    pdfs: &[InputFile],
    signature: &[u8],
    locator: &dyn TextLocator,
    cfg: &SignatureConfig,
) -> Result<(Vec<u8>, SignSummary), DentiError> {
    let image = SignatureImage::decode(signature).map_err(|e| e.to_string());
    if let Err(reason) = &image {
        warn!(%reason, "signature image could not be decoded");
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut used = HashSet::new();
    let mut summary = SignSummary::default();

    for pdf in pdfs {
        let safe = safe_filename(&pdf.name);
        let result = match &image {
            Ok(image) => sign_one(&pdf.bytes, image, locator, cfg).map_err(|e| e.to_string()),
            Err(reason) => Err(format!("signature image: {reason}")),
        };

        match result {
            Ok((bytes, placement)) => {
                let entry = unique_entry(&mut used, safe);
                zip.start_file(entry.as_str(), options)?;
                zip.write_all(&bytes)?;
                info!(file = %pdf.name, ?placement, "signed");
                summary.signed.push(SignedFile {
                    source: pdf.name.clone(),
                    entry,
                    placement,
                });
            }
            Err(reason) => {
                let entry = unique_entry(&mut used, format!("{safe}.error.txt"));
                zip.start_file(entry.as_str(), options)?;
                zip.write_all(reason.as_bytes())?;
                warn!(file = %pdf.name, %reason, "signing failed");
                summary.failed.push(SignFailure {
                    source: pdf.name.clone(),
                    entry,
                    reason,
                });
            }
        }
    }

    let bytes = zip.finish()?.into_inner();
    info!(
        signed = summary.signed.len(),
        failed = summary.failed.len(),
        "signing batch complete"
    );
    Ok((bytes, summary))
}

fn sign_one(
    pdf_bytes: &[u8],
    image: &SignatureImage,
    locator: &dyn TextLocator,
    cfg: &SignatureConfig,
) -> Result<(Vec<u8>, Placement), DentiError> {
    let target = StampTarget::open(pdf_bytes)?;
    let found = locate_reference(pdf_bytes, target.page_number as usize, locator, cfg);
    let placement = if found.is_some() {
        Placement::Anchored
    } else {
        Placement::Fallback
    };

    let rect = fit_image(&stamp_rect(found.as_ref(), cfg), image.width, image.height);
    let pdf_rect = to_pdf_space(&rect, &target.media_box);
    debug!(page = target.page_number, ?rect, ?pdf_rect, "stamp placement");

    Ok((target.stamp(image, pdf_rect)?, placement))
}

/// First occurrence of the reference text on the page. Search errors are
/// logged and treated as "not found".
fn locate_reference(
    pdf_bytes: &[u8],
    page_number: usize,
    locator: &dyn TextLocator,
    cfg: &SignatureConfig,
) -> Option<BBox> {
    let needle = cfg.reference_text.trim();
    if needle.is_empty() {
        return None;
    }
    match locator.find_text(pdf_bytes, page_number, needle) {
        Ok(boxes) => boxes.into_iter().next(),
        Err(e) => {
            warn!(error = %e, "reference text search failed, using fallback position");
            None
        }
    }
}

/// Archive entry names must be unique: `a.pdf`, `a_2.pdf`, `a_3.pdf`...
fn unique_entry(used: &mut HashSet<String>, name: String) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = match name.find('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name.as_str(), ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem}_{n}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
