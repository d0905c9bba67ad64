use crate::error::DentiError;
use crate::extraction::{BBox, PageContent, PdfExtractor, TextLocator, WordBox};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// PDF extraction backend using pdftotext (from poppler-utils).
///
/// Uses `pdftotext -layout` to preserve whitespace alignment of tables, and
/// `pdftotext -bbox-layout` to locate words on a page.
pub struct PdftotextExtractor {
    binary: String,
}

impl PdftotextExtractor {
    pub fn new() -> Self {
        Self::with_binary("pdftotext")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        PdftotextExtractor {
            binary: binary.into(),
        }
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }

    fn run(&self, args: &[&str], pdf_path: &Path) -> Result<String, DentiError> {
        let output = Command::new(&self.binary)
            .args(args)
            .arg(pdf_path)
            .arg("-") // output to stdout
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DentiError::PdftotextNotFound
                } else {
                    DentiError::Extraction(format!("pdftotext failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(DentiError::PdftotextFailed { code, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn write_temp_pdf(pdf_bytes: &[u8]) -> Result<tempfile::NamedTempFile, DentiError> {
    let mut tmpfile =
        tempfile::NamedTempFile::new().map_err(|e| DentiError::Extraction(e.to_string()))?;
    tmpfile
        .write_all(pdf_bytes)
        .map_err(|e| DentiError::Extraction(e.to_string()))?;
    Ok(tmpfile)
}

impl PdfExtractor for PdftotextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, DentiError> {
        let tmpfile = write_temp_pdf(pdf_bytes)?;
        let text = self.run(&["-layout"], tmpfile.path())?;
        Ok(split_pages(&text))
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

impl TextLocator for PdftotextExtractor {
    fn find_text(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        needle: &str,
    ) -> Result<Vec<BBox>, DentiError> {
        let tmpfile = write_temp_pdf(pdf_bytes)?;
        let page = page_number.to_string();
        let xml = self.run(
            &["-f", &page, "-l", &page, "-bbox-layout"],
            tmpfile.path(),
        )?;
        let words = parse_bbox_xml(&xml, page_number)?;
        let hits = find_phrase(&words, needle);
        debug!(page_number, needle, hits = hits.len(), "searched page text");
        Ok(hits)
    }
}

/// Split pdftotext output into pages (form feed `\x0c` separates pages).
fn split_pages(text: &str) -> Vec<PageContent> {
    text.split('\x0c')
        .enumerate()
        .map(|(i, page_text)| PageContent {
            page_number: i + 1,
            lines: page_text.lines().map(|l| l.to_string()).collect(),
        })
        .filter(|p| !p.lines.is_empty() || p.page_number == 1)
        .collect()
}

/// Parse `pdftotext -bbox-layout` XHTML into positioned words.
///
/// Pages are numbered from `first_page`, since pdftotext does not number
/// them when a page range is requested.
fn parse_bbox_xml(xml: &str, first_page: usize) -> Result<Vec<WordBox>, DentiError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut page_number = first_page.saturating_sub(1);
    let mut line_index = 0usize;
    let mut current_word: Option<BBox> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => page_number += 1,
                b"line" => line_index += 1,
                b"word" => current_word = parse_bbox(&e),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(bbox) = current_word.take() {
                    let text = t
                        .unescape()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        out.push(WordBox {
                            page_number,
                            line_index,
                            text,
                            bbox,
                        });
                    }
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"word" => current_word = None,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DentiError::Extraction(format!(
                    "malformed pdftotext bbox output at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    Ok(out)
}

fn parse_attr_f32(tag: &BytesStart<'_>, name: &[u8]) -> Option<f32> {
    let attr = tag
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)?;
    std::str::from_utf8(&attr.value).ok()?.parse().ok()
}

fn parse_bbox(tag: &BytesStart<'_>) -> Option<BBox> {
    Some(BBox {
        x_min: parse_attr_f32(tag, b"xMin")?,
        y_min: parse_attr_f32(tag, b"yMin")?,
        x_max: parse_attr_f32(tag, b"xMax")?,
        y_max: parse_attr_f32(tag, b"yMax")?,
    })
}

/// Find every case-insensitive occurrence of `needle` within a text line and
/// return the union of the word boxes it covers. Matches may start or end
/// inside a word ("Firma Prestador:" matches "Firma Prestador").
pub fn find_phrase(words: &[WordBox], needle: &str) -> Vec<BBox> {
    let needle = normalize_ws(needle).to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let key = (words[start].page_number, words[start].line_index);
        let end = words[start..]
            .iter()
            .position(|w| (w.page_number, w.line_index) != key)
            .map(|n| start + n)
            .unwrap_or(words.len());
        hits.extend(find_in_line(&words[start..end], &needle));
        start = end;
    }
    hits
}

fn find_in_line(line: &[WordBox], needle: &str) -> Vec<BBox> {
    // Byte span of each word in the space-joined line.
    let mut text = String::new();
    let mut spans = Vec::with_capacity(line.len());
    for word in line {
        if !text.is_empty() {
            text.push(' ');
        }
        let lower = word.text.to_lowercase();
        spans.push((text.len(), text.len() + lower.len()));
        text.push_str(&lower);
    }

    text.match_indices(needle)
        .filter_map(|(pos, m)| {
            let end = pos + m.len();
            line.iter()
                .zip(&spans)
                .filter(|(_, (s, e))| *s < end && *e > pos)
                .map(|(w, _)| w.bbox)
                .reduce(|a, b| a.union(&b))
        })
        .collect()
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
