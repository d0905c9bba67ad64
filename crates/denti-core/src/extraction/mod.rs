pub mod pdftotext;
pub mod spreadsheet;
pub mod table;
pub mod tesseract;

use crate::error::DentiError;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in PDF points, origin at the top-left of the page
/// (y grows downwards), the convention pdftotext reports word boxes in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// A word with its position, as reported by a layout-aware text extractor.
#[derive(Debug, Clone)]
pub struct WordBox {
    pub page_number: usize,
    pub line_index: usize,
    pub text: String,
    pub bbox: BBox,
}

/// Content extracted from a single page of a PDF.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub page_number: usize,
    /// Layout-preserving text lines (columns aligned with spaces).
    pub lines: Vec<String>,
}

/// Trait for PDF text extraction backends.
pub trait PdfExtractor: Send + Sync {
    /// Extract text content from PDF bytes, returning one PageContent per page.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, DentiError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Trait for OCR backends turning a raster image into text.
pub trait OcrEngine: Send + Sync {
    /// Recognize text in an image. `extension` is the source file's extension
    /// including the dot (e.g. ".png"), used as a format hint.
    fn recognize(&self, image_bytes: &[u8], extension: &str) -> Result<String, DentiError>;

    fn backend_name(&self) -> &str;
}

/// Trait for locating a phrase on a PDF page.
pub trait TextLocator: Send + Sync {
    /// Rectangles of every occurrence of `needle` on page `page_number`
    /// (1-based), in reading order.
    fn find_text(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        needle: &str,
    ) -> Result<Vec<BBox>, DentiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_spans_both_boxes() {
        let a = BBox {
            x_min: 10.0,
            y_min: 20.0,
            x_max: 40.0,
            y_max: 30.0,
        };
        let b = BBox {
            x_min: 45.0,
            y_min: 19.0,
            x_max: 90.0,
            y_max: 31.0,
        };
        let u = a.union(&b);
        assert_eq!(u.x_min, 10.0);
        assert_eq!(u.y_min, 19.0);
        assert_eq!(u.width(), 80.0);
        assert_eq!(u.height(), 12.0);
    }
}
