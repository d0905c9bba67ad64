use crate::config::SignatureConfig;
use crate::extraction::BBox;

pub const STAMP_WIDTH: f32 = 140.0;
pub const STAMP_HEIGHT: f32 = 55.0;
/// How far below the reference text's bottom edge the stamp ends.
pub const BASELINE_OFFSET: f32 = 8.0;

/// Where the stamp goes when the reference text is not on the page.
pub const FALLBACK_RECT: BBox = BBox {
    x_min: 70.0,
    y_min: 130.0,
    x_max: 210.0,
    y_max: 185.0,
};

/// Stamp rectangle in top-left page coordinates. With a located reference
/// box the stamp is left-aligned with it and its bottom edge sits
/// `baseline_offset` below the box's bottom edge.
pub fn stamp_rect(found: Option<&BBox>, cfg: &SignatureConfig) -> BBox {
    match found {
        Some(f) => {
            let y_min = f.y_max - cfg.stamp_height + cfg.baseline_offset;
            BBox {
                x_min: f.x_min,
                y_min,
                x_max: f.x_min + cfg.stamp_width,
                y_max: y_min + cfg.stamp_height,
            }
        }
        None => cfg.fallback_rect,
    }
}

/// Largest rectangle with the image's aspect ratio that fits inside `rect`,
/// centered in it.
pub fn fit_image(rect: &BBox, image_width: u32, image_height: u32) -> BBox {
    if image_width == 0 || image_height == 0 {
        return *rect;
    }
    let scale = (rect.width() / image_width as f32).min(rect.height() / image_height as f32);
    let w = image_width as f32 * scale;
    let h = image_height as f32 * scale;
    let x_min = rect.x_min + (rect.width() - w) / 2.0;
    let y_min = rect.y_min + (rect.height() - h) / 2.0;
    BBox {
        x_min,
        y_min,
        x_max: x_min + w,
        y_max: y_min + h,
    }
}

/// A rectangle in PDF user space: lower-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Convert a top-left-origin rectangle to PDF user space, where `media` is
/// the page MediaBox as `[llx lly urx ury]`.
pub fn to_pdf_space(rect: &BBox, media: &BBox) -> PdfRect {
    PdfRect {
        x: media.x_min + rect.x_min,
        y: media.y_max - rect.y_max,
        width: rect.width(),
        height: rect.height(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> BBox {
        BBox {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    #[test]
    fn test_stamp_hangs_below_reference_text() {
        let cfg = SignatureConfig::default();
        let rect = stamp_rect(Some(&bbox(100.0, 200.0, 220.0, 215.0)), &cfg);
        assert_eq!(rect, bbox(100.0, 168.0, 240.0, 223.0));
    }

    #[test]
    fn test_fallback_without_match() {
        let cfg = SignatureConfig::default();
        assert_eq!(stamp_rect(None, &cfg), bbox(70.0, 130.0, 210.0, 185.0));
    }

    #[test]
    fn test_fit_image_keeps_aspect() {
        let rect = bbox(0.0, 0.0, 140.0, 55.0);
        // 2:1 image is height-bound: 110x55 centered
        assert_eq!(fit_image(&rect, 200, 100), bbox(15.0, 0.0, 125.0, 55.0));
        assert_eq!(fit_image(&rect, 0, 10), rect);
    }

    #[test]
    fn test_to_pdf_space_flips_y() {
        let media = bbox(0.0, 0.0, 612.0, 792.0);
        let pdf = to_pdf_space(&bbox(100.0, 168.0, 240.0, 223.0), &media);
        assert_eq!(
            pdf,
            PdfRect {
                x: 100.0,
                y: 569.0,
                width: 140.0,
                height: 55.0
            }
        );
    }
}
