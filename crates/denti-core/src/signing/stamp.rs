use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::DentiError;
use crate::extraction::BBox;
use crate::signing::placement::PdfRect;

/// US Letter, used when no MediaBox is found up the page tree.
const DEFAULT_MEDIA_BOX: BBox = BBox {
    x_min: 0.0,
    y_min: 0.0,
    x_max: 612.0,
    y_max: 792.0,
};

const XOBJECT_NAME: &str = "DentiSignature";

/// A signature image decoded once and reused for every document of a batch.
#[derive(Debug, Clone)]
pub struct SignatureImage {
    pub width: u32,
    pub height: u32,
    rgb: Vec<u8>,
    /// Present only when some pixel is not fully opaque.
    alpha: Option<Vec<u8>>,
}

impl SignatureImage {
    pub fn decode(bytes: &[u8]) -> Result<Self, DentiError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for px in rgba.pixels() {
            let [r, g, b, a] = px.0;
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }
        let alpha = alpha.iter().any(|&a| a != u8::MAX).then_some(alpha);

        Ok(SignatureImage {
            width,
            height,
            rgb,
            alpha,
        })
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }
}

/// An opened PDF about to receive a stamp on its last page.
pub struct StampTarget {
    doc: Document,
    page_id: ObjectId,
    /// 1-based.
    pub page_number: u32,
    pub media_box: BBox,
}

impl StampTarget {
    pub fn open(pdf_bytes: &[u8]) -> Result<Self, DentiError> {
        let doc = Document::load_mem(pdf_bytes)?;
        let (page_number, page_id) = doc
            .get_pages()
            .into_iter()
            .next_back()
            .ok_or_else(|| DentiError::Signing("PDF has no pages".into()))?;
        let media_box = media_box(&doc, page_id).unwrap_or(DEFAULT_MEDIA_BOX);

        Ok(StampTarget {
            doc,
            page_id,
            page_number,
            media_box,
        })
    }

    /// Draw `image` at `rect` inside its own saved graphics state and
    /// return the saved document.
    pub fn stamp(mut self, image: &SignatureImage, rect: PdfRect) -> Result<Vec<u8>, DentiError> {
        let image_id = add_image(&mut self.doc, image)?;
        self.doc.add_xobject(self.page_id, XOBJECT_NAME, image_id)?;

        let prefix = self.doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let draw = format!(
            "Q\nq\n{} 0 0 {} {} {} cm\n/{XOBJECT_NAME} Do\nQ\n",
            rect.width, rect.height, rect.x, rect.y
        );
        let suffix = self.doc.add_object(Stream::new(dictionary! {}, draw.into_bytes()));

        let page = self.doc.get_object_mut(self.page_id)?.as_dict_mut()?;
        let mut contents = vec![Object::Reference(prefix)];
        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => contents.push(Object::Reference(*id)),
            Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
            _ => {}
        }
        contents.push(Object::Reference(suffix));
        page.set("Contents", Object::Array(contents));

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }
}

fn add_image(doc: &mut Document, image: &SignatureImage) -> Result<ObjectId, DentiError> {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if let Some(alpha) = &image.alpha {
        let mut mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha.clone(),
        );
        mask.compress()?;
        let mask_id = doc.add_object(mask);
        dict.set("SMask", Object::Reference(mask_id));
    }

    let mut stream = Stream::new(dict, image.rgb.clone());
    stream.compress()?;
    Ok(doc.add_object(stream))
}

/// MediaBox of a page, inherited from the page tree when the page lacks one.
fn media_box(doc: &Document, page_id: ObjectId) -> Option<BBox> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    loop {
        if let Ok(obj) = node.get(b"MediaBox") {
            let array = resolve(doc, obj).as_array().ok()?;
            let values: Vec<f32> = array
                .iter()
                .filter_map(|o| resolve(doc, o).as_float().ok())
                .collect();
            if let [x0, y0, x1, y1] = values[..] {
                return Some(BBox {
                    x_min: x0.min(x1),
                    y_min: y0.min(y1),
                    x_max: x0.max(x1),
                    y_max: y0.max(y1),
                });
            }
            return None;
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}
