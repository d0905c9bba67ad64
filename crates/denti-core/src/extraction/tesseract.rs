use crate::error::DentiError;
use crate::extraction::OcrEngine;
use std::process::Command;

/// OCR backend shelling out to the `tesseract` CLI.
pub struct TesseractOcr {
    binary: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        TesseractOcr {
            binary: binary.into(),
            language: language.into(),
        }
    }

    /// Check if tesseract is available on the system.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image_bytes: &[u8], extension: &str) -> Result<String, DentiError> {
        let suffix = if extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{extension}")
        };
        let dir = tempfile::tempdir().map_err(|e| DentiError::Extraction(e.to_string()))?;
        let path = dir.path().join(format!("ocr_input{suffix}"));
        std::fs::write(&path, image_bytes)?;

        let output = Command::new(&self.binary)
            .arg(&path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DentiError::TesseractNotFound(self.binary.clone())
                } else {
                    DentiError::Extraction(format!("tesseract failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(DentiError::TesseractFailed { code, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn backend_name(&self) -> &str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_reports_not_found() {
        let ocr = TesseractOcr::new("denti-no-such-tesseract", "eng");
        assert!(!ocr.is_available());
        let err = ocr.recognize(b"not an image", ".png").unwrap_err();
        assert!(matches!(err, DentiError::TesseractNotFound(ref b) if b == "denti-no-such-tesseract"));
    }
}
