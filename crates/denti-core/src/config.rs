use crate::error::DentiError;
use crate::extraction::BBox;
use crate::parsing::doctor::{
    DOCTOR_LABEL_EXCLUDED, DOCTOR_LABEL_MIN_CHARS, DOCTOR_LABEL_MIN_CHARS_MULTIWORD,
};
use crate::signing::placement::{
    BASELINE_OFFSET, FALLBACK_RECT, STAMP_HEIGHT, STAMP_WIDTH,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_REFERENCE_TEXT: &str = "Firma Prestador";

/// Tunable knobs for every pipeline. Every field has a default, so a JSON
/// override file only needs the keys it changes. Layout sections are
/// replaced as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub doctor: DoctorRule,
    pub cancelled: AppointmentLayout,
    pub missed: AppointmentLayout,
    pub signature: SignatureConfig,
    pub tools: ToolPaths,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            doctor: DoctorRule::default(),
            cancelled: AppointmentLayout::cancelled(),
            missed: AppointmentLayout::missed(),
            signature: SignatureConfig::default(),
            tools: ToolPaths::default(),
        }
    }
}

/// When a standalone cell counts as a doctor section header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorRule {
    /// Labels must be strictly longer than this many characters...
    pub min_chars: usize,
    /// ...or, when they contain more than one word, strictly longer than this.
    pub min_chars_multiword: usize,
    /// Upper-case cells containing any of these are report titles, not doctors.
    pub excluded_keywords: Vec<String>,
}

impl Default for DoctorRule {
    fn default() -> Self {
        DoctorRule {
            min_chars: DOCTOR_LABEL_MIN_CHARS,
            min_chars_multiword: DOCTOR_LABEL_MIN_CHARS_MULTIWORD,
            excluded_keywords: DOCTOR_LABEL_EXCLUDED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Column positions of an appointment export. Candidate lists are ordered:
/// the first entry is the documented position and wins ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentLayout {
    pub label_columns: Vec<usize>,
    pub banner_column: usize,
    pub date_columns: Vec<usize>,
    pub name_columns: Vec<usize>,
    pub phone_columns: Vec<usize>,
    pub rescheduled_columns: Vec<usize>,
    #[serde(default)]
    pub id_column: Option<usize>,
    #[serde(default)]
    pub cancelled_by_column: Option<usize>,
    #[serde(default)]
    pub reason_column: Option<usize>,
    #[serde(default)]
    pub notes_column: Option<usize>,
}

impl AppointmentLayout {
    /// Cancelled-appointments export: B label, C date, F name, G phone,
    /// I rescheduled, K who cancelled, L reason, M notes.
    pub fn cancelled() -> Self {
        AppointmentLayout {
            label_columns: vec![1, 0],
            banner_column: 1,
            date_columns: vec![2, 1, 3],
            name_columns: vec![5, 4, 6],
            phone_columns: vec![6, 7, 5],
            rescheduled_columns: vec![8, 9, 7],
            id_column: None,
            cancelled_by_column: Some(10),
            reason_column: Some(11),
            notes_column: Some(12),
        }
    }

    /// Missed-appointments export: A date, C id, D name, E phone, G rescheduled.
    pub fn missed() -> Self {
        AppointmentLayout {
            label_columns: vec![0, 1],
            banner_column: 0,
            date_columns: vec![0, 1],
            name_columns: vec![3, 2, 4],
            phone_columns: vec![4, 5, 3],
            rescheduled_columns: vec![6, 7, 5],
            id_column: Some(2),
            cancelled_by_column: None,
            reason_column: None,
            notes_column: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Phrase searched on the last page; empty disables the search.
    pub reference_text: String,
    pub stamp_width: f32,
    pub stamp_height: f32,
    /// How far the stamp hangs below the found text's bottom edge.
    pub baseline_offset: f32,
    pub fallback_rect: BBox,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        SignatureConfig {
            reference_text: DEFAULT_REFERENCE_TEXT.to_string(),
            stamp_width: STAMP_WIDTH,
            stamp_height: STAMP_HEIGHT,
            baseline_offset: BASELINE_OFFSET,
            fallback_rect: FALLBACK_RECT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub pdftotext: String,
    pub tesseract: String,
    pub ocr_language: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        ToolPaths {
            pdftotext: "pdftotext".to_string(),
            tesseract: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
        }
    }
}

/// Load a config override from a JSON file.
pub fn load_config(path: &Path) -> Result<PipelineConfig, DentiError> {
    let content = std::fs::read_to_string(path).map_err(|e| DentiError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(&content, path)
}

/// Parse a config from a JSON string.
pub fn parse_config(json: &str, source: &Path) -> Result<PipelineConfig, DentiError> {
    let config: PipelineConfig =
        serde_json::from_str(json).map_err(|e| DentiError::ConfigLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate that a config is usable.
pub fn validate_config(config: &PipelineConfig) -> Result<(), DentiError> {
    for (name, layout) in [("cancelled", &config.cancelled), ("missed", &config.missed)] {
        let lists = [
            ("label_columns", &layout.label_columns),
            ("date_columns", &layout.date_columns),
            ("name_columns", &layout.name_columns),
            ("phone_columns", &layout.phone_columns),
            ("rescheduled_columns", &layout.rescheduled_columns),
        ];
        for (field, list) in lists {
            if list.is_empty() {
                return Err(DentiError::ConfigInvalid(format!(
                    "{name}.{field} must list at least one column"
                )));
            }
        }
    }

    let sig = &config.signature;
    if sig.stamp_width <= 0.0 || sig.stamp_height <= 0.0 {
        return Err(DentiError::ConfigInvalid(format!(
            "stamp size must be positive, got {}x{}",
            sig.stamp_width, sig.stamp_height
        )));
    }
    let fb = &sig.fallback_rect;
    if fb.x_max <= fb.x_min || fb.y_max <= fb.y_min {
        return Err(DentiError::ConfigInvalid(
            "signature.fallback_rect must have x_max > x_min and y_max > y_min".into(),
        ));
    }

    if config.tools.pdftotext.trim().is_empty() || config.tools.tesseract.trim().is_empty() {
        return Err(DentiError::ConfigInvalid("tool paths must not be empty".into()));
    }

    Ok(())
}
