pub mod xlsx;

use crate::model::OutputValue;

/// One worksheet of output: optional banner, a header row, then data rows.
#[derive(Debug, Clone)]
pub struct ReportSheet {
    pub name: String,
    pub banner: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<OutputValue>>,
}

impl ReportSheet {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        ReportSheet {
            name: name.into(),
            banner: None,
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}
