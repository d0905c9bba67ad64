use crate::config::DoctorRule;
use crate::model::{Cell, RawRow};

/// Single-word labels must be strictly longer than this.
pub const DOCTOR_LABEL_MIN_CHARS: usize = 5;

/// Multi-word labels (e.g. `"DR. X"`) must be strictly longer than this.
pub const DOCTOR_LABEL_MIN_CHARS_MULTIWORD: usize = 4;

/// Upper-case titles that are report banners, not doctors.
pub const DOCTOR_LABEL_EXCLUDED: &[&str] = &["CITAS"];

/// Return the label if `cell` is a doctor section header.
pub fn header_label(cell: &Cell, rule: &DoctorRule) -> Option<String> {
    let text = cell.as_text()?.trim();
    let has_letter = text.chars().any(char::is_alphabetic);
    if !has_letter || text != text.to_uppercase() {
        return None;
    }
    if rule
        .excluded_keywords
        .iter()
        .any(|kw| text.contains(kw.to_uppercase().as_str()))
    {
        return None;
    }

    let chars = text.chars().count();
    let multiword = text.split_whitespace().nth(1).is_some();
    if chars > rule.min_chars || (multiword && chars > rule.min_chars_multiword) {
        Some(text.to_string())
    } else {
        None
    }
}

/// The doctor label carried down a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorState {
    pub label: Option<String>,
}

impl DoctorState {
    /// Label in force, empty before the first header.
    pub fn current(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}

/// Advance the doctor state over one row. Data rows never open a section.
pub fn advance(
    state: DoctorState,
    row: &RawRow,
    column: usize,
    rule: &DoctorRule,
    is_data_row: bool,
) -> DoctorState {
    if is_data_row {
        return state;
    }
    match header_label(row.cell(column), rule) {
        Some(label) => DoctorState { label: Some(label) },
        None => state,
    }
}

/// Label carried onto every row of the table, in order.
pub fn carry_labels<F>(rows: &[RawRow], column: usize, rule: &DoctorRule, is_data_row: F) -> Vec<String>
where
    F: Fn(&RawRow) -> bool,
{
    rows.iter()
        .scan(DoctorState::default(), |state, row| {
            *state = advance(std::mem::take(state), row, column, rule, is_data_row(row));
            Some(state.current().to_string())
        })
        .collect()
}

/// Pick the label column yielding the most rows with a non-empty carried
/// label. Ties go to the earliest candidate.
pub fn choose_label_column<F>(
    rows: &[RawRow],
    candidates: &[usize],
    rule: &DoctorRule,
    is_data_row: F,
) -> Option<usize>
where
    F: Fn(&RawRow) -> bool,
{
    let mut best: Option<(usize, usize)> = None;
    for &column in candidates {
        let labelled = carry_labels(rows, column, rule, &is_data_row)
            .iter()
            .filter(|l| !l.is_empty())
            .count();
        if best.map_or(true, |(_, n)| labelled > n) {
            best = Some((column, labelled));
        }
    }
    best.map(|(column, _)| column)
}
