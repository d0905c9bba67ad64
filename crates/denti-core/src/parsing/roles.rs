use crate::config::AppointmentLayout;
use crate::model::{Cell, RawRow};
use crate::parsing::values::{is_plausible_serial, parse_date_text};
use serde::Serialize;

/// Header words that never appear in a patient name column.
pub const NAME_STOPLIST: &[&str] = &[
    "fecha",
    "hora",
    "ident",
    "paciente",
    "telefono",
    "actividad",
    "nueva",
];

/// Name cells must be strictly longer than this.
pub const NAME_MIN_CHARS: usize = 3;

/// Phone cells must contain a run of at least this many digits.
pub const PHONE_MIN_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Date,
    RescheduledDate,
    Name,
    Phone,
}

/// Which column plays which role in one table. `None` means the role could
/// not be resolved and every value for it is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleAssignment {
    pub date: Option<usize>,
    pub rescheduled: Option<usize>,
    pub name: Option<usize>,
    pub phone: Option<usize>,
}

/// Text or native date cell that reads as a calendar date.
pub fn is_date_cell(cell: &Cell) -> bool {
    match cell {
        Cell::Date(_) => true,
        Cell::Text(s) => parse_date_text(s).is_parsed(),
        _ => false,
    }
}

/// Numeric cell in the plausible spreadsheet-serial range.
pub fn is_serial_cell(cell: &Cell) -> bool {
    cell.as_number().is_some_and(is_plausible_serial)
}

pub fn is_name_like(cell: &Cell) -> bool {
    let text = cell.text_form();
    if text.chars().count() <= NAME_MIN_CHARS || !text.chars().any(char::is_alphabetic) {
        return false;
    }
    let folded = fold_accents(&text.to_lowercase());
    !NAME_STOPLIST.iter().any(|w| folded.contains(w))
}

pub fn is_phone_like(cell: &Cell) -> bool {
    let mut run = 0;
    for c in cell.text_form().chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run >= PHONE_MIN_DIGITS {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn count_matching(table: &[RawRow], column: usize, predicate: fn(&Cell) -> bool) -> usize {
    table.iter().filter(|row| predicate(row.cell(column))).count()
}

/// Score each candidate column by how many rows satisfy the role's
/// recognizer and return the best one. Ties go to the earliest candidate;
/// `None` when no candidate matches any row.
///
/// Date roles fall back to counting plausible numeric serials, per column,
/// only when the column holds no text or native dates at all.
pub fn choose_column(table: &[RawRow], candidates: &[usize], role: ColumnRole) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;

    for &column in candidates {
        let score = score_column(table, column, role);
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((column, score));
        }
    }

    best.map(|(column, _)| column)
}

/// Like [`choose_column`], but the first candidate wins as soon as any row
/// matches it. For sparse roles such as the rescheduled date, where a denser
/// neighbouring date column would otherwise outscore the real one.
pub fn choose_sparse_column(
    table: &[RawRow],
    candidates: &[usize],
    role: ColumnRole,
) -> Option<usize> {
    match candidates.first() {
        Some(&first) if score_column(table, first, role) > 0 => Some(first),
        _ => choose_column(table, candidates, role),
    }
}

fn score_column(table: &[RawRow], column: usize, role: ColumnRole) -> usize {
    match role {
        ColumnRole::Date | ColumnRole::RescheduledDate => {
            match count_matching(table, column, is_date_cell) {
                0 => count_matching(table, column, is_serial_cell),
                n => n,
            }
        }
        ColumnRole::Name => count_matching(table, column, is_name_like),
        ColumnRole::Phone => count_matching(table, column, is_phone_like),
    }
}

/// Resolve every role of an appointment export once for the whole table.
/// The rescheduled date never reuses the appointment date column and the
/// phone never reuses the name column.
pub fn assign_roles(table: &[RawRow], layout: &AppointmentLayout) -> RoleAssignment {
    let date = choose_column(table, &layout.date_columns, ColumnRole::Date);
    let rescheduled = choose_sparse_column(
        table,
        &excluding(&layout.rescheduled_columns, date),
        ColumnRole::RescheduledDate,
    );
    let name = choose_column(table, &layout.name_columns, ColumnRole::Name);
    let phone = choose_column(table, &excluding(&layout.phone_columns, name), ColumnRole::Phone);

    RoleAssignment {
        date,
        rescheduled,
        name,
        phone,
    }
}

fn excluding(candidates: &[usize], taken: Option<usize>) -> Vec<usize> {
    candidates
        .iter()
        .copied()
        .filter(|&c| Some(c) != taken)
        .collect()
}
