use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{AppointmentLayout, DoctorRule};
use crate::model::{Cell, OutputValue, ParseOutcome, RawRow};
use crate::parsing::doctor::{carry_labels, choose_label_column, header_label};
use crate::parsing::roles::{assign_roles, is_name_like, RoleAssignment};
use crate::parsing::values::{is_plausible_serial, parse_date};
use crate::report::ReportSheet;

pub const CANCELLED_HEADERS: &[&str] = &[
    "Conse",
    "Doctor",
    "Fecha cita",
    "Paciente",
    "Telefono",
    "Nueva fecha",
    "Cancelado por",
    "Motivo",
    "Observaciones",
];

pub const MISSED_HEADERS: &[&str] = &[
    "Conse",
    "Doctor",
    "Fecha cita",
    "Identificacion",
    "Paciente",
    "Telefono",
    "Nueva fecha",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    Cancelled,
    Missed,
}

impl AppointmentKind {
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            AppointmentKind::Cancelled => CANCELLED_HEADERS,
            AppointmentKind::Missed => MISSED_HEADERS,
        }
    }

    pub fn sheet_name(self) -> &'static str {
        match self {
            AppointmentKind::Cancelled => "Citas canceladas",
            AppointmentKind::Missed => "Citas incumplidas",
        }
    }
}

/// One accepted appointment. Fields a kind does not carry stay empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentRecord {
    pub conse: u64,
    pub doctor: String,
    pub date: NaiveDate,
    pub identification: String,
    pub name: String,
    pub phone: String,
    /// Only set when the appointment was moved to an earlier or equal date.
    pub rescheduled: Option<NaiveDate>,
    pub cancelled_by: String,
    pub reason: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The name cell is missing or does not look like a person's name.
    NoName,
    /// Moved to a later date, so it was not really lost.
    Rescheduled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentSummary {
    pub kind: AppointmentKind,
    pub rows_read: usize,
    pub candidates: usize,
    pub accepted: usize,
    pub rejected_no_name: usize,
    pub rejected_rescheduled: usize,
    pub doctor_blocks: usize,
    pub label_column: Option<usize>,
    pub columns: RoleAssignment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentReport {
    pub banner: Option<String>,
    pub records: Vec<AppointmentRecord>,
    pub summary: AppointmentSummary,
}

/// Date of an appointment cell. Numbers only count inside the plausible
/// serial range, so phone numbers and counters never read as dates.
pub fn appointment_date(cell: &Cell) -> ParseOutcome<NaiveDate> {
    match cell {
        Cell::Number(n) if !is_plausible_serial(*n) => {
            ParseOutcome::Malformed(format!("{n} is outside the date serial range"))
        }
        _ => parse_date(cell),
    }
}

/// Whether a candidate row is kept. A missing or unreadable rescheduled
/// date counts as "not rescheduled".
pub fn decide(
    original: NaiveDate,
    name: Option<&Cell>,
    rescheduled: &ParseOutcome<NaiveDate>,
) -> Result<(), Rejection> {
    if !name.is_some_and(is_name_like) {
        return Err(Rejection::NoName);
    }
    match rescheduled {
        ParseOutcome::Parsed(d) if *d > original => Err(Rejection::Rescheduled),
        _ => Ok(()),
    }
}

/// Filter an appointment export down to the appointments that were really
/// lost, tagging each with the doctor section it appears under.
pub fn build_appointments(
    rows: &[RawRow],
    kind: AppointmentKind,
    layout: &AppointmentLayout,
    rule: &DoctorRule,
) -> AppointmentReport {
    let roles = assign_roles(rows, layout);
    debug!(?kind, ?roles, "column roles");

    let is_data = |row: &RawRow| {
        roles
            .date
            .is_some_and(|c| appointment_date(row.cell(c)).is_parsed())
    };

    // A title on the first row, unless that row is data or a doctor section.
    let banner = rows
        .first()
        .filter(|row| !is_data(row))
        .map(|row| row.cell(layout.banner_column))
        .filter(|cell| header_label(cell, rule).is_none())
        .and_then(Cell::as_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let body = if banner.is_some() { &rows[1..] } else { rows };

    let label_column = choose_label_column(body, &layout.label_columns, rule, &is_data);
    let labels = match label_column {
        Some(col) => carry_labels(body, col, rule, &is_data),
        None => vec![String::new(); body.len()],
    };

    let mut summary = AppointmentSummary {
        kind,
        rows_read: rows.len(),
        candidates: 0,
        accepted: 0,
        rejected_no_name: 0,
        rejected_rescheduled: 0,
        doctor_blocks: count_blocks(&labels),
        label_column,
        columns: roles,
    };
    let mut records = Vec::new();

    for (row, doctor) in body.iter().zip(labels) {
        let Some(date) = roles
            .date
            .and_then(|c| appointment_date(row.cell(c)).into_value())
        else {
            continue;
        };
        summary.candidates += 1;

        let rescheduled = roles
            .rescheduled
            .map_or(ParseOutcome::Absent, |c| appointment_date(row.cell(c)));
        let name = roles.name.map(|c| row.cell(c));

        if let Err(rejection) = decide(date, name, &rescheduled) {
            debug!(%date, ?rejection, "row rejected");
            match rejection {
                Rejection::NoName => summary.rejected_no_name += 1,
                Rejection::Rescheduled => summary.rejected_rescheduled += 1,
            }
            continue;
        }

        let text_at = |col: Option<usize>| col.map(|c| row.cell(c).text_form()).unwrap_or_default();
        records.push(AppointmentRecord {
            conse: records.len() as u64 + 1,
            doctor,
            date,
            identification: text_at(layout.id_column),
            name: text_at(roles.name),
            phone: text_at(roles.phone),
            rescheduled: rescheduled.into_value(),
            cancelled_by: text_at(layout.cancelled_by_column),
            reason: text_at(layout.reason_column),
            notes: text_at(layout.notes_column),
        });
    }

    summary.accepted = records.len();
    info!(
        ?kind,
        rows = summary.rows_read,
        candidates = summary.candidates,
        accepted = summary.accepted,
        "appointments filtered"
    );

    AppointmentReport {
        banner,
        records,
        summary,
    }
}

fn count_blocks(labels: &[String]) -> usize {
    let mut previous = "";
    let mut blocks = 0;
    for label in labels {
        if !label.is_empty() && label != previous {
            blocks += 1;
        }
        previous = label;
    }
    blocks
}

/// Lay the records out in the kind's fixed column order.
pub fn build_sheet(report: &AppointmentReport) -> ReportSheet {
    let kind = report.summary.kind;
    let mut sheet = ReportSheet::new(kind.sheet_name(), kind.headers());
    sheet.banner = report.banner.clone();
    sheet.rows = report
        .records
        .iter()
        .map(|r| {
            let conse = OutputValue::Integer(r.conse);
            let doctor = OutputValue::text(r.doctor.clone());
            let date = OutputValue::Date(r.date);
            let name = OutputValue::text(r.name.clone());
            let phone = OutputValue::text(r.phone.clone());
            let rescheduled = OutputValue::date(r.rescheduled);
            match kind {
                AppointmentKind::Cancelled => vec![
                    conse,
                    doctor,
                    date,
                    name,
                    phone,
                    rescheduled,
                    OutputValue::text(r.cancelled_by.clone()),
                    OutputValue::text(r.reason.clone()),
                    OutputValue::text(r.notes.clone()),
                ],
                AppointmentKind::Missed => vec![
                    conse,
                    doctor,
                    date,
                    OutputValue::text(r.identification.clone()),
                    name,
                    phone,
                    rescheduled,
                ],
            }
        })
        .collect();
    sheet
}
