use denti_core::error::DentiError;
use denti_core::naming::{CANCELLED_PREFIX, MISSED_PREFIX};
use std::path::Path;

use super::{config, read_input, write_output};
use crate::output;
use crate::CommonArgs;

pub fn run_cancelled(file: &Path, common: &CommonArgs) -> Result<(), DentiError> {
    let cfg = config(common)?;
    let source = read_input(file)?;
    let result = denti_core::cancelled_appointments_report(&source, &cfg)?;
    let path = write_output(common, CANCELLED_PREFIX, "xlsx", &result.bytes)?;
    report(&result.summary, &path, common)
}

pub fn run_missed(file: &Path, common: &CommonArgs) -> Result<(), DentiError> {
    let cfg = config(common)?;
    let source = read_input(file)?;
    let result = denti_core::missed_appointments_report(&source, &cfg)?;
    let path = write_output(common, MISSED_PREFIX, "xlsx", &result.bytes)?;
    report(&result.summary, &path, common)
}

fn report(
    summary: &denti_core::pipeline::appointments::AppointmentSummary,
    path: &Path,
    common: &CommonArgs,
) -> Result<(), DentiError> {
    match common.output.as_str() {
        "json" => output::json::print(summary)?,
        _ => output::table::print_appointments(summary, path),
    }
    Ok(())
}
