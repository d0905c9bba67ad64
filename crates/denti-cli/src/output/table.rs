use denti_core::pipeline::appointments::{AppointmentKind, AppointmentSummary};
use denti_core::pipeline::extract::ExtractSummary;
use denti_core::signing::{Placement, SignSummary};
use std::path::Path;

pub fn print_extract(summary: &ExtractSummary, path: &Path) {
    println!("=== PDF / image extraction ===\n");
    println!("  Files processed:    {}", summary.files_processed);
    println!("  Files failed:       {}", summary.files_failed);
    println!("  Files unsupported:  {}", summary.files_unsupported);
    println!("  Tables found:       {}", summary.tables_found);
    println!("  Rows added:         {}", summary.rows_added);
    println!("\n  Written to {}", path.display());
}

pub fn print_sign(summary: &SignSummary, path: &Path) {
    println!("=== Signing ===\n");
    println!(
        "  Signed: {}   Failed: {}\n",
        summary.signed.len(),
        summary.failed.len()
    );

    let width = summary
        .signed
        .iter()
        .map(|s| s.source.len())
        .chain(summary.failed.iter().map(|f| f.source.len()))
        .max()
        .unwrap_or(10);

    for s in &summary.signed {
        let placement = match s.placement {
            Placement::Anchored => "below reference text",
            Placement::Fallback => "fallback position",
        };
        println!("  {:<width$}  -> {} ({})", s.source, s.entry, placement);
    }
    for f in &summary.failed {
        println!("  {:<width$}  !! {}", f.source, f.reason);
    }
    println!("\n  Written to {}", path.display());
}

pub fn print_appointments(summary: &AppointmentSummary, path: &Path) {
    let title = match summary.kind {
        AppointmentKind::Cancelled => "Cancelled appointments",
        AppointmentKind::Missed => "Missed appointments",
    };
    println!("=== {title} ===\n");
    println!("  Rows read:              {}", summary.rows_read);
    println!("  Dated rows:             {}", summary.candidates);
    println!("  Accepted:               {}", summary.accepted);
    println!("  Rejected (rescheduled): {}", summary.rejected_rescheduled);
    println!("  Rejected (no name):     {}", summary.rejected_no_name);
    println!("  Doctor sections:        {}", summary.doctor_blocks);

    let col = |c: Option<usize>| c.map(column_letter).unwrap_or_else(|| "-".into());
    println!(
        "\n  Columns: date {}, rescheduled {}, name {}, phone {}, doctor {}",
        col(summary.columns.date),
        col(summary.columns.rescheduled),
        col(summary.columns.name),
        col(summary.columns.phone),
        col(summary.label_column),
    );
    println!("\n  Written to {}", path.display());
}

/// 0 -> A, 25 -> Z, 26 -> AA
fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(12), "M");
        assert_eq!(column_letter(26), "AA");
    }
}
