use chrono::Local;
use regex::Regex;
use std::sync::LazyLock;

pub const EXTRACT_PREFIX: &str = "DATOS_PDF";
pub const SIGNED_PREFIX: &str = "PDFS_FIRMADOS";
pub const CANCELLED_PREFIX: &str = "CITAS_CANCELADAS";
pub const MISSED_PREFIX: &str = "CITAS_INCUMPLIDAS";

static UNSAFE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("filename pattern compiles"));

/// Make a file name safe for an archive entry: each run of characters
/// outside `[A-Za-z0-9._-]` becomes one `_`.
pub fn safe_filename(name: &str) -> String {
    UNSAFE_RUN.replace_all(name.trim(), "_").into_owned()
}

/// Local-time stamp used in output names, `YYYYMMDD_HHMMSS`.
pub fn now_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `<prefix>_<stamp>.<extension>`
pub fn output_file_name(prefix: &str, extension: &str, stamp: &str) -> String {
    format!("{prefix}_{stamp}.{}", extension.trim_start_matches('.'))
}
