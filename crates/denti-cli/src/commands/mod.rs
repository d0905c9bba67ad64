pub mod appointments;
pub mod extract;
pub mod sign;

use denti_core::config::{load_config, PipelineConfig};
use denti_core::error::DentiError;
use denti_core::model::InputFile;
use denti_core::naming::{now_stamp, output_file_name};
use std::path::{Path, PathBuf};

use crate::CommonArgs;

/// Built-in configuration, or the `--config` override.
pub fn config(common: &CommonArgs) -> Result<PipelineConfig, DentiError> {
    match &common.config {
        Some(path) => load_config(path),
        None => Ok(PipelineConfig::default()),
    }
}

/// Read an input file, keeping only its file name.
pub fn read_input(path: &Path) -> Result<InputFile, DentiError> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(InputFile::new(name, bytes))
}

/// Write `<prefix>_<stamp>.<extension>` into the output directory.
pub fn write_output(
    common: &CommonArgs,
    prefix: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<PathBuf, DentiError> {
    std::fs::create_dir_all(&common.out_dir)?;
    let path = common
        .out_dir
        .join(output_file_name(prefix, extension, &now_stamp()));
    std::fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(path)
}
