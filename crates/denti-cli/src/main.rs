mod commands;
mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "denti",
    version,
    about = "Document transformer for dental practice paperwork"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every pipeline.
#[derive(Args)]
pub struct CommonArgs {
    /// Directory the output file is written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// JSON file overriding the built-in configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Summary format: table (default) or json
    #[arg(short, long, default_value = "table")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract tables from PDFs and text from images into one spreadsheet
    Extract {
        /// PDF (.pdf) and image (.png .jpg .jpeg .tif .tiff) files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Stamp a signature image onto the last page of each PDF, zipped
    Sign {
        /// Signature image (PNG or JPG)
        #[arg(short, long, value_name = "IMG")]
        signature: PathBuf,

        /// Text the signature is anchored below (empty string disables the search)
        #[arg(short, long)]
        text: Option<String>,

        /// PDF files to sign
        #[arg(required = true)]
        pdfs: Vec<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Report cancelled appointments that were not rescheduled later
    Cancelled {
        /// Cancelled-appointments export (.xls or .xlsx)
        file: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Report missed appointments that were not rescheduled later
    Missed {
        /// Missed-appointments export (.xls or .xlsx)
        file: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract { files, common } => commands::extract::run(&files, &common),
        Commands::Sign {
            signature,
            text,
            pdfs,
            common,
        } => commands::sign::run(&signature, text, &pdfs, &common),
        Commands::Cancelled { file, common } => commands::appointments::run_cancelled(&file, &common),
        Commands::Missed { file, common } => commands::appointments::run_missed(&file, &common),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
