use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "water-temp-processor")]
#[command(about = "Compute per-location water temperature averages from a water-quality CSV export")]
#[command(version)]
pub struct Cli {
    /// Water-quality CSV file to process
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}
