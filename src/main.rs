use clap::Parser;
use water_temp_processor::cli::{run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}", e);
        std::process::exit(if e.is_cancelled() { 130 } else { 1 });
    }
}
