use crate::cli::args::Cli;
use crate::coordinator::IngestionTask;
use crate::error::{ProcessingError, Result};
use crate::models::IngestionResults;
use crate::readers::DataSource;
use crate::utils::constants::ALL_LOCATIONS_ID;
use crate::utils::progress::ProgressReporter;
use crate::utils::Settings;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn, Level};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let settings = Settings::load()?;
    info!(
        file = %cli.file.display(),
        mmap = settings.use_mmap,
        "Processing water temperature data"
    );

    // No spinner when stderr is redirected
    let progress =
        ProgressReporter::new_spinner("Reading header...", !io::stderr().is_terminal());
    let mut task = IngestionTask::spawn(DataSource::path(&cli.file), settings, Some(progress));

    let finished = tokio::select! {
        result = task.wait() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let results = match finished {
        Some(result) => result?,
        None => {
            warn!("Interrupt received, cancelling ingestion");
            task.cancel();
            task.wait().await?
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&results, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Human-readable listing of every location, sorted by ID, with the overall average last.
pub fn write_report<W: Write>(results: &IngestionResults, out: &mut W) -> Result<()> {
    if results.monitoring_location_results.is_empty() {
        writeln!(out, "No water temperature readings found")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<24} {:<40} {:>10} {:>8}",
        "Location ID", "Location Name", "Avg (°C)", "Readings"
    )?;

    for (location_id, result) in results.sorted_results() {
        if location_id == ALL_LOCATIONS_ID {
            continue;
        }
        writeln!(
            out,
            "{:<24} {:<40} {:>10.2} {:>8}",
            location_id,
            results.location_name(location_id).unwrap_or(""),
            result.average,
            result.count
        )?;
    }

    if let Some(overall) = results.overall() {
        writeln!(
            out,
            "{:<24} {:<40} {:>10.2} {:>8}",
            ALL_LOCATIONS_ID, "All locations", overall.average, overall.count
        )?;
    }

    Ok(())
}

fn log_level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_target(false);

    let initialised = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };

    initialised
        .map_err(|e| ProcessingError::Config(format!("Failed to initialise logging: {}", e)))
}
