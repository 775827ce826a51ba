//! phytopet CLI - PhytoPET list-mode conversion tools.
//!
//! Converts list-mode acquisitions into CASToR histogram files, inspects
//! histogram files and exports decoded events as CSV.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]

use clap::{ArgAction, Parser, Subcommand};
use phytopet_io::{
    run_conversion, ConversionConfig, EventCsvWriter, HistogramFileReader, ListModeFileReader,
};
use phytopet_listmode::{ListModeRecord, Sentinel};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    PhytopetIo(#[from] phytopet_io::Error),

    #[error("list-mode error: {0}")]
    ListMode(#[from] phytopet_listmode::Error),
}

impl CliError {
    /// Process exit status for this error.
    fn exit_code(&self) -> u8 {
        use phytopet_io::Error as IoError;
        match self {
            Self::ListMode(e) | Self::PhytopetIo(IoError::ListModeError(e)) => {
                match e.sentinel() {
                    Some(Sentinel::Stepped) => 3,
                    Some(Sentinel::Continuous) => 4,
                    None => 1,
                }
            }
            Self::PhytopetIo(
                IoError::PairOutOfRange { .. }
                | IoError::RecordOutOfRange { .. }
                | IoError::CoreError(
                    phytopet_core::Error::InvalidCrystalIndex { .. }
                    | phytopet_core::Error::InvalidModuleSlot(_),
                ),
            ) => 5,
            Self::PhytopetIo(IoError::Config(_) | IoError::Json(_) | IoError::CoreError(_)) => 2,
            _ => 1,
        }
    }
}

/// PhytoPET list-mode to CASToR histogram converter.
#[derive(Parser)]
#[command(name = "phytopet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a list-mode file into a decay-corrected histogram
    Convert {
        /// Input list-mode file
        input: Option<PathBuf>,

        /// Output histogram file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON run configuration; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Lower energy bound, percent below 511 keV
        #[arg(long)]
        energy_low: Option<f64>,

        /// Upper energy bound, percent above 511 keV
        #[arg(long)]
        energy_high: Option<f64>,

        /// Reject pairs whose crystal coordinates are far apart
        #[arg(long)]
        spatial: bool,

        /// Tracer half-life in minutes
        #[arg(long)]
        half_life: Option<f64>,

        /// Highest vertical index of the acquisition
        #[arg(long)]
        max_vertical: Option<u32>,

        /// Events between progress messages (0 disables)
        #[arg(long)]
        progress_interval: Option<u64>,

        /// Also write the run statistics as JSON
        #[arg(long)]
        stats_json: Option<PathBuf>,
    },

    /// Print records of a histogram file
    Dump {
        /// Input histogram file
        input: PathBuf,

        /// Maximum number of records to print
        #[arg(short = 'n', long, default_value = "1000")]
        limit: u64,

        /// Skip records with zero weight
        #[arg(long)]
        nonzero: bool,
    },

    /// Export decoded list-mode events as CSV
    Export {
        /// Input list-mode file
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum number of events to export
        #[arg(short = 'n', long)]
        limit: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Convert {
            input,
            output,
            config,
            energy_low,
            energy_high,
            spatial,
            half_life,
            max_vertical,
            progress_interval,
            stats_json,
        } => {
            let mut settings = match config {
                Some(path) => ConversionConfig::from_file(path)?,
                None => ConversionConfig::default(),
            };
            if let Some(input) = input {
                settings.input = input;
            }
            if let Some(output) = output {
                settings.output = output;
            }
            if energy_low.is_some() {
                settings.energy_low_percent = energy_low;
            }
            if energy_high.is_some() {
                settings.energy_high_percent = energy_high;
            }
            if spatial {
                settings.spatial_filter = true;
            }
            if let Some(minutes) = half_life {
                settings.half_life_minutes = minutes;
            }
            if let Some(v) = max_vertical {
                settings.max_vertical_index = v;
            }
            if let Some(n) = progress_interval {
                settings.progress_interval = n;
            }

            let window = settings.energy_window()?;
            log::info!(
                "energy window [{}, {}] keV, spatial filter {}",
                window.min,
                window.max,
                if settings.spatial_filter { "on" } else { "off" }
            );

            let start = Instant::now();
            let stats = run_conversion(&settings)?;

            println!(
                "Converted {} in {:.2}s",
                settings.input.display(),
                start.elapsed().as_secs_f64()
            );
            println!("Events read: {}", stats.events_read);
            println!("Events written: {}", stats.events_written);
            println!("Position markers: {}", stats.markers_read);
            println!(
                "Rejected: {} multiplicity, {} energy, {} spatial, {} module pair",
                stats.filter.rejected_multiplicity,
                stats.filter.rejected_energy,
                stats.filter.rejected_spatial,
                stats.filter.rejected_module_pair
            );
            for (rotation, count) in &stats.written_per_rotation {
                println!("  rotation {}: {} events", rotation, count);
            }
            println!(
                "Run time: {:.3} s",
                stats.last_elapsed_ms as f64 / 1000.0
            );
            if stats.truncated {
                println!("Input ended inside a record");
            }
            if let Some(path) = stats_json {
                stats.write_json(&path)?;
                log::info!("wrote statistics to {}", path.display());
            }
        }

        Commands::Dump {
            input,
            limit,
            nonzero,
        } => {
            let reader = HistogramFileReader::open(&input)?;
            println!("File: {}", input.display());
            println!("Records: {}", reader.record_count());
            println!("index,crystalId1,crystalId2,weight");

            let mut shown = 0u64;
            for (index, record) in (0u64..).zip(reader.records()) {
                if shown >= limit {
                    break;
                }
                if nonzero && record.weight == 0.0 {
                    continue;
                }
                println!(
                    "{},{},{},{}",
                    index, record.crystal_id1, record.crystal_id2, record.weight
                );
                shown += 1;
            }
        }

        Commands::Export {
            input,
            output,
            limit,
        } => {
            let reader = ListModeFileReader::open(&input)?;
            let mut stream = reader.stream();
            let mut writer = EventCsvWriter::create(&output)?;

            while limit.is_none_or(|n| writer.rows() < n) {
                match stream.next_record() {
                    Ok(Some(ListModeRecord::Event(event))) => {
                        writer.write_event(&event, stream.rotation())?;
                    }
                    Ok(Some(ListModeRecord::Position(state))) => {
                        log::debug!(
                            "position marker: rotation {}, vertical {}",
                            state.rotation_index,
                            state.vertical_index
                        );
                    }
                    Ok(None) => break,
                    Err(phytopet_listmode::Error::UnexpectedEnd { field, offset }) => {
                        log::warn!("input ends inside {field} at byte {offset}; stopping");
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            writer.flush()?;

            println!(
                "Exported {} events ({} markers) to {}",
                writer.rows(),
                stream.markers_read(),
                output.display()
            );
        }
    }

    Ok(())
}
