//! clonetrack CLI.
//!
//! Finds suspicious detection pairs of a cloned plate and splits each day's
//! pairs into two vehicle tracks.
#![allow(clippy::uninlined_format_args)]

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{ArgAction, Args, Parser, Subcommand};
use clonetrack_algorithms::{detect_pairs, ClusteringPipeline, DayAssessment, DayKey};
use clonetrack_core::{ClusteringConfig, DetectionPairRow};
use clonetrack_io::{load_config, DetectionReader, PairReader, PairWriter, ResultWriter};
use log::{info, warn};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    ClonetrackIo(#[from] clonetrack_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] clonetrack_core::Error),
}

/// Separates cloned-plate detections into per-vehicle tracks.
#[derive(Parser)]
#[command(name = "clonetrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Find suspicious pairs in a CSV of raw plate detections
    Detect {
        /// Raw detections CSV file
        input: PathBuf,

        /// Pair table output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep only detections of this plate
        #[arg(long)]
        plate: Option<String>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Build per-day vehicle tracks from a CSV of detection pairs
    Cluster {
        #[command(flatten)]
        input: InputArgs,

        /// JSON output file (stdout if neither this nor --tracks-dir is given)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for per-day, per-vehicle CSV track tables
        #[arg(long)]
        tracks_dir: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Report, per day, whether and how the pairs can be separated
    Inspect {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Input CSV file
    input: PathBuf,

    /// Input holds raw plate detections; find the suspicious pairs first
    #[arg(long)]
    raw: bool,

    /// Keep only detections of this plate (with --raw)
    #[arg(long, requires = "raw")]
    plate: Option<String>,
}

#[derive(Args)]
struct ConfigArgs {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum plausible speed of one vehicle (km/h); also the pair detection limit
    #[arg(long)]
    max_speed: Option<f64>,

    /// Days with a pair at or below this distance are skipped (km)
    #[arg(long)]
    min_pair_distance: Option<f64>,

    /// Seed for spatial 2-means
    #[arg(long)]
    seed: Option<u64>,

    /// Local time offset from UTC (minutes)
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<i32>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<ClusteringConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ClusteringConfig::default(),
        };
        if let Some(speed) = self.max_speed {
            config = config.with_max_speed_kmh(speed);
        }
        if let Some(distance) = self.min_pair_distance {
            config = config.with_min_pair_distance_km(distance);
        }
        if let Some(seed) = self.seed {
            config = config.with_kmeans_seed(seed);
        }
        if let Some(minutes) = self.utc_offset {
            config = config.with_utc_offset_minutes(minutes);
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn detect_from_raw(
    path: &Path,
    plate: Option<&str>,
    config: &ClusteringConfig,
) -> Result<Vec<DetectionPairRow>> {
    let mut detections = DetectionReader::open(path)?.read_all()?;
    info!("{}: {} detections", path.display(), detections.len());
    if let Some(plate) = plate {
        detections.retain(|det| det.plate.as_deref() == Some(plate));
        info!("{} detections of plate {}", detections.len(), plate);
    }
    if detections.is_empty() {
        warn!("no detections to scan in {}", path.display());
        return Ok(Vec::new());
    }
    Ok(detect_pairs(&detections, config)?)
}

fn read_rows(input: &InputArgs, config: &ClusteringConfig) -> Result<Vec<DetectionPairRow>> {
    if input.raw {
        return detect_from_raw(&input.input, input.plate.as_deref(), config);
    }
    let rows = PairReader::open(&input.input)?.read_all()?;
    info!("{}: {} detection pairs", input.input.display(), rows.len());
    Ok(rows)
}

fn write_line<W: Write>(mut sink: W, text: &str) -> Result<()> {
    writeln!(sink, "{}", text)?;
    sink.flush()?;
    Ok(())
}

fn describe(day: DayKey, assessment: &DayAssessment) -> String {
    match (assessment.method, assessment.rejection) {
        (Some(method), _) => format!(
            "{}  pairs={:<4} min={:>8.2} km  {} ({} violations)",
            day, assessment.n_pairs, assessment.min_pair_km, method, assessment.violations
        ),
        (None, Some(reason)) => format!(
            "{}  pairs={:<4} min={:>8.2} km  skipped: {}",
            day, assessment.n_pairs, assessment.min_pair_km, reason
        ),
        (None, None) => format!("{}  pairs={:<4} no labels", day, assessment.n_pairs),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Detect {
            input,
            output,
            plate,
            config,
        } => {
            let config = config.resolve()?;
            let pairs = detect_from_raw(&input, plate.as_deref(), &config)?;
            let writer = PairWriter::new(&pairs);
            match &output {
                Some(path) => {
                    writer.write_csv(path)?;
                    println!("Found {} suspicious pairs", pairs.len());
                }
                None => writer.write_to(io::stdout().lock())?,
            }
        }

        Commands::Cluster {
            input,
            output,
            tracks_dir,
            config,
        } => {
            let config = config.resolve()?;
            let rows = read_rows(&input, &config)?;
            let pipeline = ClusteringPipeline::new(config)?;

            let start = Instant::now();
            let results = pipeline.build_daily_tracks(&rows);
            let elapsed = start.elapsed();

            let writer = ResultWriter::new(&results);
            let to_stdout = output.is_none() && tracks_dir.is_none();
            if let Some(path) = &output {
                writer.write_json(path)?;
            }
            if let Some(dir) = &tracks_dir {
                writer.write_track_tables(dir)?;
            }
            if to_stdout {
                write_line(io::stdout().lock(), &writer.to_json_string()?)?;
            }

            // Keep stdout clean when it carries the JSON.
            let report = |line: String| {
                if to_stdout {
                    eprintln!("{}", line);
                } else {
                    println!("{}", line);
                }
            };
            for (day, tracks) in &results {
                report(format!(
                    "{}  {}  vehicle0={} vehicle1={}",
                    day,
                    tracks.method,
                    tracks.tracks.vehicle0.len(),
                    tracks.tracks.vehicle1.len()
                ));
            }
            report(format!(
                "Separated {} days from {} pairs in {:.2}s",
                results.len(),
                rows.len(),
                elapsed.as_secs_f64()
            ));
        }

        Commands::Inspect { input, config } => {
            let config = config.resolve()?;
            let rows = read_rows(&input, &config)?;
            let pipeline = ClusteringPipeline::new(config)?;
            let assessed = pipeline.assess_days(&rows);

            println!("File: {}", input.input.display());
            println!("Pairs: {}", rows.len());
            println!("Days: {}", assessed.len());
            for (day, assessment) in &assessed {
                println!("{}", describe(*day, assessment));
            }
            let clusterable = assessed.values().filter(|a| a.is_clusterable()).count();
            println!("Clusterable: {}/{}", clusterable, assessed.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stdout_failure_reported_as_io_error() {
        let err = write_line(ClosedPipe, "{}").unwrap_err();
        assert!(matches!(err, CliError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));

        let mut buf = Vec::new();
        write_line(&mut buf, "{}").unwrap();
        assert_eq!(buf, b"{}\n");
    }

    #[test]
    fn test_raw_input_flags() {
        let plate_only = ["clonetrack", "cluster", "in.csv", "--plate", "ABC"];
        assert!(Cli::try_parse_from(plate_only).is_err());

        let raw = ["clonetrack", "inspect", "in.csv", "--raw", "--plate", "ABC"];
        let cli = Cli::try_parse_from(raw).unwrap();
        let Commands::Inspect { input, .. } = cli.command else {
            panic!("expected inspect");
        };
        assert!(input.raw);
        assert_eq!(input.plate.as_deref(), Some("ABC"));

        let detect = ["clonetrack", "detect", "raw.csv", "-o", "pairs.csv"];
        let cli = Cli::try_parse_from(detect).unwrap();
        assert!(matches!(cli.command, Commands::Detect { output: Some(_), .. }));
    }
}
